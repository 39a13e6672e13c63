//! Smoke checks for a deployment. Five checks run in order: configuration,
//! schema, sample data, application construction and route coverage.
//!
//! Every check traps its own failure so one broken check never hides the
//! result of the others.

use std::fmt;
use std::net::SocketAddr;
use std::path::Path;

use actix_web::http::StatusCode;
use actix_web::{test, web, App, HttpResponse};
use serde_json::json;

use crate::config::Config;
use crate::error::ApiError;
use crate::handlers::ENDPOINTS;
use crate::schema::TABLE_NAMES;
use crate::{configure, db, query, AppState};

const PASS: &str = "✓";
const FAIL: &str = "✗";

/// Routes a working deployment must serve, with the method used to probe them.
pub const EXPECTED_ROUTES: [(&str, &str); 9] = [
    ("GET", "/"),
    ("GET", "/recipes/{id}/"),
    ("GET", "/api"),
    ("POST", "/api/user/create/"),
    ("GET", "/api/user/me/"),
    ("POST", "/api/user/token/"),
    ("GET", "/api/recipe/recipes/"),
    ("GET", "/api/recipe/ingredients/"),
    ("GET", "/api/recipe/tags/"),
];

#[derive(Debug, Clone)]
pub struct CheckOutcome {
    pub name: &'static str,
    pub passed: bool,
    pub lines: Vec<String>,
}

impl CheckOutcome {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            passed: true,
            lines: Vec::new(),
        }
    }

    fn pass(&mut self, line: impl Into<String>) {
        self.lines.push(format!("{} {}", PASS, line.into()));
    }

    fn fail(&mut self, line: impl Into<String>) {
        self.passed = false;
        self.lines.push(format!("{} {}", FAIL, line.into()));
    }
}

#[derive(Debug, Clone, Default)]
pub struct CheckReport {
    pub outcomes: Vec<CheckOutcome>,
}

impl CheckReport {
    pub fn passed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.passed).count()
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn success(&self) -> bool {
        self.passed() == self.total()
    }

    pub fn exit_code(&self) -> i32 {
        if self.success() {
            0
        } else {
            1
        }
    }
}

impl fmt::Display for CheckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(50);
        writeln!(f, "Checking recipe-server deployment...")?;
        writeln!(f, "{}", rule)?;
        for outcome in &self.outcomes {
            writeln!(f, "[{}]", outcome.name)?;
            for line in &outcome.lines {
                writeln!(f, "{}", line)?;
            }
            writeln!(f)?;
        }
        writeln!(f, "{}", rule)?;
        writeln!(
            f,
            "Results: {}/{} checks passed",
            self.passed(),
            self.total()
        )?;
        if self.success() {
            writeln!(f, "{} All checks passed.", PASS)
        } else {
            writeln!(f, "{} Some checks failed. See the errors above.", FAIL)
        }
    }
}

fn check_config(config: &Config) -> CheckOutcome {
    let mut outcome = CheckOutcome::new("configuration");
    if config.database_url.trim().is_empty() {
        outcome.fail("DATABASE_URL is empty");
    } else {
        outcome.pass(format!("Database: {}", config.database_url));
    }
    match config.bind_address.parse::<SocketAddr>() {
        Ok(addr) => outcome.pass(format!("Bind address: {}", addr)),
        Err(e) => outcome.fail(format!("Bind address '{}' invalid: {}", config.bind_address, e)),
    }
    match &config.redis_url {
        Some(url) => outcome.pass(format!("Recipe cache: {}", url)),
        None => outcome.pass("Recipe cache: disabled"),
    }
    outcome
}

/// Deletes the database file and its WAL companions.
fn remove_database(path: &str) -> std::io::Result<bool> {
    let mut removed = false;
    for suffix in ["", "-wal", "-shm"] {
        let file = format!("{}{}", path, suffix);
        if Path::new(&file).exists() {
            std::fs::remove_file(&file)?;
            removed = true;
        }
    }
    Ok(removed)
}

async fn check_schema(config: &Config, fresh: bool) -> (CheckOutcome, Option<AppState>) {
    let mut outcome = CheckOutcome::new("schema");

    if fresh && !config.is_in_memory() {
        match remove_database(&config.database_url) {
            Ok(true) => outcome.pass(format!("Removed existing {}", config.database_url)),
            Ok(false) => {}
            Err(e) => {
                outcome.fail(format!("Could not remove {}: {}", config.database_url, e));
                return (outcome, None);
            }
        }
    }

    let state = match AppState::from_config(config) {
        Ok(state) => state,
        Err(e) => {
            outcome.fail(format!("Database connection failed: {}", e));
            return (outcome, None);
        }
    };

    let init_state = state.clone();
    let seed = config.seed;
    let initialized: Result<bool, ApiError> = match web::block(move || init_state.init_db(seed)).await {
        Ok(result) => result,
        Err(e) => Err(e.into()),
    };
    if let Err(e) = initialized {
        outcome.fail(format!("Database initialization failed: {}", e));
        return (outcome, Some(state));
    }

    match db::run(&state, db::table_names).await {
        Ok(names) => {
            for table in TABLE_NAMES.iter() {
                if names.iter().any(|name| name == table) {
                    outcome.pass(format!("Table '{}' exists", table));
                } else {
                    outcome.fail(format!("Table '{}' missing", table));
                }
            }
        }
        Err(e) => outcome.fail(format!("Could not list tables: {}", e)),
    }

    (outcome, Some(state))
}

/// Never writes: with `SEED_DATA=false` an empty database fails here.
async fn check_sample_data(state: Option<&AppState>) -> CheckOutcome {
    let mut outcome = CheckOutcome::new("sample data");
    let state = match state {
        Some(state) => state,
        None => {
            outcome.fail("Database unavailable");
            return outcome;
        }
    };
    match db::run(state, query::count_recipes).await {
        Ok(count) if count > 0 => outcome.pass(format!("Sample data present ({} recipes)", count)),
        Ok(_) => outcome.fail("No sample data found"),
        Err(e) => outcome.fail(format!("Could not count recipes: {}", e)),
    }
    outcome
}

async fn first_recipe_id(state: &AppState) -> i32 {
    db::run(state, query::list_all_recipes)
        .await
        .ok()
        .and_then(|recipes| recipes.first().map(|r| r.id))
        .unwrap_or(1)
}

// Stands in for the JSON 404 while probing, so a handler's own 404 (such as
// a missing recipe page) still counts as routed.
async fn unrouted() -> HttpResponse {
    HttpResponse::new(UNROUTED)
}

const UNROUTED: StatusCode = StatusCode::NOT_IMPLEMENTED;

fn probe_request(method: &str, path: &str) -> test::TestRequest {
    let req = match method {
        "POST" => test::TestRequest::post(),
        "PUT" => test::TestRequest::put(),
        "PATCH" => test::TestRequest::patch(),
        "DELETE" => test::TestRequest::delete(),
        _ => test::TestRequest::get(),
    }
    .uri(path);
    match method {
        "POST" | "PUT" | "PATCH" => req.set_json(json!({})),
        _ => req,
    }
}

/// Probes the expected routes and every method listed by `/api` against the
/// services `routes` registers.
async fn check_routes<F>(state: AppState, routes: F, recipe_id: i32) -> CheckOutcome
where
    F: FnOnce(&mut web::ServiceConfig),
{
    let mut outcome = CheckOutcome::new("routes");
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(routes)
            .default_service(web::route().to(unrouted)),
    )
    .await;
    let id = recipe_id.to_string();

    for (method, route) in EXPECTED_ROUTES.iter() {
        let req = probe_request(method, &route.replace("{id}", &id)).to_request();
        if test::call_service(&app, req).await.status() == UNROUTED {
            outcome.fail(format!("Route '{}' missing", route));
        } else {
            outcome.pass(format!("Route '{}' registered", route));
        }
    }

    let mut listed = 0;
    let mut found = 0;
    for endpoint in ENDPOINTS.iter() {
        for method in endpoint.methods.iter() {
            listed += 1;
            let req = probe_request(method, &endpoint.path.replace("{id}", &id)).to_request();
            if test::call_service(&app, req).await.status() == UNROUTED {
                outcome.fail(format!("{} {} is listed but not routed", method, endpoint.path));
            } else {
                found += 1;
            }
        }
    }
    let summary = format!("Found {} of {} listed routes", found, listed);
    if found == listed {
        outcome.pass(summary);
    } else {
        outcome.fail(summary);
    }
    outcome
}

/// Builds the application in-process, then probes its routes.
async fn check_application(state: Option<AppState>, config: &Config) -> Vec<CheckOutcome> {
    let mut app_outcome = CheckOutcome::new("application");

    let state = match state.map(Ok).unwrap_or_else(|| AppState::from_config(config)) {
        Ok(state) => state,
        Err(e) => {
            app_outcome.fail(format!("Application state unavailable: {}", e));
            let mut routes_outcome = CheckOutcome::new("routes");
            routes_outcome.fail("Routes not probed");
            return vec![app_outcome, routes_outcome];
        }
    };
    let recipe_id = first_recipe_id(&state).await;

    test::init_service(
        App::new()
            .app_data(web::Data::new(state.clone()))
            .configure(configure),
    )
    .await;
    app_outcome.pass("Application service built");

    let routes_outcome = check_routes(state, configure, recipe_id).await;
    vec![app_outcome, routes_outcome]
}

/// Runs every check. Must be called inside an actix system.
pub async fn run_checks(config: &Config, fresh: bool) -> CheckReport {
    let mut report = CheckReport::default();
    report.outcomes.push(check_config(config));
    let (schema, state) = check_schema(config, fresh).await;
    report.outcomes.push(schema);
    report.outcomes.push(check_sample_data(state.as_ref()).await);
    report
        .outcomes
        .extend(check_application(state, config).await);
    report
}
