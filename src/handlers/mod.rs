pub mod pages;
pub mod recipe;
pub mod user;

use actix_web::{get, web, HttpResponse};
use serde::Serialize;
use serde_json::json;

use crate::db;
use crate::error::ApiError;
use crate::query;
use crate::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct Endpoint {
    pub path: &'static str,
    pub methods: &'static [&'static str],
    pub description: &'static str,
}

pub const ENDPOINTS: &[Endpoint] = &[
    Endpoint {
        path: "/",
        methods: &["GET"],
        description: "HTML list of all recipes",
    },
    Endpoint {
        path: "/recipes/{id}/",
        methods: &["GET"],
        description: "HTML recipe page",
    },
    Endpoint {
        path: "/api",
        methods: &["GET"],
        description: "This index",
    },
    Endpoint {
        path: "/api/user/create/",
        methods: &["POST"],
        description: "Register a user",
    },
    Endpoint {
        path: "/api/user/token/",
        methods: &["POST"],
        description: "Exchange email and password for an auth token",
    },
    Endpoint {
        path: "/api/user/me/",
        methods: &["GET", "PUT", "PATCH"],
        description: "The authenticated user",
    },
    Endpoint {
        path: "/api/recipe/recipes/",
        methods: &["GET", "POST"],
        description: "Own recipes; filter with ?tags=1,2&ingredients=3",
    },
    Endpoint {
        path: "/api/recipe/recipes/{id}/",
        methods: &["GET", "PUT", "PATCH", "DELETE"],
        description: "One recipe with its tags and ingredients",
    },
    Endpoint {
        path: "/api/recipe/ingredients/",
        methods: &["GET", "POST"],
        description: "Own ingredients; ?assigned_only=1 for those in use",
    },
    Endpoint {
        path: "/api/recipe/ingredients/{id}/",
        methods: &["PUT", "PATCH", "DELETE"],
        description: "Rename or delete an ingredient",
    },
    Endpoint {
        path: "/api/recipe/tags/",
        methods: &["GET", "POST"],
        description: "Own tags; ?assigned_only=1 for those in use",
    },
    Endpoint {
        path: "/api/recipe/tags/{id}/",
        methods: &["PUT", "PATCH", "DELETE"],
        description: "Rename or delete a tag",
    },
    Endpoint {
        path: "/health",
        methods: &["GET"],
        description: "Liveness and database reachability",
    },
];

#[get("/api")]
pub async fn api_index() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": ENDPOINTS,
    }))
}

#[get("/health")]
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    match db::run(&state, query::count_recipes).await {
        Ok(_) => HttpResponse::Ok().json(json!({"status": "ok", "database": "ok"})),
        Err(e) => {
            log::warn!("health check failed: {}", e);
            HttpResponse::ServiceUnavailable()
                .json(json!({"status": "degraded", "database": e.to_string()}))
        }
    }
}

pub async fn not_found() -> Result<HttpResponse, ApiError> {
    Err(ApiError::not_found("Resource"))
}
