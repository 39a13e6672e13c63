//! Connection pool, schema setup and sample data.

use actix_web::web;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager, CustomizeConnection};
use diesel::sql_types::Text;
use failsafe::backoff::EqualJittered;
use failsafe::failure_policy::{ConsecutiveFailures, OrElse, SuccessRateOverTimeWindow};
use failsafe::{CircuitBreaker, StateMachine};

use crate::auth::Hasher;
use crate::config::Config;
use crate::error::ApiError;
use crate::models::{LabelKind, NewRecipe};
use crate::query;
use crate::AppState;

pub type DbPool = r2d2::Pool<ConnectionManager<SqliteConnection>>;

pub type CircuitBreakerType = StateMachine<
    OrElse<SuccessRateOverTimeWindow<EqualJittered>, ConsecutiveFailures<EqualJittered>>,
    (),
>;

const BUSY_TIMEOUT_MS: u32 = 5_000;

const SCHEMA: &str = "
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        email TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL DEFAULT '',
        password_hash TEXT NOT NULL,
        token TEXT UNIQUE,
        is_active BOOLEAN NOT NULL DEFAULT 1
    );

    CREATE TABLE IF NOT EXISTS recipes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        title TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        time_minutes INTEGER NOT NULL,
        price REAL NOT NULL,
        link TEXT NOT NULL DEFAULT ''
    );

    CREATE TABLE IF NOT EXISTS ingredients (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        name TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS tags (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        name TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS recipe_ingredients (
        recipe_id INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
        ingredient_id INTEGER NOT NULL REFERENCES ingredients(id) ON DELETE CASCADE,
        PRIMARY KEY (recipe_id, ingredient_id)
    );

    CREATE TABLE IF NOT EXISTS recipe_tags (
        recipe_id INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
        tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
        PRIMARY KEY (recipe_id, tag_id)
    );

    CREATE INDEX IF NOT EXISTS idx_recipes_user ON recipes(user_id);
    CREATE INDEX IF NOT EXISTS idx_ingredients_user ON ingredients(user_id);
    CREATE INDEX IF NOT EXISTS idx_tags_user ON tags(user_id);
";

pub const SAMPLE_USER_EMAIL: &str = "demo@example.com";
pub const SAMPLE_USER_PASSWORD: &str = "demopass123";

struct SampleRecipe {
    title: &'static str,
    description: &'static str,
    time_minutes: i32,
    price: f64,
    tags: &'static [&'static str],
    ingredients: &'static [&'static str],
}

const SAMPLE_TAGS: [&str; 5] = ["Breakfast", "Dessert", "Dinner", "Quick", "Vegan"];
const SAMPLE_INGREDIENTS: [&str; 8] = [
    "Butter", "Eggs", "Flour", "Garlic", "Milk", "Rice", "Sugar", "Tofu",
];

const SAMPLE_RECIPES: [SampleRecipe; 4] = [
    SampleRecipe {
        title: "Classic Pancakes",
        description: "Whisk, rest the batter for ten minutes, fry in butter.",
        time_minutes: 20,
        price: 3.50,
        tags: &["Breakfast", "Quick"],
        ingredients: &["Flour", "Eggs", "Milk", "Butter", "Sugar"],
    },
    SampleRecipe {
        title: "Garlic Fried Rice",
        description: "Day-old rice fried hard with plenty of garlic and an egg.",
        time_minutes: 15,
        price: 2.75,
        tags: &["Dinner", "Quick"],
        ingredients: &["Rice", "Garlic", "Eggs"],
    },
    SampleRecipe {
        title: "Crispy Tofu Bowl",
        description: "Pressed tofu, pan fried until golden, over steamed rice.",
        time_minutes: 35,
        price: 6.00,
        tags: &["Dinner", "Vegan"],
        ingredients: &["Tofu", "Rice", "Garlic"],
    },
    SampleRecipe {
        title: "Shortbread",
        description: "Three ingredients, slow oven.",
        time_minutes: 50,
        price: 4.25,
        tags: &["Dessert"],
        ingredients: &["Flour", "Sugar", "Butter"],
    },
];

#[derive(Debug)]
struct ConnectionOptions {
    wal: bool,
}

impl CustomizeConnection<SqliteConnection, r2d2::Error> for ConnectionOptions {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), r2d2::Error> {
        let mut pragmas = format!(
            "PRAGMA foreign_keys = ON; PRAGMA busy_timeout = {};",
            BUSY_TIMEOUT_MS
        );
        if self.wal {
            pragmas.push_str(" PRAGMA journal_mode = WAL;");
        }
        conn.batch_execute(&pragmas).map_err(r2d2::Error::QueryError)
    }
}

pub fn build_pool(config: &Config) -> Result<DbPool, r2d2::PoolError> {
    let manager = ConnectionManager::<SqliteConnection>::new(config.database_url.as_str());
    let builder = r2d2::Pool::builder()
        .max_size(config.effective_pool_size())
        .connection_customizer(Box::new(ConnectionOptions {
            wal: !config.is_in_memory(),
        }));
    // an in-memory database lives exactly as long as its connection
    let builder = if config.is_in_memory() {
        builder.idle_timeout(None).max_lifetime(None)
    } else {
        builder
    };
    builder.build(manager)
}

pub fn build_circuit_breaker() -> CircuitBreakerType {
    failsafe::Config::new().build()
}

pub fn create_schema(conn: &SqliteConnection) -> Result<(), ApiError> {
    conn.batch_execute(SCHEMA)?;
    Ok(())
}

/// Creates missing tables and, when asked, seeds an empty database.
/// Returns whether sample data was inserted.
pub fn init_db(conn: &SqliteConnection, hasher: &Hasher, seed: bool) -> Result<bool, ApiError> {
    create_schema(conn)?;
    if !seed || query::count_recipes(conn)? > 0 {
        return Ok(false);
    }
    insert_sample_data(conn, hasher)?;
    log::info!("inserted {} sample recipes", SAMPLE_RECIPES.len());
    Ok(true)
}

fn insert_sample_data(conn: &SqliteConnection, hasher: &Hasher) -> Result<(), ApiError> {
    let password_hash = hasher.hash(SAMPLE_USER_PASSWORD)?;
    conn.transaction::<_, ApiError, _>(|| {
        let user = match query::find_user_by_email(SAMPLE_USER_EMAIL, conn)? {
            Some(user) => user,
            None => query::create_user(SAMPLE_USER_EMAIL, "Demo Cook", &password_hash, conn)?,
        };

        let mut tag_ids = Vec::new();
        for name in SAMPLE_TAGS.iter() {
            let tag = query::create_label(LabelKind::Tag, user.id, name, conn)?;
            tag_ids.push((*name, tag.id));
        }
        let mut ingredient_ids = Vec::new();
        for name in SAMPLE_INGREDIENTS.iter() {
            let ingredient = query::create_label(LabelKind::Ingredient, user.id, name, conn)?;
            ingredient_ids.push((*name, ingredient.id));
        }
        let lookup = |names: &[&str], ids: &[(&str, i32)]| -> Vec<i32> {
            ids.iter()
                .filter(|(name, _)| names.contains(name))
                .map(|(_, id)| *id)
                .collect()
        };

        for sample in SAMPLE_RECIPES.iter() {
            let new = NewRecipe {
                user_id: user.id,
                title: sample.title,
                description: sample.description,
                time_minutes: sample.time_minutes,
                price: sample.price,
                link: "",
            };
            query::create_recipe(
                &new,
                &lookup(sample.tags, &tag_ids),
                &lookup(sample.ingredients, &ingredient_ids),
                conn,
            )?;
        }
        Ok(())
    })
}

#[derive(QueryableByName)]
struct TableName {
    #[sql_type = "Text"]
    name: String,
}

pub fn table_names(conn: &SqliteConnection) -> Result<Vec<String>, ApiError> {
    let rows = diesel::sql_query("SELECT name FROM sqlite_master WHERE type = 'table'")
        .load::<TableName>(conn)?;
    Ok(rows.into_iter().map(|row| row.name).collect())
}

/// Runs a database operation on the blocking pool, behind the circuit breaker.
pub async fn run<F, T>(state: &AppState, op: F) -> Result<T, ApiError>
where
    F: FnOnce(&SqliteConnection) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    let pool = state.pool.clone();
    let circuit_breaker = state.circuit_breaker.clone();
    let result = web::block(move || {
        circuit_breaker
            .call_with(ApiError::is_failure, || {
                let conn = pool.get()?;
                op(&conn)
            })
            .map_err(|e| {
                if let failsafe::Error::Rejected = e {
                    log::warn!("database call rejected by circuit breaker");
                }
                ApiError::from(e)
            })
    })
    .await?;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TABLE_NAMES;

    fn memory_pool() -> DbPool {
        build_pool(&Config::in_memory()).unwrap()
    }

    #[test]
    fn init_creates_every_table() {
        let pool = memory_pool();
        let conn = pool.get().unwrap();
        init_db(&conn, &Hasher::fast(), false).unwrap();
        let names = table_names(&conn).unwrap();
        for table in TABLE_NAMES.iter() {
            assert!(names.iter().any(|n| n == table), "missing {}", table);
        }
        assert_eq!(query::count_recipes(&conn).unwrap(), 0);
    }

    #[test]
    fn seeding_is_idempotent() {
        let pool = memory_pool();
        let conn = pool.get().unwrap();
        let hasher = Hasher::fast();
        assert!(init_db(&conn, &hasher, true).unwrap());
        assert!(!init_db(&conn, &hasher, true).unwrap());
        assert_eq!(
            query::count_recipes(&conn).unwrap(),
            SAMPLE_RECIPES.len() as i64
        );
    }

    #[test]
    fn sample_user_can_log_in() {
        let pool = memory_pool();
        let conn = pool.get().unwrap();
        let hasher = Hasher::fast();
        init_db(&conn, &hasher, true).unwrap();
        let user = query::find_user_by_email(SAMPLE_USER_EMAIL, &conn)
            .unwrap()
            .unwrap();
        assert!(hasher.verify(SAMPLE_USER_PASSWORD, &user.password_hash));
    }

    #[test]
    fn sample_recipes_are_linked() {
        let pool = memory_pool();
        let conn = pool.get().unwrap();
        init_db(&conn, &Hasher::fast(), true).unwrap();
        for recipe in query::list_all_recipes(&conn).unwrap() {
            assert!(query::count_recipe_links(recipe.id, &conn).unwrap() > 0);
        }
    }

    #[test]
    fn pooled_connections_enforce_foreign_keys() {
        let pool = memory_pool();
        let conn = pool.get().unwrap();
        create_schema(&conn).unwrap();
        let err = conn
            .batch_execute("INSERT INTO recipe_tags (recipe_id, tag_id) VALUES (99, 99);")
            .unwrap_err();
        assert!(err.to_string().contains("FOREIGN KEY"));
    }
}
