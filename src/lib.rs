//! Recipe management service: users, recipes, ingredients and tags over a
//! single SQLite file, served as HTML pages and a token authenticated JSON API.

#[macro_use]
extern crate diesel;

pub mod auth;
pub mod cache;
pub mod check;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod query;
pub mod schema;

use actix_web::web;

use crate::auth::Hasher;
use crate::cache::RecipeCache;
use crate::config::Config;
use crate::db::{CircuitBreakerType, DbPool};
use crate::error::ApiError;

/// State shared by every worker.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub circuit_breaker: CircuitBreakerType,
    pub hasher: Hasher,
    pub cache: Option<RecipeCache>,
}

impl AppState {
    pub fn new(pool: DbPool, hasher: Hasher, cache: Option<RecipeCache>) -> Self {
        Self {
            pool,
            circuit_breaker: db::build_circuit_breaker(),
            hasher,
            cache,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        let pool = db::build_pool(config)?;
        let cache = match &config.redis_url {
            Some(url) => {
                let cache = RecipeCache::connect(url, config.cache_ttl_seconds)
                    .map_err(|e| ApiError::Unavailable(format!("invalid redis url: {}", e)))?;
                log::info!("caching recipe lists in redis for {}s", config.cache_ttl_seconds);
                Some(cache)
            }
            None => None,
        };
        // a throwaway database gets throwaway password hashes
        let hasher = if config.is_in_memory() {
            Hasher::fast()
        } else {
            Hasher::default()
        };
        Ok(Self::new(pool, hasher, cache))
    }

    /// Creates the schema and optionally the sample data. Blocking.
    pub fn init_db(&self, seed: bool) -> Result<bool, ApiError> {
        let conn = self.pool.get()?;
        db::init_db(&conn, &self.hasher, seed)
    }
}

/// Registers every route, the JSON extractor error handling and the JSON 404.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        ApiError::bad_request(format!("Invalid JSON body: {}", err)).into()
    }))
    .app_data(web::QueryConfig::default().error_handler(|err, _req| {
        ApiError::bad_request(format!("Invalid query string: {}", err)).into()
    }))
    .service(handlers::pages::index)
    .service(handlers::pages::recipe_page)
    .service(handlers::api_index)
    .service(handlers::health)
    .service(handlers::user::create_user)
    .service(handlers::user::create_token)
    .service(handlers::user::me)
    .service(handlers::user::replace_me)
    .service(handlers::user::patch_me)
    .service(handlers::recipe::list_tags)
    .service(handlers::recipe::create_tag)
    .service(handlers::recipe::replace_tag)
    .service(handlers::recipe::patch_tag)
    .service(handlers::recipe::delete_tag)
    .service(handlers::recipe::list_ingredients)
    .service(handlers::recipe::create_ingredient)
    .service(handlers::recipe::replace_ingredient)
    .service(handlers::recipe::patch_ingredient)
    .service(handlers::recipe::delete_ingredient)
    .service(handlers::recipe::list_recipes)
    .service(handlers::recipe::create_recipe)
    .service(handlers::recipe::get_recipe)
    .service(handlers::recipe::replace_recipe)
    .service(handlers::recipe::patch_recipe)
    .service(handlers::recipe::delete_recipe)
    .default_service(web::route().to(handlers::not_found));
}
