//! Server configuration.
//!
//! Values come from command line flags, then the environment (a `.env` file
//! is loaded first), then the defaults below.

use clap::{ArgAction, Args};

const DEFAULT_DATABASE_URL: &str = "app.db";
const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8080";
const MEMORY_DATABASE: &str = ":memory:";

#[derive(Debug, Clone, Args)]
pub struct Config {
    /// Path of the SQLite database file (`:memory:` for a throwaway database).
    #[arg(long, env = "DATABASE_URL", default_value = DEFAULT_DATABASE_URL, global = true)]
    pub database_url: String,

    /// Address to listen on for HTTP requests.
    #[arg(long, env = "BIND_ADDRESS", default_value = DEFAULT_BIND_ADDRESS, global = true)]
    pub bind_address: String,

    /// Maximum number of pooled database connections.
    #[arg(long, env = "DB_POOL_SIZE", default_value_t = 8, global = true)]
    pub pool_size: u32,

    /// Redis connection string for the recipe list cache. Caching is off when unset.
    #[arg(long, env = "REDIS_URL", global = true)]
    pub redis_url: Option<String>,

    /// Lifetime of cached recipe lists.
    #[arg(long, env = "CACHE_TTL_SECONDS", default_value_t = 60, global = true)]
    pub cache_ttl_seconds: u64,

    /// Insert sample data into an empty database.
    #[arg(long, env = "SEED_DATA", default_value_t = true, action = ArgAction::Set, global = true)]
    pub seed: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            pool_size: 8,
            redis_url: None,
            cache_ttl_seconds: 60,
            seed: true,
        }
    }
}

impl Config {
    /// Configuration backed by a private in-memory database.
    pub fn in_memory() -> Self {
        Self {
            database_url: MEMORY_DATABASE.to_string(),
            ..Self::default()
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_url == MEMORY_DATABASE
    }

    /// Every connection to `:memory:` opens its own database, so the pool
    /// must hold exactly one.
    pub fn effective_pool_size(&self) -> u32 {
        if self.is_in_memory() {
            1
        } else {
            self.pool_size.max(1)
        }
    }
}
