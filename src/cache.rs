//! Optional Redis cache for per-user recipe lists.
//!
//! The cache never fails a request: every Redis error is logged and the
//! caller falls back to the database.
//!
//! Lists are stored under a per-user generation number. Invalidation bumps
//! the generation, so a list read before a write and stored after it lands
//! under a generation nobody reads again.

use std::ops::DerefMut;
use std::time::Duration;

use diesel::r2d2;
use r2d2_redis::redis::{Commands, RedisError};
use r2d2_redis::RedisConnectionManager;

use crate::models::RecipeSummary;

pub type RedisPool = r2d2::Pool<RedisConnectionManager>;

const CACHE_POOL_MAX_OPEN: u32 = 16;
const CACHE_POOL_CONNECT_TIMEOUT_MS: u64 = 250;
const CACHE_POOL_EXPIRE_SECONDS: u64 = 60;

#[derive(Clone)]
pub struct RecipeCache {
    pool: RedisPool,
    ttl_seconds: usize,
}

impl RecipeCache {
    /// Builds the pool without connecting, so an unreachable Redis does not
    /// hold up startup.
    pub fn connect(redis_url: &str, ttl_seconds: u64) -> Result<Self, RedisError> {
        let manager = RedisConnectionManager::new(redis_url)?;
        let pool = r2d2::Pool::builder()
            .max_size(CACHE_POOL_MAX_OPEN)
            .min_idle(Some(0))
            .connection_timeout(Duration::from_millis(CACHE_POOL_CONNECT_TIMEOUT_MS))
            .max_lifetime(Some(Duration::from_secs(CACHE_POOL_EXPIRE_SECONDS)))
            .build_unchecked(manager);
        Ok(Self {
            pool,
            ttl_seconds: ttl_seconds.max(1) as usize,
        })
    }

    pub fn key(user_id: i32, generation: u64) -> String {
        format!("recipes:{}:{}", user_id, generation)
    }

    pub fn generation_key(user_id: i32) -> String {
        format!("recipes:{}:generation", user_id)
    }

    /// Current list generation for the user, or None when Redis is
    /// unavailable. Blocking; call from the blocking pool.
    pub fn generation(&self, user_id: i32) -> Option<u64> {
        let mut conn = match self.pool.get() {
            Ok(conn) => conn,
            Err(e) => {
                log::warn!("recipe cache unavailable: {}", e);
                return None;
            }
        };
        let value: Result<Option<u64>, RedisError> =
            conn.deref_mut().get(Self::generation_key(user_id));
        match value {
            Ok(generation) => Some(generation.unwrap_or(0)),
            Err(e) => {
                log::warn!("recipe cache read failed: {}", e);
                None
            }
        }
    }

    pub fn get(&self, user_id: i32, generation: u64) -> Option<Vec<RecipeSummary>> {
        let mut conn = match self.pool.get() {
            Ok(conn) => conn,
            Err(e) => {
                log::warn!("recipe cache unavailable: {}", e);
                return None;
            }
        };
        let value: Result<Option<Vec<u8>>, RedisError> =
            conn.deref_mut().get(Self::key(user_id, generation));
        match value {
            Ok(Some(bytes)) if !bytes.is_empty() => match RecipeSummary::decode_list(&bytes) {
                Ok(recipes) => Some(recipes),
                Err(e) => {
                    log::warn!("discarding unreadable cache entry: {}", e);
                    None
                }
            },
            Ok(_) => None,
            Err(e) => {
                log::warn!("recipe cache read failed: {}", e);
                None
            }
        }
    }

    /// Stores `recipes` as read under `generation`.
    pub fn put(&self, user_id: i32, generation: u64, recipes: &[RecipeSummary]) {
        let bytes = match RecipeSummary::encode_list(recipes) {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("could not encode recipe list: {}", e);
                return;
            }
        };
        match self.pool.get() {
            Ok(mut conn) => {
                let result: Result<(), RedisError> = conn.deref_mut().set_ex(
                    Self::key(user_id, generation),
                    bytes,
                    self.ttl_seconds,
                );
                if let Err(e) = result {
                    log::warn!("recipe cache write failed: {}", e);
                }
            }
            Err(e) => log::warn!("recipe cache unavailable: {}", e),
        }
    }

    pub fn invalidate(&self, user_id: i32) {
        match self.pool.get() {
            Ok(mut conn) => {
                let result: Result<u64, RedisError> =
                    conn.deref_mut().incr(Self::generation_key(user_id), 1);
                if let Err(e) = result {
                    log::warn!("recipe cache invalidation failed: {}", e);
                }
            }
            Err(e) => log::warn!("recipe cache unavailable: {}", e),
        }
    }
}
