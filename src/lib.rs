use std::sync::RwLock;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
pub type DbPool = Pool<SqliteConnectionManager>;

use crate::cache::QueryCache;

/// Process-wide state shared by every worker.
pub struct AppState {
    pub query_cache: RwLock<QueryCache>,
}

impl AppState {
    pub fn new() -> Self {
        AppState {
            query_cache: RwLock::new(QueryCache::default()),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds a pool whose connections all enforce foreign keys.
pub fn build_pool(manager: SqliteConnectionManager) -> Result<DbPool, r2d2::Error> {
    let manager = manager.with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
    Pool::builder().build(manager)
}

pub mod cache;
pub mod config;
pub mod error;
pub mod helper;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod setup;
