use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool, PoolError, PooledConnection};
use log::{error, info};

use crate::error::ApiError;

pub type DbPool = Pool<ConnectionManager<PgConnection>>;
pub type DbConn = PooledConnection<ConnectionManager<PgConnection>>;

pub fn init_pool(database_url: &str) -> Result<DbPool, PoolError> {
    info!("Building database pool for {}", database_url);
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    match Pool::builder().build(manager) {
        Ok(pool) => {
            info!("Database pool established successfully");
            Ok(pool)
        }
        Err(e) => {
            error!("Failed to build database pool: {}", e);
            Err(e)
        }
    }
}

/// Checks out a connection for the current request. The pooled connection
/// returns to the pool when the guard drops, on every exit path.
pub fn get_conn(pool: &DbPool) -> Result<DbConn, ApiError> {
    pool.get().map_err(|e| {
        error!("Failed to get database connection from pool: {}", e);
        ApiError::internal("Database connection failed", e)
    })
}
