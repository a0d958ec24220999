pub mod db;
mod errors;

pub mod orders;
pub mod users;
pub mod withdrawals;

use std::str::FromStr;

pub use db::SqliteDatabase;
pub use errors::SqliteDatabaseError;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};

/// Creates a connection pool for the given url. The database file is created if it does not exist yet.
pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqliteDatabaseError> {
    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect_with(options).await?;
    Ok(pool)
}
