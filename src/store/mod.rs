//! SQLite persistence for audio records and users.
//!
//! Uniqueness of filenames, usernames and emails is enforced by UNIQUE
//! constraints in `migrations/`, so concurrent inserts cannot both succeed.

pub mod audio;
pub mod users;

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::error::AppError;

pub use audio::AudioRecordStore;
pub use users::{NewUser, UserStore};

/// Open the pool and bring the schema up to date.
pub async fn connect(url: &str, max_connections: u32) -> Result<SqlitePool, AppError> {
    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

    // Every connection to `sqlite::memory:` gets its own database, so keep
    // exactly one alive for the lifetime of the pool.
    let pool = if url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(max_connections)
    }
    .connect_with(options)
    .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    tracing::info!("Database ready: {}", url);
    Ok(pool)
}

#[cfg(test)]
pub(crate) async fn memory_pool() -> SqlitePool {
    connect("sqlite::memory:", 1).await.unwrap()
}
