use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::error::AppError;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AudioRecord {
    pub id: i64,
    pub filename: String,
    pub created_at: DateTime<Utc>,
}

/// Metadata rows for generated audio. Rows are only ever inserted.
#[derive(Debug, Clone)]
pub struct AudioRecordStore {
    pool: SqlitePool,
}

impl AudioRecordStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, filename: &str) -> Result<AudioRecord, AppError> {
        let record = sqlx::query_as::<_, AudioRecord>(
            "INSERT INTO audio_files (filename, created_at) VALUES ($1, $2)
             RETURNING id, filename, created_at",
        )
        .bind(filename)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    /// Every record, oldest first.
    pub async fn list_all(&self) -> Result<Vec<AudioRecord>, AppError> {
        let records = sqlx::query_as::<_, AudioRecord>(
            "SELECT id, filename, created_at FROM audio_files ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}
