use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use ts_rs::TS;

/// Link row tying a born calf to the AI record and pregnancy diagnosis it
/// came from.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct CalfRecord {
    pub id: i64,
    pub cow_id: i64,
    pub ai_record_id: i64,
    pub pd_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CalfRecord {
    pub async fn insert<'e, E>(
        executor: E,
        cow_id: i64,
        ai_record_id: i64,
        pd_id: i64,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as(
            "INSERT INTO calf_records (cow_id, ai_record_id, pd_id)
             VALUES ($1, $2, $3)
             RETURNING *",
        )
        .bind(cow_id)
        .bind(ai_record_id)
        .bind(pd_id)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_ai_record_id(
        pool: &SqlitePool,
        ai_record_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM calf_records WHERE ai_record_id = $1")
            .bind(ai_record_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_pd_id(pool: &SqlitePool, pd_id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM calf_records WHERE pd_id = $1")
            .bind(pd_id)
            .fetch_optional(pool)
            .await
    }
}
