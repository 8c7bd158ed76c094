//! Movement history rows. An open row (no close timestamp) is the current
//! assignment; closing it and opening a new one records a move.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use ts_rs::TS;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct CowFeedlotHistory {
    pub id: i64,
    pub cow_id: i64,
    pub feedlot_id: i64,
    pub moved_in_at: DateTime<Utc>,
    pub moved_out_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CowFeedlotHistory {
    pub async fn find_open_for_cow<'e, E>(
        executor: E,
        cow_id: i64,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as(
            "SELECT * FROM cow_feedlot_history WHERE cow_id = $1 AND moved_out_at IS NULL",
        )
        .bind(cow_id)
        .fetch_optional(executor)
        .await
    }

    pub async fn exists_open<'e, E>(
        executor: E,
        feedlot_id: i64,
        cow_id: i64,
    ) -> Result<bool, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM cow_feedlot_history
             WHERE feedlot_id = $1 AND cow_id = $2 AND moved_out_at IS NULL",
        )
        .bind(feedlot_id)
        .bind(cow_id)
        .fetch_one(executor)
        .await?;
        Ok(count > 0)
    }

    pub async fn open<'e, E>(
        executor: E,
        cow_id: i64,
        feedlot_id: i64,
        at: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as(
            "INSERT INTO cow_feedlot_history (cow_id, feedlot_id, moved_in_at)
             VALUES ($1, $2, $3)
             RETURNING *",
        )
        .bind(cow_id)
        .bind(feedlot_id)
        .bind(at)
        .fetch_one(executor)
        .await
    }

    pub async fn close<'e, E>(executor: E, id: i64, at: DateTime<Utc>) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            "UPDATE cow_feedlot_history
             SET moved_out_at = $2, updated_at = CURRENT_TIMESTAMP
             WHERE id = $1",
        )
        .bind(id)
        .bind(at)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn find_by_cow(pool: &SqlitePool, cow_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            "SELECT * FROM cow_feedlot_history WHERE cow_id = $1 ORDER BY moved_in_at DESC, id DESC",
        )
        .bind(cow_id)
        .fetch_all(pool)
        .await
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct CowTransponderHistory {
    pub id: i64,
    pub cow_id: i64,
    pub transponder_id: i64,
    pub assigned_at: DateTime<Utc>,
    pub unassigned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CowTransponderHistory {
    pub async fn find_open_for_transponder<'e, E>(
        executor: E,
        transponder_id: i64,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as(
            "SELECT * FROM cow_transponder_history
             WHERE transponder_id = $1 AND unassigned_at IS NULL",
        )
        .bind(transponder_id)
        .fetch_optional(executor)
        .await
    }

    pub async fn find_open_for_cow<'e, E>(
        executor: E,
        cow_id: i64,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as(
            "SELECT * FROM cow_transponder_history WHERE cow_id = $1 AND unassigned_at IS NULL",
        )
        .bind(cow_id)
        .fetch_optional(executor)
        .await
    }

    pub async fn exists_open<'e, E>(
        executor: E,
        transponder_id: i64,
        cow_id: i64,
    ) -> Result<bool, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM cow_transponder_history
             WHERE transponder_id = $1 AND cow_id = $2 AND unassigned_at IS NULL",
        )
        .bind(transponder_id)
        .bind(cow_id)
        .fetch_one(executor)
        .await?;
        Ok(count > 0)
    }

    pub async fn open<'e, E>(
        executor: E,
        cow_id: i64,
        transponder_id: i64,
        at: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as(
            "INSERT INTO cow_transponder_history (cow_id, transponder_id, assigned_at)
             VALUES ($1, $2, $3)
             RETURNING *",
        )
        .bind(cow_id)
        .bind(transponder_id)
        .bind(at)
        .fetch_one(executor)
        .await
    }

    pub async fn close<'e, E>(executor: E, id: i64, at: DateTime<Utc>) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            "UPDATE cow_transponder_history
             SET unassigned_at = $2, updated_at = CURRENT_TIMESTAMP
             WHERE id = $1",
        )
        .bind(id)
        .bind(at)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn find_by_cow(pool: &SqlitePool, cow_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            "SELECT * FROM cow_transponder_history
             WHERE cow_id = $1 ORDER BY assigned_at DESC, id DESC",
        )
        .bind(cow_id)
        .fetch_all(pool)
        .await
    }
}
