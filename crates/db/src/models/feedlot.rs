use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use ts_rs::TS;

use super::cow::CowView;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Feedlot {
    pub id: i64,
    pub name: String,
    pub remark: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct UpsertFeedlot {
    pub name: String,
    pub remark: Option<String>,
}

/// A feedlot together with the cows currently assigned to it. This is the
/// data source behind the bulk assignment dialog.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct FeedlotWithCows {
    #[serde(flatten)]
    #[ts(flatten)]
    pub feedlot: Feedlot,
    pub cows: Vec<CowView>,
}

impl Feedlot {
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM feedlots ORDER BY id")
            .fetch_all(pool)
            .await
    }

    pub async fn find_active(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM feedlots WHERE active = 1 ORDER BY id")
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as("SELECT * FROM feedlots WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn create(pool: &SqlitePool, data: &UpsertFeedlot) -> Result<Self, sqlx::Error> {
        sqlx::query_as(
            "INSERT INTO feedlots (name, remark, active) VALUES ($1, $2, 1) RETURNING *",
        )
        .bind(&data.name)
        .bind(&data.remark)
        .fetch_one(pool)
        .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: i64,
        data: &UpsertFeedlot,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(
            "UPDATE feedlots SET name = $2, remark = $3, updated_at = CURRENT_TIMESTAMP
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(&data.name)
        .bind(&data.remark)
        .fetch_optional(pool)
        .await
    }

    pub async fn toggle_active(pool: &SqlitePool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(
            "UPDATE feedlots SET active = NOT active, updated_at = CURRENT_TIMESTAMP
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Ids of the cows currently in the feedlot, in id order. This is what
    /// a selection session snapshots when the assignment dialog opens.
    pub async fn current_cow_ids(pool: &SqlitePool, id: i64) -> Result<Vec<i64>, sqlx::Error> {
        let rows: Vec<(i64,)> =
            sqlx::query_as("SELECT id FROM cows WHERE current_feedlot_id = $1 ORDER BY id")
                .bind(id)
                .fetch_all(pool)
                .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}
