use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use ts_rs::TS;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Transponder {
    pub id: i64,
    pub code: String,
    pub current_cow_id: Option<i64>,
    pub assigned_date: Option<NaiveDate>,
    pub remark: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct UpsertTransponder {
    pub code: String,
    pub remark: Option<String>,
}

impl Transponder {
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM transponders ORDER BY id")
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as("SELECT * FROM transponders WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn create(pool: &SqlitePool, data: &UpsertTransponder) -> Result<Self, sqlx::Error> {
        sqlx::query_as("INSERT INTO transponders (code, remark) VALUES ($1, $2) RETURNING *")
            .bind(&data.code)
            .bind(&data.remark)
            .fetch_one(pool)
            .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: i64,
        data: &UpsertTransponder,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(
            "UPDATE transponders SET code = $2, remark = $3, updated_at = CURRENT_TIMESTAMP
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(&data.code)
        .bind(&data.remark)
        .fetch_optional(pool)
        .await
    }

    /// Point the transponder at a cow (or clear it). The assigned date
    /// follows the pointer: present while worn, cleared when taken off.
    pub async fn set_assignment<'e, E>(
        executor: E,
        id: i64,
        cow_id: Option<i64>,
        assigned_date: Option<NaiveDate>,
    ) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            "UPDATE transponders
             SET current_cow_id = $2, assigned_date = $3, updated_at = CURRENT_TIMESTAMP
             WHERE id = $1",
        )
        .bind(id)
        .bind(cow_id)
        .bind(assigned_date)
        .execute(executor)
        .await?;
        Ok(())
    }
}
