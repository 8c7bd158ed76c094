use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use ts_rs::TS;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Semen {
    pub id: i64,
    pub name: String,
    pub sire: Option<String>,
    pub date: NaiveDate,
    pub straw: Option<i64>,
    pub bull: bool,
    pub remark: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct UpsertSemen {
    pub name: String,
    pub sire: Option<String>,
    pub date: NaiveDate,
    pub straw: Option<i64>,
    pub bull: bool,
    pub remark: Option<String>,
}

impl Semen {
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM semen ORDER BY id")
            .fetch_all(pool)
            .await
    }

    pub async fn find_active(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM semen WHERE active = 1 ORDER BY id")
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as("SELECT * FROM semen WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn create(pool: &SqlitePool, data: &UpsertSemen) -> Result<Self, sqlx::Error> {
        sqlx::query_as(
            r#"INSERT INTO semen (name, sire, date, straw, bull, remark, active)
               VALUES ($1, $2, $3, $4, $5, $6, 1)
               RETURNING *"#,
        )
        .bind(&data.name)
        .bind(&data.sire)
        .bind(data.date)
        .bind(data.straw)
        .bind(data.bull)
        .bind(&data.remark)
        .fetch_one(pool)
        .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: i64,
        data: &UpsertSemen,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(
            r#"UPDATE semen
               SET name = $2, sire = $3, date = $4, straw = $5, bull = $6, remark = $7,
                   updated_at = CURRENT_TIMESTAMP
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .bind(&data.name)
        .bind(&data.sire)
        .bind(data.date)
        .bind(data.straw)
        .bind(data.bull)
        .bind(&data.remark)
        .fetch_optional(pool)
        .await
    }

    pub async fn toggle_active(pool: &SqlitePool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(
            "UPDATE semen SET active = NOT active, updated_at = CURRENT_TIMESTAMP
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Take one straw from stock. Returns the number of rows updated: zero
    /// means the stock was already empty (or the id unknown) and nothing
    /// was deducted.
    pub async fn decrement_straw<'e, E>(executor: E, id: i64) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            "UPDATE semen
             SET straw = straw - 1, updated_at = CURRENT_TIMESTAMP
             WHERE id = $1 AND straw IS NOT NULL AND straw > 0",
        )
        .bind(id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }
}
