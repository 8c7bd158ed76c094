use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Inseminator {
    pub id: i64,
    pub name: String,
    pub remark: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct UpsertInseminator {
    pub name: String,
    pub remark: Option<String>,
}

impl Inseminator {
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM inseminators ORDER BY id")
            .fetch_all(pool)
            .await
    }

    pub async fn find_active(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM inseminators WHERE active = 1 ORDER BY id")
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM inseminators WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn create(pool: &SqlitePool, data: &UpsertInseminator) -> Result<Self, sqlx::Error> {
        sqlx::query_as(
            "INSERT INTO inseminators (name, remark, active) VALUES ($1, $2, 1) RETURNING *",
        )
        .bind(&data.name)
        .bind(&data.remark)
        .fetch_one(pool)
        .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: i64,
        data: &UpsertInseminator,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(
            "UPDATE inseminators SET name = $2, remark = $3, updated_at = CURRENT_TIMESTAMP
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
            "UPDATE inseminators SET active = NOT active, updated_at = CURRENT_TIMESTAMP
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }
}
