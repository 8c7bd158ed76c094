use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;

/// Row id of the setting holding the pregnancy-diagnosis day total.
pub const PD_DAY_SETTING_ID: i64 = 1;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct SystemSetting {
    pub id: i64,
    pub name: String,
    pub value: Option<String>,
    pub remark: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SystemSetting {
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM system_settings ORDER BY id")
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM system_settings WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn update_value(
        pool: &SqlitePool,
        id: i64,
        value: Option<&str>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(
            "UPDATE system_settings SET value = $2, updated_at = CURRENT_TIMESTAMP
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(value)
        .fetch_optional(pool)
        .await
    }
}
