use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use ts_rs::TS;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct AiRecord {
    pub id: i64,
    pub code: String,
    pub dam_id: i64,
    pub semen_id: i64,
    /// Name of the dam's feedlot at insemination time, denormalized so the
    /// record keeps it even if the dam moves later.
    pub feedlot: Option<String>,
    pub ai_by_id: Option<i64>,
    pub prepared_by_id: Option<i64>,
    pub status_id: i64,
    pub ai_date: NaiveDate,
    pub ai_time: Option<String>,
    pub remark: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateAiRecord {
    pub dam_id: i64,
    pub semen_id: i64,
    pub ai_date: NaiveDate,
    pub ai_time: Option<String>,
    pub ai_by_id: Option<i64>,
    pub prepared_by_id: Option<i64>,
    pub remark: Option<String>,
}

/// List projection with lookup names resolved.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct AiRecordView {
    pub id: i64,
    pub code: String,
    pub dam_id: i64,
    pub dam_tag: String,
    pub semen_id: i64,
    pub semen_name: String,
    pub feedlot: Option<String>,
    pub ai_by: Option<String>,
    pub prepared_by: Option<String>,
    pub status_id: i64,
    pub status: String,
    pub ai_date: NaiveDate,
    pub ai_time: Option<String>,
    pub remark: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct AiRecordSummary {
    pub id: i64,
    pub code: String,
}

/// Per-dam AI overview row: up to the first three non-bull records, every
/// bull record, and days since the most recent record of any kind.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct DamAiRecord {
    pub dam_id: i64,
    pub dam_tag: String,
    pub ai_records: Vec<AiRecordSummary>,
    pub bull_ai_records: Vec<AiRecordSummary>,
    pub last_ai_days: Option<i64>,
}

/// Raw row for the dam overview aggregation: one AI record joined with its
/// dam tag and semen kind, ordered by dam and AI date.
#[derive(Debug, Clone, FromRow)]
pub struct DamAiRow {
    pub id: i64,
    pub code: String,
    pub ai_date: NaiveDate,
    pub dam_id: i64,
    pub dam_tag: String,
    pub bull: bool,
}

impl AiRecord {
    pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as("SELECT * FROM ai_records WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_all_views(pool: &SqlitePool) -> Result<Vec<AiRecordView>, sqlx::Error> {
        sqlx::query_as(
            r#"SELECT
                a.id,
                a.code,
                a.dam_id,
                c.tag AS dam_tag,
                a.semen_id,
                s.name AS semen_name,
                a.feedlot,
                ib.name AS ai_by,
                ip.name AS prepared_by,
                a.status_id,
                st.name AS status,
                a.ai_date,
                a.ai_time,
                a.remark
            FROM ai_records a
            JOIN cows c ON c.id = a.dam_id
            JOIN semen s ON s.id = a.semen_id
            JOIN ai_statuses st ON st.id = a.status_id
            LEFT JOIN inseminators ib ON ib.id = a.ai_by_id
            LEFT JOIN inseminators ip ON ip.id = a.prepared_by_id
            ORDER BY a.ai_date DESC, a.id DESC"#,
        )
        .fetch_all(pool)
        .await
    }

    pub async fn insert<'e, E>(
        executor: E,
        data: &CreateAiRecord,
        code: &str,
        feedlot: Option<&str>,
        status_id: i64,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as(
            r#"INSERT INTO ai_records
                   (code, dam_id, semen_id, feedlot, ai_by_id, prepared_by_id,
                    status_id, ai_date, ai_time, remark)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
               RETURNING *"#,
        )
        .bind(code)
        .bind(data.dam_id)
        .bind(data.semen_id)
        .bind(feedlot)
        .bind(data.ai_by_id)
        .bind(data.prepared_by_id)
        .bind(status_id)
        .bind(data.ai_date)
        .bind(&data.ai_time)
        .bind(&data.remark)
        .fetch_one(executor)
        .await
    }

    pub async fn update_status<'e, E>(
        executor: E,
        id: i64,
        status_id: i64,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as(
            "UPDATE ai_records SET status_id = $2, updated_at = CURRENT_TIMESTAMP
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(status_id)
        .fetch_optional(executor)
        .await
    }

    /// Number of AI records for the dam that used non-bull semen. The
    /// breeding rule caps this at three before bull-only applies.
    pub async fn count_non_bull_for_dam<'e, E>(executor: E, dam_id: i64) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM ai_records a
             JOIN semen s ON s.id = a.semen_id
             WHERE a.dam_id = $1 AND s.bull = 0",
        )
        .bind(dam_id)
        .fetch_one(executor)
        .await
    }

    pub async fn count_with_code_prefix<'e, E>(
        executor: E,
        prefix: &str,
    ) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar("SELECT COUNT(*) FROM ai_records WHERE code LIKE $1 || '%'")
            .bind(prefix)
            .fetch_one(executor)
            .await
    }

    pub async fn find_dam_rows(pool: &SqlitePool) -> Result<Vec<DamAiRow>, sqlx::Error> {
        sqlx::query_as(
            r#"SELECT a.id, a.code, a.ai_date, a.dam_id, c.tag AS dam_tag, s.bull
            FROM ai_records a
            JOIN cows c ON c.id = a.dam_id
            JOIN semen s ON s.id = a.semen_id
            ORDER BY a.dam_id ASC, a.ai_date ASC, a.id ASC"#,
        )
        .fetch_all(pool)
        .await
    }
}
