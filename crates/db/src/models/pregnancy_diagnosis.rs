use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use ts_rs::TS;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct PregnancyDiagnosis {
    pub id: i64,
    pub ai_record_id: i64,
    /// Copied from the AI record at creation; the progress math runs off
    /// this date.
    pub ai_date: NaiveDate,
    pub diagnosis_by_id: Option<i64>,
    pub pd_status_id: i64,
    pub pregnant_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// List projection with the AI record code and lookup names resolved,
/// ordered the way the diagnosis screen shows them.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct PregnancyDiagnosisView {
    pub id: i64,
    pub ai_record_id: i64,
    pub ai_record_code: String,
    pub ai_date: NaiveDate,
    pub diagnosis_by_id: Option<i64>,
    pub diagnosis_by: Option<String>,
    pub pd_status_id: i64,
    pub pd_status: String,
    pub pd_status_color: Option<String>,
    pub pregnant_date: Option<NaiveDate>,
}

impl PregnancyDiagnosis {
    pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as("SELECT * FROM pregnancy_diagnosis WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_by_ai_record_id<'e, E>(
        executor: E,
        ai_record_id: i64,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as("SELECT * FROM pregnancy_diagnosis WHERE ai_record_id = $1")
            .bind(ai_record_id)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_by_status(
        pool: &SqlitePool,
        pd_status_id: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM pregnancy_diagnosis WHERE pd_status_id = $1 ORDER BY id")
            .bind(pd_status_id)
            .fetch_all(pool)
            .await
    }

    pub async fn find_all_views(
        pool: &SqlitePool,
    ) -> Result<Vec<PregnancyDiagnosisView>, sqlx::Error> {
        sqlx::query_as(
            r#"SELECT
                pd.id,
                pd.ai_record_id,
                a.code AS ai_record_code,
                pd.ai_date,
                pd.diagnosis_by_id,
                i.name AS diagnosis_by,
                pd.pd_status_id,
                st.name AS pd_status,
                st.color AS pd_status_color,
                pd.pregnant_date
            FROM pregnancy_diagnosis pd
            JOIN ai_records a ON a.id = pd.ai_record_id
            JOIN pd_statuses st ON st.id = pd.pd_status_id
            LEFT JOIN inseminators i ON i.id = pd.diagnosis_by_id
            ORDER BY pd.ai_date DESC, pd.id DESC"#,
        )
        .fetch_all(pool)
        .await
    }

    pub async fn insert<'e, E>(
        executor: E,
        ai_record_id: i64,
        ai_date: NaiveDate,
        pd_status_id: i64,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as(
            "INSERT INTO pregnancy_diagnosis (ai_record_id, ai_date, pd_status_id)
             VALUES ($1, $2, $3)
             RETURNING *",
        )
        .bind(ai_record_id)
        .bind(ai_date)
        .bind(pd_status_id)
        .fetch_one(executor)
        .await
    }

    /// Record a diagnosis. `diagnosis_by_id` and `pregnant_date` only
    /// overwrite when provided.
    pub async fn update_status<'e, E>(
        executor: E,
        id: i64,
        diagnosis_by_id: Option<i64>,
        pd_status_id: i64,
        pregnant_date: Option<NaiveDate>,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as(
            r#"UPDATE pregnancy_diagnosis
               SET diagnosis_by_id = COALESCE($2, diagnosis_by_id),
                   pd_status_id = $3,
                   pregnant_date = COALESCE($4, pregnant_date),
                   updated_at = CURRENT_TIMESTAMP
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .bind(diagnosis_by_id)
        .bind(pd_status_id)
        .bind(pregnant_date)
        .fetch_optional(executor)
        .await
    }

    pub async fn set_status<'e, E>(
        executor: E,
        id: i64,
        pd_status_id: i64,
    ) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            "UPDATE pregnancy_diagnosis
             SET pd_status_id = $2, updated_at = CURRENT_TIMESTAMP
             WHERE id = $1",
        )
        .bind(id)
        .bind(pd_status_id)
        .execute(executor)
        .await?;
        Ok(())
    }
}
