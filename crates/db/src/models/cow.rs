use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use ts_rs::TS;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Cow {
    pub id: i64,
    pub tag: String,
    pub gender_id: i64,
    pub dob: Option<NaiveDate>,
    pub weight: Option<f64>,
    pub color_id: Option<i64>,
    pub role_id: Option<i64>,
    pub status_id: Option<i64>,
    pub dam_id: Option<i64>,
    pub semen_id: Option<i64>,
    pub current_feedlot_id: Option<i64>,
    pub current_transponder_id: Option<i64>,
    pub remark: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct CreateCow {
    pub tag: String,
    pub gender_id: i64,
    pub dob: Option<NaiveDate>,
    pub weight: Option<f64>,
    pub color_id: Option<i64>,
    pub role_id: Option<i64>,
    pub status_id: Option<i64>,
    pub dam_id: Option<i64>,
    pub semen_id: Option<i64>,
    pub current_feedlot_id: Option<i64>,
    pub remark: Option<String>,
}

/// Flat list/table projection with lookup names resolved.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct CowView {
    pub id: i64,
    pub tag: String,
    pub gender: String,
    pub gender_id: i64,
    pub role: Option<String>,
    pub role_id: Option<i64>,
    pub status: Option<String>,
    pub status_id: Option<i64>,
    pub weight: Option<f64>,
    pub feedlot: Option<String>,
    pub feedlot_id: Option<i64>,
    pub transponder: Option<String>,
    pub transponder_id: Option<i64>,
    pub remark: Option<String>,
    pub active: bool,
}

const VIEW_SQL: &str = r#"SELECT
    c.id,
    c.tag,
    g.name AS gender,
    c.gender_id,
    r.name AS role,
    c.role_id,
    s.name AS status,
    c.status_id,
    c.weight,
    f.name AS feedlot,
    c.current_feedlot_id AS feedlot_id,
    t.code AS transponder,
    c.current_transponder_id AS transponder_id,
    c.remark,
    c.active
FROM cows c
JOIN cow_genders g ON g.id = c.gender_id
LEFT JOIN cow_roles r ON r.id = c.role_id
LEFT JOIN cow_statuses s ON s.id = c.status_id
LEFT JOIN feedlots f ON f.id = c.current_feedlot_id
LEFT JOIN transponders t ON t.id = c.current_transponder_id"#;

impl Cow {
    pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as("SELECT * FROM cows WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM cows ORDER BY id")
            .fetch_all(pool)
            .await
    }

    pub async fn create<'e, E>(executor: E, data: &CreateCow) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as(
            r#"INSERT INTO cows
                   (tag, gender_id, dob, weight, color_id, role_id, status_id,
                    dam_id, semen_id, current_feedlot_id, remark, active)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 1)
               RETURNING *"#,
        )
        .bind(&data.tag)
        .bind(data.gender_id)
        .bind(data.dob)
        .bind(data.weight)
        .bind(data.color_id)
        .bind(data.role_id)
        .bind(data.status_id)
        .bind(data.dam_id)
        .bind(data.semen_id)
        .bind(data.current_feedlot_id)
        .bind(&data.remark)
        .fetch_one(executor)
        .await
    }

    pub async fn set_current_feedlot<'e, E>(
        executor: E,
        cow_id: i64,
        feedlot_id: Option<i64>,
    ) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            "UPDATE cows SET current_feedlot_id = $2, updated_at = CURRENT_TIMESTAMP WHERE id = $1",
        )
        .bind(cow_id)
        .bind(feedlot_id)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn set_current_transponder<'e, E>(
        executor: E,
        cow_id: i64,
        transponder_id: Option<i64>,
    ) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            "UPDATE cows SET current_transponder_id = $2, updated_at = CURRENT_TIMESTAMP WHERE id = $1",
        )
        .bind(cow_id)
        .bind(transponder_id)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn toggle_active(pool: &SqlitePool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(
            "UPDATE cows SET active = NOT active, updated_at = CURRENT_TIMESTAMP
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_views(pool: &SqlitePool) -> Result<Vec<CowView>, sqlx::Error> {
        let sql = format!("{VIEW_SQL} ORDER BY c.id");
        sqlx::query_as(&sql).fetch_all(pool).await
    }

    pub async fn find_views_by_feedlot(
        pool: &SqlitePool,
        feedlot_id: i64,
    ) -> Result<Vec<CowView>, sqlx::Error> {
        let sql = format!("{VIEW_SQL} WHERE c.current_feedlot_id = $1 ORDER BY c.id");
        sqlx::query_as(&sql).bind(feedlot_id).fetch_all(pool).await
    }

    pub async fn find_view_by_id(
        pool: &SqlitePool,
        id: i64,
    ) -> Result<Option<CowView>, sqlx::Error> {
        let sql = format!("{VIEW_SQL} WHERE c.id = $1");
        sqlx::query_as(&sql).bind(id).fetch_optional(pool).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DBService;
    use crate::models::feedlot::{Feedlot, UpsertFeedlot};

    fn heifer(tag: &str) -> CreateCow {
        CreateCow {
            tag: tag.into(),
            gender_id: 2,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn view_resolves_lookup_names() {
        let db = DBService::new("sqlite::memory:").await.unwrap();
        let feedlot = Feedlot::create(
            &db.pool,
            &UpsertFeedlot {
                name: "North Pen".into(),
                remark: None,
            },
        )
        .await
        .unwrap();

        let mut data = heifer("C-001");
        data.status_id = Some(1);
        data.current_feedlot_id = Some(feedlot.id);
        let cow = Cow::create(&db.pool, &data).await.unwrap();

        let view = Cow::find_view_by_id(&db.pool, cow.id).await.unwrap().unwrap();
        assert_eq!(view.gender, "Female");
        assert_eq!(view.status.as_deref(), Some("Active"));
        assert_eq!(view.feedlot.as_deref(), Some("North Pen"));
        assert_eq!(view.feedlot_id, Some(feedlot.id));
        assert_eq!(view.transponder, None);
    }
}
