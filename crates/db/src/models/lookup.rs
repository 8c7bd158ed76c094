//! Generic model for the lookup vocabularies (colors, genders, roles,
//! statuses). The tables share one shape, so one model serves them all;
//! the workflow-relevant rows are re-exported as typed id enums.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use strum_macros::{Display, EnumString, FromRepr};
use ts_rs::TS;

/// Tables sharing the lookup shape (`id, name, remark, active, color`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, EnumString, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LookupKind {
    Colors,
    CowGenders,
    CowRoles,
    CowStatuses,
    AiStatuses,
    PdStatuses,
    CalfStatuses,
}

impl LookupKind {
    pub fn table(self) -> &'static str {
        match self {
            LookupKind::Colors => "colors",
            LookupKind::CowGenders => "cow_genders",
            LookupKind::CowRoles => "cow_roles",
            LookupKind::CowStatuses => "cow_statuses",
            LookupKind::AiStatuses => "ai_statuses",
            LookupKind::PdStatuses => "pd_statuses",
            LookupKind::CalfStatuses => "calf_statuses",
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct LookupEntry {
    pub id: i64,
    pub name: String,
    pub remark: Option<String>,
    pub active: bool,
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct UpsertLookup {
    pub name: String,
    pub remark: Option<String>,
    pub color: Option<String>,
}

const COLUMNS: &str = "id, name, remark, active, color, created_at, updated_at";

impl LookupEntry {
    pub async fn find_all(pool: &SqlitePool, kind: LookupKind) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!("SELECT {COLUMNS} FROM {} ORDER BY id", kind.table());
        sqlx::query_as(&sql).fetch_all(pool).await
    }

    pub async fn find_active(pool: &SqlitePool, kind: LookupKind) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {COLUMNS} FROM {} WHERE active = 1 ORDER BY id",
            kind.table()
        );
        sqlx::query_as(&sql).fetch_all(pool).await
    }

    pub async fn find_by_id(
        pool: &SqlitePool,
        kind: LookupKind,
        id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {COLUMNS} FROM {} WHERE id = $1", kind.table());
        sqlx::query_as(&sql).bind(id).fetch_optional(pool).await
    }

    /// New entries always start active.
    pub async fn create(
        pool: &SqlitePool,
        kind: LookupKind,
        data: &UpsertLookup,
    ) -> Result<Self, sqlx::Error> {
        let sql = format!(
            "INSERT INTO {} (name, remark, active, color) VALUES ($1, $2, 1, $3)
             RETURNING {COLUMNS}",
            kind.table()
        );
        sqlx::query_as(&sql)
            .bind(&data.name)
            .bind(&data.remark)
            .bind(&data.color)
            .fetch_one(pool)
            .await
    }

    pub async fn update(
        pool: &SqlitePool,
        kind: LookupKind,
        id: i64,
        data: &UpsertLookup,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "UPDATE {} SET name = $2, remark = $3, color = $4, updated_at = CURRENT_TIMESTAMP
             WHERE id = $1
             RETURNING {COLUMNS}",
            kind.table()
        );
        sqlx::query_as(&sql)
            .bind(id)
            .bind(&data.name)
            .bind(&data.remark)
            .bind(&data.color)
            .fetch_optional(pool)
            .await
    }

    pub async fn toggle_active(
        pool: &SqlitePool,
        kind: LookupKind,
        id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "UPDATE {} SET active = NOT active, updated_at = CURRENT_TIMESTAMP
             WHERE id = $1
             RETURNING {COLUMNS}",
            kind.table()
        );
        sqlx::query_as(&sql).bind(id).fetch_optional(pool).await
    }
}

/// Fixed rows of `pd_statuses` the pregnancy workflow keys on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, Display, FromRepr)]
#[repr(i64)]
pub enum PdStatusId {
    Pending = 1,
    AiFailed = 2,
    Pregnant = 3,
    NoPregnant = 4,
    LateGestation = 5,
    Gestation = 6,
    New = 7,
    Complete = 8,
    StillBirth = 9,
}

/// Fixed rows of `ai_statuses`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, Display, FromRepr)]
#[repr(i64)]
pub enum AiStatusId {
    Success = 1,
    Failed = 2,
    Pending = 3,
}

/// Fixed rows of `cow_statuses`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, Display, FromRepr)]
#[repr(i64)]
pub enum CowStatusId {
    Active = 1,
    Cull = 2,
    Dead = 3,
    NewBorn = 4,
    Growing = 5,
}

impl PdStatusId {
    pub fn id(self) -> i64 {
        self as i64
    }
}

impl AiStatusId {
    pub fn id(self) -> i64 {
        self as i64
    }
}

impl CowStatusId {
    pub fn id(self) -> i64 {
        self as i64
    }
}
