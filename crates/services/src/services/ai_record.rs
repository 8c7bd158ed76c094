//! AI (artificial insemination) record workflow.
//!
//! Creating a record is the entry point of the breeding pipeline: it
//! validates the bull-only rule, generates the record code, freezes the
//! dam's feedlot name onto the record, opens the linked pregnancy
//! diagnosis, and deducts semen stock.

use chrono::{NaiveDate, Utc};
use db::{
    DBService,
    models::{
        ai_record::{AiRecord, AiRecordSummary, AiRecordView, CreateAiRecord, DamAiRecord},
        cow::Cow,
        feedlot::Feedlot,
        lookup::{AiStatusId, PdStatusId},
        pregnancy_diagnosis::PregnancyDiagnosis,
        semen::Semen,
    },
};
use sqlx::{Executor, Sqlite};
use thiserror::Error;
use tracing::info;

/// A dam gets at most this many AI records with non-bull semen; after
/// that only bull semen may be used.
pub const NON_BULL_AI_LIMIT: i64 = 3;

#[derive(Debug, Error)]
pub enum AiRecordError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("ai record {0} not found")]
    RecordNotFound(i64),
    #[error("dam {0} not found")]
    DamNotFound(i64),
    #[error("semen {0} not found")]
    SemenNotFound(i64),
    #[error("dam {dam_id} already has {count} AI records with non-bull semen; only bull semen can be used")]
    DamAiLimitReached { dam_id: i64, count: i64 },
    #[error("no straws remaining for semen {0}")]
    NoStrawsRemaining(i64),
}

#[derive(Clone)]
pub struct AiRecordService {
    db: DBService,
}

impl AiRecordService {
    pub fn new(db: DBService) -> Self {
        Self { db }
    }

    pub async fn create(&self, data: CreateAiRecord) -> Result<AiRecord, AiRecordError> {
        self.create_on(data, Utc::now().date_naive()).await
    }

    /// `today` only feeds the generated code; the AI date itself comes
    /// from the payload.
    pub async fn create_on(
        &self,
        data: CreateAiRecord,
        today: NaiveDate,
    ) -> Result<AiRecord, AiRecordError> {
        let dam = Cow::find_by_id(&self.db.pool, data.dam_id)
            .await?
            .ok_or(AiRecordError::DamNotFound(data.dam_id))?;
        let semen = Semen::find_by_id(&self.db.pool, data.semen_id)
            .await?
            .ok_or(AiRecordError::SemenNotFound(data.semen_id))?;

        if !semen.bull {
            let count = AiRecord::count_non_bull_for_dam(&self.db.pool, dam.id).await?;
            if count >= NON_BULL_AI_LIMIT {
                return Err(AiRecordError::DamAiLimitReached { dam_id: dam.id, count });
            }
        }

        // The record keeps the feedlot the dam was in at insemination.
        let feedlot_name = match dam.current_feedlot_id {
            Some(feedlot_id) => Feedlot::find_by_id(&self.db.pool, feedlot_id)
                .await?
                .map(|f| f.name),
            None => None,
        };

        let mut tx = self.db.pool.begin().await?;

        let code = Self::next_code(&mut *tx, today).await?;
        let record = AiRecord::insert(
            &mut *tx,
            &data,
            &code,
            feedlot_name.as_deref(),
            AiStatusId::Pending.id(),
        )
        .await?;

        // Every AI record opens a diagnosis; it matures into Pending as
        // the check date approaches.
        PregnancyDiagnosis::insert(&mut *tx, record.id, record.ai_date, PdStatusId::New.id())
            .await?;

        if !semen.bull {
            let deducted = Semen::decrement_straw(&mut *tx, semen.id).await?;
            if deducted == 0 {
                return Err(AiRecordError::NoStrawsRemaining(semen.id));
            }
        }

        tx.commit().await?;
        info!(record_id = record.id, code = %record.code, dam_id = dam.id, "ai record created");
        Ok(record)
    }

    /// Codes are `YYYYMMDD-<n>` with `n` counting up within the day.
    async fn next_code<'e, E>(executor: E, on: NaiveDate) -> Result<String, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let prefix = on.format("%Y%m%d").to_string();
        let count = AiRecord::count_with_code_prefix(executor, &prefix).await?;
        Ok(format!("{}-{}", prefix, count + 1))
    }

    /// The semen list offered for a dam: everything active, narrowed to
    /// bull semen once the dam has exhausted its non-bull attempts.
    pub async fn eligible_semen(&self, dam_id: i64) -> Result<Vec<Semen>, AiRecordError> {
        let all = Semen::find_active(&self.db.pool).await?;
        let count = AiRecord::count_non_bull_for_dam(&self.db.pool, dam_id).await?;
        if count >= NON_BULL_AI_LIMIT {
            Ok(all.into_iter().filter(|s| s.bull).collect())
        } else {
            Ok(all)
        }
    }

    pub async fn non_bull_count(&self, dam_id: i64) -> Result<i64, AiRecordError> {
        Ok(AiRecord::count_non_bull_for_dam(&self.db.pool, dam_id).await?)
    }

    /// Set the AI status. A failed insemination cascades to the linked
    /// pregnancy diagnosis.
    pub async fn update_status(
        &self,
        id: i64,
        status: AiStatusId,
    ) -> Result<AiRecord, AiRecordError> {
        let mut tx = self.db.pool.begin().await?;

        let record = AiRecord::update_status(&mut *tx, id, status.id())
            .await?
            .ok_or(AiRecordError::RecordNotFound(id))?;

        if status == AiStatusId::Failed
            && let Some(pd) = PregnancyDiagnosis::find_by_ai_record_id(&mut *tx, id).await?
        {
            PregnancyDiagnosis::set_status(&mut *tx, pd.id, PdStatusId::AiFailed.id()).await?;
        }

        tx.commit().await?;
        Ok(record)
    }

    pub async fn list(&self) -> Result<Vec<AiRecordView>, AiRecordError> {
        Ok(AiRecord::find_all_views(&self.db.pool).await?)
    }

    pub async fn dam_overview(&self) -> Result<Vec<DamAiRecord>, AiRecordError> {
        self.dam_overview_at(Utc::now().date_naive()).await
    }

    /// Per-dam aggregation for the overview screen: the first three
    /// non-bull records, every bull record, and days since the most
    /// recent record of any kind.
    pub async fn dam_overview_at(&self, today: NaiveDate) -> Result<Vec<DamAiRecord>, AiRecordError> {
        let rows = AiRecord::find_dam_rows(&self.db.pool).await?;

        let mut overview: Vec<DamAiRecord> = Vec::new();
        for row in rows {
            let start_new = overview.last().is_none_or(|d| d.dam_id != row.dam_id);
            if start_new {
                overview.push(DamAiRecord {
                    dam_id: row.dam_id,
                    dam_tag: row.dam_tag.clone(),
                    ai_records: Vec::new(),
                    bull_ai_records: Vec::new(),
                    last_ai_days: None,
                });
            }
            if let Some(entry) = overview.last_mut() {
                let summary = AiRecordSummary {
                    id: row.id,
                    code: row.code,
                };
                if row.bull {
                    entry.bull_ai_records.push(summary);
                } else if entry.ai_records.len() < NON_BULL_AI_LIMIT as usize {
                    entry.ai_records.push(summary);
                }
                let days = (today - row.ai_date).num_days();
                entry.last_ai_days = Some(entry.last_ai_days.map_or(days, |d| d.min(days)));
            }
        }
        Ok(overview)
    }
}
