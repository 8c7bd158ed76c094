//! Background service maturing freshly opened pregnancy diagnoses.
//!
//! A diagnosis starts in NEW when its AI record is created. Once the AI
//! date is within five days of the configured diagnosis window it moves
//! to Pending, which puts it on the vet's worklist.

use std::time::Duration;

use chrono::{NaiveDate, Utc};
use db::{
    DBService,
    models::{
        lookup::PdStatusId,
        pregnancy_diagnosis::PregnancyDiagnosis,
        system_setting::{PD_DAY_SETTING_ID, SystemSetting},
    },
};
use sqlx::SqlitePool;
use thiserror::Error;
use tokio::time::interval;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum PdMaturationError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Background service that periodically runs the maturation sweep.
pub struct PdMaturationService {
    db: DBService,
    poll_interval: Duration,
}

impl PdMaturationService {
    /// Spawn the background maturation service.
    pub async fn spawn(db: DBService) -> tokio::task::JoinHandle<()> {
        let service = Self {
            db,
            poll_interval: Duration::from_secs(3600),
        };
        tokio::spawn(async move {
            service.start().await;
        })
    }

    async fn start(&self) {
        info!(
            "Starting PD maturation service with interval {:?}",
            self.poll_interval
        );

        let mut interval = interval(self.poll_interval);

        loop {
            interval.tick().await;
            if let Err(e) = Self::sweep(&self.db.pool, Utc::now().date_naive()).await {
                error!("Error running PD maturation sweep: {}", e);
            }
        }
    }

    /// Move every NEW diagnosis whose AI date is old enough to Pending.
    /// The window comes from the PD day system setting; a missing or
    /// malformed setting skips the sweep rather than failing it.
    pub async fn sweep(pool: &SqlitePool, today: NaiveDate) -> Result<u64, PdMaturationError> {
        let Some(setting) = SystemSetting::find_by_id(pool, PD_DAY_SETTING_ID).await? else {
            warn!("PD day setting not found, skipping maturation sweep");
            return Ok(0);
        };
        let Some(pd_days) = setting.value.as_deref().and_then(|v| v.parse::<i64>().ok()) else {
            warn!(value = ?setting.value, "PD day setting is not a number, skipping sweep");
            return Ok(0);
        };

        let threshold = pd_days - 5;

        let new_pds = PregnancyDiagnosis::find_by_status(pool, PdStatusId::New.id()).await?;
        let mut updated = 0;
        for pd in new_pds {
            let days_since = (today - pd.ai_date).num_days();
            if days_since >= threshold {
                PregnancyDiagnosis::set_status(pool, pd.id, PdStatusId::Pending.id()).await?;
                updated += 1;
            }
        }

        if updated > 0 {
            info!(updated, "PD records matured from NEW to Pending");
        }
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use db::models::ai_record::CreateAiRecord;
    use db::models::cow::{Cow, CreateCow};
    use db::models::semen::{Semen, UpsertSemen};

    use super::*;
    use crate::services::ai_record::AiRecordService;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    async fn setup_with_new_pd(ai_date: NaiveDate) -> (DBService, i64) {
        let db = DBService::new("sqlite::memory:").await.unwrap();
        let dam = Cow::create(
            &db.pool,
            &CreateCow {
                tag: "D-001".into(),
                gender_id: 2,
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let semen = Semen::create(
            &db.pool,
            &UpsertSemen {
                name: "S-1".into(),
                sire: None,
                date: date("2025-01-01"),
                straw: Some(5),
                bull: false,
                remark: None,
            },
        )
        .await
        .unwrap();

        let record = AiRecordService::new(db.clone())
            .create_on(
                CreateAiRecord {
                    dam_id: dam.id,
                    semen_id: semen.id,
                    ai_date,
                    ai_time: None,
                    ai_by_id: None,
                    prepared_by_id: None,
                    remark: None,
                },
                ai_date,
            )
            .await
            .unwrap();

        let pd = PregnancyDiagnosis::find_by_ai_record_id(&db.pool, record.id)
            .await
            .unwrap()
            .unwrap();
        (db, pd.id)
    }

    #[tokio::test]
    async fn sweep_matures_records_at_the_threshold() {
        // pd_day seeds at 90, so the threshold is 85 days after AI.
        let (db, pd_id) = setup_with_new_pd(date("2025-03-01")).await;

        // Day 84: too early.
        let updated = PdMaturationService::sweep(&db.pool, date("2025-05-24")).await.unwrap();
        assert_eq!(updated, 0);

        // Day 85: matures.
        let updated = PdMaturationService::sweep(&db.pool, date("2025-05-25")).await.unwrap();
        assert_eq!(updated, 1);

        let pd = PregnancyDiagnosis::find_by_id(&db.pool, pd_id).await.unwrap().unwrap();
        assert_eq!(pd.pd_status_id, PdStatusId::Pending.id());

        // Already Pending: the next sweep finds nothing.
        let updated = PdMaturationService::sweep(&db.pool, date("2025-05-26")).await.unwrap();
        assert_eq!(updated, 0);
    }

    #[tokio::test]
    async fn sweep_skips_on_bad_setting() {
        let (db, pd_id) = setup_with_new_pd(date("2025-01-01")).await;

        SystemSetting::update_value(&db.pool, PD_DAY_SETTING_ID, Some("soon"))
            .await
            .unwrap();
        let updated = PdMaturationService::sweep(&db.pool, date("2025-12-01")).await.unwrap();
        assert_eq!(updated, 0);

        let pd = PregnancyDiagnosis::find_by_id(&db.pool, pd_id).await.unwrap().unwrap();
        assert_eq!(pd.pd_status_id, PdStatusId::New.id());
    }
}
