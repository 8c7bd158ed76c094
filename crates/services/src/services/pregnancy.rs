//! Pregnancy diagnosis workflow: recording the diagnosis outcome and
//! registering the calf once a pregnancy comes to term.

use chrono::{NaiveDate, Utc};
use db::{
    DBService,
    models::{
        ai_record::AiRecord,
        calf_record::CalfRecord,
        cow::{Cow, CreateCow},
        lookup::{CowStatusId, PdStatusId},
        pregnancy_diagnosis::{PregnancyDiagnosis, PregnancyDiagnosisView},
    },
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use ts_rs::TS;

#[derive(Debug, Error)]
pub enum PregnancyError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("pregnancy diagnosis {0} not found")]
    DiagnosisNotFound(i64),
    #[error("ai record {0} not found")]
    AiRecordNotFound(i64),
}

/// Details for the calf born out of a diagnosis. Dam and semen are not
/// part of this: they come from the AI record behind the diagnosis.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct NewCalf {
    pub tag: String,
    pub gender_id: i64,
    pub dob: Option<NaiveDate>,
    pub weight: Option<f64>,
    pub color_id: Option<i64>,
    pub feedlot_id: Option<i64>,
    pub remark: Option<String>,
}

/// Day-count math for the diagnosis progress bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
pub struct PdProgress {
    pub days: i64,
    pub total: i64,
    pub percent: i64,
}

/// Elapsed share of the diagnosis window, capped at 100 percent once the
/// check date has passed.
pub fn progress(ai_date: NaiveDate, today: NaiveDate, total_days: i64) -> PdProgress {
    let days = (today - ai_date).num_days();
    let percent = if total_days <= 0 {
        0
    } else {
        (((days as f64 / total_days as f64) * 100.0).round() as i64).min(100)
    };
    PdProgress {
        days,
        total: total_days,
        percent,
    }
}

#[derive(Clone)]
pub struct PregnancyService {
    db: DBService,
}

impl PregnancyService {
    pub fn new(db: DBService) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> Result<Vec<PregnancyDiagnosisView>, PregnancyError> {
        Ok(PregnancyDiagnosis::find_all_views(&self.db.pool).await?)
    }

    pub async fn update_status(
        &self,
        id: i64,
        diagnosis_by_id: Option<i64>,
        status: PdStatusId,
    ) -> Result<PregnancyDiagnosis, PregnancyError> {
        self.update_status_on(id, diagnosis_by_id, status, Utc::now().date_naive())
            .await
    }

    /// Record a diagnosis outcome. Moving to Pregnant stamps the pregnant
    /// date.
    pub async fn update_status_on(
        &self,
        id: i64,
        diagnosis_by_id: Option<i64>,
        status: PdStatusId,
        today: NaiveDate,
    ) -> Result<PregnancyDiagnosis, PregnancyError> {
        let pregnant_date = (status == PdStatusId::Pregnant).then_some(today);
        let updated = PregnancyDiagnosis::update_status(
            &self.db.pool,
            id,
            diagnosis_by_id,
            status.id(),
            pregnant_date,
        )
        .await?
        .ok_or(PregnancyError::DiagnosisNotFound(id))?;

        info!(pd_id = id, status = %status, "pregnancy diagnosis updated");
        Ok(updated)
    }

    /// Register the calf born out of a diagnosis: a new cow with New Born
    /// status, dam and semen inherited from the AI record, plus the link
    /// row tying calf, record, and diagnosis together.
    pub async fn register_calf(&self, pd_id: i64, calf: NewCalf) -> Result<Cow, PregnancyError> {
        let pd = PregnancyDiagnosis::find_by_id(&self.db.pool, pd_id)
            .await?
            .ok_or(PregnancyError::DiagnosisNotFound(pd_id))?;
        let ai_record = AiRecord::find_by_id(&self.db.pool, pd.ai_record_id)
            .await?
            .ok_or(PregnancyError::AiRecordNotFound(pd.ai_record_id))?;

        let mut tx = self.db.pool.begin().await?;

        let cow = Cow::create(
            &mut *tx,
            &CreateCow {
                tag: calf.tag,
                gender_id: calf.gender_id,
                dob: calf.dob,
                weight: calf.weight,
                color_id: calf.color_id,
                role_id: None,
                status_id: Some(CowStatusId::NewBorn.id()),
                dam_id: Some(ai_record.dam_id),
                semen_id: Some(ai_record.semen_id),
                current_feedlot_id: calf.feedlot_id,
                remark: calf.remark,
            },
        )
        .await?;

        CalfRecord::insert(&mut *tx, cow.id, ai_record.id, pd.id).await?;

        tx.commit().await?;
        info!(pd_id, calf_id = cow.id, tag = %cow.tag, "calf registered");
        Ok(cow)
    }
}

#[cfg(test)]
mod tests {
    use db::models::semen::UpsertSemen;

    use super::*;
    use crate::services::ai_record::AiRecordService;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    async fn setup_with_diagnosis() -> (DBService, PregnancyService, i64, i64, i64) {
        let db = DBService::new("sqlite::memory:").await.unwrap();
        db::models::inseminator::Inseminator::create(
            &db.pool,
            &db::models::inseminator::UpsertInseminator {
                name: "Vet A".into(),
                remark: None,
            },
        )
        .await
        .unwrap();
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
        let semen = db::models::semen::Semen::create(
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
                db::models::ai_record::CreateAiRecord {
                    dam_id: dam.id,
                    semen_id: semen.id,
                    ai_date: date("2025-03-01"),
                    ai_time: None,
                    ai_by_id: None,
                    prepared_by_id: None,
                    remark: None,
                },
                date("2025-03-01"),
            )
            .await
            .unwrap();

        let pd = PregnancyDiagnosis::find_by_ai_record_id(&db.pool, record.id)
            .await
            .unwrap()
            .unwrap();

        let service = PregnancyService::new(db.clone());
        (db, service, pd.id, dam.id, semen.id)
    }

    #[test]
    fn progress_counts_days_and_caps_at_full() {
        let p = progress(date("2025-03-01"), date("2025-03-31"), 90);
        assert_eq!(p.days, 30);
        assert_eq!(p.percent, 33);

        let p = progress(date("2025-03-01"), date("2025-09-01"), 90);
        assert_eq!(p.percent, 100);

        // A missing or zero window renders as empty, not a division error.
        let p = progress(date("2025-03-01"), date("2025-03-31"), 0);
        assert_eq!(p.percent, 0);
    }

    #[tokio::test]
    async fn pregnant_diagnosis_stamps_the_date() {
        let (_db, service, pd_id, _dam, _semen) = setup_with_diagnosis().await;

        let updated = service
            .update_status_on(pd_id, Some(1), PdStatusId::Pregnant, date("2025-05-29"))
            .await
            .unwrap();
        assert_eq!(updated.pd_status_id, PdStatusId::Pregnant.id());
        assert_eq!(updated.pregnant_date, Some(date("2025-05-29")));

        // A later non-pregnant update keeps the stamp.
        let updated = service
            .update_status_on(pd_id, None, PdStatusId::Gestation, date("2025-06-20"))
            .await
            .unwrap();
        assert_eq!(updated.pregnant_date, Some(date("2025-05-29")));
        assert_eq!(updated.diagnosis_by_id, Some(1));
    }

    #[tokio::test]
    async fn no_pregnant_diagnosis_leaves_no_stamp() {
        let (_db, service, pd_id, _dam, _semen) = setup_with_diagnosis().await;

        let updated = service
            .update_status_on(pd_id, Some(1), PdStatusId::NoPregnant, date("2025-05-29"))
            .await
            .unwrap();
        assert_eq!(updated.pregnant_date, None);
    }

    #[tokio::test]
    async fn registered_calf_inherits_dam_and_semen() {
        let (db, service, pd_id, dam_id, semen_id) = setup_with_diagnosis().await;

        let calf = service
            .register_calf(
                pd_id,
                NewCalf {
                    tag: "C-100".into(),
                    gender_id: 1,
                    dob: Some(date("2025-12-01")),
                    weight: Some(32.5),
                    color_id: None,
                    feedlot_id: None,
                    remark: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(calf.dam_id, Some(dam_id));
        assert_eq!(calf.semen_id, Some(semen_id));
        assert_eq!(calf.status_id, Some(CowStatusId::NewBorn.id()));

        let link = CalfRecord::find_by_pd_id(&db.pool, pd_id).await.unwrap().unwrap();
        assert_eq!(link.cow_id, calf.id);

        let missing = service
            .register_calf(
                9999,
                NewCalf {
                    tag: "C-101".into(),
                    gender_id: 1,
                    dob: None,
                    weight: None,
                    color_id: None,
                    feedlot_id: None,
                    remark: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(missing, PregnancyError::DiagnosisNotFound(9999)));
    }

    #[tokio::test]
    async fn views_resolve_code_and_status_names() {
        let (_db, service, pd_id, _dam, _semen) = setup_with_diagnosis().await;

        let views = service.list().await.unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].id, pd_id);
        assert_eq!(views[0].pd_status, "NEW");
        assert_eq!(views[0].ai_record_code, "20250301-1");
    }
}
