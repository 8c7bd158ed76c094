//! Transponder assignment. Unlike feedlots, both sides are exclusive: a
//! transponder sits on one cow and a cow wears one transponder, so an
//! assignment may have to close an open history row on each side.

use chrono::Utc;
use db::{
    DBService,
    models::{cow::Cow, history::CowTransponderHistory, transponder::Transponder},
};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum TransponderError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("transponder {0} not found")]
    TransponderNotFound(i64),
    #[error("cow {0} not found")]
    CowNotFound(i64),
    #[error("transponder {transponder_id} is already assigned to cow {cow_id}")]
    AlreadyAssigned { transponder_id: i64, cow_id: i64 },
    #[error("transponder {0} is not currently assigned to any cow")]
    NotAssigned(i64),
}

#[derive(Clone)]
pub struct TransponderService {
    db: DBService,
}

impl TransponderService {
    pub fn new(db: DBService) -> Self {
        Self { db }
    }

    pub async fn assign(&self, transponder_id: i64, cow_id: i64) -> Result<(), TransponderError> {
        Transponder::find_by_id(&self.db.pool, transponder_id)
            .await?
            .ok_or(TransponderError::TransponderNotFound(transponder_id))?;
        Cow::find_by_id(&self.db.pool, cow_id)
            .await?
            .ok_or(TransponderError::CowNotFound(cow_id))?;

        let mut tx = self.db.pool.begin().await?;

        if CowTransponderHistory::exists_open(&mut *tx, transponder_id, cow_id).await? {
            return Err(TransponderError::AlreadyAssigned { transponder_id, cow_id });
        }

        let now = Utc::now();

        // The transponder may currently sit on another cow.
        if let Some(open) =
            CowTransponderHistory::find_open_for_transponder(&mut *tx, transponder_id).await?
        {
            CowTransponderHistory::close(&mut *tx, open.id, now).await?;
            Cow::set_current_transponder(&mut *tx, open.cow_id, None).await?;
        }

        // The cow may currently wear another transponder.
        if let Some(open) = CowTransponderHistory::find_open_for_cow(&mut *tx, cow_id).await? {
            CowTransponderHistory::close(&mut *tx, open.id, now).await?;
            Transponder::set_assignment(&mut *tx, open.transponder_id, None, None).await?;
        }

        CowTransponderHistory::open(&mut *tx, cow_id, transponder_id, now).await?;
        Transponder::set_assignment(&mut *tx, transponder_id, Some(cow_id), Some(now.date_naive()))
            .await?;
        Cow::set_current_transponder(&mut *tx, cow_id, Some(transponder_id)).await?;

        tx.commit().await?;
        debug!(transponder_id, cow_id, "transponder assigned");
        Ok(())
    }

    /// Take the transponder off whichever cow wears it. Returns that
    /// cow's id.
    pub async fn unassign(&self, transponder_id: i64) -> Result<i64, TransponderError> {
        Transponder::find_by_id(&self.db.pool, transponder_id)
            .await?
            .ok_or(TransponderError::TransponderNotFound(transponder_id))?;

        let mut tx = self.db.pool.begin().await?;

        let open = CowTransponderHistory::find_open_for_transponder(&mut *tx, transponder_id)
            .await?
            .ok_or(TransponderError::NotAssigned(transponder_id))?;

        CowTransponderHistory::close(&mut *tx, open.id, Utc::now()).await?;
        Transponder::set_assignment(&mut *tx, transponder_id, None, None).await?;
        Cow::set_current_transponder(&mut *tx, open.cow_id, None).await?;

        tx.commit().await?;
        debug!(transponder_id, cow_id = open.cow_id, "transponder unassigned");
        Ok(open.cow_id)
    }
}

#[cfg(test)]
mod tests {
    use db::models::cow::CreateCow;
    use db::models::transponder::UpsertTransponder;

    use super::*;

    async fn setup() -> (DBService, TransponderService, Vec<i64>, Vec<i64>) {
        let db = DBService::new("sqlite::memory:").await.unwrap();

        let mut transponders = Vec::new();
        for code in ["T-100", "T-200"] {
            let t = Transponder::create(
                &db.pool,
                &UpsertTransponder {
                    code: code.into(),
                    remark: None,
                },
            )
            .await
            .unwrap();
            transponders.push(t.id);
        }

        let mut cows = Vec::new();
        for tag in ["C-001", "C-002"] {
            let cow = Cow::create(
                &db.pool,
                &CreateCow {
                    tag: tag.into(),
                    gender_id: 2,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
            cows.push(cow.id);
        }

        let service = TransponderService::new(db.clone());
        (db, service, transponders, cows)
    }

    #[tokio::test]
    async fn assign_updates_both_pointers() {
        let (db, service, transponders, cows) = setup().await;

        service.assign(transponders[0], cows[0]).await.unwrap();

        let t = Transponder::find_by_id(&db.pool, transponders[0])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(t.current_cow_id, Some(cows[0]));
        assert!(t.assigned_date.is_some());

        let cow = Cow::find_by_id(&db.pool, cows[0]).await.unwrap().unwrap();
        assert_eq!(cow.current_transponder_id, Some(transponders[0]));

        let err = service.assign(transponders[0], cows[0]).await.unwrap_err();
        assert!(matches!(err, TransponderError::AlreadyAssigned { .. }));
    }

    #[tokio::test]
    async fn reassignment_releases_both_previous_sides() {
        let (db, service, transponders, cows) = setup().await;

        service.assign(transponders[0], cows[0]).await.unwrap();
        service.assign(transponders[1], cows[1]).await.unwrap();

        // Move transponder 0 onto cow 1: frees cow 0, and takes
        // transponder 1 off cow 1.
        service.assign(transponders[0], cows[1]).await.unwrap();

        let cow0 = Cow::find_by_id(&db.pool, cows[0]).await.unwrap().unwrap();
        assert_eq!(cow0.current_transponder_id, None);

        let cow1 = Cow::find_by_id(&db.pool, cows[1]).await.unwrap().unwrap();
        assert_eq!(cow1.current_transponder_id, Some(transponders[0]));

        let t1 = Transponder::find_by_id(&db.pool, transponders[1])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(t1.current_cow_id, None);
        assert_eq!(t1.assigned_date, None);

        let history = CowTransponderHistory::find_by_cow(&db.pool, cows[1]).await.unwrap();
        assert_eq!(history.iter().filter(|h| h.unassigned_at.is_none()).count(), 1);
    }

    #[tokio::test]
    async fn unassign_round_trip() {
        let (db, service, transponders, cows) = setup().await;

        let err = service.unassign(transponders[0]).await.unwrap_err();
        assert!(matches!(err, TransponderError::NotAssigned(_)));

        service.assign(transponders[0], cows[0]).await.unwrap();
        let freed = service.unassign(transponders[0]).await.unwrap();
        assert_eq!(freed, cows[0]);

        let cow = Cow::find_by_id(&db.pool, cows[0]).await.unwrap().unwrap();
        assert_eq!(cow.current_transponder_id, None);
        assert!(
            CowTransponderHistory::find_open_for_transponder(&db.pool, transponders[0])
                .await
                .unwrap()
                .is_none()
        );
    }
}
