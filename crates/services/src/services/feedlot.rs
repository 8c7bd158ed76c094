//! Feedlot membership backed by movement-history rows.

use async_trait::async_trait;
use chrono::Utc;
use db::{
    DBService,
    models::{
        cow::Cow,
        feedlot::{Feedlot, FeedlotWithCows},
        history::CowFeedlotHistory,
    },
};
use thiserror::Error;
use tracing::{debug, info};

use super::reconciliation::MembershipSubmitter;
use super::selection::MemberId;

#[derive(Debug, Error)]
pub enum FeedlotError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("feedlot {0} not found")]
    FeedlotNotFound(i64),
    #[error("cow {0} not found")]
    CowNotFound(i64),
    #[error("cow {cow_id} is already in feedlot {feedlot_id}")]
    AlreadyInFeedlot { feedlot_id: i64, cow_id: i64 },
    #[error("cow {0} is not currently in any feedlot")]
    NotInAnyFeedlot(i64),
}

#[derive(Clone)]
pub struct FeedlotService {
    db: DBService,
}

impl FeedlotService {
    pub fn new(db: DBService) -> Self {
        Self { db }
    }

    /// Move a cow into a feedlot. The cow's open history row in any other
    /// feedlot is closed, a new open row is created, and the cow's
    /// current-feedlot pointer follows.
    pub async fn assign(&self, feedlot_id: i64, cow_id: i64) -> Result<(), FeedlotError> {
        Feedlot::find_by_id(&self.db.pool, feedlot_id)
            .await?
            .ok_or(FeedlotError::FeedlotNotFound(feedlot_id))?;
        Cow::find_by_id(&self.db.pool, cow_id)
            .await?
            .ok_or(FeedlotError::CowNotFound(cow_id))?;

        let mut tx = self.db.pool.begin().await?;

        if CowFeedlotHistory::exists_open(&mut *tx, feedlot_id, cow_id).await? {
            return Err(FeedlotError::AlreadyInFeedlot { feedlot_id, cow_id });
        }

        let now = Utc::now();
        if let Some(open) = CowFeedlotHistory::find_open_for_cow(&mut *tx, cow_id).await? {
            CowFeedlotHistory::close(&mut *tx, open.id, now).await?;
        }
        CowFeedlotHistory::open(&mut *tx, cow_id, feedlot_id, now).await?;
        Cow::set_current_feedlot(&mut *tx, cow_id, Some(feedlot_id)).await?;

        tx.commit().await?;
        debug!(feedlot_id, cow_id, "cow moved to feedlot");
        Ok(())
    }

    /// Take a cow out of whatever feedlot it is in. Returns the feedlot it
    /// left.
    pub async fn unassign(&self, cow_id: i64) -> Result<i64, FeedlotError> {
        Cow::find_by_id(&self.db.pool, cow_id)
            .await?
            .ok_or(FeedlotError::CowNotFound(cow_id))?;

        let mut tx = self.db.pool.begin().await?;

        let open = CowFeedlotHistory::find_open_for_cow(&mut *tx, cow_id)
            .await?
            .ok_or(FeedlotError::NotInAnyFeedlot(cow_id))?;

        CowFeedlotHistory::close(&mut *tx, open.id, Utc::now()).await?;
        Cow::set_current_feedlot(&mut *tx, cow_id, None).await?;

        tx.commit().await?;
        debug!(feedlot_id = open.feedlot_id, cow_id, "cow removed from feedlot");
        Ok(open.feedlot_id)
    }

    /// Assign many cows. Cows already in this feedlot are skipped so a
    /// re-submitted diff is idempotent; the count is the number actually
    /// moved.
    pub async fn assign_bulk(&self, feedlot_id: i64, cow_ids: &[i64]) -> Result<u64, FeedlotError> {
        let mut moved = 0;
        for &cow_id in cow_ids {
            match self.assign(feedlot_id, cow_id).await {
                Ok(()) => moved += 1,
                Err(FeedlotError::AlreadyInFeedlot { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        info!(feedlot_id, moved, requested = cow_ids.len(), "bulk feedlot assign");
        Ok(moved)
    }

    /// Unassign many cows, skipping the ones not in any feedlot.
    pub async fn unassign_bulk(&self, cow_ids: &[i64]) -> Result<u64, FeedlotError> {
        let mut moved = 0;
        for &cow_id in cow_ids {
            match self.unassign(cow_id).await {
                Ok(_) => moved += 1,
                Err(FeedlotError::NotInAnyFeedlot(_)) => {}
                Err(e) => return Err(e),
            }
        }
        info!(moved, requested = cow_ids.len(), "bulk feedlot unassign");
        Ok(moved)
    }

    pub async fn with_cows(&self, feedlot_id: i64) -> Result<FeedlotWithCows, FeedlotError> {
        let feedlot = Feedlot::find_by_id(&self.db.pool, feedlot_id)
            .await?
            .ok_or(FeedlotError::FeedlotNotFound(feedlot_id))?;
        let cows = Cow::find_views_by_feedlot(&self.db.pool, feedlot_id).await?;
        Ok(FeedlotWithCows { feedlot, cows })
    }

    /// The membership snapshot source for a selection session.
    pub async fn current_cow_ids(&self, feedlot_id: i64) -> Result<Vec<i64>, FeedlotError> {
        Ok(Feedlot::current_cow_ids(&self.db.pool, feedlot_id).await?)
    }
}

/// One feedlot's membership as a reconciliation target: the selection
/// dialog's diff lands here as the two bulk operations.
pub struct FeedlotMembership {
    service: FeedlotService,
    feedlot_id: i64,
}

impl FeedlotMembership {
    pub fn new(service: FeedlotService, feedlot_id: i64) -> Self {
        Self { service, feedlot_id }
    }
}

#[async_trait]
impl MembershipSubmitter for FeedlotMembership {
    async fn add_members(&self, ids: &[MemberId]) -> anyhow::Result<u64> {
        Ok(self.service.assign_bulk(self.feedlot_id, ids).await?)
    }

    async fn remove_members(&self, ids: &[MemberId]) -> anyhow::Result<u64> {
        Ok(self.service.unassign_bulk(ids).await?)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use db::models::cow::CreateCow;
    use db::models::feedlot::UpsertFeedlot;
    use db::models::history::CowFeedlotHistory;

    use super::*;
    use crate::services::reconciliation::{self, ViewRefresher};
    use crate::services::selection::SelectionSession;

    struct NoopRefresher;

    #[async_trait]
    impl ViewRefresher for NoopRefresher {
        async fn refresh(&self) {}
    }

    async fn setup() -> (DBService, FeedlotService, i64, Vec<i64>) {
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

        let mut cow_ids = Vec::new();
        for tag in ["C-001", "C-002", "C-003", "C-004", "C-005"] {
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
            cow_ids.push(cow.id);
        }

        let service = FeedlotService::new(db.clone());
        (db, service, feedlot.id, cow_ids)
    }

    #[tokio::test]
    async fn assign_opens_history_and_sets_pointer() {
        let (db, service, feedlot_id, cows) = setup().await;

        service.assign(feedlot_id, cows[0]).await.unwrap();

        let cow = Cow::find_by_id(&db.pool, cows[0]).await.unwrap().unwrap();
        assert_eq!(cow.current_feedlot_id, Some(feedlot_id));

        let open = CowFeedlotHistory::find_open_for_cow(&db.pool, cows[0])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(open.feedlot_id, feedlot_id);
        assert!(open.moved_out_at.is_none());

        // Same feedlot again is rejected.
        let err = service.assign(feedlot_id, cows[0]).await.unwrap_err();
        assert!(matches!(err, FeedlotError::AlreadyInFeedlot { .. }));
    }

    #[tokio::test]
    async fn moving_between_feedlots_closes_the_old_row() {
        let (db, service, feedlot_id, cows) = setup().await;
        let other = Feedlot::create(
            &db.pool,
            &UpsertFeedlot {
                name: "South Pen".into(),
                remark: None,
            },
        )
        .await
        .unwrap();

        service.assign(feedlot_id, cows[0]).await.unwrap();
        service.assign(other.id, cows[0]).await.unwrap();

        let history = CowFeedlotHistory::find_by_cow(&db.pool, cows[0]).await.unwrap();
        assert_eq!(history.len(), 2);
        let open: Vec<_> = history.iter().filter(|h| h.moved_out_at.is_none()).collect();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].feedlot_id, other.id);

        let cow = Cow::find_by_id(&db.pool, cows[0]).await.unwrap().unwrap();
        assert_eq!(cow.current_feedlot_id, Some(other.id));
    }

    #[tokio::test]
    async fn unassign_requires_current_membership() {
        let (db, service, feedlot_id, cows) = setup().await;

        let err = service.unassign(cows[0]).await.unwrap_err();
        assert!(matches!(err, FeedlotError::NotInAnyFeedlot(_)));

        service.assign(feedlot_id, cows[0]).await.unwrap();
        let left = service.unassign(cows[0]).await.unwrap();
        assert_eq!(left, feedlot_id);

        let cow = Cow::find_by_id(&db.pool, cows[0]).await.unwrap().unwrap();
        assert_eq!(cow.current_feedlot_id, None);
    }

    #[tokio::test]
    async fn bulk_operations_skip_settled_rows() {
        let (_db, service, feedlot_id, cows) = setup().await;

        service.assign(feedlot_id, cows[0]).await.unwrap();

        // One of the three is already in place; only two actually move.
        let moved = service
            .assign_bulk(feedlot_id, &[cows[0], cows[1], cows[2]])
            .await
            .unwrap();
        assert_eq!(moved, 2);

        // One of the two was never assigned anywhere.
        let moved = service.unassign_bulk(&[cows[1], cows[4]]).await.unwrap();
        assert_eq!(moved, 1);
    }

    #[tokio::test]
    async fn selection_session_reconciles_against_the_feedlot() {
        let (_db, service, feedlot_id, cows) = setup().await;
        service
            .assign_bulk(feedlot_id, &[cows[0], cows[1], cows[2]])
            .await
            .unwrap();

        // Dialog opens on the current membership.
        let current = service.current_cow_ids(feedlot_id).await.unwrap();
        let mut session = SelectionSession::new();
        session.sync(true, &current);

        // Uncheck one resident, check one newcomer.
        session.toggle(cows[1]);
        session.toggle(cows[4]);

        let membership = FeedlotMembership::new(service.clone(), feedlot_id);
        let outcome = reconciliation::confirm(&mut session, &membership, &NoopRefresher)
            .await
            .expect("changes to submit");
        assert!(outcome.fully_applied());
        assert_eq!(outcome.assigned, 1);
        assert_eq!(outcome.unassigned, 1);

        let after = service.current_cow_ids(feedlot_id).await.unwrap();
        assert_eq!(after, vec![cows[0], cows[2], cows[4]]);

        // Reopening baselines on the new membership.
        session.sync(true, &after);
        assert!(!session.has_changes());
    }

    #[tokio::test]
    async fn with_cows_resolves_the_view() {
        let (_db, service, feedlot_id, cows) = setup().await;
        service.assign(feedlot_id, cows[2]).await.unwrap();

        let with_cows = service.with_cows(feedlot_id).await.unwrap();
        assert_eq!(with_cows.feedlot.name, "North Pen");
        assert_eq!(with_cows.cows.len(), 1);
        assert_eq!(with_cows.cows[0].id, cows[2]);
        assert_eq!(with_cows.cows[0].feedlot.as_deref(), Some("North Pen"));
    }
}
