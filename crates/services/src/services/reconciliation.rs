//! Applies a selection diff through paired bulk membership operations.
//!
//! The two mutations are independent: assigns run first, unassigns second,
//! and a failure on either side is recorded against that operation while
//! the other side's result stands. There is no compensating rollback, and
//! dependent views are refreshed exactly once after both sides settle.

use async_trait::async_trait;
use serde::Serialize;
use strum_macros::Display;
use tracing::{info, warn};
use ts_rs::TS;

use super::selection::{MemberId, SelectionDiff, SelectionSession};

/// The two bulk mutations a membership backend must expose. Either may
/// fail independently; implementations return the number of members
/// actually moved.
#[async_trait]
pub trait MembershipSubmitter: Send + Sync {
    async fn add_members(&self, ids: &[MemberId]) -> anyhow::Result<u64>;
    async fn remove_members(&self, ids: &[MemberId]) -> anyhow::Result<u64>;
}

/// Consolidated refresh of every view depending on the membership, fired
/// once per reconciliation rather than once per operation.
#[async_trait]
pub trait ViewRefresher: Send + Sync {
    async fn refresh(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, TS)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BulkOperation {
    Assign,
    Unassign,
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct OperationFailure {
    pub operation: BulkOperation,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, TS)]
pub struct ReconciliationOutcome {
    pub assigned: u64,
    pub unassigned: u64,
    pub failures: Vec<OperationFailure>,
}

impl ReconciliationOutcome {
    pub fn fully_applied(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Run both bulk operations for a diff. Empty sides are skipped entirely.
pub async fn apply<S>(submitter: &S, diff: &SelectionDiff) -> ReconciliationOutcome
where
    S: MembershipSubmitter + ?Sized,
{
    let mut outcome = ReconciliationOutcome::default();

    if !diff.to_add.is_empty() {
        match submitter.add_members(&diff.to_add).await {
            Ok(count) => outcome.assigned = count,
            Err(error) => {
                warn!(requested = diff.to_add.len(), %error, "bulk assign failed");
                outcome.failures.push(OperationFailure {
                    operation: BulkOperation::Assign,
                    message: error.to_string(),
                });
            }
        }
    }

    if !diff.to_remove.is_empty() {
        match submitter.remove_members(&diff.to_remove).await {
            Ok(count) => outcome.unassigned = count,
            Err(error) => {
                warn!(requested = diff.to_remove.len(), %error, "bulk unassign failed");
                outcome.failures.push(OperationFailure {
                    operation: BulkOperation::Unassign,
                    message: error.to_string(),
                });
            }
        }
    }

    outcome
}

/// Drive a session through confirmation: freeze the diff, submit both
/// operations, refresh dependent views once, close the session. Partial
/// failure still closes it; the failures ride back in the outcome.
///
/// Returns `None` when the session has nothing to submit (the confirm
/// control is disabled in that state), in which case nothing is refreshed.
pub async fn confirm<S, R>(
    session: &mut SelectionSession,
    submitter: &S,
    refresher: &R,
) -> Option<ReconciliationOutcome>
where
    S: MembershipSubmitter + ?Sized,
    R: ViewRefresher + ?Sized,
{
    let diff = session.begin_submit()?;
    let outcome = apply(submitter, &diff).await;
    refresher.refresh().await;
    session.finish_submit();

    info!(
        assigned = outcome.assigned,
        unassigned = outcome.unassigned,
        failures = outcome.failures.len(),
        "reconciliation settled"
    );
    Some(outcome)
}
