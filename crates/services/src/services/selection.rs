//! Snapshot-based member selection for bulk assignment dialogs.
//!
//! A `SelectionSession` lives from dialog open to dialog close. On the
//! open edge it freezes the current membership as the diff baseline and
//! seeds the live selection from it; while open, the user toggles entries
//! and the diff against the frozen baseline is recomputed on demand. The
//! baseline must survive churn in the externally supplied membership list
//! (background refetches) for as long as the session is open.

use std::collections::BTreeSet;

use serde::Serialize;
use strum_macros::Display;
use ts_rs::TS;

pub type MemberId = i64;

/// Minimal add/remove set transforming the snapshot into the selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, TS)]
pub struct SelectionDiff {
    pub to_add: Vec<MemberId>,
    pub to_remove: Vec<MemberId>,
}

impl SelectionDiff {
    pub fn has_changes(&self) -> bool {
        !self.to_add.is_empty() || !self.to_remove.is_empty()
    }

    /// Label for the confirm control: `"no changes"`, or the non-empty
    /// counts joined, e.g. `"3 assign, 1 unassign"`.
    pub fn summary(&self) -> String {
        if !self.has_changes() {
            return "no changes".to_string();
        }
        let mut parts = Vec::new();
        if !self.to_add.is_empty() {
            parts.push(format!("{} assign", self.to_add.len()));
        }
        if !self.to_remove.is_empty() {
            parts.push(format!("{} unassign", self.to_remove.len()));
        }
        parts.join(", ")
    }
}

/// Pure set difference in both directions. Safe to call on every render.
pub fn diff(snapshot: &BTreeSet<MemberId>, selection: &BTreeSet<MemberId>) -> SelectionDiff {
    SelectionDiff {
        to_add: selection.difference(snapshot).copied().collect(),
        to_remove: snapshot.difference(selection).copied().collect(),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Display, TS)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SessionState {
    #[default]
    Closed,
    Open,
    Submitting,
}

/// Header-checkbox state over the currently visible (filtered) rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, TS)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SelectAllState {
    Checked,
    Indeterminate,
    Unchecked,
}

/// A physical click being routed through nested handlers. A row and its
/// embedded checkbox both react to clicks; whichever handler runs first
/// must stop propagation so the same click cannot toggle twice.
#[derive(Debug, Default)]
pub struct ClickEvent {
    propagation_stopped: bool,
}

impl ClickEvent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

#[derive(Debug, Default)]
pub struct SelectionSession {
    state: SessionState,
    prev_open: bool,
    snapshot: BTreeSet<MemberId>,
    selected: BTreeSet<MemberId>,
}

impl SelectionSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconcile with the host's `open` flag and its current membership
    /// list. Call on every render.
    ///
    /// Capture is edge-triggered on the stored previous value of `open`:
    /// it fires exactly once per closed-to-open transition, and changes to
    /// `current_members` while the session stays open never re-capture the
    /// baseline. Snapshot and live selection initialize in the same call,
    /// so no caller can observe one without the other.
    pub fn sync(&mut self, open: bool, current_members: &[MemberId]) {
        let was_open = self.prev_open;
        self.prev_open = open;

        if open && !was_open {
            self.snapshot = current_members.iter().copied().collect();
            self.selected = self.snapshot.clone();
            self.state = SessionState::Open;
        } else if !open && was_open {
            self.reset();
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == SessionState::Open
    }

    pub fn snapshot(&self) -> &BTreeSet<MemberId> {
        &self.snapshot
    }

    pub fn selected(&self) -> &BTreeSet<MemberId> {
        &self.selected
    }

    pub fn is_selected(&self, id: MemberId) -> bool {
        self.selected.contains(&id)
    }

    /// Flip one member. Ignored unless the session is open; a pending
    /// submission must not have its diff edited out from under it.
    pub fn toggle(&mut self, id: MemberId) {
        if self.state != SessionState::Open {
            return;
        }
        if !self.selected.remove(&id) {
            self.selected.insert(id);
        }
    }

    /// Select-all over the filtered view: if every visible id is already
    /// selected, deselect exactly the visible ids; otherwise select them.
    pub fn toggle_all_visible(&mut self, visible: &[MemberId]) {
        if self.state != SessionState::Open || visible.is_empty() {
            return;
        }
        if visible.iter().all(|id| self.selected.contains(id)) {
            for id in visible {
                self.selected.remove(id);
            }
        } else {
            self.selected.extend(visible.iter().copied());
        }
    }

    pub fn select_all_state(&self, visible: &[MemberId]) -> SelectAllState {
        let selected = visible
            .iter()
            .filter(|id| self.selected.contains(*id))
            .count();
        if visible.is_empty() || selected == 0 {
            SelectAllState::Unchecked
        } else if selected == visible.len() {
            SelectAllState::Checked
        } else {
            SelectAllState::Indeterminate
        }
    }

    /// Checkbox handler: consumes the click before the enclosing row sees
    /// it, then toggles.
    pub fn handle_checkbox_click(&mut self, event: &mut ClickEvent, id: MemberId) {
        event.stop_propagation();
        self.toggle(id);
    }

    /// Row handler: toggles only if no nested control already consumed the
    /// click.
    pub fn handle_row_click(&mut self, event: &mut ClickEvent, id: MemberId) {
        if event.propagation_stopped() {
            return;
        }
        self.toggle(id);
    }

    pub fn diff(&self) -> SelectionDiff {
        diff(&self.snapshot, &self.selected)
    }

    pub fn has_changes(&self) -> bool {
        self.diff().has_changes()
    }

    /// Freeze the diff and enter `Submitting`. Returns `None` when the
    /// session is not open or there is nothing to submit (the confirm
    /// control is disabled in that case).
    pub fn begin_submit(&mut self) -> Option<SelectionDiff> {
        if self.state != SessionState::Open {
            return None;
        }
        let diff = self.diff();
        if !diff.has_changes() {
            return None;
        }
        self.state = SessionState::Submitting;
        Some(diff)
    }

    /// Close out a submission. The session ends whether or not every bulk
    /// operation succeeded; failures were already reported per-operation.
    pub fn finish_submit(&mut self) {
        if self.state == SessionState::Submitting {
            self.prev_open = false;
            self.reset();
        }
    }

    /// Discard the in-progress selection without submitting.
    pub fn cancel(&mut self) {
        if self.state == SessionState::Open {
            self.prev_open = false;
            self.reset();
        }
    }

    fn reset(&mut self) {
        self.snapshot.clear();
        self.selected.clear();
        self.state = SessionState::Closed;
    }
}
