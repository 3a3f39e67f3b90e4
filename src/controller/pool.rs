//! Slot-aligned session pool.
//!
//! Slot `i` always serves the `i`-th current work item. Reconciling against
//! a new item list derives a [`ReconciliationPlan`] and applies it:
//!
//! ```text
//!   old sessions:  [0] [1] [2] [3] [4]
//!   new items:     [a] [b] [c]
//!   plan:          Close(3) Close(4) Reuse(0) Reuse(1) Reuse(2)
//!
//!   old sessions:  [0] [1]
//!   new items:     [a] [b] [c] [d]
//!   plan:          Reuse(0) Reuse(1) Open(2) Open(3)
//! ```
//!
//! Closes run first so the browser never holds more tabs than needed.
//! Opens are staggered; a slot whose tab is gone is repaired by opening a
//! fresh tab in its place. A reuse waits for the session to take the rebind,
//! so a tab lost mid-capture is repaired in the same pass.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rustc_hash::FxHashMap;
use tracing::{debug, error};

use crate::engine::Browser;
use crate::source::WorkItem;

use super::session::{SessionContext, SessionHandle, SessionSnapshot, SessionState};

// ============================================================================
// Constants
// ============================================================================

/// Default delay between consecutive tab opens.
pub const DEFAULT_OPEN_STAGGER: Duration = Duration::from_millis(700);

// ============================================================================
// ReconciliationPlan
// ============================================================================

/// What to do with one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotAction {
    /// Rebind the existing tab to the new item.
    Reuse(usize),
    /// Open a new tab for the new item.
    Open(usize),
    /// Close the tab; the slot no longer exists.
    Close(usize),
}

/// Ordered slot actions for one reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationPlan {
    actions: Vec<SlotAction>,
}

impl ReconciliationPlan {
    /// Plans the move from `old_len` sessions to `new_len` items.
    #[must_use]
    pub fn new(old_len: usize, new_len: usize) -> Self {
        let closes = (new_len..old_len).map(SlotAction::Close);
        let keeps = (0..new_len).map(|i| {
            if i < old_len {
                SlotAction::Reuse(i)
            } else {
                SlotAction::Open(i)
            }
        });
        Self {
            actions: closes.chain(keeps).collect(),
        }
    }

    /// Returns the actions in execution order.
    #[inline]
    #[must_use]
    pub fn actions(&self) -> &[SlotAction] {
        &self.actions
    }

    fn count(&self, pred: impl Fn(&SlotAction) -> bool) -> usize {
        self.actions.iter().filter(|a| pred(a)).count()
    }
}

// ============================================================================
// ReconcileSummary
// ============================================================================

/// Outcome counts of one reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Slots rebound in place.
    pub reused: usize,
    /// Slots given a new tab because the list grew.
    pub opened: usize,
    /// Slots whose old tab was gone and got a new one.
    pub repaired: usize,
    /// Tabs closed because the list shrank.
    pub closed: usize,
    /// Opens that failed.
    pub failed_opens: usize,
}

impl fmt::Display for ReconcileSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} reused, {} opened, {} repaired, {} closed",
            self.reused, self.opened, self.repaired, self.closed
        )?;
        if self.failed_opens > 0 {
            write!(f, ", {} failed to open", self.failed_opens)?;
        }
        Ok(())
    }
}

// ============================================================================
// TabPool
// ============================================================================

/// Owns the sessions, one per slot.
pub struct TabPool {
    browser: Arc<dyn Browser>,
    context: Arc<SessionContext>,
    open_stagger: Duration,
    sessions: Vec<SessionHandle>,
}

impl TabPool {
    /// Creates an empty pool.
    pub fn new(
        browser: Arc<dyn Browser>,
        context: Arc<SessionContext>,
        open_stagger: Duration,
    ) -> Self {
        Self {
            browser,
            context,
            open_stagger,
            sessions: Vec::new(),
        }
    }

    /// Returns the number of slots.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if the pool has no slots.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Returns the session in `slot`.
    #[must_use]
    pub fn session(&self, slot: usize) -> Option<&SessionHandle> {
        self.sessions.get(slot)
    }

    /// Returns a snapshot per slot.
    #[must_use]
    pub fn snapshots(&self) -> Vec<SessionSnapshot> {
        self.sessions.iter().map(SessionHandle::snapshot).collect()
    }

    /// Counts sessions per state.
    #[must_use]
    pub fn state_counts(&self) -> FxHashMap<SessionState, usize> {
        let mut counts = FxHashMap::default();
        for snapshot in self.snapshots() {
            *counts.entry(snapshot.state).or_insert(0) += 1;
        }
        counts
    }

    /// Aligns the pool with `items`.
    ///
    /// Afterwards the pool has exactly `items.len()` slots and slot `i` is
    /// bound to `items[i]`. A tab that fails to open leaves a `Failed`
    /// session in its slot.
    pub async fn reconcile(&mut self, items: &[WorkItem]) -> ReconcileSummary {
        let plan = ReconciliationPlan::new(self.sessions.len(), items.len());
        debug!(
            old = self.sessions.len(),
            new = items.len(),
            reuse = plan.count(|a| matches!(a, SlotAction::Reuse(_))),
            open = plan.count(|a| matches!(a, SlotAction::Open(_))),
            close = plan.count(|a| matches!(a, SlotAction::Close(_))),
            "Reconciling tabs"
        );

        let mut old: Vec<Option<SessionHandle>> =
            std::mem::take(&mut self.sessions).into_iter().map(Some).collect();
        let mut next = Vec::with_capacity(items.len());
        let mut summary = ReconcileSummary::default();
        let mut opened_any = false;

        for action in plan.actions() {
            match *action {
                SlotAction::Close(slot) => {
                    if let Some(session) = old.get_mut(slot).and_then(Option::take) {
                        session.close().await;
                        summary.closed += 1;
                        debug!(slot, "Closed slot");
                    }
                }
                SlotAction::Reuse(slot) => {
                    let item = items[slot].clone();
                    let reused = match old.get_mut(slot).and_then(Option::take) {
                        Some(session) if session.is_reusable() => {
                            let rebound = session.rebind(item.clone()).await;
                            rebound.then_some(session)
                        }
                        _ => None,
                    };

                    match reused {
                        Some(session) => {
                            next.push(session);
                            summary.reused += 1;
                        }
                        None => {
                            debug!(slot, item = %item, "Tab gone, opening a replacement");
                            let session = self.open_slot(slot, item, &mut opened_any).await;
                            summary.repaired += 1;
                            summary.failed_opens += usize::from(!session.is_reusable());
                            next.push(session);
                        }
                    }
                }
                SlotAction::Open(slot) => {
                    let session = self
                        .open_slot(slot, items[slot].clone(), &mut opened_any)
                        .await;
                    summary.opened += 1;
                    summary.failed_opens += usize::from(!session.is_reusable());
                    next.push(session);
                }
            }
        }

        self.sessions = next;
        summary
    }

    /// Closes every session.
    pub async fn close_all(&mut self) {
        for session in self.sessions.drain(..) {
            session.close().await;
        }
    }

    /// Opens a tab for `slot`, waiting out the stagger if another tab was
    /// opened earlier in this pass.
    async fn open_slot(
        &self,
        slot: usize,
        item: WorkItem,
        opened_any: &mut bool,
    ) -> SessionHandle {
        if *opened_any && !self.open_stagger.is_zero() {
            tokio::time::sleep(self.open_stagger).await;
        }
        *opened_any = true;

        match self.browser.open_page().await {
            Ok(page) => SessionHandle::spawn(slot, page, item, Arc::clone(&self.context)),
            Err(e) => {
                error!(slot, item = %item, error = %e, "Could not open tab");
                SessionHandle::failed(slot, item)
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
