//! Tab lifecycle and event-reconciliation controller.
//!
//! | Module | Role |
//! |--------|------|
//! | [`form`] | Entry page, acknowledgment pattern, selectors, form scripts |
//! | [`session`] | One actor per tab running the submission state machine |
//! | [`pool`] | Slot-aligned sessions and reconciliation |
//! | [`command`] | Operator input loop |
//!
//! [`Controller`] ties them to a [`WorkItemSource`] and a [`Browser`].

// ============================================================================
// Modules
// ============================================================================

pub mod command;
pub mod form;
pub mod pool;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

// ============================================================================
// Imports
// ============================================================================

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::capture::CaptureSink;
use crate::engine::Browser;
use crate::error::{Error, Result};
use crate::source::WorkItemSource;

pub use command::{CommandChannel, OperatorCommand};
pub use form::FormProfile;
pub use pool::{DEFAULT_OPEN_STAGGER, ReconcileSummary, ReconciliationPlan, SlotAction, TabPool};
pub use session::{
    SessionContext, SessionHandle, SessionSnapshot, SessionState, SessionTiming,
};

// ============================================================================
// ControllerSettings
// ============================================================================

/// Everything the controller needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    /// Target form.
    pub form: FormProfile,
    /// Population timing.
    pub timing: SessionTiming,
    /// Delay between consecutive tab opens.
    pub open_stagger: Duration,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            form: FormProfile::default(),
            timing: SessionTiming::default(),
            open_stagger: DEFAULT_OPEN_STAGGER,
        }
    }
}

// ============================================================================
// Controller
// ============================================================================

/// Keeps one tab per current work item.
pub struct Controller {
    source: Arc<dyn WorkItemSource>,
    browser: Arc<dyn Browser>,
    pool: TabPool,
}

impl Controller {
    /// Reads the work items, launches the browser and opens one tab per
    /// item.
    ///
    /// `launch` is only called once the source has produced at least one
    /// item.
    ///
    /// # Errors
    ///
    /// - [`Error::NoWorkItems`] if the source is empty
    /// - Source errors from the first read
    /// - Launch errors from `launch`
    pub async fn start<L, F>(
        source: Arc<dyn WorkItemSource>,
        sink: Arc<dyn CaptureSink>,
        settings: ControllerSettings,
        launch: L,
    ) -> Result<Self>
    where
        L: FnOnce() -> F,
        F: Future<Output = Result<Arc<dyn Browser>>>,
    {
        let items = source.current_items().await?;
        if items.is_empty() {
            return Err(Error::NoWorkItems);
        }
        info!(count = items.len(), "Loaded work items");

        let browser = launch().await?;
        let context = Arc::new(SessionContext {
            form: settings.form,
            timing: settings.timing,
            sink,
        });
        let mut pool = TabPool::new(Arc::clone(&browser), context, settings.open_stagger);

        let summary = pool.reconcile(&items).await;
        info!(tabs = pool.len(), %summary, "Tabs opened");

        Ok(Self {
            source,
            browser,
            pool,
        })
    }

    /// Returns the number of slots.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.pool.len()
    }

    /// Returns `true` if no slot is open.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    /// Returns a snapshot per slot.
    #[must_use]
    pub fn snapshots(&self) -> Vec<SessionSnapshot> {
        self.pool.snapshots()
    }

    /// Re-reads the work items and reconciles the pool against them.
    ///
    /// # Errors
    ///
    /// Returns the source error; the pool is left untouched.
    pub async fn refresh(&mut self) -> Result<ReconcileSummary> {
        let items = self.source.current_items().await?;
        if items.is_empty() {
            warn!("Work item list is empty, closing every tab");
        }

        let summary = self.pool.reconcile(&items).await;

        let counts = self.pool.state_counts();
        let count = |state| counts.get(&state).copied().unwrap_or(0);
        info!(
            tabs = self.pool.len(),
            %summary,
            initializing = count(SessionState::Initializing),
            awaiting = count(SessionState::AwaitingSubmission),
            captured = count(SessionState::Captured),
            failed = count(SessionState::Failed),
            "Refresh complete"
        );
        Ok(summary)
    }

    /// Closes every tab, then the browser.
    ///
    /// # Errors
    ///
    /// Returns the browser's shutdown error.
    pub async fn shutdown(mut self) -> Result<()> {
        info!(tabs = self.pool.len(), "Shutting down");
        self.pool.close_all().await;
        self.browser.shutdown().await
    }
}

// ============================================================================
// Tests
// ============================================================================
