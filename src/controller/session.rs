//! Per-tab session state machine.
//!
//! Each [`SessionHandle`] fronts one actor task that owns a tab and the work
//! item bound to it. Everything that touches the session arrives on the
//! actor's single input channel: browser events tagged with the listener
//! epoch they were registered under, rebinds from reconciliation, and the
//! close request.
//!
//! A rebind is accepted only once the actor dequeues it with its tab still
//! open. A session that loses its tab while a rebind is queued refuses it,
//! and the pool repairs the slot instead.
//!
//! # States
//!
//! | State | Meaning |
//! |-------|---------|
//! | `Initializing` | Navigating to the entry page or populating the form |
//! | `AwaitingSubmission` | Reference typed; waiting for the human |
//! | `Acknowledging` | Acknowledgment page loaded; capture running |
//! | `Captured` | Artifact written and tab closed (terminal) |
//! | `Failed` | Abandoned after an unrecoverable error |
//!
//! A session that failed because population timed out still listens for
//! reloads of the entry page and retries population on each one.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, trace, warn};

use crate::capture::CaptureSink;
use crate::engine::{Page, PageEvent};
use crate::error::{Error, Result};
use crate::identifiers::ListenerEpoch;
use crate::source::WorkItem;

use super::form::FormProfile;

// ============================================================================
// SessionState
// ============================================================================

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Navigating to the form or populating it.
    Initializing,
    /// Form populated and armed for the human.
    AwaitingSubmission,
    /// Capturing the acknowledgment page.
    Acknowledging,
    /// Artifact saved; tab released.
    Captured,
    /// Abandoned after an unrecoverable error.
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Initializing => "initializing",
            Self::AwaitingSubmission => "awaiting submission",
            Self::Acknowledging => "acknowledging",
            Self::Captured => "captured",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Delays and bounds used while populating the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTiming {
    /// Pause between typed keys.
    pub typing_delay: Duration,
    /// Wait for the reference field after navigating.
    pub field_timeout: Duration,
    /// Wait for the reference field after a manual reload.
    pub reload_field_timeout: Duration,
    /// Population attempts before a timeout becomes fatal.
    pub populate_attempts: u32,
}

impl Default for SessionTiming {
    fn default() -> Self {
        Self {
            typing_delay: Duration::from_millis(100),
            field_timeout: Duration::from_secs(10),
            reload_field_timeout: Duration::from_secs(15),
            populate_attempts: 2,
        }
    }
}

/// State shared by every session in a pool.
pub struct SessionContext {
    /// Target form.
    pub form: FormProfile,
    /// Population timing.
    pub timing: SessionTiming,
    /// Receives acknowledgment pages.
    pub sink: Arc<dyn CaptureSink>,
}

// ============================================================================
// SessionSnapshot
// ============================================================================

/// Published view of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Position in the pool.
    pub slot: usize,
    /// Bound work item.
    pub item: WorkItem,
    /// Current state.
    pub state: SessionState,
    /// Current listener epoch.
    pub epoch: ListenerEpoch,
    /// Whether the session still holds its tab.
    pub tab_open: bool,
}

// ============================================================================
// SessionHandle
// ============================================================================

enum SessionInput {
    Event {
        epoch: ListenerEpoch,
        event: PageEvent,
    },
    Rebind {
        item: WorkItem,
        accepted: oneshot::Sender<()>,
    },
    Close {
        done: oneshot::Sender<()>,
    },
}

/// Owner's side of a session.
///
/// Dropping the handle stops the actor without closing the tab.
pub struct SessionHandle {
    input: mpsc::UnboundedSender<SessionInput>,
    snapshot: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    /// Starts a session on `page`: navigates to the entry page and
    /// populates the form in the background.
    pub fn spawn(
        slot: usize,
        page: Arc<dyn Page>,
        item: WorkItem,
        context: Arc<SessionContext>,
    ) -> Self {
        let (input, input_rx) = mpsc::unbounded_channel();
        let initial = SessionSnapshot {
            slot,
            item: item.clone(),
            state: SessionState::Initializing,
            epoch: ListenerEpoch::initial(),
            tab_open: true,
        };
        let (snapshot_tx, snapshot) = watch::channel(initial);

        let session = TabSession {
            slot,
            item,
            state: SessionState::Initializing,
            epoch: ListenerEpoch::initial(),
            page: Some(page),
            stalled: false,
            context,
            events: input.downgrade(),
            snapshot: snapshot_tx,
        };
        tokio::spawn(session.run(input_rx));

        Self { input, snapshot }
    }

    /// Creates a session for a slot whose tab could not be opened.
    #[must_use]
    pub fn failed(slot: usize, item: WorkItem) -> Self {
        let (input, _) = mpsc::unbounded_channel();
        let (_, snapshot) = watch::channel(SessionSnapshot {
            slot,
            item,
            state: SessionState::Failed,
            epoch: ListenerEpoch::initial(),
            tab_open: false,
        });
        Self { input, snapshot }
    }

    /// Returns the latest published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Returns `true` if the session can be rebound in place.
    #[must_use]
    pub fn is_reusable(&self) -> bool {
        self.snapshot.borrow().tab_open && !self.input.is_closed()
    }

    /// Rebinds the tab to `item` and restarts population.
    ///
    /// Waits until the actor has finished its current action and taken the
    /// request. Returns `false` if the session stopped or lost its tab
    /// first.
    pub async fn rebind(&self, item: WorkItem) -> bool {
        let (accepted, taken) = oneshot::channel();
        if self
            .input
            .send(SessionInput::Rebind { item, accepted })
            .is_err()
        {
            return false;
        }
        taken.await.is_ok()
    }

    /// Closes the tab and waits for the session to stop.
    pub async fn close(self) {
        let (done, closed) = oneshot::channel();
        if self.input.send(SessionInput::Close { done }).is_ok() {
            let _ = closed.await;
        }
    }

    /// Waits until a snapshot satisfies `predicate`.
    ///
    /// Returns `None` if the session stops first.
    pub async fn wait_for(
        &self,
        predicate: impl FnMut(&SessionSnapshot) -> bool,
    ) -> Option<SessionSnapshot> {
        let mut snapshot = self.snapshot.clone();
        let matched = snapshot.wait_for(predicate).await.ok()?.clone();
        Some(matched)
    }
}

// ============================================================================
// TabSession
// ============================================================================

struct TabSession {
    slot: usize,
    item: WorkItem,
    state: SessionState,
    epoch: ListenerEpoch,
    page: Option<Arc<dyn Page>>,
    /// Navigation or population timed out; an entry reload retries from `Failed`.
    stalled: bool,
    context: Arc<SessionContext>,
    events: mpsc::WeakUnboundedSender<SessionInput>,
    snapshot: watch::Sender<SessionSnapshot>,
}

impl TabSession {
    async fn run(mut self, mut input: mpsc::UnboundedReceiver<SessionInput>) {
        if let Some(page) = &self.page {
            info!(slot = self.slot, item = %self.item, tab = %page.id(), "Tab opened");
        }
        self.navigate_and_populate().await;

        while self.page.is_some() {
            let Some(message) = input.recv().await else {
                break;
            };

            match message {
                SessionInput::Event { epoch, event } => {
                    if epoch != self.epoch {
                        trace!(
                            slot = self.slot,
                            item = %self.item,
                            %epoch,
                            current = %self.epoch,
                            %event,
                            "Dropped stale event"
                        );
                        continue;
                    }
                    self.on_event(event).await;
                }
                SessionInput::Rebind { item, accepted } => {
                    let _ = accepted.send(());
                    self.rebind(item).await;
                }
                SessionInput::Close { done } => {
                    self.close_tab().await;
                    let _ = done.send(());
                    return;
                }
            }
        }

        if let Some(page) = self.page.take() {
            page.clear_event_handler();
        }
        self.publish();

        // dropping the queued acks refuses every pending rebind
        input.close();
        while let Ok(message) = input.try_recv() {
            if let SessionInput::Rebind { item, .. } = message {
                debug!(slot = self.slot, item = %self.item, refused = %item, "Tab gone, rebind refused");
            }
        }
    }

    // ========================================================================
    // Events
    // ========================================================================

    async fn on_event(&mut self, event: PageEvent) {
        match event {
            PageEvent::Closed => {
                warn!(slot = self.slot, item = %self.item, "Tab closed outside the controller");
                self.page = None;
                self.set_state(SessionState::Failed);
            }
            PageEvent::Navigated { url } if self.stalled && self.context.form.is_entry(&url) => {
                info!(slot = self.slot, item = %self.item, "Form reloaded, retrying population");
                let timeout = self.context.timing.reload_field_timeout;
                self.populate_and_arm(timeout).await;
            }
            event if self.state != SessionState::AwaitingSubmission => {
                trace!(slot = self.slot, item = %self.item, state = %self.state, %event, "Ignored event");
            }
            PageEvent::Dialog { message } => self.on_dialog(message).await,
            PageEvent::Navigated { url } => self.on_navigated(url).await,
        }
    }

    async fn on_dialog(&mut self, message: String) {
        let Some(page) = self.page.clone() else {
            return;
        };
        if let Err(e) = page.dismiss_dialog().await {
            warn!(slot = self.slot, item = %self.item, error = %e, "Could not dismiss dialog");
        }

        if self.context.form.is_incorrect_captcha(&message) {
            info!(slot = self.slot, item = %self.item, "Incorrect CAPTCHA, reloading form");
            self.navigate_and_populate().await;
        } else {
            warn!(slot = self.slot, item = %self.item, message = %message, "Dialog dismissed");
        }
    }

    async fn on_navigated(&mut self, url: String) {
        let form = &self.context.form;
        if form.is_acknowledgment(&url) {
            self.acknowledge(url).await;
        } else if form.is_entry(&url) {
            info!(slot = self.slot, item = %self.item, "Form reloaded, re-inserting reference");
            let timeout = self.context.timing.reload_field_timeout;
            self.populate_and_arm(timeout).await;
        } else {
            debug!(slot = self.slot, item = %self.item, url = %url, "Ignored navigation");
        }
    }

    async fn rebind(&mut self, item: WorkItem) {
        debug!(slot = self.slot, from = %self.item, to = %item, "Rebinding tab");
        self.item = item;
        self.navigate_and_populate().await;
    }

    // ========================================================================
    // Actions
    // ========================================================================

    /// Loads the entry page under a fresh epoch, then populates the form.
    ///
    /// The navigation's own `Navigated` echo carries the previous epoch and
    /// is dropped.
    async fn navigate_and_populate(&mut self) {
        let Some(page) = self.page.clone() else {
            return;
        };
        self.epoch = self.epoch.next();
        self.stalled = false;
        self.set_state(SessionState::Initializing);

        let navigated = page.goto(self.context.form.entry_url()).await;
        self.arm(page.as_ref());
        if let Err(e) = navigated {
            self.stalled = e.is_recoverable();
            self.fail("Navigation", &e);
            return;
        }

        let timeout = self.context.timing.field_timeout;
        self.populate_and_arm(timeout).await;
    }

    /// Populates the reference field, retrying recoverable failures.
    async fn populate_and_arm(&mut self, field_timeout: Duration) {
        let Some(page) = self.page.clone() else {
            return;
        };
        self.stalled = false;
        self.set_state(SessionState::Initializing);

        let attempts = self.context.timing.populate_attempts.max(1);
        for attempt in 1..=attempts {
            match self.populate(page.as_ref(), field_timeout).await {
                Ok(()) => {
                    info!(slot = self.slot, item = %self.item, "Reference inserted, waiting for CAPTCHA");
                    self.set_state(SessionState::AwaitingSubmission);
                    return;
                }
                Err(e) if e.is_recoverable() && attempt < attempts => {
                    warn!(
                        slot = self.slot,
                        item = %self.item,
                        attempt,
                        error = %e,
                        "Population failed, retrying"
                    );
                }
                Err(e) => {
                    self.stalled = e.is_recoverable();
                    self.fail("Population", &e);
                    return;
                }
            }
        }
    }

    /// Types the reference with the CAPTCHA and submit controls disabled.
    ///
    /// The controls stay disabled if any step fails.
    async fn populate(&self, page: &dyn Page, field_timeout: Duration) -> Result<()> {
        let form = &self.context.form;
        let field = form.reference_field();

        page.wait_for_selector(field, field_timeout).await?;
        page.evaluate(&form.controls_script(true)).await?;

        let cleared = page.evaluate(&form.clear_field_script()).await?;
        if cleared.as_bool() == Some(false) {
            return Err(Error::script_error(format!("{field} disappeared")));
        }

        page.type_text(field, self.item.as_str(), self.context.timing.typing_delay)
            .await?;
        page.evaluate(&form.controls_script(false)).await?;
        Ok(())
    }

    /// Captures the acknowledgment page and releases the tab.
    async fn acknowledge(&mut self, url: String) {
        let Some(page) = self.page.clone() else {
            return;
        };
        info!(slot = self.slot, item = %self.item, url = %url, "Acknowledgment page loaded");

        page.clear_event_handler();
        self.epoch = self.epoch.next();
        self.set_state(SessionState::Acknowledging);

        match self.context.sink.capture(page.as_ref(), &self.item).await {
            Ok(path) => {
                if let Err(e) = page.close().await {
                    warn!(slot = self.slot, item = %self.item, error = %e, "Could not close tab");
                }
                self.page = None;
                self.set_state(SessionState::Captured);
                info!(slot = self.slot, item = %self.item, path = %path.display(), "Captured, tab closed");
            }
            Err(e) => {
                // keep watching for an external close
                self.arm(page.as_ref());
                self.fail("Capture", &e);
            }
        }
    }

    async fn close_tab(&mut self) {
        if let Some(page) = self.page.take() {
            page.clear_event_handler();
            if let Err(e) = page.close().await {
                warn!(slot = self.slot, item = %self.item, error = %e, "Could not close tab");
            }
            debug!(slot = self.slot, item = %self.item, "Tab closed");
        }
        self.publish();
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Installs the event handler for the current epoch, replacing any
    /// previous one.
    fn arm(&self, page: &dyn Page) {
        let events = self.events.clone();
        let epoch = self.epoch;
        page.set_event_handler(Box::new(move |event| {
            if let Some(events) = events.upgrade() {
                let _ = events.send(SessionInput::Event { epoch, event });
            }
        }));
    }

    fn fail(&mut self, stage: &str, err: &Error) {
        error!(slot = self.slot, item = %self.item, error = %err, "{stage} failed");
        self.set_state(SessionState::Failed);
    }

    fn set_state(&mut self, state: SessionState) {
        self.state = state;
        self.publish();
    }

    fn publish(&self) {
        self.snapshot.send_replace(SessionSnapshot {
            slot: self.slot,
            item: self.item.clone(),
            state: self.state,
            epoch: self.epoch,
            tab_open: self.page.is_some(),
        });
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::controller::form::DEFAULT_ENTRY_URL;
    use crate::controller::testing::{Call, FakePage, FakeSink};

    const ACK_URL: &str = "https://www.sngpl.com.pk/onlineapp/pages/acknowledge.jsp";

    fn context(sink: Arc<FakeSink>) -> Arc<SessionContext> {
        Arc::new(SessionContext {
            form: FormProfile::default(),
            timing: SessionTiming::default(),
            sink,
        })
    }

    fn start(page: &Arc<FakePage>, id: &str, sink: &Arc<FakeSink>) -> SessionHandle {
        let page: Arc<dyn Page> = page.clone();
        SessionHandle::spawn(0, page, WorkItem::new(id), context(Arc::clone(sink)))
    }

    /// Lets every ready task run until the runtime is idle.
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    fn position(calls: &[Call], pred: impl Fn(&Call) -> bool) -> usize {
        calls.iter().position(pred).expect("call recorded")
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_population_disables_controls_while_typing() {
        let page = FakePage::new("p0");
        let sink = FakeSink::new();
        let session = start(&page, "1001", &sink);
        settle().await;

        let snapshot = session.snapshot();
        assert_eq!(snapshot.state, SessionState::AwaitingSubmission);
        assert!(snapshot.tab_open);

        let calls = page.calls();
        assert_eq!(calls[0], Call::Goto(DEFAULT_ENTRY_URL.to_string()));
        assert_eq!(calls[1], Call::WaitFor("#refNo".to_string()));

        let disabled = position(&calls, |c| {
            matches!(c, Call::Evaluate(s) if s.contains("disabled = true"))
        });
        let typed = position(&calls, |c| matches!(c, Call::Type { .. }));
        let enabled = position(&calls, |c| {
            matches!(c, Call::Evaluate(s) if s.contains("disabled = false"))
        });
        assert!(disabled < typed && typed < enabled);
        assert_eq!(page.typed(), ["1001"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_incorrect_captcha_renavigates_once() {
        let page = FakePage::new("p0");
        let sink = FakeSink::new();
        let session = start(&page, "1001", &sink);
        settle().await;
        let before = session.snapshot().epoch;

        page.emit(PageEvent::Dialog {
            message: "Incorrect Captcha Code".to_string(),
        });
        settle().await;

        assert_eq!(page.count(|c| *c == Call::DismissDialog), 1);
        assert_eq!(page.gotos(), 2);
        assert_eq!(page.typed(), ["1001", "1001"]);
        let after = session.snapshot();
        assert_eq!(after.state, SessionState::AwaitingSubmission);
        assert!(after.epoch > before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_dialog_changes_nothing() {
        let page = FakePage::new("p0");
        let sink = FakeSink::new();
        let session = start(&page, "1001", &sink);
        settle().await;
        let before = session.snapshot();

        page.emit(PageEvent::Dialog {
            message: "Server busy, try later".to_string(),
        });
        settle().await;

        assert_eq!(page.count(|c| *c == Call::DismissDialog), 1);
        assert_eq!(page.gotos(), 1);
        assert_eq!(page.typed().len(), 1);
        assert_eq!(session.snapshot(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_reload_repopulates_without_navigating() {
        let page = FakePage::new("p0");
        let sink = FakeSink::new();
        let session = start(&page, "1001", &sink);
        settle().await;

        page.emit(PageEvent::Navigated {
            url: format!("{DEFAULT_ENTRY_URL}?reload=1"),
        });
        settle().await;

        assert_eq!(page.gotos(), 1);
        assert_eq!(page.typed(), ["1001", "1001"]);
        assert_eq!(session.snapshot().state, SessionState::AwaitingSubmission);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acknowledgment_captures_once_and_closes_tab() {
        let page = FakePage::new("p0");
        let sink = FakeSink::new();
        let session = start(&page, "1001", &sink);
        settle().await;

        for _ in 0..2 {
            page.emit(PageEvent::Navigated {
                url: ACK_URL.to_string(),
            });
        }
        settle().await;

        assert_eq!(sink.captured(), [WorkItem::new("1001")]);
        assert!(page.is_closed());
        assert!(!page.has_handler());
        let snapshot = session.snapshot();
        assert_eq!(snapshot.state, SessionState::Captured);
        assert!(!snapshot.tab_open);
        assert!(!session.is_reusable());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_epoch_event_is_ignored_after_rebind() {
        let page = FakePage::new("p0");
        let sink = FakeSink::new();
        let session = start(&page, "1001", &sink);
        settle().await;

        // queued behind the rebind through the pre-rebind handler
        let (rebound, ()) = tokio::join!(session.rebind(WorkItem::new("2002")), async {
            page.emit(PageEvent::Navigated {
                url: ACK_URL.to_string(),
            });
        });
        settle().await;

        assert!(rebound);

        assert!(sink.captured().is_empty());
        let snapshot = session.snapshot();
        assert_eq!(snapshot.item, WorkItem::new("2002"));
        assert_eq!(snapshot.state, SessionState::AwaitingSubmission);
        assert_eq!(page.typed(), ["1001", "2002"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_capture_failure_leaves_tab_open() {
        let page = FakePage::new("p0");
        let sink = FakeSink::new();
        sink.fail(true);
        let session = start(&page, "1001", &sink);
        settle().await;

        page.emit(PageEvent::Navigated {
            url: ACK_URL.to_string(),
        });
        settle().await;

        let snapshot = session.snapshot();
        assert_eq!(snapshot.state, SessionState::Failed);
        assert!(snapshot.tab_open);
        assert!(!page.is_closed());

        page.emit(PageEvent::Dialog {
            message: "incorrect".to_string(),
        });
        settle().await;
        assert_eq!(page.count(|c| *c == Call::DismissDialog), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_populate_retries_one_timeout() {
        let page = FakePage::new("p0");
        page.fail_waits(1);
        let sink = FakeSink::new();
        let session = start(&page, "1001", &sink);
        settle().await;

        assert_eq!(session.snapshot().state, SessionState::AwaitingSubmission);
        assert_eq!(page.count(|c| matches!(c, Call::WaitFor(_))), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_populate_fails_after_attempts_exhausted() {
        let page = FakePage::new("p0");
        page.fail_waits(2);
        let sink = FakeSink::new();
        let session = start(&page, "1001", &sink);
        settle().await;

        let snapshot = session.snapshot();
        assert_eq!(snapshot.state, SessionState::Failed);
        assert!(snapshot.tab_open);
        assert!(page.typed().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_population_script_error_is_not_retried() {
        let page = FakePage::new("p0");
        page.push_eval(json!(true));
        page.push_eval(json!(false));
        let sink = FakeSink::new();
        let session = start(&page, "1001", &sink);
        settle().await;

        assert_eq!(session.snapshot().state, SessionState::Failed);
        assert_eq!(page.count(|c| matches!(c, Call::WaitFor(_))), 1);
        assert!(
            !page
                .calls()
                .iter()
                .any(|c| matches!(c, Call::Evaluate(s) if s.contains("disabled = false")))
        );

        // not a timeout, so a reload does not revive it
        page.emit(PageEvent::Navigated {
            url: DEFAULT_ENTRY_URL.to_string(),
        });
        settle().await;
        assert_eq!(session.snapshot().state, SessionState::Failed);
        assert_eq!(page.count(|c| matches!(c, Call::WaitFor(_))), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reload_after_timed_out_reload_repopulates() {
        let page = FakePage::new("p0");
        let sink = FakeSink::new();
        let session = start(&page, "1001", &sink);
        settle().await;

        page.fail_waits(2);
        page.emit(PageEvent::Navigated {
            url: DEFAULT_ENTRY_URL.to_string(),
        });
        settle().await;
        assert_eq!(session.snapshot().state, SessionState::Failed);
        assert_eq!(page.typed(), ["1001"]);

        page.emit(PageEvent::Navigated {
            url: DEFAULT_ENTRY_URL.to_string(),
        });
        settle().await;

        assert_eq!(page.gotos(), 1);
        assert_eq!(page.typed(), ["1001", "1001"]);
        assert_eq!(session.snapshot().state, SessionState::AwaitingSubmission);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_session_ignores_other_events() {
        let page = FakePage::new("p0");
        page.fail_waits(2);
        let sink = FakeSink::new();
        let session = start(&page, "1001", &sink);
        settle().await;
        assert_eq!(session.snapshot().state, SessionState::Failed);

        page.emit(PageEvent::Dialog {
            message: "incorrect".to_string(),
        });
        page.emit(PageEvent::Navigated {
            url: ACK_URL.to_string(),
        });
        settle().await;

        assert_eq!(page.count(|c| *c == Call::DismissDialog), 0);
        assert!(sink.captured().is_empty());
        assert_eq!(session.snapshot().state, SessionState::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rebind_queued_before_external_close_is_refused() {
        let page = FakePage::new("p0");
        let sink = FakeSink::new();
        let session = start(&page, "1001", &sink);
        settle().await;

        page.emit(PageEvent::Closed);
        let rebound = session.rebind(WorkItem::new("2002")).await;

        assert!(!rebound);
        let snapshot = session.snapshot();
        assert_eq!(snapshot.item, WorkItem::new("1001"));
        assert!(!snapshot.tab_open);
        assert_eq!(page.typed(), ["1001"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigation_failure_marks_failed() {
        let page = FakePage::new("p0");
        page.fail_goto(true);
        let sink = FakeSink::new();
        let session = start(&page, "1001", &sink);
        settle().await;

        assert_eq!(session.snapshot().state, SessionState::Failed);
        assert!(page.has_handler());
    }

    #[tokio::test(start_paused = true)]
    async fn test_external_close_releases_tab() {
        let page = FakePage::new("p0");
        let sink = FakeSink::new();
        let session = start(&page, "1001", &sink);
        settle().await;

        page.emit(PageEvent::Closed);
        settle().await;

        let snapshot = session.snapshot();
        assert_eq!(snapshot.state, SessionState::Failed);
        assert!(!snapshot.tab_open);
        assert!(!session.is_reusable());
        assert!(!session.rebind(WorkItem::new("2002")).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_releases_tab_without_capture() {
        let page = FakePage::new("p0");
        let sink = FakeSink::new();
        let session = start(&page, "1001", &sink);
        settle().await;

        session.close().await;

        assert!(page.is_closed());
        assert!(!page.has_handler());
        assert!(sink.captured().is_empty());
    }

    #[tokio::test]
    async fn test_failed_placeholder() {
        let session = SessionHandle::failed(3, WorkItem::new("x"));
        let snapshot = session.snapshot();
        assert_eq!(snapshot.slot, 3);
        assert_eq!(snapshot.state, SessionState::Failed);
        assert!(!session.is_reusable());
        assert!(!session.rebind(WorkItem::new("y")).await);
        session.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_state() {
        let page = FakePage::new("p0");
        let sink = FakeSink::new();
        let session = start(&page, "1001", &sink);

        let snapshot = session
            .wait_for(|s| s.state == SessionState::AwaitingSubmission)
            .await
            .expect("session running");
        assert_eq!(snapshot.item, WorkItem::new("1001"));
    }
}
