//! In-memory engine for controller tests.
//!
//! [`FakePage`] records every call and delivers events through the
//! installed handler the way a real tab would: `goto` emits a
//! `Navigated` echo before it returns.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::capture::CaptureSink;
use crate::engine::{Browser, Page, PageEvent, PageEventHandler};
use crate::error::{Error, Result};
use crate::source::{WorkItem, WorkItemSource};

// ============================================================================
// Call
// ============================================================================

/// One recorded page operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Goto(String),
    WaitFor(String),
    Evaluate(String),
    Type { selector: String, text: String },
    DismissDialog,
    SetViewport(u32, u32),
    PrintPdf,
    Close,
}

// ============================================================================
// FakePage
// ============================================================================

type SharedHandler = Arc<dyn Fn(PageEvent) + Send + Sync>;

pub struct FakePage {
    id: String,
    calls: Mutex<Vec<Call>>,
    handler: Mutex<Option<SharedHandler>>,
    wait_failures: AtomicUsize,
    bounded_eval_failures: AtomicUsize,
    fail_goto: AtomicBool,
    fail_print: AtomicBool,
    eval_results: Mutex<VecDeque<Value>>,
    closed: AtomicBool,
}

impl FakePage {
    pub fn new(id: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            id: id.into(),
            calls: Mutex::new(Vec::new()),
            handler: Mutex::new(None),
            wait_failures: AtomicUsize::new(0),
            bounded_eval_failures: AtomicUsize::new(0),
            fail_goto: AtomicBool::new(false),
            fail_print: AtomicBool::new(false),
            eval_results: Mutex::new(VecDeque::new()),
            closed: AtomicBool::new(false),
        })
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| pred(c)).count()
    }

    pub fn gotos(&self) -> usize {
        self.count(|c| matches!(c, Call::Goto(_)))
    }

    pub fn typed(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                Call::Type { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn has_handler(&self) -> bool {
        self.handler.lock().is_some()
    }

    /// Makes the next `n` selector waits time out.
    pub fn fail_waits(&self, n: usize) {
        self.wait_failures.store(n, Ordering::SeqCst);
    }

    /// Makes the next `n` bounded evaluations time out.
    pub fn fail_bounded_evals(&self, n: usize) {
        self.bounded_eval_failures.store(n, Ordering::SeqCst);
    }

    pub fn fail_goto(&self, fail: bool) {
        self.fail_goto.store(fail, Ordering::SeqCst);
    }

    pub fn fail_print(&self, fail: bool) {
        self.fail_print.store(fail, Ordering::SeqCst);
    }

    /// Queues a value for the next `evaluate`; unqueued calls return `true`.
    pub fn push_eval(&self, value: Value) {
        self.eval_results.lock().push_back(value);
    }

    /// Delivers an event through the installed handler, if any.
    pub fn emit(&self, event: PageEvent) {
        let handler = self.handler.lock().clone();
        if let Some(handler) = handler {
            handler(event);
        }
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl Page for FakePage {
    fn id(&self) -> String {
        self.id.clone()
    }

    async fn goto(&self, url: &str) -> Result<()> {
        self.record(Call::Goto(url.to_string()));
        if self.fail_goto.load(Ordering::SeqCst) {
            return Err(Error::protocol("unknown error: navigation failed"));
        }
        self.emit(PageEvent::Navigated {
            url: url.to_string(),
        });
        Ok(())
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()> {
        self.record(Call::WaitFor(selector.to_string()));
        let failing = self
            .wait_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(Error::timeout(
                format!("waiting for {selector}"),
                timeout.as_millis() as u64,
            ));
        }
        Ok(())
    }

    async fn evaluate(&self, expression: &str) -> Result<Value> {
        self.record(Call::Evaluate(expression.to_string()));
        Ok(self
            .eval_results
            .lock()
            .pop_front()
            .unwrap_or(Value::Bool(true)))
    }

    async fn evaluate_within(&self, expression: &str, timeout: Duration) -> Result<Value> {
        let failing = self
            .bounded_eval_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            self.record(Call::Evaluate(expression.to_string()));
            return Err(Error::timeout(
                "evaluating script",
                timeout.as_millis() as u64,
            ));
        }
        self.evaluate(expression).await
    }

    async fn type_text(&self, selector: &str, text: &str, _delay: Duration) -> Result<()> {
        self.record(Call::Type {
            selector: selector.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn dismiss_dialog(&self) -> Result<()> {
        self.record(Call::DismissDialog);
        Ok(())
    }

    async fn set_viewport(&self, width: u32, height: u32) -> Result<()> {
        self.record(Call::SetViewport(width, height));
        Ok(())
    }

    async fn print_pdf(&self) -> Result<Vec<u8>> {
        self.record(Call::PrintPdf);
        if self.fail_print.load(Ordering::SeqCst) {
            return Err(Error::capture("print failed"));
        }
        Ok(b"%PDF-1.4 fake".to_vec())
    }

    async fn close(&self) -> Result<()> {
        self.record(Call::Close);
        self.closed.store(true, Ordering::SeqCst);
        *self.handler.lock() = None;
        Ok(())
    }

    fn set_event_handler(&self, handler: PageEventHandler) {
        *self.handler.lock() = Some(Arc::from(handler));
    }

    fn clear_event_handler(&self) {
        *self.handler.lock() = None;
    }
}

// ============================================================================
// FakeBrowser
// ============================================================================

#[derive(Default)]
pub struct FakeBrowser {
    pages: Mutex<Vec<Arc<FakePage>>>,
    opened_at: Mutex<Vec<Instant>>,
    open_failures: AtomicUsize,
    shut_down: AtomicBool,
}

impl FakeBrowser {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn pages(&self) -> Vec<Arc<FakePage>> {
        self.pages.lock().clone()
    }

    pub fn page(&self, index: usize) -> Arc<FakePage> {
        Arc::clone(&self.pages.lock()[index])
    }

    pub fn opened(&self) -> usize {
        self.pages.lock().len()
    }

    pub fn opened_at(&self) -> Vec<Instant> {
        self.opened_at.lock().clone()
    }

    /// Makes the next `n` opens fail.
    pub fn fail_opens(&self, n: usize) {
        self.open_failures.store(n, Ordering::SeqCst);
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Browser for FakeBrowser {
    async fn open_page(&self) -> Result<Arc<dyn Page>> {
        let failing = self
            .open_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(Error::protocol("unknown error: tab creation failed"));
        }

        let mut pages = self.pages.lock();
        let page = FakePage::new(format!("page-{}", pages.len()));
        pages.push(Arc::clone(&page));
        self.opened_at.lock().push(Instant::now());
        Ok(page)
    }

    async fn shutdown(&self) -> Result<()> {
        self.shut_down.store(true, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// FakeSink / FakeSource
// ============================================================================

#[derive(Default)]
pub struct FakeSink {
    captured: Mutex<Vec<WorkItem>>,
    fail: AtomicBool,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl FakeSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn captured(&self) -> Vec<WorkItem> {
        self.captured.lock().clone()
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Makes every capture wait until the returned `Notify` fires.
    pub fn hold(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock() = Some(Arc::clone(&gate));
        gate
    }
}

#[async_trait]
impl CaptureSink for FakeSink {
    async fn capture(&self, _page: &dyn Page, item: &WorkItem) -> Result<PathBuf> {
        self.captured.lock().push(item.clone());
        let gate = self.gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::capture("disk full"));
        }
        Ok(PathBuf::from(format!("Unknown_{item}.pdf")))
    }
}

/// Source whose list the test replaces between calls.
#[derive(Default)]
pub struct FakeSource {
    items: Mutex<Option<Vec<WorkItem>>>,
    calls: AtomicUsize,
}

impl FakeSource {
    pub fn new(ids: &[&str]) -> Arc<Self> {
        let source = Self::default();
        source.set(ids);
        Arc::new(source)
    }

    pub fn set(&self, ids: &[&str]) {
        *self.items.lock() = Some(items(ids));
    }

    /// Makes every following call fail.
    pub fn break_source(&self) {
        *self.items.lock() = None;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WorkItemSource for FakeSource {
    async fn current_items(&self) -> Result<Vec<WorkItem>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.items
            .lock()
            .clone()
            .ok_or_else(|| Error::source("refs.csv", "unreadable"))
    }
}

pub fn items(ids: &[&str]) -> Vec<WorkItem> {
    ids.iter().map(|id| WorkItem::new(*id)).collect()
}
