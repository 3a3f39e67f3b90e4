//! Acknowledgment capture.
//!
//! A [`CaptureSink`] turns a loaded acknowledgment page into a persisted
//! artifact. [`PdfArchive`] prints the page to PDF and stores it as
//! `<label>_<identifier>.pdf`, where the label is the customer name read
//! from the acknowledgment table.

// ============================================================================
// Imports
// ============================================================================

use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, info};

use crate::engine::{Page, json_string};
use crate::error::{Error, Result};
use crate::source::WorkItem;

// ============================================================================
// Constants
// ============================================================================

/// Label used when the page yields no usable name.
pub const FALLBACK_LABEL: &str = "Unknown";

/// Characters that are not allowed in file names on common platforms.
static ILLEGAL_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[<>:"/\\|?*]+"#).expect("invalid illegal-chars regex"));

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("invalid whitespace regex"));

/// Resolves once every image has loaded or failed.
const IMAGES_SCRIPT: &str = r#"Promise.all(Array.from(document.images)
    .filter((img) => !img.complete)
    .map((img) => new Promise((resolve) => { img.onload = img.onerror = resolve; })))
    .then(() => true)"#;

// ============================================================================
// CaptureSink
// ============================================================================

/// Persists the acknowledgment page for one work item.
#[async_trait]
pub trait CaptureSink: Send + Sync {
    /// Captures `page` and returns where the artifact was written.
    async fn capture(&self, page: &dyn Page, item: &WorkItem) -> Result<PathBuf>;
}

// ============================================================================
// CaptureSettings
// ============================================================================

/// Page preparation applied before printing.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureSettings {
    /// Bound on waiting for the body and its images.
    pub page_timeout: Duration,
    /// Viewport width and height in CSS pixels.
    pub viewport: (u32, u32),
    /// CSS zoom applied to `body`.
    pub zoom: f64,
    /// Text identifying the table row that holds the label.
    pub label_row: String,
    /// Table containing the label row.
    pub table_selector: String,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            page_timeout: Duration::from_secs(60),
            viewport: (1200, 1024),
            zoom: 0.8,
            label_row: "Customer Name".to_string(),
            table_selector: "form#acknowledgeform table".to_string(),
        }
    }
}

// ============================================================================
// PdfArchive
// ============================================================================

/// Writes acknowledgment PDFs into one directory.
#[derive(Debug, Clone)]
pub struct PdfArchive {
    output_dir: PathBuf,
    settings: CaptureSettings,
}

impl PdfArchive {
    /// Creates an archive rooted at `output_dir`.
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>, settings: CaptureSettings) -> Self {
        Self {
            output_dir: output_dir.into(),
            settings,
        }
    }

    /// Returns the output directory.
    #[inline]
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Prepares the page for printing and returns its label.
    async fn prepare(&self, page: &dyn Page) -> Result<String> {
        let settings = &self.settings;
        let timeout_ms = settings.page_timeout.as_millis() as u64;

        page.wait_for_selector("body", settings.page_timeout).await?;

        page
            .evaluate_within(IMAGES_SCRIPT, settings.page_timeout)
            .await
            .map_err(|e| match e {
                Error::Timeout { .. } => Error::timeout("waiting for images", timeout_ms),
                other => other,
            })?;

        let (width, height) = settings.viewport;
        page.set_viewport(width, height).await?;
        page.evaluate(&zoom_script(settings.zoom)).await?;

        let label = page
            .evaluate(&label_script(&settings.table_selector, &settings.label_row))
            .await?;
        Ok(label.as_str().unwrap_or_default().to_string())
    }
}

#[async_trait]
impl CaptureSink for PdfArchive {
    async fn capture(&self, page: &dyn Page, item: &WorkItem) -> Result<PathBuf> {
        let label = self.prepare(page).await?;
        debug!(item = %item, label = %label, "Printing acknowledgment page");

        let pdf = page.print_pdf().await?;
        if pdf.is_empty() {
            return Err(Error::capture("print returned an empty document"));
        }

        tokio::fs::create_dir_all(&self.output_dir).await?;
        let path = self.output_dir.join(artifact_file_name(&label, item));
        tokio::fs::write(&path, &pdf).await?;

        info!(item = %item, path = %path.display(), bytes = pdf.len(), "Saved acknowledgment PDF");
        Ok(path)
    }
}

// ============================================================================
// Naming
// ============================================================================

/// Makes `label` safe for a file name.
///
/// Illegal characters are removed and whitespace runs become `_`. An empty
/// result becomes [`FALLBACK_LABEL`].
#[must_use]
pub fn sanitize_label(label: &str) -> String {
    let stripped = ILLEGAL_CHARS.replace_all(label.trim(), "");
    let joined = WHITESPACE.replace_all(stripped.trim(), "_");
    if joined.is_empty() {
        FALLBACK_LABEL.to_string()
    } else {
        joined.into_owned()
    }
}

/// Returns `<label>_<identifier>.pdf`.
#[must_use]
pub fn artifact_file_name(label: &str, item: &WorkItem) -> String {
    let id = ILLEGAL_CHARS.replace_all(item.as_str(), "");
    let id = WHITESPACE.replace_all(&id, "_");
    format!("{}_{}.pdf", sanitize_label(label), id)
}

// ============================================================================
// Scripts
// ============================================================================

fn zoom_script(zoom: f64) -> String {
    format!(
        "document.body.style.zoom = {}",
        json_string(&zoom.to_string())
    )
}

/// Reads the first cell of the last row mentioning `row_marker`.
fn label_script(table_selector: &str, row_marker: &str) -> String {
    format!(
        r#"(() => {{
            const table = document.querySelector({table});
            if (!table) return "";
            let label = "";
            for (const tr of table.querySelectorAll("tr")) {{
                if (!tr.innerText.includes({marker})) continue;
                const td = tr.querySelector("td");
                if (td) label = td.innerText.trim();
            }}
            return label;
        }})()"#,
        table = json_string(table_selector),
        marker = json_string(row_marker)
    )
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::{Value, json};
    use tempfile::TempDir;

    use crate::controller::testing::{Call, FakePage};

    #[test]
    fn test_sanitize_label() {
        assert_eq!(sanitize_label("MUHAMMAD  ALI KHAN"), "MUHAMMAD_ALI_KHAN");
        assert_eq!(sanitize_label(r#"A/B:C*"D"#), "ABCD");
        assert_eq!(sanitize_label("  \t "), "Unknown");
        assert_eq!(sanitize_label("???"), "Unknown");
    }

    #[test]
    fn test_artifact_file_name() {
        let item = WorkItem::new("12 345/67");
        assert_eq!(artifact_file_name("Ali Khan", &item), "Ali_Khan_12_34567.pdf");
        assert_eq!(
            artifact_file_name("", &WorkItem::new("999")),
            "Unknown_999.pdf"
        );
    }

    #[test]
    fn test_label_script_quotes_inputs() {
        let script = label_script("form#acknowledgeform table", "Customer \"Name\"");
        assert!(script.contains(r#"document.querySelector("form#acknowledgeform table")"#));
        assert!(script.contains(r#"includes("Customer \"Name\"")"#));
    }

    #[tokio::test]
    async fn test_capture_writes_named_pdf() {
        let dir = TempDir::new().expect("temp dir");
        let output = dir.path().join("out");
        let archive = PdfArchive::new(&output, CaptureSettings::default());

        let page = FakePage::new("ack");
        page.push_eval(json!(true));
        page.push_eval(Value::Null);
        page.push_eval(json!("Sara Bibi"));

        let path = archive
            .capture(page.as_ref(), &WorkItem::new("0412"))
            .await
            .expect("capture");

        assert_eq!(path, output.join("Sara_Bibi_0412.pdf"));
        assert_eq!(std::fs::read(&path).expect("read pdf"), b"%PDF-1.4 fake");

        let calls = page.calls();
        assert_eq!(calls[0], Call::WaitFor("body".to_string()));
        assert!(calls.contains(&Call::SetViewport(1200, 1024)));
        assert_eq!(calls.last(), Some(&Call::PrintPdf));
    }

    #[tokio::test]
    async fn test_capture_without_label_uses_fallback() {
        let dir = TempDir::new().expect("temp dir");
        let archive = PdfArchive::new(dir.path(), CaptureSettings::default());

        let page = FakePage::new("ack");
        page.push_eval(json!(true));
        page.push_eval(Value::Null);
        page.push_eval(json!(""));

        let path = archive
            .capture(page.as_ref(), &WorkItem::new("7"))
            .await
            .expect("capture");
        assert!(path.ends_with("Unknown_7.pdf"));
    }

    #[tokio::test]
    async fn test_capture_body_timeout_fails_without_printing() {
        let dir = TempDir::new().expect("temp dir");
        let archive = PdfArchive::new(dir.path(), CaptureSettings::default());

        let page = FakePage::new("ack");
        page.fail_waits(1);

        let err = archive
            .capture(page.as_ref(), &WorkItem::new("7"))
            .await
            .expect_err("timeout");
        assert!(err.is_timeout());
        assert_eq!(page.count(|c| *c == Call::PrintPdf), 0);
    }

    #[tokio::test]
    async fn test_capture_print_failure_propagates() {
        let dir = TempDir::new().expect("temp dir");
        let archive = PdfArchive::new(dir.path(), CaptureSettings::default());

        let page = FakePage::new("ack");
        page.fail_print(true);

        let err = archive
            .capture(page.as_ref(), &WorkItem::new("7"))
            .await
            .expect_err("print fails");
        assert!(matches!(err, Error::Capture { .. }));
    }

    #[tokio::test]
    async fn test_image_wait_uses_page_timeout() {
        let dir = TempDir::new().expect("temp dir");
        let settings = CaptureSettings {
            page_timeout: Duration::from_secs(90),
            ..CaptureSettings::default()
        };
        let archive = PdfArchive::new(dir.path(), settings);

        let page = FakePage::new("ack");
        page.fail_bounded_evals(1);

        let err = archive
            .capture(page.as_ref(), &WorkItem::new("7"))
            .await
            .expect_err("images never load");
        assert!(matches!(
            err,
            Error::Timeout {
                ref operation,
                timeout_ms: 90_000,
            } if operation == "waiting for images"
        ));
        assert_eq!(page.count(|c| *c == Call::PrintPdf), 0);
    }
}
