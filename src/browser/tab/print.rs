//! Viewport control and PDF rendering.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as Base64Standard;
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::protocol::{BrowsingContextCommand, Command, PrintPage, Viewport};

use super::Tab;

impl Tab {
    /// Resizes the viewport at device pixel ratio 1.
    pub async fn set_viewport(&self, width: u32, height: u32) -> Result<()> {
        debug!(context = %self.inner.context, width, height, "Setting viewport");

        self.send_command(Command::BrowsingContext(BrowsingContextCommand::SetViewport {
            context: self.inner.context.clone(),
            viewport: Viewport { width, height },
            device_pixel_ratio: 1.0,
        }))
        .await?;
        Ok(())
    }

    /// Prints the document to an A4 portrait PDF with backgrounds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Capture`] if Firefox returns no usable data.
    pub async fn print_pdf(&self) -> Result<Vec<u8>> {
        debug!(context = %self.inner.context, "Printing to PDF");

        let result = self
            .send_command(Command::BrowsingContext(BrowsingContextCommand::Print {
                context: self.inner.context.clone(),
                background: true,
                orientation: "portrait".to_string(),
                page: PrintPage::A4,
                shrink_to_fit: true,
            }))
            .await?;

        decode_print_result(&result)
    }
}

/// Decodes the base64 `data` field of a `browsingContext.print` result.
fn decode_print_result(result: &Value) -> Result<Vec<u8>> {
    let data = result
        .get("data")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::capture("Print result has no data"))?;

    Base64Standard
        .decode(data)
        .map_err(|e| Error::capture(format!("Invalid PDF payload: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_decode_print_result() {
        let encoded = Base64Standard.encode(b"%PDF-1.7");
        let bytes = decode_print_result(&json!({ "data": encoded })).expect("decode");
        assert_eq!(bytes, b"%PDF-1.7");
    }

    #[test]
    fn test_decode_print_result_rejects_garbage() {
        assert!(decode_print_result(&json!({})).is_err());
        assert!(decode_print_result(&json!({"data": "***"})).is_err());
    }
}
