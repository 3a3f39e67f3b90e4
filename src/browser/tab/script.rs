//! JavaScript evaluation and selector waits.

use std::time::Duration;

use serde_json::{Map, Value};
use tracing::debug;

use crate::engine::json_string;
use crate::error::{Error, Result};
use crate::protocol::{Command, ScriptCommand, ScriptTarget};

use super::Tab;

// ============================================================================
// Constants
// ============================================================================

/// Extra time granted to the command beyond the in-page wait.
const WAIT_SLACK: Duration = Duration::from_secs(5);

// ============================================================================
// Tab - Script Execution
// ============================================================================

impl Tab {
    /// Evaluates an expression in the page's main realm.
    ///
    /// Promises are awaited. The result is deserialized into JSON; values
    /// with no JSON form (functions, nodes, `undefined`) become `null`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ScriptError`] if the expression throws.
    pub async fn evaluate(&self, expression: &str) -> Result<Value> {
        self.evaluate_with_timeout(expression, None).await
    }

    /// Evaluates an expression whose promise may take up to `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`] if the promise has not settled in time.
    pub async fn evaluate_within(&self, expression: &str, timeout: Duration) -> Result<Value> {
        self.evaluate_with_timeout(expression, Some(timeout))
            .await
            .map_err(|e| bounded_timeout(e, timeout))
    }

    /// Waits until `selector` matches an element, using a MutationObserver
    /// in the page.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`] if nothing matches within `timeout`.
    pub async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()> {
        debug!(
            context = %self.inner.context,
            selector = %selector,
            timeout_ms = timeout.as_millis() as u64,
            "Waiting for selector"
        );

        let script = wait_for_selector_script(selector, timeout);
        let found = self
            .evaluate_with_timeout(&script, Some(timeout + WAIT_SLACK))
            .await?;

        if found.as_bool() == Some(true) {
            Ok(())
        } else {
            Err(Error::timeout(
                format!("waiting for {selector}"),
                timeout.as_millis() as u64,
            ))
        }
    }

    async fn evaluate_with_timeout(
        &self,
        expression: &str,
        timeout: Option<Duration>,
    ) -> Result<Value> {
        debug!(context = %self.inner.context, script_len = expression.len(), "Evaluating script");

        let command = Command::Script(ScriptCommand::Evaluate {
            expression: expression.to_string(),
            target: ScriptTarget {
                context: self.inner.context.clone(),
            },
            await_promise: true,
            result_ownership: "none".to_string(),
        });

        let result = match timeout {
            Some(timeout) => self.send_command_with_timeout(command, timeout).await?,
            None => self.send_command(command).await?,
        };

        evaluate_result_to_json(&result)
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Reports an expired command deadline as a page timeout.
fn bounded_timeout(err: Error, timeout: Duration) -> Error {
    match err {
        Error::RequestTimeout { .. } => {
            Error::timeout("evaluating script", timeout.as_millis() as u64)
        }
        other => other,
    }
}

/// Builds the in-page wait for `selector`.
fn wait_for_selector_script(selector: &str, timeout: Duration) -> String {
    format!(
        r#"new Promise((resolve) => {{
            const selector = {selector};
            if (document.querySelector(selector)) {{ resolve(true); return; }}
            const observer = new MutationObserver(() => {{
                if (document.querySelector(selector)) {{
                    observer.disconnect();
                    clearTimeout(timer);
                    resolve(true);
                }}
            }});
            observer.observe(document.documentElement || document, {{ childList: true, subtree: true }});
            const timer = setTimeout(() => {{ observer.disconnect(); resolve(false); }}, {ms});
        }})"#,
        selector = json_string(selector),
        ms = timeout.as_millis()
    )
}

/// Unwraps a `script.evaluate` result.
fn evaluate_result_to_json(result: &Value) -> Result<Value> {
    match result.get("type").and_then(Value::as_str) {
        Some("success") => Ok(result.get("result").map(remote_value_to_json).unwrap_or(Value::Null)),
        Some("exception") => {
            let text = result
                .get("exceptionDetails")
                .and_then(|d| d.get("text"))
                .and_then(Value::as_str)
                .unwrap_or("uncaught exception");
            Err(Error::script_error(text))
        }
        _ => Err(Error::protocol("Unexpected script.evaluate result")),
    }
}

/// Converts a BiDi `RemoteValue` to plain JSON.
fn remote_value_to_json(remote: &Value) -> Value {
    let value = remote.get("value");

    match remote.get("type").and_then(Value::as_str) {
        Some("string" | "boolean") => value.cloned().unwrap_or(Value::Null),
        // NaN, Infinity and -0 arrive as strings
        Some("number") => value.filter(|v| v.is_number()).cloned().unwrap_or(Value::Null),
        Some("bigint") => value
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<i64>().ok())
            .map(Value::from)
            .unwrap_or(Value::Null),
        Some("array" | "set") => Value::Array(
            value
                .and_then(Value::as_array)
                .map(|items| items.iter().map(remote_value_to_json).collect())
                .unwrap_or_default(),
        ),
        Some("object" | "map") => {
            let mut map = Map::new();
            for entry in value.and_then(Value::as_array).into_iter().flatten() {
                let Some(pair) = entry.as_array() else {
                    continue;
                };
                let (Some(key), Some(item)) = (pair.first(), pair.get(1)) else {
                    continue;
                };
                let key = match key {
                    Value::String(s) => s.clone(),
                    other => match remote_value_to_json(other) {
                        Value::String(s) => s,
                        v => v.to_string(),
                    },
                };
                map.insert(key, remote_value_to_json(item));
            }
            Value::Object(map)
        }
        _ => Value::Null,
    }
}

// ============================================================================
// Tests
// ============================================================================
