//! Thin page driver over the CDP client.
//!
//! Only what the recording needs: JavaScript evaluation with exception
//! surfacing, replacing the document content, and screencast control.

use serde_json::Value;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::cdp::{CdpClient, CdpEvent};
use crate::error::BrowserError;

/// Driver for a single page target. Clones share one CDP connection, so
/// the recorder can acknowledge frames while the animator evaluates.
#[derive(Clone)]
pub struct PageDriver {
    client: CdpClient,
}

impl PageDriver {
    /// Attach to a page target and enable the Page and Runtime domains.
    ///
    /// Returns the driver plus the page's event stream (screencast frames
    /// arrive there).
    pub async fn attach(
        ws_url: &str,
    ) -> Result<(Self, UnboundedReceiver<CdpEvent>), BrowserError> {
        let (client, events) = CdpClient::connect(ws_url).await?;
        client.enable_domain("Page").await?;
        client.enable_domain("Runtime").await?;
        Ok((Self { client }, events))
    }

    /// Evaluate a JavaScript expression in the page, surfacing thrown
    /// exceptions as [`BrowserError::JsException`].
    pub async fn evaluate(&self, expression: &str) -> Result<Value, BrowserError> {
        let result = self
            .client
            .send_command("Runtime.evaluate", build_evaluate_params(expression))
            .await?;

        if let Some(exception) = result.get("exceptionDetails") {
            let message = exception
                .get("exception")
                .and_then(|e| e.get("description"))
                .and_then(|d| d.as_str())
                .or_else(|| exception.get("text").and_then(|t| t.as_str()))
                .unwrap_or("unknown exception")
                .to_string();
            return Err(BrowserError::JsException { message });
        }

        Ok(result
            .get("result")
            .and_then(|r| r.get("value"))
            .cloned()
            .unwrap_or(Value::Null))
    }

    /// Replace the main frame's document with `html`.
    pub async fn set_content(&self, html: &str) -> Result<(), BrowserError> {
        let tree = self
            .client
            .send_command("Page.getFrameTree", serde_json::json!({}))
            .await?;
        let frame_id = main_frame_id(&tree).ok_or_else(|| BrowserError::Protocol {
            detail: "Page.getFrameTree did not return a main frame id".to_string(),
        })?;

        self.client
            .send_command(
                "Page.setDocumentContent",
                serde_json::json!({ "frameId": frame_id, "html": html }),
            )
            .await?;
        Ok(())
    }

    /// Start the JPEG screencast at the given capture size.
    pub async fn start_screencast(&self, width: u32, height: u32) -> Result<(), BrowserError> {
        self.client
            .send_command("Page.startScreencast", build_screencast_params(width, height))
            .await?;
        Ok(())
    }

    /// Acknowledge a received screencast frame so the browser keeps
    /// sending more.
    pub async fn ack_frame(&self, session_id: i64) -> Result<(), BrowserError> {
        self.client
            .send_command(
                "Page.screencastFrameAck",
                serde_json::json!({ "sessionId": session_id }),
            )
            .await?;
        Ok(())
    }

    /// Stop the screencast.
    pub async fn stop_screencast(&self) -> Result<(), BrowserError> {
        self.client
            .send_command("Page.stopScreencast", serde_json::json!({}))
            .await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Param builders and parsers (pure, for tests)
// ---------------------------------------------------------------------------

/// Build `Runtime.evaluate` parameters.
pub fn build_evaluate_params(expression: &str) -> Value {
    serde_json::json!({
        "expression": expression,
        "returnByValue": true,
        "awaitPromise": true,
    })
}

/// Build `Page.startScreencast` parameters.
pub fn build_screencast_params(width: u32, height: u32) -> Value {
    serde_json::json!({
        "format": "jpeg",
        "quality": 80,
        "maxWidth": width,
        "maxHeight": height,
        "everyNthFrame": 1,
    })
}

/// Extract the main frame id from a `Page.getFrameTree` result.
pub fn main_frame_id(tree: &Value) -> Option<String> {
    tree.get("frameTree")?
        .get("frame")?
        .get("id")?
        .as_str()
        .map(str::to_string)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
