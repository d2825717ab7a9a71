//! Error types for the reel-browser crate.

use std::time::Duration;

use thiserror::Error;

/// Errors from browser launch, CDP traffic, and screencast capture.
#[derive(Debug, Error)]
pub enum BrowserError {
    /// No Chromium-family binary could be found on this system.
    #[error("no Chromium or Chrome binary found; pass --chrome to point at one")]
    NoBrowserFound,

    /// The browser process could not be started or never announced its
    /// DevTools endpoint.
    #[error("failed to launch browser: {reason}")]
    LaunchFailed { reason: String },

    /// Failed to establish the DevTools WebSocket connection.
    #[error("failed to connect to DevTools at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    /// A CDP command returned an error response.
    #[error("CDP error {code}: {message}")]
    CdpError {
        code: i64,
        message: String,
        data: Option<String>,
    },

    /// A CDP command timed out waiting for its response.
    #[error("CDP command '{method}' timed out after {duration:?}")]
    Timeout { method: String, duration: Duration },

    /// Serialization or unexpected message shape on the wire.
    #[error("CDP protocol error: {detail}")]
    Protocol { detail: String },

    /// JavaScript evaluation threw in the page.
    #[error("JavaScript exception: {message}")]
    JsException { message: String },

    /// The screencast capture could not be written.
    #[error("recording failed: {detail}")]
    Recording { detail: String },
}
