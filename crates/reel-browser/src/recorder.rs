//! Screencast capture while the animation plays.
//!
//! The browser pushes `Page.screencastFrame` events at its own pace, only
//! when the page actually repaints; frames are NOT evenly spaced. Each one
//! is written to disk as a JPEG and logged in a manifest with the
//! browser-reported capture timestamp, so the finalizer can reconstruct
//! real durations afterwards. Every frame must be acknowledged or the
//! browser stops sending more.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine;
use serde_json::Value;
use tokio::sync::{mpsc::UnboundedReceiver, oneshot};

use crate::cdp::CdpEvent;
use crate::error::BrowserError;
use crate::page::PageDriver;

// ---------------------------------------------------------------------------
// Manifest types
// ---------------------------------------------------------------------------

/// One captured frame: the file it was written to and when the browser
/// captured it (seconds since the Unix epoch, from screencast metadata).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FrameRecord {
    pub file: String,
    pub ts: f64,
}

/// Everything the finalizer needs to turn a frame directory into video:
/// the ordered frames and the moment capture stopped, so the last frame's
/// hold time is known.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FrameManifest {
    pub frames: Vec<FrameRecord>,
    pub stopped_at: f64,
}

impl FrameManifest {
    /// Write the manifest as `manifest.json` inside the capture directory.
    pub fn write(&self, capture_dir: &Path) -> Result<(), BrowserError> {
        let json = serde_json::to_string_pretty(self).map_err(|e| BrowserError::Recording {
            detail: format!("failed to serialize manifest: {e}"),
        })?;
        std::fs::write(capture_dir.join("manifest.json"), json).map_err(|e| {
            BrowserError::Recording {
                detail: format!("failed to write manifest: {e}"),
            }
        })
    }

    /// Read `manifest.json` back from a capture directory.
    pub fn load(capture_dir: &Path) -> Result<Self, BrowserError> {
        let path = capture_dir.join("manifest.json");
        let json = std::fs::read_to_string(&path).map_err(|e| BrowserError::Recording {
            detail: format!("failed to read {}: {e}", path.display()),
        })?;
        serde_json::from_str(&json).map_err(|e| BrowserError::Recording {
            detail: format!("malformed manifest {}: {e}", path.display()),
        })
    }
}

// ---------------------------------------------------------------------------
// Frame parsing (pure, for tests)
// ---------------------------------------------------------------------------

/// Decoded `Page.screencastFrame` event parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreencastFrame {
    /// Base64-encoded JPEG payload.
    pub data: String,
    /// Session id the acknowledgement must echo back.
    pub session_id: i64,
    /// Capture time, seconds since the Unix epoch.
    pub timestamp: f64,
}

/// Pull the payload out of a `Page.screencastFrame` event, or `None` if
/// the shape is unexpected.
pub fn parse_screencast_frame(params: &Value) -> Option<ScreencastFrame> {
    Some(ScreencastFrame {
        data: params.get("data")?.as_str()?.to_string(),
        session_id: params.get("sessionId")?.as_i64()?,
        timestamp: params.get("metadata")?.get("timestamp")?.as_f64()?,
    })
}

/// File name for the frame at this index (zero-padded so lexical order is
/// capture order).
pub fn frame_file_name(index: usize) -> String {
    format!("frame-{index:06}.jpg")
}

// ---------------------------------------------------------------------------
// Recorder
// ---------------------------------------------------------------------------

/// Captures screencast frames to a directory for the life of a recording.
///
/// [`Recorder::start`] begins the screencast and spawns the capture task;
/// the animation then plays through the same CDP connection. Commands and
/// frame acknowledgements multiplex cleanly because the driver is shared.
pub struct Recorder {
    driver: PageDriver,
    capture_dir: PathBuf,
    stop_tx: oneshot::Sender<()>,
    task: tokio::task::JoinHandle<Vec<FrameRecord>>,
}

impl Recorder {
    /// Start capturing into `capture_dir` at the given size.
    pub async fn start(
        driver: PageDriver,
        events: UnboundedReceiver<CdpEvent>,
        capture_dir: &Path,
        width: u32,
        height: u32,
    ) -> Result<Self, BrowserError> {
        std::fs::create_dir_all(capture_dir).map_err(|e| BrowserError::Recording {
            detail: format!("failed to create {}: {e}", capture_dir.display()),
        })?;

        driver.start_screencast(width, height).await?;
        tracing::info!(dir = %capture_dir.display(), "screencast started");

        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(capture_loop(
            driver.clone(),
            events,
            capture_dir.to_path_buf(),
            stop_rx,
        ));

        Ok(Self {
            driver,
            capture_dir: capture_dir.to_path_buf(),
            stop_tx,
            task,
        })
    }

    /// Stop capturing and write the manifest. Returns the manifest so the
    /// caller can hand it straight to the finalizer.
    pub async fn stop(self) -> Result<FrameManifest, BrowserError> {
        self.driver.stop_screencast().await?;
        let stopped_at = unix_now();

        // The capture task drains whatever is already queued, then exits.
        let _ = self.stop_tx.send(());
        let frames = self.task.await.map_err(|e| BrowserError::Recording {
            detail: format!("capture task panicked: {e}"),
        })?;

        tracing::info!(frames = frames.len(), "screencast stopped");

        if frames.is_empty() {
            return Err(BrowserError::Recording {
                detail: "no screencast frames were captured".to_string(),
            });
        }

        let manifest = FrameManifest { frames, stopped_at };
        manifest.write(&self.capture_dir)?;
        Ok(manifest)
    }
}

fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Receives screencast events, persists each frame, and acknowledges it.
async fn capture_loop(
    driver: PageDriver,
    mut events: UnboundedReceiver<CdpEvent>,
    capture_dir: PathBuf,
    mut stop_rx: oneshot::Receiver<()>,
) -> Vec<FrameRecord> {
    let mut frames = Vec::new();

    loop {
        let event = tokio::select! {
            biased;
            event = events.recv() => match event {
                Some(event) => event,
                None => break,
            },
            _ = &mut stop_rx => break,
        };

        if event.method != "Page.screencastFrame" {
            continue;
        }
        let Some(frame) = parse_screencast_frame(&event.params) else {
            tracing::warn!("screencast frame with unexpected shape, skipping");
            continue;
        };

        match persist_frame(&capture_dir, frames.len(), &frame) {
            Ok(record) => frames.push(record),
            Err(e) => tracing::warn!(error = %e, "failed to persist frame"),
        }

        // Ack even a frame we failed to write, or capture stalls.
        if let Err(e) = driver.ack_frame(frame.session_id).await {
            tracing::warn!(error = %e, "frame ack failed, stopping capture");
            break;
        }
    }

    frames
}

fn persist_frame(
    capture_dir: &Path,
    index: usize,
    frame: &ScreencastFrame,
) -> Result<FrameRecord, BrowserError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(&frame.data)
        .map_err(|e| BrowserError::Recording {
            detail: format!("frame {index} is not valid base64: {e}"),
        })?;

    let file = frame_file_name(index);
    std::fs::write(capture_dir.join(&file), bytes).map_err(|e| BrowserError::Recording {
        detail: format!("failed to write frame {file}: {e}"),
    })?;

    Ok(FrameRecord {
        file,
        ts: frame.timestamp,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_file_names_sort_in_capture_order() {
        assert_eq!(frame_file_name(0), "frame-000000.jpg");
        assert_eq!(frame_file_name(42), "frame-000042.jpg");
        assert!(frame_file_name(99) < frame_file_name(100));
    }

    #[test]
    fn screencast_frame_parses() {
        let params = serde_json::json!({
            "data": "aGVsbG8=",
            "sessionId": 7,
            "metadata": {"timestamp": 1700000000.25, "deviceWidth": 1366}
        });
        let frame = parse_screencast_frame(&params).unwrap();
        assert_eq!(frame.data, "aGVsbG8=");
        assert_eq!(frame.session_id, 7);
        assert_eq!(frame.timestamp, 1700000000.25);
    }

    #[test]
    fn frame_without_metadata_is_rejected() {
        let params = serde_json::json!({"data": "aGVsbG8=", "sessionId": 7});
        assert!(parse_screencast_frame(&params).is_none());
    }

    #[test]
    fn frame_with_wrong_types_is_rejected() {
        let params = serde_json::json!({
            "data": 123,
            "sessionId": 7,
            "metadata": {"timestamp": 1.0}
        });
        assert!(parse_screencast_frame(&params).is_none());
    }

    #[test]
    fn persist_frame_decodes_and_writes() {
        let dir = tempfile::tempdir().unwrap();
        let frame = ScreencastFrame {
            data: base64::engine::general_purpose::STANDARD.encode(b"jpeg-bytes"),
            session_id: 1,
            timestamp: 10.5,
        };

        let record = persist_frame(dir.path(), 3, &frame).unwrap();
        assert_eq!(record.file, "frame-000003.jpg");
        assert_eq!(record.ts, 10.5);
        assert_eq!(
            std::fs::read(dir.path().join("frame-000003.jpg")).unwrap(),
            b"jpeg-bytes"
        );
    }

    #[test]
    fn persist_frame_rejects_bad_base64() {
        let dir = tempfile::tempdir().unwrap();
        let frame = ScreencastFrame {
            data: "not base64!!!".to_string(),
            session_id: 1,
            timestamp: 0.0,
        };
        assert!(persist_frame(dir.path(), 0, &frame).is_err());
    }

    #[test]
    fn manifest_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = FrameManifest {
            frames: vec![
                FrameRecord {
                    file: "frame-000000.jpg".to_string(),
                    ts: 100.0,
                },
                FrameRecord {
                    file: "frame-000001.jpg".to_string(),
                    ts: 100.4,
                },
            ],
            stopped_at: 105.0,
        };

        manifest.write(dir.path()).unwrap();
        let loaded = FrameManifest::load(dir.path()).unwrap();
        assert_eq!(loaded, manifest);
    }

    #[test]
    fn loading_a_missing_manifest_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            FrameManifest::load(dir.path()),
            Err(BrowserError::Recording { .. })
        ));
    }
}
