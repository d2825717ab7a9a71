//! Turns a captured frame directory into the final MP4.
//!
//! Screencast frames arrive only on repaint, so they are irregularly
//! spaced; encoding them at a fixed framerate would warp the recording's
//! duration. Instead each frame's real display time is written into an
//! ffconcat listing and ffmpeg's concat demuxer assembles the video from
//! that. The output is normalized to yuv420p with the moov atom up front
//! so it plays everywhere.

use std::path::Path;

use reel_browser::{FrameManifest, FrameRecord};
use thiserror::Error;

/// Floor for a single frame's display time. Guards against clock jitter
/// producing zero or negative durations, which the concat demuxer rejects.
const MIN_FRAME_SECONDS: f64 = 1.0 / 60.0;

const CONCAT_FILE: &str = "frames.ffconcat";

#[derive(Debug, Error)]
pub enum FinalizeError {
    #[error("capture directory has no frames to encode")]
    NoFrames,

    #[error("failed to read capture manifest: {0}")]
    Manifest(#[from] reel_browser::BrowserError),

    #[error("failed to write {path}: {source}")]
    WriteConcat {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to run ffmpeg: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("ffmpeg exited with {code:?}: {stderr}")]
    FfmpegFailed { code: Option<i32>, stderr: String },
}

// ---------------------------------------------------------------------------
// ffconcat generation
// ---------------------------------------------------------------------------

/// Render the concat listing for the captured frames.
///
/// Each frame is displayed from its capture timestamp until the next
/// frame's; the last frame holds until `stopped_at`. The final file entry
/// is repeated because the demuxer ignores a trailing `duration` with no
/// file after it.
pub fn ffconcat_contents(frames: &[FrameRecord], stopped_at: f64) -> Result<String, FinalizeError> {
    let last = frames.last().ok_or(FinalizeError::NoFrames)?;

    let mut out = String::from("ffconcat version 1.0\n");
    for pair in frames.windows(2) {
        push_entry(&mut out, &pair[0].file, pair[1].ts - pair[0].ts);
    }
    push_entry(&mut out, &last.file, stopped_at - last.ts);
    out.push_str(&format!("file '{}'\n", last.file));
    Ok(out)
}

fn push_entry(out: &mut String, file: &str, seconds: f64) {
    let held = seconds.max(MIN_FRAME_SECONDS);
    out.push_str(&format!("file '{file}'\nduration {held:.6}\n"));
}

/// ffmpeg invocation encoding the concat listing into `output`.
pub fn ffmpeg_args(concat_path: &str, output: &str) -> Vec<String> {
    [
        "-y",
        "-f",
        "concat",
        "-safe",
        "0",
        "-i",
        concat_path,
        "-vf",
        "format=yuv420p",
        "-movflags",
        "+faststart",
        output,
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

// ---------------------------------------------------------------------------
// finalize
// ---------------------------------------------------------------------------

/// Encode the frames in `capture_dir` into the MP4 at `output`.
pub async fn finalize(capture_dir: &Path, output: &Path) -> Result<(), FinalizeError> {
    let manifest = FrameManifest::load(capture_dir)?;
    let contents = ffconcat_contents(&manifest.frames, manifest.stopped_at)?;

    let concat_path = capture_dir.join(CONCAT_FILE);
    std::fs::write(&concat_path, contents).map_err(|source| FinalizeError::WriteConcat {
        path: concat_path.display().to_string(),
        source,
    })?;

    tracing::info!(
        frames = manifest.frames.len(),
        output = %output.display(),
        "encoding video"
    );

    let result = tokio::process::Command::new("ffmpeg")
        .args(ffmpeg_args(
            &concat_path.display().to_string(),
            &output.display().to_string(),
        ))
        .output()
        .await?;

    if !result.status.success() {
        return Err(FinalizeError::FfmpegFailed {
            code: result.status.code(),
            stderr: String::from_utf8_lossy(&result.stderr).into_owned(),
        });
    }

    tracing::info!(output = %output.display(), "video created");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(file: &str, ts: f64) -> FrameRecord {
        FrameRecord {
            file: file.to_string(),
            ts,
        }
    }

    #[test]
    fn concat_listing_uses_inter_frame_gaps() {
        let frames = vec![
            frame("frame-000000.jpg", 100.0),
            frame("frame-000001.jpg", 100.4),
            frame("frame-000002.jpg", 100.65),
        ];
        let out = ffconcat_contents(&frames, 103.0).unwrap();

        assert_eq!(
            out,
            "ffconcat version 1.0\n\
             file 'frame-000000.jpg'\nduration 0.400000\n\
             file 'frame-000001.jpg'\nduration 0.250000\n\
             file 'frame-000002.jpg'\nduration 2.350000\n\
             file 'frame-000002.jpg'\n"
        );
    }

    #[test]
    fn single_frame_holds_until_stop() {
        let frames = vec![frame("frame-000000.jpg", 50.0)];
        let out = ffconcat_contents(&frames, 55.0).unwrap();
        assert!(out.contains("duration 5.000000"));
        // Repeated so the demuxer honors the final duration.
        assert_eq!(out.matches("file 'frame-000000.jpg'").count(), 2);
    }

    #[test]
    fn out_of_order_timestamps_are_floored() {
        let frames = vec![
            frame("frame-000000.jpg", 100.0),
            frame("frame-000001.jpg", 99.9),
        ];
        let out = ffconcat_contents(&frames, 99.5).unwrap();
        for line in out.lines().filter(|l| l.starts_with("duration")) {
            let secs: f64 = line.strip_prefix("duration ").unwrap().parse().unwrap();
            assert!(secs >= MIN_FRAME_SECONDS);
        }
    }

    #[test]
    fn no_frames_is_an_error() {
        assert!(matches!(
            ffconcat_contents(&[], 10.0),
            Err(FinalizeError::NoFrames)
        ));
    }

    #[test]
    fn ffmpeg_invocation_shape() {
        let args = ffmpeg_args("/tmp/cap/frames.ffconcat", "/tmp/demo/out.mp4");
        assert_eq!(
            args,
            vec![
                "-y",
                "-f",
                "concat",
                "-safe",
                "0",
                "-i",
                "/tmp/cap/frames.ffconcat",
                "-vf",
                "format=yuv420p",
                "-movflags",
                "+faststart",
                "/tmp/demo/out.mp4",
            ]
        );
    }
}
