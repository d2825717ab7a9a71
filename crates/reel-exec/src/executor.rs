//! Single-attempt shell command execution.
//!
//! [`ShellExecutor`] spawns `sh -c <command>` with stdout/stderr piped and
//! streams stdout into a capped buffer, so memory stays bounded no matter
//! how much the child prints; a command that crosses the cap is killed on
//! the spot. A non-zero exit status is an error. Retry behavior lives in
//! [`crate::retry`], not here.

use std::path::PathBuf;
use std::process::Stdio;

use tokio::io::AsyncReadExt;
use tokio::process::Command;

/// Maximum bytes of captured stdout before the command is failed outright.
pub const MAX_OUTPUT_BYTES: usize = 20 * 1024 * 1024;

/// How much stderr to keep in error messages.
const STDERR_SNIPPET_LEN: usize = 500;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from command execution and retry exhaustion.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    /// The process could not be spawned or waited on.
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    /// The process exited with a non-zero status.
    #[error("command `{command}` exited with code {code}: {stderr}")]
    CommandFailed {
        command: String,
        code: i32,
        stderr: String,
    },

    /// Captured stdout exceeded [`MAX_OUTPUT_BYTES`].
    #[error("command `{command}` produced {size} bytes of output, limit is {limit}")]
    OutputTooLarge {
        command: String,
        size: usize,
        limit: usize,
    },

    /// A retried command never succeeded within its attempt budget.
    #[error("command `{command}` did not succeed after {attempts} attempts")]
    RetryExhausted {
        command: String,
        attempts: u32,
        #[source]
        last: Box<ExecError>,
    },
}

// ---------------------------------------------------------------------------
// CommandRunner trait
// ---------------------------------------------------------------------------

/// Something that can run one external command and capture its output.
///
/// The retry layer and tests depend on this seam instead of the concrete
/// executor, so flaky dependencies can be simulated without spawning
/// processes.
#[async_trait::async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `command` to completion and return its trimmed stdout.
    async fn run(&self, command: &str) -> Result<String, ExecError>;
}

// ---------------------------------------------------------------------------
// ShellExecutor
// ---------------------------------------------------------------------------

/// Runs commands through `sh -c` in a fixed working directory.
pub struct ShellExecutor {
    /// Working directory for every spawned command (the demoed project root).
    root: PathBuf,
    /// Output cap, overridable for tests.
    max_output_bytes: usize,
}

impl ShellExecutor {
    /// Create an executor rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_output_bytes: MAX_OUTPUT_BYTES,
        }
    }

    /// Override the captured-output cap.
    pub fn with_output_cap(mut self, max_output_bytes: usize) -> Self {
        self.max_output_bytes = max_output_bytes;
        self
    }
}

#[async_trait::async_trait]
impl CommandRunner for ShellExecutor {
    async fn run(&self, command: &str) -> Result<String, ExecError> {
        tracing::debug!(command = command, "running command");

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(&self.root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExecError::Spawn {
                command: command.to_string(),
                source: e,
            })?;

        let mut stdout_pipe = child.stdout.take().ok_or_else(|| ExecError::Spawn {
            command: command.to_string(),
            source: std::io::Error::other("stdout was not captured"),
        })?;
        let mut stderr_pipe = child.stderr.take().ok_or_else(|| ExecError::Spawn {
            command: command.to_string(),
            source: std::io::Error::other("stderr was not captured"),
        })?;

        // Drain stderr on its own task; a chatty child would otherwise fill
        // the stderr pipe and deadlock while stdout is being read.
        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stderr_pipe.read_to_end(&mut buf).await;
            buf
        });

        // Stream stdout so peak memory never exceeds the cap by more than
        // one read. A runaway command is killed the moment it crosses it.
        let mut stdout = Vec::new();
        let mut chunk = [0u8; 8 * 1024];
        loop {
            let n = stdout_pipe
                .read(&mut chunk)
                .await
                .map_err(|e| ExecError::Spawn {
                    command: command.to_string(),
                    source: e,
                })?;
            if n == 0 {
                break;
            }
            stdout.extend_from_slice(&chunk[..n]);
            if stdout.len() > self.max_output_bytes {
                let _ = child.kill().await;
                stderr_task.abort();
                tracing::warn!(
                    command = command,
                    size = stdout.len(),
                    limit = self.max_output_bytes,
                    "output cap exceeded, child killed"
                );
                return Err(ExecError::OutputTooLarge {
                    command: command.to_string(),
                    size: stdout.len(),
                    limit: self.max_output_bytes,
                });
            }
        }

        let status = child.wait().await.map_err(|e| ExecError::Spawn {
            command: command.to_string(),
            source: e,
        })?;
        let stderr_bytes = stderr_task.await.unwrap_or_default();

        if !status.success() {
            let code = status.code().unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&stderr_bytes).to_string();
            tracing::warn!(command = command, code = code, "command failed");
            return Err(ExecError::CommandFailed {
                command: command.to_string(),
                code,
                stderr: truncate(stderr.trim(), STDERR_SNIPPET_LEN).to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&stdout).trim_end().to_string())
    }
}

/// Truncate a string for error messages at a valid UTF-8 boundary.
fn truncate(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        return s;
    }
    let mut end = max_len;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn executor() -> ShellExecutor {
        ShellExecutor::new(std::env::temp_dir())
    }

    #[tokio::test]
    async fn run_captures_trimmed_stdout() {
        let out = executor().run("echo '  hello demo  '").await.unwrap();
        // Leading whitespace inside the echoed text survives; trailing
        // whitespace and the newline do not.
        assert_eq!(out, "  hello demo");
    }

    #[tokio::test]
    async fn run_multiline_output_preserved() {
        let out = executor().run("printf 'a\\nb\\nc\\n'").await.unwrap();
        assert_eq!(out, "a\nb\nc");
    }

    #[tokio::test]
    async fn nonzero_exit_is_command_failed() {
        let err = executor()
            .run("echo oops >&2; exit 3")
            .await
            .unwrap_err();
        match err {
            ExecError::CommandFailed {
                command,
                code,
                stderr,
            } => {
                assert_eq!(code, 3);
                assert!(command.contains("exit 3"));
                assert_eq!(stderr, "oops");
            }
            other => panic!("expected CommandFailed, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn oversized_output_rejected() {
        let exec = executor().with_output_cap(16);
        let err = exec
            .run("printf 'xxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx'")
            .await
            .unwrap_err();
        match err {
            ExecError::OutputTooLarge { size, limit, .. } => {
                assert_eq!(limit, 16);
                assert!(size > 16);
            }
            other => panic!("expected OutputTooLarge, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn runaway_output_kills_the_child_at_the_cap() {
        // `yes` streams forever; the run must abort once the cap is
        // crossed instead of buffering until EOF (which never comes).
        let exec = executor().with_output_cap(1024);
        let result = tokio::time::timeout(
            std::time::Duration::from_secs(10),
            exec.run("yes demo"),
        )
        .await
        .expect("capped command should be cut off promptly");

        match result.unwrap_err() {
            ExecError::OutputTooLarge { size, limit, .. } => {
                assert_eq!(limit, 1024);
                assert!(size > 1024);
                // Bounded by the cap plus at most one read, not the stream.
                assert!(size < 1024 + 64 * 1024);
            }
            other => panic!("expected OutputTooLarge, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn runs_in_configured_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "present").unwrap();
        let exec = ShellExecutor::new(dir.path());
        let out = exec.run("cat marker.txt").await.unwrap();
        assert_eq!(out, "present");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello", 3), "hel");
        // Multi-byte char straddling the cut point is dropped whole.
        assert_eq!(truncate("héllo", 2), "h");
    }
}
