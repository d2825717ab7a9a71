//! Headless Chromium discovery and launch.
//!
//! Finds a Chromium-family binary (an explicit path wins over the platform
//! candidate list), starts it headless with an ephemeral DevTools port and
//! a throwaway profile, scrapes the advertised WebSocket endpoint from
//! stderr, and resolves the page target through the `/json/list` HTTP
//! endpoint. The child is killed when the handle drops.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};

use crate::error::BrowserError;

/// How long to wait for the browser to announce its DevTools endpoint.
const DEVTOOLS_ANNOUNCE_TIMEOUT: Duration = Duration::from_secs(20);

/// Attempts to list page targets before giving up (the target list can lag
/// the endpoint announcement by a moment).
const TARGET_LIST_ATTEMPTS: u32 = 10;
const TARGET_LIST_INTERVAL: Duration = Duration::from_millis(250);

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Launch configuration.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Explicit browser binary; overrides discovery when set.
    pub binary: Option<PathBuf>,
    /// Window (and capture) width in pixels.
    pub width: u32,
    /// Window (and capture) height in pixels.
    pub height: u32,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            binary: None,
            width: 1366,
            height: 768,
        }
    }
}

// ---------------------------------------------------------------------------
// Binary discovery
// ---------------------------------------------------------------------------

/// Well-known Chromium-family binary locations for this platform.
pub fn platform_candidate_paths() -> &'static [&'static str] {
    #[cfg(target_os = "macos")]
    {
        &[
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/opt/homebrew/bin/chromium",
        ]
    }

    #[cfg(target_os = "linux")]
    {
        &[
            "/usr/bin/google-chrome-stable",
            "/usr/bin/google-chrome",
            "/usr/bin/chromium-browser",
            "/usr/bin/chromium",
            "/snap/bin/chromium",
            "/usr/lib/chromium/chromium",
        ]
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        &[]
    }
}

/// Pick the browser binary: the configured path if it exists, otherwise the
/// first existing platform candidate.
pub fn find_browser_binary(configured: Option<&Path>) -> Result<PathBuf, BrowserError> {
    if let Some(path) = configured {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        return Err(BrowserError::LaunchFailed {
            reason: format!("configured browser path does not exist: {}", path.display()),
        });
    }

    platform_candidate_paths()
        .iter()
        .map(Path::new)
        .find(|p| p.exists())
        .map(Path::to_path_buf)
        .ok_or(BrowserError::NoBrowserFound)
}

// ---------------------------------------------------------------------------
// DevTools endpoint scraping
// ---------------------------------------------------------------------------

/// Extract the WebSocket URL from the browser's announcement line, e.g.
/// `DevTools listening on ws://127.0.0.1:41233/devtools/browser/…`.
pub fn parse_devtools_line(line: &str) -> Option<String> {
    let rest = line.trim().strip_prefix("DevTools listening on ")?;
    if rest.starts_with("ws://") {
        Some(rest.trim().to_string())
    } else {
        None
    }
}

/// Extract the port from a `ws://host:port/...` URL.
pub fn parse_devtools_port(ws_url: &str) -> Option<u16> {
    let after_scheme = ws_url.strip_prefix("ws://")?;
    let authority = after_scheme.split('/').next()?;
    authority.rsplit(':').next()?.parse().ok()
}

/// Find the first `page` target's WebSocket URL in a `/json/list` payload.
pub fn find_page_target(targets: &serde_json::Value) -> Option<String> {
    targets.as_array()?.iter().find_map(|t| {
        if t.get("type").and_then(|v| v.as_str()) == Some("page") {
            t.get("webSocketDebuggerUrl")
                .and_then(|v| v.as_str())
                .map(str::to_string)
        } else {
            None
        }
    })
}

// ---------------------------------------------------------------------------
// HeadlessBrowser
// ---------------------------------------------------------------------------

/// A running headless browser. Dropping the handle kills the child.
pub struct HeadlessBrowser {
    child: Child,
    /// DevTools HTTP/WebSocket port.
    pub port: u16,
    /// Keeps the throwaway profile directory alive for the browser's life.
    _profile_dir: tempfile::TempDir,
}

impl HeadlessBrowser {
    /// Launch a headless browser and wait for its DevTools endpoint.
    pub async fn launch(options: &LaunchOptions) -> Result<Self, BrowserError> {
        let binary = find_browser_binary(options.binary.as_deref())?;
        let profile_dir = tempfile::tempdir().map_err(|e| BrowserError::LaunchFailed {
            reason: format!("failed to create profile dir: {e}"),
        })?;

        tracing::info!(
            binary = %binary.display(),
            width = options.width,
            height = options.height,
            "launching headless browser"
        );

        let mut child = Command::new(&binary)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-first-run")
            .arg("--hide-scrollbars")
            .arg("--remote-debugging-port=0")
            .arg(format!("--window-size={},{}", options.width, options.height))
            .arg(format!("--user-data-dir={}", profile_dir.path().display()))
            .arg("about:blank")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| BrowserError::LaunchFailed {
                reason: format!("failed to spawn {}: {e}", binary.display()),
            })?;

        let stderr = child.stderr.take().ok_or_else(|| BrowserError::LaunchFailed {
            reason: "browser stderr was not captured".to_string(),
        })?;

        let ws_url = tokio::time::timeout(
            DEVTOOLS_ANNOUNCE_TIMEOUT,
            wait_for_devtools_announcement(stderr),
        )
        .await
        .map_err(|_| BrowserError::LaunchFailed {
            reason: format!(
                "browser did not announce DevTools endpoint within {DEVTOOLS_ANNOUNCE_TIMEOUT:?}"
            ),
        })??;

        let port = parse_devtools_port(&ws_url).ok_or_else(|| BrowserError::LaunchFailed {
            reason: format!("could not parse DevTools port from {ws_url}"),
        })?;

        tracing::info!(port = port, "DevTools endpoint ready");

        Ok(Self {
            child,
            port,
            _profile_dir: profile_dir,
        })
    }

    /// Resolve the WebSocket URL of the browser's (only) page target.
    pub async fn page_ws_url(&self) -> Result<String, BrowserError> {
        let list_url = format!("http://127.0.0.1:{}/json/list", self.port);

        for attempt in 1..=TARGET_LIST_ATTEMPTS {
            match reqwest::get(&list_url).await {
                Ok(resp) => {
                    let targets: serde_json::Value =
                        resp.json().await.map_err(|e| BrowserError::Protocol {
                            detail: format!("bad /json/list payload: {e}"),
                        })?;
                    if let Some(url) = find_page_target(&targets) {
                        return Ok(url);
                    }
                }
                Err(e) => {
                    tracing::debug!(attempt = attempt, error = %e, "target list not ready");
                }
            }
            if attempt < TARGET_LIST_ATTEMPTS {
                tokio::time::sleep(TARGET_LIST_INTERVAL).await;
            }
        }

        Err(BrowserError::LaunchFailed {
            reason: "no page target appeared in /json/list".to_string(),
        })
    }

    /// Terminate the browser process.
    pub async fn close(mut self) -> Result<(), BrowserError> {
        self.child.kill().await.map_err(|e| BrowserError::LaunchFailed {
            reason: format!("failed to kill browser: {e}"),
        })
    }
}

/// Read stderr lines until the DevTools announcement appears.
async fn wait_for_devtools_announcement(
    stderr: tokio::process::ChildStderr,
) -> Result<String, BrowserError> {
    let mut lines = BufReader::new(stderr).lines();
    while let Some(line) = lines.next_line().await.map_err(|e| BrowserError::LaunchFailed {
        reason: format!("failed to read browser stderr: {e}"),
    })? {
        if let Some(url) = parse_devtools_line(&line) {
            return Ok(url);
        }
        tracing::trace!(line = %line, "browser stderr");
    }
    Err(BrowserError::LaunchFailed {
        reason: "browser exited before announcing its DevTools endpoint".to_string(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn devtools_line_parses() {
        let line = "DevTools listening on ws://127.0.0.1:41233/devtools/browser/abc-def";
        assert_eq!(
            parse_devtools_line(line).as_deref(),
            Some("ws://127.0.0.1:41233/devtools/browser/abc-def")
        );
    }

    #[test]
    fn unrelated_stderr_lines_ignored() {
        assert!(parse_devtools_line("[1234:1234:ERROR] gpu init failed").is_none());
        assert!(parse_devtools_line("").is_none());
        assert!(parse_devtools_line("DevTools listening on http://nope").is_none());
    }

    #[test]
    fn port_extraction() {
        assert_eq!(
            parse_devtools_port("ws://127.0.0.1:41233/devtools/browser/abc"),
            Some(41233)
        );
        assert_eq!(parse_devtools_port("ws://127.0.0.1:9222/"), Some(9222));
        assert_eq!(parse_devtools_port("http://127.0.0.1:9222/"), None);
        assert_eq!(parse_devtools_port("ws://127.0.0.1/devtools"), None);
    }

    #[test]
    fn page_target_selected_from_list() {
        let targets = serde_json::json!([
            {"type": "background_page", "webSocketDebuggerUrl": "ws://x/1"},
            {"type": "page", "webSocketDebuggerUrl": "ws://127.0.0.1:9222/devtools/page/AAA"},
            {"type": "page", "webSocketDebuggerUrl": "ws://127.0.0.1:9222/devtools/page/BBB"},
        ]);
        assert_eq!(
            find_page_target(&targets).as_deref(),
            Some("ws://127.0.0.1:9222/devtools/page/AAA")
        );
    }

    #[test]
    fn empty_target_list_yields_none() {
        assert!(find_page_target(&serde_json::json!([])).is_none());
        assert!(find_page_target(&serde_json::json!({})).is_none());
    }

    #[test]
    fn candidate_paths_are_absolute() {
        for p in platform_candidate_paths() {
            assert!(p.starts_with('/'), "candidate path is not absolute: {p}");
        }
    }

    #[test]
    fn missing_configured_binary_is_an_error() {
        let err = find_browser_binary(Some(Path::new("/definitely/not/here"))).unwrap_err();
        assert!(matches!(err, BrowserError::LaunchFailed { .. }));
    }
}
