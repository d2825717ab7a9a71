//! The rendered terminal page and the drawing seam the animator uses.
//!
//! The page is a static HTML shell with a `#out` pre element; a small set
//! of helper functions is installed into the page once, and every
//! animation step becomes one `Runtime.evaluate` call against them. The
//! [`Surface`] trait fronts that so animator tests can record operations
//! instead of driving a browser.

use crate::error::BrowserError;
use crate::page::PageDriver;

// ---------------------------------------------------------------------------
// Page content
// ---------------------------------------------------------------------------

/// The terminal page rendered during recording.
pub const TERMINAL_PAGE_HTML: &str = r#"<!doctype html>
<html>
<head>
<meta charset="utf-8" />
<style>
  body { margin: 0; background: #070b18; color: #d7e0ff; font-family: "Courier New", monospace; }
  .frame { padding: 24px; }
  h1 { margin: 0 0 14px 0; font-size: 44px; color: #8bd3ff; }
  .term { border: 1px solid #2a3d66; border-radius: 12px; background: #030712; }
  .bar { background: #0e1b33; padding: 10px 14px; border-bottom: 1px solid #2a3d66; color: #9ab6ff; font-size: 24px; }
  pre { margin: 0; padding: 14px; white-space: pre-wrap; line-height: 1.42; font-size: 24px; height: 620px; overflow-y: auto; }
  .ok { color: #7ee787; }
  .cmd { color: #79c0ff; }
  .sec { color: #f2cc60; }
</style>
</head>
<body>
  <div class="frame">
    <h1>VW Digital Twin - Full Functional Demo</h1>
    <div class="term">
      <div class="bar">Terminal</div>
      <pre id="out"></pre>
    </div>
  </div>
</body>
</html>"#;

/// Helper functions installed into the page once, before animation starts.
/// Each line is one span; `end` appends the newline and keeps the tail of
/// the output scrolled into view.
const HELPER_JS: &str = r#"
(() => {
  const out = document.getElementById('out');
  let cur = null;
  window.__term = {
    begin(cls) {
      cur = document.createElement('span');
      if (cls) cur.className = cls;
      out.appendChild(cur);
    },
    put(ch) { cur.textContent += ch; },
    end() {
      out.appendChild(document.createTextNode('\n'));
      out.scrollTop = out.scrollHeight;
    },
  };
})();
"#;

// ---------------------------------------------------------------------------
// Visual classification
// ---------------------------------------------------------------------------

/// Visual style of a line, decided once from its content when the line
/// starts revealing and never re-evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass {
    /// An issued command (`$ ` prefix).
    Command,
    /// A `###`-framed section header.
    Section,
    /// Output signalling success (an `ok` status or a passing test run).
    Success,
    /// Everything else.
    Plain,
}

/// Classify a line's visual style from its text.
///
/// The success match is a literal substring heuristic, nothing stricter:
/// the demoed services report `{"status":"ok"}` and the test runner prints
/// `passed`. A command prefix wins regardless of the rest of the content.
pub fn classify(text: &str) -> LineClass {
    if text.starts_with("$ ") {
        LineClass::Command
    } else if text.starts_with("###") {
        LineClass::Section
    } else if text.contains(r#"{"status":"ok"}"#) || text.contains("passed") {
        LineClass::Success
    } else {
        LineClass::Plain
    }
}

impl LineClass {
    /// CSS class name on the terminal page, if any.
    pub fn css_class(self) -> Option<&'static str> {
        match self {
            LineClass::Command => Some("cmd"),
            LineClass::Section => Some("sec"),
            LineClass::Success => Some("ok"),
            LineClass::Plain => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Surface trait
// ---------------------------------------------------------------------------

/// Where the animator draws. One line is an open/append/close cycle; the
/// implementation must keep the latest line visible after each `end_line`.
#[async_trait::async_trait]
pub trait Surface: Send {
    /// Open a new line with the given visual style.
    async fn begin_line(&mut self, class: LineClass) -> Result<(), BrowserError>;
    /// Append one revealed character to the current line.
    async fn put_char(&mut self, ch: char) -> Result<(), BrowserError>;
    /// Terminate the current line and scroll the tail into view.
    async fn end_line(&mut self) -> Result<(), BrowserError>;
}

// ---------------------------------------------------------------------------
// PageSurface
// ---------------------------------------------------------------------------

/// Surface implementation drawing into the terminal page over CDP.
pub struct PageSurface {
    driver: PageDriver,
}

impl PageSurface {
    /// Install the page content and helper functions, returning a ready
    /// surface.
    pub async fn prepare(driver: PageDriver) -> Result<Self, BrowserError> {
        driver.set_content(TERMINAL_PAGE_HTML).await?;
        driver.evaluate(HELPER_JS).await?;
        Ok(Self { driver })
    }
}

#[async_trait::async_trait]
impl Surface for PageSurface {
    async fn begin_line(&mut self, class: LineClass) -> Result<(), BrowserError> {
        self.driver.evaluate(&begin_line_js(class)).await?;
        Ok(())
    }

    async fn put_char(&mut self, ch: char) -> Result<(), BrowserError> {
        self.driver.evaluate(&put_char_js(ch)).await?;
        Ok(())
    }

    async fn end_line(&mut self) -> Result<(), BrowserError> {
        self.driver.evaluate("window.__term.end()").await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// JS snippet builders (pure, for tests)
// ---------------------------------------------------------------------------

/// JS call opening a line span with the class's CSS name.
pub fn begin_line_js(class: LineClass) -> String {
    let cls = serde_json::Value::String(class.css_class().unwrap_or("").to_string());
    format!("window.__term.begin({cls})")
}

/// JS call appending one character, JSON-escaped.
pub fn put_char_js(ch: char) -> String {
    let escaped = serde_json::Value::String(ch.to_string());
    format!("window.__term.put({escaped})")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_marker_wins_regardless_of_content() {
        assert_eq!(classify("$ docker compose up --build -d"), LineClass::Command);
        // Even when the content also contains a success token.
        assert_eq!(classify(r#"$ curl says {"status":"ok"}"#), LineClass::Command);
    }

    #[test]
    fn section_decoration_classifies_as_header() {
        assert_eq!(classify("### Health Checks ###"), LineClass::Section);
    }

    #[test]
    fn success_tokens_match_by_substring() {
        assert_eq!(
            classify(r#"digital-twin-api (8000): {"status":"ok"}"#),
            LineClass::Success
        );
        assert_eq!(classify("5 passed in 2.31s"), LineClass::Success);
    }

    #[test]
    fn ordinary_output_is_plain() {
        assert_eq!(classify("Container api  Started"), LineClass::Plain);
        assert_eq!(classify(""), LineClass::Plain);
        assert_eq!(classify("..."), LineClass::Plain);
    }

    #[test]
    fn css_class_mapping() {
        assert_eq!(LineClass::Command.css_class(), Some("cmd"));
        assert_eq!(LineClass::Section.css_class(), Some("sec"));
        assert_eq!(LineClass::Success.css_class(), Some("ok"));
        assert_eq!(LineClass::Plain.css_class(), None);
    }

    #[test]
    fn begin_line_js_embeds_class() {
        assert_eq!(begin_line_js(LineClass::Command), r#"window.__term.begin("cmd")"#);
        assert_eq!(begin_line_js(LineClass::Plain), r#"window.__term.begin("")"#);
    }

    #[test]
    fn put_char_js_escapes_specials() {
        assert_eq!(put_char_js('a'), r#"window.__term.put("a")"#);
        assert_eq!(put_char_js('"'), r#"window.__term.put("\"")"#);
        assert_eq!(put_char_js('\\'), r#"window.__term.put("\\")"#);
        // JSON string escaping keeps the snippet a single line.
        assert!(!put_char_js('\n').contains('\n'));
    }

    #[test]
    fn page_html_has_the_output_element_and_styles() {
        assert!(TERMINAL_PAGE_HTML.contains(r#"<pre id="out">"#));
        for cls in [".ok", ".cmd", ".sec"] {
            assert!(TERMINAL_PAGE_HTML.contains(cls), "missing style {cls}");
        }
    }
}
