//! Display lines and the script they form.

// ---------------------------------------------------------------------------
// LineKind
// ---------------------------------------------------------------------------

/// What a display line is, for pacing purposes.
///
/// The kind is fixed when the line is created and determines both the
/// per-character reveal delay and the pause after the line. Visual styling
/// is a separate, content-based concern decided by the animator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineKind {
    /// A `### Section ###` narrative divider.
    SectionHeader,
    /// The command the demo issued, rendered with a `$ ` prompt.
    CommandLine,
    /// Captured output, separators, and everything else.
    OutputLine,
}

// ---------------------------------------------------------------------------
// DisplayLine
// ---------------------------------------------------------------------------

/// One line of the recorded terminal. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayLine {
    pub text: String,
    pub kind: LineKind,
}

impl DisplayLine {
    pub fn section(title: &str) -> Self {
        Self {
            text: format!("### {title} ###"),
            kind: LineKind::SectionHeader,
        }
    }

    pub fn command(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: LineKind::CommandLine,
        }
    }

    pub fn output(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: LineKind::OutputLine,
        }
    }

    /// Number of characters to reveal during animation.
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

// ---------------------------------------------------------------------------
// Script
// ---------------------------------------------------------------------------

/// An ordered sequence of display lines; the exact playback order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script {
    lines: Vec<DisplayLine>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: DisplayLine) {
        self.lines.push(line);
    }

    /// Append one output line per newline-separated line of `text`.
    ///
    /// A multi-line command result becomes multiple display lines so each
    /// animates (and pauses) independently, matching how a terminal would
    /// print it.
    pub fn push_output_block(&mut self, text: &str) {
        for line in text.split('\n') {
            self.lines.push(DisplayLine::output(line));
        }
    }

    /// A blank separator line between sections.
    pub fn push_blank(&mut self) {
        self.lines.push(DisplayLine::output(""));
    }

    pub fn lines(&self) -> &[DisplayLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DisplayLine> {
        self.lines.iter()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
