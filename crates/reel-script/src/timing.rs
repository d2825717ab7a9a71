//! Animation pacing profiles.
//!
//! Exactly two profiles exist: `compact` for a short clip and `extended`
//! for the deliberately paced five-minute cut. One is selected at startup
//! from a boolean flag and never changes mid-run. There is no per-line
//! timing override.

use std::time::Duration;

use crate::line::{DisplayLine, LineKind, Script};

// ---------------------------------------------------------------------------
// TimingProfile
// ---------------------------------------------------------------------------

/// Delay and pause constants governing the typewriter animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingProfile {
    /// Per-character delay while revealing a command line.
    pub cmd_char: Duration,
    /// Per-character delay for every other line.
    pub out_char: Duration,
    /// Pause after a command line completes.
    pub cmd_line_pause: Duration,
    /// Pause after any other line completes.
    pub out_line_pause: Duration,
    /// Hold after the last line, so the closing frame lingers.
    pub final_pause: Duration,
}

impl TimingProfile {
    /// Fast pacing for the short demo clip.
    pub fn compact() -> Self {
        Self {
            cmd_char: Duration::from_millis(7),
            out_char: Duration::from_millis(2),
            cmd_line_pause: Duration::from_millis(500),
            out_line_pause: Duration::from_millis(240),
            final_pause: Duration::from_millis(5000),
        }
    }

    /// Slow pacing that stretches the recording to roughly five minutes.
    pub fn extended() -> Self {
        Self {
            cmd_char: Duration::from_millis(58),
            out_char: Duration::from_millis(17),
            cmd_line_pause: Duration::from_millis(5500),
            out_line_pause: Duration::from_millis(2400),
            final_pause: Duration::from_millis(26000),
        }
    }

    /// Select the profile for this run from the extended-mode flag.
    pub fn select(extended: bool) -> Self {
        if extended {
            Self::extended()
        } else {
            Self::compact()
        }
    }

    /// Per-character delay for a line of the given kind.
    pub fn char_delay(&self, kind: LineKind) -> Duration {
        match kind {
            LineKind::CommandLine => self.cmd_char,
            _ => self.out_char,
        }
    }

    /// End-of-line pause for a line of the given kind.
    pub fn line_pause(&self, kind: LineKind) -> Duration {
        match kind {
            LineKind::CommandLine => self.cmd_line_pause,
            _ => self.out_line_pause,
        }
    }
}

// ---------------------------------------------------------------------------
// Duration arithmetic
// ---------------------------------------------------------------------------

/// Animation time one line contributes: one char delay per character plus
/// the end-of-line pause.
pub fn line_duration(line: &DisplayLine, timing: &TimingProfile) -> Duration {
    timing.char_delay(line.kind) * line.char_count() as u32 + timing.line_pause(line.kind)
}

/// Total animation time for a script under a profile. Deterministic for a
/// fixed script and profile.
pub fn script_duration(script: &Script, timing: &TimingProfile) -> Duration {
    script
        .iter()
        .map(|line| line_duration(line, timing))
        .sum::<Duration>()
        + timing.final_pause
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
