//! Typewriter replay of a script, modeled as an explicit state machine.
//!
//! [`Animator::next_step`] is pure: it advances the machine and says what
//! side effect to perform and how long to wait afterwards. [`play`] is the
//! single-threaded driver that applies each effect to a [`Surface`] and
//! sleeps the step's delay; each sleep is a cooperative suspension point,
//! and line N+1 never starts before line N's pause has fully elapsed.
//!
//! States: Idle (between lines) -> Revealing (characters) -> LinePause ->
//! Idle ... -> Done (after the final hold). Keeping the transitions pure
//! makes the ordering and total-duration properties testable without a
//! browser.

use std::time::Duration;

use reel_script::{LineKind, Script, TimingProfile};

use crate::error::BrowserError;
use crate::surface::{classify, LineClass, Surface};

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Ready to start the line at this index (or finish if exhausted).
    Idle { next_line: usize },
    /// Revealing characters of `line`; `next_char` is the next to show.
    Revealing { line: usize, next_char: usize },
    /// Holding after `line` completed.
    LinePause { line: usize },
    /// Final hold emitted; nothing left to do.
    Done,
}

/// One side effect the driver must perform, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Open a new line with this visual style.
    BeginLine { class: LineClass },
    /// Reveal one character on the current line.
    PutChar(char),
    /// Terminate the current line and scroll the tail into view.
    EndLine,
    /// No surface mutation; just let the pause elapse.
    Hold,
}

/// An effect plus the delay to wait after performing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub effect: Effect,
    pub delay: Duration,
}

/// Replays a [`Script`] under a [`TimingProfile`], one step at a time.
pub struct Animator<'a> {
    script: &'a Script,
    timing: TimingProfile,
    state: State,
}

impl<'a> Animator<'a> {
    pub fn new(script: &'a Script, timing: TimingProfile) -> Self {
        Self {
            script,
            timing,
            state: State::Idle { next_line: 0 },
        }
    }

    fn kind(&self, line: usize) -> LineKind {
        self.script.lines()[line].kind
    }

    /// Advance the machine and return the next step, or `None` once the
    /// final hold has been emitted.
    pub fn next_step(&mut self) -> Option<Step> {
        match self.state {
            State::Idle { next_line } => {
                if next_line >= self.script.len() {
                    // Script exhausted: hold the closing frame, then stop.
                    self.state = State::Done;
                    return Some(Step {
                        effect: Effect::Hold,
                        delay: self.timing.final_pause,
                    });
                }
                let text = &self.script.lines()[next_line].text;
                // Classified once here, at line start; never re-evaluated.
                let class = classify(text);
                self.state = State::Revealing {
                    line: next_line,
                    next_char: 0,
                };
                Some(Step {
                    effect: Effect::BeginLine { class },
                    delay: Duration::ZERO,
                })
            }

            State::Revealing { line, next_char } => {
                let display = &self.script.lines()[line];
                match display.text.chars().nth(next_char) {
                    Some(ch) => {
                        self.state = State::Revealing {
                            line,
                            next_char: next_char + 1,
                        };
                        Some(Step {
                            effect: Effect::PutChar(ch),
                            delay: self.timing.char_delay(display.kind),
                        })
                    }
                    None => {
                        self.state = State::LinePause { line };
                        Some(Step {
                            effect: Effect::EndLine,
                            delay: Duration::ZERO,
                        })
                    }
                }
            }

            State::LinePause { line } => {
                let pause = self.timing.line_pause(self.kind(line));
                self.state = State::Idle {
                    next_line: line + 1,
                };
                Some(Step {
                    effect: Effect::Hold,
                    delay: pause,
                })
            }

            State::Done => None,
        }
    }

    /// Whether the final hold has been emitted.
    pub fn is_done(&self) -> bool {
        self.state == State::Done
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// Play the whole script against a surface, sleeping between steps.
pub async fn play<S: Surface + ?Sized>(
    script: &Script,
    timing: TimingProfile,
    surface: &mut S,
) -> Result<(), BrowserError> {
    tracing::info!(lines = script.len(), "starting animation");

    let mut animator = Animator::new(script, timing);
    while let Some(step) = animator.next_step() {
        match step.effect {
            Effect::BeginLine { class } => surface.begin_line(class).await?,
            Effect::PutChar(ch) => surface.put_char(ch).await?,
            Effect::EndLine => surface.end_line().await?,
            Effect::Hold => {}
        }
        if !step.delay.is_zero() {
            tokio::time::sleep(step.delay).await;
        }
    }

    tracing::info!("animation complete");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
