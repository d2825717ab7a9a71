//! Headless-browser rendering surface for the recorded demo terminal.
//!
//! Pipeline pieces, in the order the recording uses them:
//! - [`launch`] finds a Chromium-family binary and starts it headless with
//!   an ephemeral DevTools port.
//! - [`cdp`] speaks the DevTools protocol over WebSocket (command/response
//!   correlation plus an event stream).
//! - [`page`] is the thin page driver: JavaScript evaluation, document
//!   content, screencast control.
//! - [`surface`] renders the fake terminal page and exposes the
//!   character-level drawing seam the animator writes through.
//! - [`animator`] replays a script line by line as a typewriter, governed
//!   by the run's timing profile.
//! - [`recorder`] captures screencast frames to disk while the animation
//!   plays.

pub mod animator;
pub mod cdp;
pub mod error;
pub mod launch;
pub mod page;
pub mod recorder;
pub mod surface;

pub use animator::{play, Animator, Effect, Step};
pub use cdp::{CdpClient, CdpEvent};
pub use error::BrowserError;
pub use launch::{HeadlessBrowser, LaunchOptions};
pub use page::PageDriver;
pub use recorder::{FrameManifest, FrameRecord, Recorder};
pub use surface::{classify, LineClass, PageSurface, Surface, TERMINAL_PAGE_HTML};
