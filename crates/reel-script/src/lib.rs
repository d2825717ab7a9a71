//! The demo script: what the recorded terminal says, in what order.
//!
//! Raw command output is compacted ([`compact`]), interleaved with section
//! headers and the issued command text into an ordered [`Script`] of typed
//! display lines ([`builder`]), and paced by one of two canonical timing
//! profiles ([`timing`]). The animator replays the script verbatim;
//! insertion order here is the playback order.

pub mod builder;
pub mod compact;
pub mod line;
pub mod timing;

pub use builder::{build_script, DemoResults, HealthResult};
pub use compact::{compact, ELLIPSIS};
pub use line::{DisplayLine, LineKind, Script};
pub use timing::{line_duration, script_duration, TimingProfile};
