//! External metadata tool process management.
//!
//! The tool (`exiftool -listx` by default) is started once per request. Its
//! stdout is handed to the fragment scanner while a reaper task waits for the
//! process, so the process is reaped no matter how the reading side ends.
//!
//! ```text
//! ┌──────────────────────────┐   stdout    ┌────────────────────┐
//! │  exiftool -listx         │ ──────────▶ │  fragment scanner  │
//! └──────────────────────────┘             └────────────────────┘
//!              ▲
//!              │ wait / kill
//! ┌──────────────────────────┐  terminate  ┌────────────────────┐
//! │  reaper task             │ ◀────────── │  Terminator        │
//! └──────────────────────────┘             └────────────────────┘
//! ```

mod error;
mod launcher;

pub use error::{ToolError, ToolResult};
pub use launcher::{Terminator, ToolExit, ToolLauncher, ToolRun};
