//! # exiftags
//!
//! Serves the tag definitions of an external metadata tool (`exiftool -listx`)
//! as a streamed JSON document.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │              GET /tags  (axum router)                   │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [tool]
//! ┌─────────────────────────────────────────────────────────┐
//! │      exiftool -listx  (child process + reaper)          │
//! └─────────────────────────────────────────────────────────┘
//!                          │ stdout
//!                          ▼ [scanner]
//! ┌─────────────────────────────────────────────────────────┐
//! │        <table>...</table> fragments, one at a time      │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [tags] + [stream]
//! ┌─────────────────────────────────────────────────────────┐
//! │    {"tags":[ record , record , ... ]}  chunk by chunk   │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod scanner;
pub mod stream;
pub mod tags;
pub mod tool;
pub mod web;

pub use config::Settings;
pub use tags::{convert_fragment, TagRecord};
