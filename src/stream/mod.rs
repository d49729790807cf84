//! Streaming of tag records as one JSON document.
//!
//! ```text
//! tool stdout ──▶ scanner task ──(1 fragment)──▶ stream_tags ──(1 chunk)──▶ HTTP body
//!                                                    │
//!                                 client gone / error ▼
//!                                         abort scanner + terminate tool
//! ```
//!
//! The document is `{"tags":[` + records separated by `,` + `]}`. Every
//! record is its own chunk, so a client sees tags as soon as they are
//! converted. A stream that stops early never gets its closing `]}`.

mod pump;
mod writer;

pub use pump::{
    stream_tags, BodyChunk, StreamAborted, StreamError, StreamOutcome, StreamState, TagStream,
};
pub use writer::TagArrayWriter;
