//! Line scanner that cuts the tool's XML listing into table fragments.
//!
//! The listing is never parsed as a whole document. Each `<table ...>` block
//! is collected line by line and handed over as soon as its `</table>` line
//! has been read, so memory stays bounded by one line plus one fragment.
//! Lines are handled as raw bytes; only the fragment consumer cares about
//! their encoding, so bytes outside of any table are never decoded.

use std::io;
use std::str::Utf8Error;

use log::{debug, warn};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;

const TABLE_OPEN: &[u8] = b"<table";
const TABLE_CLOSE: &[u8] = b"</table>";

/// One complete `<table>...</table>` block, newlines included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment(Vec<u8>);

impl Fragment {
    /// The raw fragment bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The fragment as text.
    ///
    /// # Errors
    ///
    /// Fails if the tool wrote bytes that are not UTF-8 inside the table.
    pub fn text(&self) -> Result<&str, Utf8Error> {
        std::str::from_utf8(&self.0)
    }
}

/// Event sent from the scanner to its consumer.
#[derive(Debug)]
pub enum ScanEvent {
    /// A complete fragment, in stream order.
    Fragment(Fragment),

    /// Terminal event; nothing follows it.
    Finished(ScanEnd),
}

/// How the scanned stream ended.
#[derive(Debug)]
pub enum ScanEnd {
    /// Clean end of stream outside of any table.
    Eof,

    /// The stream ended inside an unterminated table.
    Dangling {
        /// Lines buffered for the partial fragment.
        lines: usize,
        /// Bytes buffered for the partial fragment.
        bytes: usize,
    },

    /// Reading the stream failed.
    ReadFailed(io::Error),
}

/// Summary returned by [`scan_fragments`] once it stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Lines read from the stream.
    pub lines: usize,
    /// Fragments delivered to the consumer.
    pub fragments: usize,
}

/// Offsets of every occurrence of `needle` in `haystack`.
fn find<'a>(haystack: &'a [u8], needle: &'a [u8]) -> impl Iterator<Item = usize> + 'a {
    haystack
        .windows(needle.len())
        .enumerate()
        .filter(move |(_, window)| *window == needle)
        .map(|(at, _)| at)
}

/// True if the line starts a table element (`<table` followed by a space,
/// `>` or `/`).
pub fn opens_table(line: &[u8]) -> bool {
    find(line, TABLE_OPEN).any(|at| {
        matches!(
            line.get(at + TABLE_OPEN.len()),
            Some(&c) if c.is_ascii_whitespace() || c == b'>' || c == b'/'
        )
    })
}

/// True if the line closes a table element.
pub fn closes_table(line: &[u8]) -> bool {
    find(line, TABLE_CLOSE).next().is_some()
}

/// Read `reader` line by line and send every complete table fragment to `tx`.
///
/// The channel is expected to be bounded; `send` waits until the consumer
/// has room, which is what keeps at most one fragment in flight. Exactly one
/// [`ScanEvent::Finished`] is sent at the end unless the consumer has
/// already dropped its receiver, in which case scanning stops early.
pub async fn scan_fragments<R>(mut reader: R, tx: mpsc::Sender<ScanEvent>) -> ScanStats
where
    R: AsyncBufRead + Unpin,
{
    let mut stats = ScanStats::default();
    let mut line = Vec::new();
    let mut buffer = Vec::new();
    let mut buffered_lines = 0usize;
    let mut inside_table = false;

    let end = loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => {
                if inside_table {
                    break ScanEnd::Dangling {
                        lines: buffered_lines,
                        bytes: buffer.len(),
                    };
                }
                break ScanEnd::Eof;
            }
            Ok(_) => {
                stats.lines += 1;

                // Open before close: a single-line table is both.
                if !inside_table && opens_table(&line) {
                    inside_table = true;
                }

                if inside_table {
                    buffer.extend_from_slice(&line);
                    buffered_lines += 1;
                }

                if closes_table(&line) {
                    if !inside_table {
                        debug!(
                            "[scanner] ignoring stray closing tag on line {}",
                            stats.lines
                        );
                        continue;
                    }

                    inside_table = false;
                    buffered_lines = 0;
                    let fragment = Fragment(std::mem::take(&mut buffer));
                    if tx.send(ScanEvent::Fragment(fragment)).await.is_err() {
                        return stats;
                    }
                    stats.fragments += 1;
                }
            }
            Err(e) => break ScanEnd::ReadFailed(e),
        }
    };

    if let ScanEnd::Dangling { lines, bytes } = &end {
        warn!(
            "[scanner] stream ended inside a table ({} lines, {} bytes buffered)",
            lines, bytes
        );
    }

    if tx.send(ScanEvent::Finished(end)).await.is_err() {
        debug!("[scanner] consumer gone before the end of the stream");
    }
    stats
}
