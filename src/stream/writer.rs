//! Incremental rendering of the `{"tags":[...]}` document.

use bytes::Bytes;

use crate::tags::TagRecord;

const OPENING: &[u8] = b"{\"tags\":[";
const SEPARATOR: &[u8] = b",";
const CLOSING: &[u8] = b"]}";

/// Renders records one chunk at a time so the document never has to be
/// held in memory as a whole.
///
/// ```
/// use exiftags::stream::TagArrayWriter;
///
/// let mut writer = TagArrayWriter::new();
/// assert_eq!(&writer.finish()[..], b"{\"tags\":[]}");
/// ```
#[derive(Debug, Default)]
pub struct TagArrayWriter {
    records: usize,
}

impl TagArrayWriter {
    /// Create a writer with nothing emitted yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Render `record` prefixed with the array opening (first record) or a
    /// separator (every later record).
    pub fn record(&mut self, record: &TagRecord) -> serde_json::Result<Bytes> {
        let mut buf = Vec::with_capacity(256);
        buf.extend_from_slice(if self.records == 0 { OPENING } else { SEPARATOR });
        serde_json::to_writer(&mut buf, record)?;
        self.records += 1;
        Ok(Bytes::from(buf))
    }

    /// Render the closing token. With no records written the opening is
    /// included so the document stays valid JSON.
    pub fn finish(&self) -> Bytes {
        if self.records == 0 {
            let mut buf = Vec::with_capacity(OPENING.len() + CLOSING.len());
            buf.extend_from_slice(OPENING);
            buf.extend_from_slice(CLOSING);
            return Bytes::from(buf);
        }
        Bytes::from_static(CLOSING)
    }

    /// Number of records rendered so far.
    pub fn records(&self) -> usize {
        self.records
    }
}
