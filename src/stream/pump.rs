//! The per-request loop turning scanner events into body chunks.

use std::io;

use bytes::Bytes;
use log::{debug, error, info, warn};
use thiserror::Error;
use tokio::io::{AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::writer::TagArrayWriter;
use crate::scanner::{scan_fragments, Fragment, ScanEnd, ScanEvent};
use crate::tags::{convert_fragment, ConvertError};
use crate::tool::{Terminator, ToolExit, ToolResult, ToolRun};

/// One item of the response body. An `Err` ends the body abnormally.
pub type BodyChunk = Result<Bytes, StreamAborted>;

/// Error item pushed into the body when streaming fails midway.
#[derive(Error, Debug, Clone)]
#[error("tag stream aborted: {reason}")]
pub struct StreamAborted {
    reason: String,
}

impl StreamAborted {
    /// Why the stream stopped.
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Failures that end a stream early.
#[derive(Error, Debug)]
pub enum StreamError {
    /// A fragment did not convert into a record.
    #[error("conversion from xml table to tag record failed: {0}")]
    Convert(#[from] ConvertError),

    /// A record could not be encoded as JSON.
    #[error("encoding tag record failed: {0}")]
    Encode(#[from] serde_json::Error),

    /// Reading the tool's output failed.
    #[error("reading tool output failed: {0}")]
    ReadFailed(#[source] io::Error),

    /// The tool's output ended inside a table.
    #[error("tool output ended inside a table ({lines} lines, {bytes} bytes discarded)")]
    DanglingFragment {
        /// Lines of the partial fragment.
        lines: usize,
        /// Bytes of the partial fragment.
        bytes: usize,
    },

    /// The scanner stopped without a terminal event.
    #[error("fragment scanner stopped unexpectedly")]
    ScannerGone,
}

/// Terminal state of a stream.
#[derive(Debug)]
pub enum StreamState {
    /// Every fragment was streamed and the document was closed.
    Completed,

    /// The client went away; nothing was written after that.
    Aborted,

    /// Streaming stopped on an error; the document was left open.
    Failed(StreamError),
}

/// Result of [`stream_tags`].
#[derive(Debug)]
pub struct StreamOutcome {
    /// How the stream ended.
    pub state: StreamState,

    /// Records rendered before the stream stopped.
    pub records: usize,
}

impl StreamOutcome {
    /// True if the document was written completely.
    pub fn is_completed(&self) -> bool {
        matches!(self.state, StreamState::Completed)
    }

    /// True if the client disconnected.
    pub fn is_aborted(&self) -> bool {
        matches!(self.state, StreamState::Aborted)
    }
}

/// A tag stream running in the background.
#[derive(Debug)]
pub struct TagStream {
    /// Body chunks, in document order.
    pub chunks: mpsc::Receiver<BodyChunk>,

    /// The streaming loop.
    pub outcome: JoinHandle<StreamOutcome>,

    /// The tool's reaper.
    pub exit: JoinHandle<ToolResult<ToolExit>>,
}

impl TagStream {
    /// Start streaming the output of a launched tool.
    ///
    /// Both hops are bounded to one item: the scanner blocks until the loop
    /// takes its fragment, and the loop blocks until the consumer takes the
    /// rendered chunk. With a stalled consumer that still leaves up to one
    /// chunk queued, one chunk held by the loop and one fragment queued from
    /// the scanner (plus the line being read), so the tool is throttled
    /// within a few fragments of what was delivered.
    pub fn spawn(run: ToolRun) -> Self {
        let ToolRun {
            stdout,
            terminator,
            exit,
        } = run;

        let (tx, chunks) = mpsc::channel(1);
        let outcome = tokio::spawn(stream_tags(stdout, terminator, tx));

        Self {
            chunks,
            outcome,
            exit,
        }
    }
}

/// Scan `reader`, convert each fragment, and send the rendered chunks to
/// `sink` in order.
///
/// Cancellation is observed through `sink`: once its receiver is dropped the
/// loop stops without writing anything else. On any early stop the scanner
/// task is aborted, which drops (and closes) the reader, and `terminator`
/// is fired so the tool process does not keep running.
pub async fn stream_tags<R>(
    reader: R,
    mut terminator: Terminator,
    sink: mpsc::Sender<BodyChunk>,
) -> StreamOutcome
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let (event_tx, mut events) = mpsc::channel(1);
    let scanner = tokio::spawn(scan_fragments(BufReader::new(reader), event_tx));
    let mut writer = TagArrayWriter::new();

    let state = loop {
        let event = tokio::select! {
            biased;
            _ = sink.closed() => break StreamState::Aborted,
            event = events.recv() => event,
        };

        let chunk = match event {
            Some(ScanEvent::Fragment(fragment)) => match render(&mut writer, &fragment) {
                Ok(chunk) => chunk,
                Err(e) => break StreamState::Failed(e),
            },
            Some(ScanEvent::Finished(ScanEnd::Eof)) => {
                if sink.send(Ok(writer.finish())).await.is_err() {
                    break StreamState::Aborted;
                }
                break StreamState::Completed;
            }
            Some(ScanEvent::Finished(ScanEnd::Dangling { lines, bytes })) => {
                break StreamState::Failed(StreamError::DanglingFragment { lines, bytes });
            }
            Some(ScanEvent::Finished(ScanEnd::ReadFailed(e))) => {
                break StreamState::Failed(StreamError::ReadFailed(e));
            }
            None => break StreamState::Failed(StreamError::ScannerGone),
        };

        if sink.send(Ok(chunk)).await.is_err() {
            break StreamState::Aborted;
        }
    };

    let records = writer.records();
    match &state {
        StreamState::Completed => {
            info!("[stream] streamed {} tags", records);
            match scanner.await {
                Ok(stats) => debug!(
                    "[stream] scanner read {} lines, {} fragments",
                    stats.lines, stats.fragments
                ),
                Err(e) => warn!("[stream] scanner task failed: {}", e),
            }
        }
        StreamState::Aborted => {
            warn!(
                "[stream] connection interrupted by client after {} tags, stopping tool",
                records
            );
            scanner.abort();
            terminator.terminate();
        }
        StreamState::Failed(e) => {
            error!("[stream] {} (after {} tags)", e, records);
            scanner.abort();
            terminator.terminate();
            let aborted = StreamAborted {
                reason: e.to_string(),
            };
            if sink.send(Err(aborted)).await.is_err() {
                debug!("[stream] client gone before the abort could be delivered");
            }
        }
    }

    StreamOutcome { state, records }
}

fn render(writer: &mut TagArrayWriter, fragment: &Fragment) -> Result<Bytes, StreamError> {
    let text = fragment.text().map_err(ConvertError::from)?;
    let record = convert_fragment(text)?;
    Ok(writer.record(&record)?)
}
