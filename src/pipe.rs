//! # In-process byte pipes between jobs, collectors, and readers.
//!
//! ```text
//!   Job ──▶ OutputWriter ──▶ [duplex] ──▶ collector
//!   fan-out ──▶ [duplex] ──▶ OutputReader (caller)
//! ```
//!
//! [`OutputWriter`] is the write endpoint handed to a [`Job`](crate::Job):
//! a clonable handle the job writes through while the runner retains the
//! ability to close it. Closing drops the underlying stream, so the read
//! end observes EOF after draining; writes after close fail. Dropping an
//! [`OutputReader`] surfaces as a broken pipe to the task feeding it.

use std::fmt;
use std::io;
use std::sync::Arc;

use tokio::io::{AsyncWriteExt, DuplexStream};
use tokio::sync::Mutex;

/// Byte stream returned by [`JobRunner::new_reader`](crate::JobRunner::new_reader).
///
/// Blocks until bytes are available and returns EOF once the job has
/// terminated and all accumulated bytes have been delivered. Dropping it
/// detaches the feeding task; no explicit close is needed.
pub type OutputReader = DuplexStream;

/// Creates the pipe pair between a job and its collector.
pub(crate) fn output_pipe(capacity: usize) -> (OutputWriter, DuplexStream) {
    let (write_half, read_half) = tokio::io::duplex(capacity);
    (OutputWriter::new(write_half), read_half)
}

/// Clonable, explicitly closable write endpoint of a job's output pipe.
///
/// All clones write into the same stream. [`close`](OutputWriter::close)
/// is shared too: once any holder closes, every clone's writes fail and
/// the collector sees end-of-stream.
#[derive(Clone)]
pub struct OutputWriter {
    inner: Arc<Mutex<Option<DuplexStream>>>,
}

impl OutputWriter {
    pub(crate) fn new(stream: DuplexStream) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(stream))),
        }
    }

    /// Writes all of `bytes` into the pipe.
    ///
    /// Blocks while the pipe is full. Fails once the writer has been
    /// closed or the read end has gone away.
    pub async fn write_all(&self, bytes: &[u8]) -> io::Result<()> {
        let mut guard = self.inner.lock().await;
        match guard.as_mut() {
            Some(stream) => stream.write_all(bytes).await,
            None => Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "output writer closed",
            )),
        }
    }

    /// Closes the pipe: the read end observes EOF after draining, and
    /// all subsequent writes through any clone fail. Idempotent.
    pub async fn close(&self) {
        self.inner.lock().await.take();
    }

    /// Whether [`close`](OutputWriter::close) has been called.
    pub async fn is_closed(&self) -> bool {
        self.inner.lock().await.is_none()
    }
}

impl fmt::Debug for OutputWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputWriter").finish()
    }
}
