//! # Per-job shared state.
//!
//! A [`JobRecord`] is created by `run` and shared between the runner's
//! index, the job's collector task, the stop path, and every fan-out
//! task tailing the job. Its lifetime is the longest holder: eviction
//! from the index drops one `Arc`, nothing more.
//!
//! Lock discipline: `buffer` and `stopped_at` live behind the state
//! mutex; `running` is a separate atomic so `status` and the fan-out
//! termination check stay cheap. The mutex is only ever held for memory
//! operations — never across a pipe write.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

use tokio::sync::Mutex;

use crate::broadcast::Broadcaster;
use crate::buffer::RingBuffer;
use crate::job::{JobId, JobRef};
use crate::pipe::OutputWriter;

/// Point-in-time view of a job, as returned by
/// [`JobRunner::status`](crate::JobRunner::status) and
/// [`JobRunner::list`](crate::JobRunner::list).
#[derive(Clone, Debug)]
pub struct Status {
    pub id: JobId,
    /// Whether the collector is still consuming job output.
    pub running: bool,
    /// When the job was submitted.
    pub started_at: SystemTime,
    /// When the collector observed end-of-stream; `None` while the job
    /// is still producing.
    pub stopped_at: Option<SystemTime>,
}

struct OutputState {
    buffer: RingBuffer,
    stopped_at: Option<SystemTime>,
}

pub(crate) struct JobRecord {
    pub(crate) id: JobId,
    pub(crate) started_at: SystemTime,
    running: AtomicBool,
    state: Mutex<OutputState>,
    pub(crate) wakeup: Broadcaster,
    pub(crate) writer: OutputWriter,
    pub(crate) job: JobRef,
}

impl JobRecord {
    pub(crate) fn new(id: JobId, buffer: RingBuffer, writer: OutputWriter, job: JobRef) -> Self {
        Self {
            id,
            started_at: SystemTime::now(),
            running: AtomicBool::new(false),
            state: Mutex::new(OutputState {
                buffer,
                stopped_at: None,
            }),
            wakeup: Broadcaster::new(),
            writer,
            job,
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Whether the collector has ever observed the job: still running,
    /// or already terminated. `run` waits on this.
    pub(crate) async fn has_started(&self) -> bool {
        self.is_running() || self.state.lock().await.stopped_at.is_some()
    }

    /// Marks the job as live. Called by the collector before its first
    /// read; broadcast so `run`'s wait loop can observe the transition.
    pub(crate) fn mark_running(&self) {
        self.running.store(true, Ordering::SeqCst);
        self.wakeup.broadcast();
    }

    /// Appends collector output, waking all tailing readers. The
    /// broadcast happens with the buffer update already visible.
    pub(crate) async fn append(&self, bytes: &[u8]) {
        let mut state = self.state.lock().await;
        state.buffer.write(bytes);
        self.wakeup.broadcast();
    }

    /// Terminal transition: after this no further bytes are appended.
    /// The final broadcast lets drained readers observe the end.
    pub(crate) async fn finish(&self) {
        self.running.store(false, Ordering::SeqCst);
        let mut state = self.state.lock().await;
        state.stopped_at = Some(SystemTime::now());
        self.wakeup.broadcast();
    }

    /// Consistent sample of the buffer from an absolute offset.
    pub(crate) async fn read_chunk(&self, offset: usize) -> (Vec<u8>, usize) {
        self.state.lock().await.buffer.read_offset(offset)
    }

    /// The absolute position just past the most recent append.
    pub(crate) async fn end_offset(&self) -> usize {
        self.state.lock().await.buffer.offset()
    }

    /// Copy of everything the buffer still retains, from the oldest
    /// retained byte.
    pub(crate) async fn snapshot_output(&self) -> Vec<u8> {
        self.state.lock().await.buffer.read_offset(0).0
    }

    pub(crate) async fn status(&self) -> Status {
        let state = self.state.lock().await;
        Status {
            id: self.id.clone(),
            running: self.is_running(),
            started_at: self.started_at,
            stopped_at: state.stopped_at,
        }
    }
}
