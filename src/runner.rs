//! # Job lifecycle orchestration.
//!
//! [`JobRunner`] supervises caller-supplied [`Job`](crate::Job)s:
//! submit with [`run`](JobRunner::run), observe with
//! [`status`](JobRunner::status) / [`list`](JobRunner::list), tail
//! output with [`new_reader`](JobRunner::new_reader), terminate with
//! [`stop`](JobRunner::stop) / [`close`](JobRunner::close).
//!
//! # High-level architecture
//!
//! ```text
//!   run(ctx, job) ──▶ JobRecord ──▶ LruIndex
//!                        │
//!                   collect task ──▶ RingBuffer + broadcast
//!                                        │
//!   new_reader(id) ──▶ fan_out task ─────┘──▶ OutputReader
//! ```
//!
//! Records are retained in a bounded LRU index; submitting beyond its
//! capacity evicts the least-recently-accessed record. Eviction only
//! forgets the record — a still-running evicted job keeps collecting
//! into its buffer, but can no longer be looked up, stopped, or read.

use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::buffer::RingBuffer;
use crate::collector;
use crate::config::Config;
use crate::error::{JobError, RunnerError};
use crate::index::LruIndex;
use crate::job::{JobId, JobRef};
use crate::pipe::{output_pipe, OutputReader};
use crate::record::{JobRecord, Status};

/// Supervises jobs and fans their output out to readers.
pub struct JobRunner {
    jobs: LruIndex<JobId, JobRecord>,
    /// Serializes `new_reader`, `stop`, `list`, and `close` against
    /// each other, keeping their lookups and enumerations race-free
    /// with respect to eviction.
    ops: Mutex<()>,
    cfg: Config,
}

impl JobRunner {
    /// Creates a runner retaining at most `capacity` job records, with
    /// default sizing for everything else.
    pub fn new(capacity: usize) -> Self {
        Self::with_config(Config {
            jobs_capacity: capacity,
            ..Config::default()
        })
    }

    pub fn with_config(cfg: Config) -> Self {
        Self {
            jobs: LruIndex::new(cfg.jobs_capacity),
            ops: Mutex::new(()),
            cfg,
        }
    }

    /// Submits a job and returns its id once it is observably running.
    ///
    /// The record is registered *before* `job.start` is invoked. If
    /// `start` fails, the error is returned and the record stays
    /// registered: its writer is closed so the collector drains and the
    /// record settles at `running = false` with `stopped_at` set.
    ///
    /// Cancelling `ctx` while waiting for the job to start returns
    /// [`RunnerError::Canceled`]; once this method has returned the id,
    /// the job runs until it finishes or [`stop`](JobRunner::stop) is
    /// called.
    pub async fn run(&self, ctx: CancellationToken, job: JobRef) -> Result<JobId, RunnerError> {
        let buffer = RingBuffer::new(self.cfg.buffer_capacity)?;
        let (writer, job_output) = output_pipe(self.cfg.pipe_capacity);

        let record = Arc::new(JobRecord::new(
            JobId::generate(),
            buffer,
            writer.clone(),
            job.clone(),
        ));
        let id = record.id.clone();

        tokio::spawn(collector::collect(
            record.clone(),
            job_output,
            self.cfg.read_chunk,
        ));
        self.jobs.add(id.clone(), record.clone());

        if let Err(e) = job.start(ctx.clone(), writer).await {
            // Close the writer so the collector observes EOF and the
            // record settles terminated.
            record.writer.close().await;
            return Err(RunnerError::Job(e));
        }

        loop {
            let seen = record.wakeup.epoch();
            if record.has_started().await {
                break;
            }
            tokio::select! {
                _ = ctx.cancelled() => return Err(RunnerError::Canceled),
                _ = record.wakeup.wait(seen) => {}
            }
        }

        debug!(id = %id, "job submitted");
        Ok(id)
    }

    /// Returns a byte stream over the job's output.
    ///
    /// For a terminated job this is a finite snapshot of the buffer's
    /// retained contents, immediately readable without blocking. For a
    /// live job it is a tail: accumulated bytes are replayed, then new
    /// output streams until the job terminates and drains, at which
    /// point the stream ends. Each call returns an independent stream;
    /// a consumer slower than the job's output rate may lose history to
    /// the retention window and resume at the newest retained byte.
    pub async fn new_reader(&self, id: &JobId) -> Result<OutputReader, RunnerError> {
        let _ops = self.ops.lock().await;

        let record = self.jobs.get(id).ok_or(RunnerError::JobNotFound)?;

        // Terminated: hand back a copy of what the buffer retains.
        if !record.is_running() {
            let snapshot = record.snapshot_output().await;
            let (mut writer, reader) = tokio::io::duplex(snapshot.len().max(1));
            // The pipe is sized to the snapshot; this cannot block, and
            // the read end is alive in scope.
            let _ = writer.write_all(&snapshot).await;
            return Ok(reader);
        }

        let (writer, reader) = tokio::io::duplex(self.cfg.pipe_capacity);
        tokio::spawn(collector::fan_out(record, writer));
        Ok(reader)
    }

    /// Stops a running job.
    ///
    /// Errors from the job's own `stop` are propagated without closing
    /// the writer, leaving the job intact so the caller can retry. On
    /// success the writer is closed, which drives the collector to the
    /// terminated state.
    pub async fn stop(&self, ctx: CancellationToken, id: &JobId) -> Result<(), RunnerError> {
        let _ops = self.ops.lock().await;

        let record = self.jobs.get(id).ok_or(RunnerError::JobNotFound)?;
        if !record.is_running() {
            return Err(RunnerError::JobNotRunning);
        }

        self.stop_record(ctx, &record).await.map_err(RunnerError::Job)
    }

    async fn stop_record(&self, ctx: CancellationToken, record: &JobRecord) -> Result<(), JobError> {
        record.job.stop(ctx).await?;

        // Closing the writer makes the collector's read return EOF,
        // which drives the transition to the terminated state.
        record.writer.close().await;
        debug!(id = %record.id, "job stopped");
        Ok(())
    }

    /// Non-blocking view of one job. Returns `None` for unknown or
    /// evicted ids. Looking a job up counts as an access for eviction
    /// purposes.
    pub async fn status(&self, id: &JobId) -> Option<Status> {
        let record = self.jobs.get(id)?;
        Some(record.status().await)
    }

    /// Snapshot of every record currently in the index, in unspecified
    /// order.
    pub async fn list(&self) -> Vec<Status> {
        let _ops = self.ops.lock().await;

        let mut records = Vec::with_capacity(self.jobs.len());
        self.jobs.each(|_, record| records.push(record.clone()));

        let mut result = Vec::with_capacity(records.len());
        for record in records {
            result.push(record.status().await);
        }
        result
    }

    /// Stops every still-running job.
    ///
    /// Already-terminated records are skipped. The first failure aborts
    /// the sweep and is returned wrapped with the offending job id;
    /// jobs stopped before the failure stay stopped.
    pub async fn close(&self, ctx: CancellationToken) -> Result<(), RunnerError> {
        let _ops = self.ops.lock().await;

        let mut records = Vec::with_capacity(self.jobs.len());
        self.jobs.each(|_, record| records.push(record.clone()));

        for record in records {
            if !record.is_running() {
                continue;
            }
            if let Err(e) = self.stop_record(ctx.clone(), &record).await {
                return Err(RunnerError::StopFailed {
                    id: record.id.clone(),
                    source: e,
                });
            }
        }
        Ok(())
    }
}
