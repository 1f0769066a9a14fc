//! # Error types used by the job runner and jobs.
//!
//! This module defines two main error enums:
//!
//! - [`RunnerError`] errors raised by the runner itself.
//! - [`JobError`] errors raised by a caller-supplied [`Job`](crate::Job).
//!
//! Both types provide an `as_label` helper for logs/metrics. Job errors
//! cross the runner boundary unchanged: `run` and `stop` return them
//! wrapped in [`RunnerError::Job`], and `close` annotates the first
//! failure with the offending job id.

use std::io;

use thiserror::Error;

use crate::job::JobId;

/// # Errors produced by the runner.
///
/// These represent failures of the supervision machinery itself, plus
/// job errors passed through from [`Job`](crate::Job) implementations.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RunnerError {
    /// No record exists for the requested job id. The job may never
    /// have been submitted, or its record may have been evicted.
    #[error("no such job found")]
    JobNotFound,

    /// The operation requires a live job, but this one has already
    /// terminated.
    #[error("job not running")]
    JobNotRunning,

    /// A ring buffer was configured with a capacity of zero.
    #[error("ring buffer capacity must be at least 1 byte")]
    InvalidCapacity,

    /// The context was cancelled while waiting for the collector to
    /// observe the job start.
    #[error("context canceled")]
    Canceled,

    /// An error returned by a job's `start` or `stop`, unchanged.
    #[error(transparent)]
    Job(#[from] JobError),

    /// `close` aborted because stopping one of the jobs failed.
    #[error("while stopping '{id}': {source}")]
    StopFailed {
        /// Id of the job whose `stop` failed.
        id: JobId,
        /// The underlying job error.
        source: JobError,
    },
}

impl RunnerError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RunnerError::JobNotFound => "runner_job_not_found",
            RunnerError::JobNotRunning => "runner_job_not_running",
            RunnerError::InvalidCapacity => "runner_invalid_capacity",
            RunnerError::Canceled => "runner_canceled",
            RunnerError::Job(_) => "runner_job_error",
            RunnerError::StopFailed { .. } => "runner_stop_failed",
        }
    }
}

/// # Errors produced by job execution.
///
/// Returned by [`Job::start`](crate::Job::start) and
/// [`Job::stop`](crate::Job::stop) implementations. The runner never
/// interprets these beyond propagating them.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum JobError {
    /// The job could not start, stop, or produce output.
    #[error("execution failed: {reason}")]
    Fail { reason: String },

    /// The job observed its context being cancelled.
    ///
    /// This is **not an error** in the traditional sense, but signals
    /// intentional termination.
    #[error("context canceled")]
    Canceled,
}

impl JobError {
    /// Returns a short stable label.
    pub fn as_label(&self) -> &'static str {
        match self {
            JobError::Fail { .. } => "job_failed",
            JobError::Canceled => "job_canceled",
        }
    }
}

impl From<io::Error> for JobError {
    fn from(e: io::Error) -> Self {
        JobError::Fail {
            reason: e.to_string(),
        }
    }
}
