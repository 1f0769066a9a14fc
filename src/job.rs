//! # Job capability and identity.
//!
//! This module defines the [`Job`] trait (async, cancelable) that
//! callers implement to describe a unit of work, and [`JobId`], the
//! opaque identity a runner hands back for it. The common handle type
//! is [`JobRef`], an `Arc<dyn Job>` suitable for sharing across the
//! runtime.
//!
//! The runner never spawns processes. Whatever a job actually does —
//! fork a process, drive a state machine, relay from a socket — it
//! surfaces here as two operations: `start` begins producing bytes into
//! the provided writer, `stop` asks it to cease.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::JobError;
use crate::pipe::OutputWriter;

/// # Shared handle to a job object.
///
/// This is the primary type accepted by [`JobRunner::run`](crate::JobRunner::run).
pub type JobRef = Arc<dyn Job>;

/// # A unit of work that produces a byte stream.
///
/// `start` is expected to *initiate* the work and return: long-running
/// production happens in tasks the job spawns itself, writing through
/// (clones of) the provided [`OutputWriter`]. A job whose producer
/// finishes on its own should close its writer so the stream terminates
/// without an explicit [`stop`](Job::stop).
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use tokio_util::sync::CancellationToken;
/// use jobtail::{Job, JobError, OutputWriter};
///
/// struct Greeter;
///
/// #[async_trait]
/// impl Job for Greeter {
///     async fn start(&self, _ctx: CancellationToken, writer: OutputWriter) -> Result<(), JobError> {
///         tokio::spawn(async move {
///             let _ = writer.write_all(b"hello\n").await;
///             writer.close().await;
///         });
///         Ok(())
///     }
///
///     async fn stop(&self, _ctx: CancellationToken) -> Result<(), JobError> {
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Job: Send + Sync + 'static {
    /// Launches the work. All output goes through `writer`.
    ///
    /// Should return once the job is initiated; the runner then waits
    /// for the first signs of life before handing back the job id.
    async fn start(&self, ctx: CancellationToken, writer: OutputWriter) -> Result<(), JobError>;

    /// Instructs the job to cease producing and release its resources.
    async fn stop(&self, ctx: CancellationToken) -> Result<(), JobError>;
}

/// Opaque, globally unique job identity.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct JobId(String);

impl JobId {
    /// Allocates a fresh random id.
    pub(crate) fn generate() -> Self {
        JobId(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        JobId(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        JobId(s.to_owned())
    }
}
