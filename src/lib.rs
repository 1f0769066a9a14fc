//! # jobtail
//!
//! **Jobtail** is an in-process job runner with streaming output fan-out.
//!
//! It supervises long-running, output-producing jobs, captures their
//! streaming output into bounded per-job buffers, and lets any number of
//! independent readers tail that output concurrently — including readers
//! that attach after a job has already produced output, or after it has
//! terminated.
//!
//! ## Features
//!
//! | Area            | Description                                                           | Key types / traits             |
//! |-----------------|-----------------------------------------------------------------------|--------------------------------|
//! | **Jobs**        | Describe work as a start/stop capability; the runner never spawns processes. | [`Job`], [`JobRef`], [`JobId`] |
//! | **Supervision** | Submit, observe, stop, and enumerate jobs.                            | [`JobRunner`], [`Status`]      |
//! | **Tailing**     | Attach byte-stream readers to live or finished jobs.                  | [`OutputReader`]               |
//! | **Retention**   | Bounded output history per job; bounded record index with LRU eviction. | [`Config`]                   |
//! | **Errors**      | Typed errors for the runner and for jobs.                             | [`RunnerError`], [`JobError`]  |
//!
//! Readers attached to a live job block until bytes are available and
//! observe end-of-file once the job has terminated and its output has
//! drained. A reader slower than the job's output rate falls behind the
//! per-job retention window and resumes at the newest retained byte —
//! delivery of every byte to every reader is deliberately not
//! guaranteed.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use tokio::io::AsyncReadExt;
//! use tokio_util::sync::CancellationToken;
//!
//! use jobtail::{Job, JobError, JobRunner, OutputWriter};
//!
//! struct Greeter;
//!
//! #[async_trait]
//! impl Job for Greeter {
//!     async fn start(&self, _ctx: CancellationToken, writer: OutputWriter) -> Result<(), JobError> {
//!         tokio::spawn(async move {
//!             let _ = writer.write_all(b"hello from the job\n").await;
//!             writer.close().await;
//!         });
//!         Ok(())
//!     }
//!
//!     async fn stop(&self, _ctx: CancellationToken) -> Result<(), JobError> {
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runner = JobRunner::new(16);
//!     let ctx = CancellationToken::new();
//!
//!     let id = runner.run(ctx.clone(), Arc::new(Greeter)).await?;
//!
//!     let mut reader = runner.new_reader(&id).await?;
//!     let mut out = Vec::new();
//!     reader.read_to_end(&mut out).await?;
//!     print!("{}", String::from_utf8_lossy(&out));
//!
//!     Ok(())
//! }
//! ```
//!
//! ---

mod broadcast;
mod buffer;
mod collector;
mod config;
mod error;
mod index;
mod job;
mod pipe;
mod record;
mod runner;

// ---- Public re-exports ----

pub use config::Config;
pub use error::{JobError, RunnerError};
pub use job::{Job, JobId, JobRef};
pub use pipe::{OutputReader, OutputWriter};
pub use record::Status;
pub use runner::JobRunner;
