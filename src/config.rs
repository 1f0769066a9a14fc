//! # Runner configuration.
//!
//! [`Config`] defines the runner's sizing: how many job records are
//! retained, how much output history each job keeps, and the chunk and
//! pipe sizes used when moving bytes around.
//!
//! # Example
//! ```
//! use jobtail::Config;
//!
//! let mut cfg = Config::default();
//! cfg.jobs_capacity = 32;
//! cfg.buffer_capacity = 1024 * 1024;
//!
//! assert_eq!(cfg.jobs_capacity, 32);
//! ```

/// Sizing configuration for a [`JobRunner`](crate::JobRunner).
///
/// Controls record retention, per-job output history, and byte-moving
/// granularity.
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum number of job records retained in the index. Inserting
    /// beyond this evicts the least-recently-accessed record.
    pub jobs_capacity: usize,
    /// Ring buffer capacity per job, in bytes. Output older than this
    /// window is lost to late or slow readers.
    pub buffer_capacity: usize,
    /// Scratch size for each collector read from the job's pipe.
    pub read_chunk: usize,
    /// Buffer size of the in-process pipes between a job and its
    /// collector, and between a fan-out task and its reader.
    pub pipe_capacity: usize,
}

impl Default for Config {
    /// Provides a default configuration:
    /// - `jobs_capacity = 128`
    /// - `buffer_capacity = 256 KiB`
    /// - `read_chunk = 2048`
    /// - `pipe_capacity = 64 KiB` (kernel pipe sized)
    fn default() -> Self {
        Self {
            jobs_capacity: 128,
            buffer_capacity: 256 * 1024,
            read_chunk: 2048,
            pipe_capacity: 64 * 1024,
        }
    }
}
