//! # Collector and fan-out task bodies.
//!
//! ```text
//!            start(ctx, writer)
//!   Job ───────▶ pipe ───────▶ collect() ──▶ RingBuffer ──▶ broadcast
//!                                                │
//!                              ┌─────────────────┼──────────────────┐
//!                              ▼                 ▼                  ▼
//!                          fan_out()         fan_out()          fan_out()
//!                              │                 │                  │
//!                           reader            reader             reader
//! ```
//!
//! One collector per job copies pipe output into the record's ring
//! buffer and broadcasts after every append. One fan-out task per live
//! reader replays the accumulated bytes and then tails the buffer,
//! parking on the broadcaster between appends.

use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tracing::{debug, trace};

use crate::record::JobRecord;

/// Consumes the job's pipe until end-of-stream.
///
/// Marks the record running, then appends every chunk read and
/// broadcasts it. EOF or a read error drives the terminal transition:
/// `running = false`, `stopped_at` set, one final broadcast.
pub(crate) async fn collect(record: Arc<JobRecord>, mut output: DuplexStream, scratch_size: usize) {
    record.mark_running();
    debug!(id = %record.id, "collector started");

    let mut scratch = vec![0u8; scratch_size];
    loop {
        match output.read(&mut scratch).await {
            Ok(0) | Err(_) => break,
            Ok(n) => record.append(&scratch[..n]).await,
        }
    }

    record.finish().await;
    debug!(id = %record.id, "collector finished");
}

/// Feeds one reader: replay from offset 0, then tail.
///
/// The buffer is sampled under the record's lock, but the pipe write
/// happens outside it — the consumer controls how long that write
/// blocks. A reader that falls behind the retention window is snapped
/// forward by the buffer's history-lost branch; a reader that goes away
/// entirely surfaces as a write error and detaches this task silently.
pub(crate) async fn fan_out(record: Arc<JobRecord>, mut sink: DuplexStream) {
    let mut idx = 0;
    loop {
        // Sample the wakeup epoch before the buffer, so a broadcast
        // racing with this iteration is observed by the wait below.
        let seen = record.wakeup.epoch();

        let (chunk, next) = record.read_chunk(idx).await;
        if !chunk.is_empty() && sink.write_all(&chunk).await.is_err() {
            trace!(id = %record.id, "reader detached");
            return;
        }
        idx = next;

        // The collector broadcasts once more after its terminal
        // transition, so a drained reader always gets here.
        if !record.is_running() && idx == record.end_offset().await {
            let _ = sink.shutdown().await;
            trace!(id = %record.id, "reader drained");
            return;
        }

        record.wakeup.wait(seen).await;
    }
}
