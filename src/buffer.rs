//! # Bounded ring buffer with absolute-offset reads.
//!
//! [`RingBuffer`] is the backing store for job output. Writers append;
//! readers address bytes by the *absolute* number of bytes ever written,
//! which stays stable across wrap-around and needs no per-reader state
//! in the buffer itself.
//!
//! Only the most recent `capacity` bytes are retained. A reader that has
//! fallen more than one full ring behind is snapped forward: it receives
//! the entire retained window and a new offset equal to the current
//! total, so it resumes on a contiguous suffix with a detectable gap
//! (its offset advanced by more than the bytes it was handed).

use crate::error::RunnerError;

/// Initial allocation size of the buffer.
///
/// If the requested capacity is larger than this initial size, the
/// internal buffer grows to match the requested capacity as bytes are
/// written.
pub(crate) const ALLOC_SIZE: usize = 512;

/// Append-only byte sink with bounded retention.
#[derive(Debug)]
pub(crate) struct RingBuffer {
    buffer: Vec<u8>,
    capacity: usize,
    total: usize,
    wpos: usize,
}

impl RingBuffer {
    /// Creates a ring buffer retaining the last `capacity` bytes.
    ///
    /// Returns [`RunnerError::InvalidCapacity`] when `capacity` is zero.
    /// The initial physical allocation is `min(capacity, ALLOC_SIZE)`.
    pub(crate) fn new(capacity: usize) -> Result<Self, RunnerError> {
        if capacity == 0 {
            return Err(RunnerError::InvalidCapacity);
        }

        Ok(Self {
            buffer: vec![0; capacity.min(ALLOC_SIZE)],
            capacity,
            total: 0,
            wpos: 0,
        })
    }

    /// Appends `bytes` to the logical stream, overwriting the oldest
    /// bytes once `capacity` has been exceeded.
    pub(crate) fn write(&mut self, bytes: &[u8]) {
        // Grow the physical allocation while it is still below capacity
        // and this write would not fit.
        if self.buffer.len() < self.capacity && self.total + bytes.len() > self.buffer.len() {
            let size = (self.total + bytes.len())
                .max(2 * bytes.len())
                .min(self.capacity);
            self.buffer.resize(size, 0);
        }

        self.total += bytes.len();
        for &b in bytes {
            self.buffer[self.wpos] = b;
            self.wpos = (self.wpos + 1) % self.capacity;
        }
    }

    /// The absolute position just past the most recent write. Useful as
    /// a starting offset to read only bytes written from now on.
    pub(crate) fn offset(&self) -> usize {
        self.total
    }

    /// The number of bytes currently allocated for the ring.
    #[cfg(test)]
    pub(crate) fn capacity_allocated(&self) -> usize {
        self.buffer.len()
    }

    /// The entire physical array, for inspection and tests. Contents at
    /// and past `wpos` belong to the previous ring cycle.
    #[cfg(test)]
    pub(crate) fn bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Reads the bytes logically located at `[offset, total)`.
    ///
    /// Returns the bytes and the offset to pass on the next call:
    ///
    /// - `offset >= total`: nothing new, `(empty, total)`.
    /// - `offset` before the retention window, or exactly one full ring
    ///   behind: the whole retained window and `total` ("history lost,
    ///   here is everything we still have").
    /// - otherwise: the bytes from `offset` up to the write position,
    ///   and `offset + returned.len()`.
    pub(crate) fn read_offset(&self, offset: usize) -> (Vec<u8>, usize) {
        if offset >= self.total {
            return (Vec::new(), self.total);
        }

        // Where in the ring the requested offset lands.
        let pos = offset % self.capacity;

        // The offset belongs to a ring cycle that has been overwritten,
        // or the read position has been lapped by the writer. Either
        // way the requested bytes are gone; hand back the entire ring
        // starting from the current write position.
        if offset < self.total.saturating_sub(self.capacity) || pos == self.wpos {
            let mut data = Vec::with_capacity(self.capacity);
            data.extend_from_slice(&self.buffer[self.wpos..self.capacity]);
            data.extend_from_slice(&self.buffer[..self.wpos]);
            return (data, self.total);
        }

        if self.wpos < pos {
            // The valid range wraps past the end of the ring.
            let mut data = Vec::with_capacity(self.capacity - pos + self.wpos);
            data.extend_from_slice(&self.buffer[pos..self.capacity]);
            data.extend_from_slice(&self.buffer[..self.wpos]);
            let next = offset + data.len();
            return (data, next);
        }

        let data = self.buffer[pos..self.wpos].to_vec();
        let next = offset + data.len();
        (data, next)
    }
}
