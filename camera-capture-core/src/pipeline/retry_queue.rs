use std::collections::VecDeque;

use crate::models::buffer::TimedBuffer;

/// Default bound for the skipped-audio retry queue.
pub const DEFAULT_RETRY_CAPACITY: usize = 64;

/// Bounded FIFO of audio buffers the writer was not ready for.
///
/// Audio drops are less tolerable than video drops, so refused audio buffers
/// wait here and are retried together with the next incoming buffer. The
/// queue is bounded: on overflow the oldest buffer is dropped and counted,
/// so a writer that never becomes ready cannot grow an unbounded backlog.
#[derive(Debug)]
pub struct RetryQueue {
    buffers: VecDeque<TimedBuffer>,
    capacity: usize,
    dropped: u64,
}

impl RetryQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffers: VecDeque::new(),
            capacity: capacity.max(1),
            dropped: 0,
        }
    }

    /// Queue a refused buffer, evicting the oldest on overflow.
    pub fn push(&mut self, buffer: TimedBuffer) {
        if self.buffers.len() == self.capacity {
            self.buffers.pop_front();
            self.dropped += 1;
            log::warn!(
                "audio retry queue full, dropped oldest buffer ({} dropped total)",
                self.dropped
            );
        }
        self.buffers.push_back(buffer);
    }

    /// Take the whole backlog in arrival order, leaving the queue empty.
    pub fn drain(&mut self) -> Vec<TimedBuffer> {
        self.buffers.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Buffers evicted due to the bound since creation or the last `clear`.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn clear(&mut self) {
        self.buffers.clear();
        self.dropped = 0;
    }
}

impl Default for RetryQueue {
    fn default() -> Self {
        Self::new(DEFAULT_RETRY_CAPACITY)
    }
}
