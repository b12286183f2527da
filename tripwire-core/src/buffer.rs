//! Fixed-Capacity History Buffer for Sensor Samples
//!
//! ## Overview
//!
//! Every sensor records each observation into a [`HistoryBuffer`]: a ring of
//! timestamped samples with a capacity chosen at construction (default
//! 1000). When full, the oldest sample is evicted as part of the same
//! `record()` call that stores the new one.
//!
//! The buffer also carries a running [`Accumulator`] over everything it
//! retains, so whole-window statistics are O(1) to read and O(1) to keep
//! current. One narrower window can be tracked the same way
//! ([`HistoryBuffer::with_window`]): each `record()` adds the new sample to
//! it and removes the sample that slid out. [`RollingSummary`] reads
//! whichever accumulator matches its window and folds the tail only for
//! other, ad-hoc window sizes.
//!
//! ```text
//! capacity 8, tracked window 3, record(s8):
//!
//!   s1 s2 s3 s4 s5 [s6 s7 s8]     window: + s8, - s5
//!   └──────── stats ────────┘     stats:  + s8, - s0 (evicted)
//! ```
//!
//! ```text
//! HistoryBuffer (capacity 5) after 7 records:
//! ┌─────┬─────┬─────┬─────┬─────┐
//! │ s5  │ s6  │ s2  │ s3  │ s4  │  ← physical slots
//! └─────┴─────┴─────┴─────┴─────┘
//!          ↑     ↑
//!          │     └── oldest (logical index 0)
//!          └── newest
//! ```
//!
//! ## Invariants
//!
//! - `len() <= capacity()`
//! - iteration yields samples oldest to newest
//! - timestamps never decrease along the iteration order
//! - the accumulator always describes exactly the retained samples
//! - the tracked window accumulator describes exactly the newest
//!   `min(window, len)` samples
//!
//! ## Usage Example
//!
//! ```rust
//! use tripwire_core::buffer::{HistoryBuffer, Sample};
//!
//! let mut history = HistoryBuffer::new(3).unwrap();
//! for (i, v) in [1.0, 2.0, 3.0, 4.0, 5.0].into_iter().enumerate() {
//!     history.record(Sample::new(i as u64 * 100, v));
//! }
//!
//! let kept: Vec<f64> = history.iter().map(|s| s.value).collect();
//! assert_eq!(kept, vec![3.0, 4.0, 5.0]);
//! assert_eq!(history.summary(3).mean(), Some(4.0));
//! ```

use crate::constants::buffers::MIN_HISTORY_CAPACITY;
use crate::errors::{ConfigResult, ConfigurationError};
use crate::summary::{Accumulator, RollingSummary};
use crate::time::Timestamp;

/// Single observation with the time it was taken
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub timestamp: Timestamp,
    pub value: f64,
}

impl Sample {
    pub const fn new(timestamp: Timestamp, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Ring buffer of samples with an incremental accumulator
///
/// ## Thread Safety
///
/// Not synchronized. [`Sensor`](crate::sensor::Sensor) wraps it in a mutex.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    /// Storage, `capacity` slots; `None` until first written
    data: Box<[Option<Sample>]>,

    /// Index where the next write will occur
    write_pos: usize,

    /// Number of valid samples, grows until `capacity`
    len: usize,

    /// Statistics over the retained samples
    stats: Accumulator,

    /// Statistics over the newest `size` samples, if tracked
    window: Option<TrackedWindow>,
}

#[derive(Debug, Clone)]
struct TrackedWindow {
    size: usize,
    stats: Accumulator,
}

impl HistoryBuffer {
    /// Creates an empty buffer holding at most `capacity` samples
    pub fn new(capacity: usize) -> ConfigResult<Self> {
        if capacity < MIN_HISTORY_CAPACITY {
            return Err(ConfigurationError::CapacityTooSmall {
                got: capacity,
                min: MIN_HISTORY_CAPACITY,
            });
        }

        Ok(Self {
            data: vec![None; capacity].into_boxed_slice(),
            write_pos: 0,
            len: 0,
            stats: Accumulator::new(),
            window: None,
        })
    }

    /// Creates an empty buffer that also tracks the newest `window` samples
    ///
    /// A window wider than `capacity` is clamped to it; zero disables
    /// tracking.
    pub fn with_window(capacity: usize, window: usize) -> ConfigResult<Self> {
        let mut buffer = Self::new(capacity)?;
        buffer.track_window(window);
        Ok(buffer)
    }

    /// Starts tracking the newest `window` samples incrementally
    ///
    /// Folds the current tail once; later records update it in O(1).
    pub fn track_window(&mut self, window: usize) {
        self.window = (window > 0).then(|| {
            let size = window.min(self.capacity());
            TrackedWindow {
                size,
                stats: self.tail(size).map(|s| s.value).collect(),
            }
        });
    }

    /// Size of the incrementally tracked window
    pub fn tracked_window(&self) -> Option<usize> {
        self.window.as_ref().map(|w| w.size)
    }

    /// Statistics over the tracked window
    pub fn window_stats(&self) -> Option<&Accumulator> {
        self.window.as_ref().map(|w| &w.stats)
    }

    /// Appends a sample, evicting and returning the oldest one when full
    ///
    /// A sample stamped earlier than the newest retained one is recorded
    /// with the newest timestamp so the time order invariant holds.
    pub fn record(&mut self, mut sample: Sample) -> Option<Sample> {
        if let Some(last) = self.last() {
            sample.timestamp = sample.timestamp.max(last.timestamp);
        }

        let leaving = match &self.window {
            Some(w) if self.len >= w.size => self.get(self.len - w.size).map(|s| s.value),
            _ => None,
        };

        let evicted = if self.is_full() {
            self.data[self.write_pos].take()
        } else {
            None
        };

        self.data[self.write_pos] = Some(sample);
        self.write_pos = (self.write_pos + 1) % self.capacity();
        if self.len < self.capacity() {
            self.len += 1;
        }

        self.stats.add(sample.value);
        if let Some(old) = evicted {
            if self.stats.remove(old.value) {
                let (min, max) = extremes(self.iter().map(|s| s.value));
                self.stats.set_extremes(min, max);
            }
        }

        if let Some(w) = self.window.as_mut() {
            w.stats.add(sample.value);
            let size = w.size;
            if leaving.is_some_and(|old| w.stats.remove(old)) {
                let (min, max) = extremes(self.tail(size).map(|s| s.value));
                if let Some(w) = self.window.as_mut() {
                    w.stats.set_extremes(min, max);
                }
            }
        }

        evicted
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Most recent sample
    pub fn last(&self) -> Option<&Sample> {
        if self.is_empty() {
            return None;
        }

        let idx = if self.write_pos == 0 {
            self.capacity() - 1
        } else {
            self.write_pos - 1
        };

        self.data[idx].as_ref()
    }

    /// Oldest retained sample
    pub fn first(&self) -> Option<&Sample> {
        self.get(0)
    }

    /// Iterate over samples from oldest to newest
    pub fn iter(&self) -> HistoryIter<'_> {
        HistoryIter {
            buffer: self,
            index: 0,
        }
    }

    /// Iterate over the newest `window` samples, oldest first
    pub fn tail(&self, window: usize) -> HistoryIter<'_> {
        HistoryIter {
            buffer: self,
            index: self.len.saturating_sub(window),
        }
    }

    /// Statistics over every retained sample
    pub fn stats(&self) -> &Accumulator {
        &self.stats
    }

    /// Read-only summary over the newest `window` samples
    pub fn summary(&self, window: usize) -> RollingSummary<'_> {
        RollingSummary::new(self, window)
    }

    pub fn clear(&mut self) {
        self.data.iter_mut().for_each(|slot| *slot = None);
        self.write_pos = 0;
        self.len = 0;
        self.stats = Accumulator::new();
        if let Some(w) = self.window.as_mut() {
            w.stats = Accumulator::new();
        }
    }

    /// Gets a sample by logical index (0 = oldest, len-1 = newest)
    ///
    /// ```text
    /// Physical:  [D, E, A, B, C]  (write_pos = 2)
    /// Logical:   [A, B, C, D, E]
    /// logical[i] = physical[(write_pos + i) % capacity]
    /// ```
    pub fn get(&self, index: usize) -> Option<&Sample> {
        if index >= self.len {
            return None;
        }

        let actual_index = if self.len < self.capacity() {
            index
        } else {
            (self.write_pos + index) % self.capacity()
        };

        self.data[actual_index].as_ref()
    }
}

fn extremes(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}

/// Iterator over history contents
pub struct HistoryIter<'a> {
    buffer: &'a HistoryBuffer,
    index: usize,
}

impl<'a> Iterator for HistoryIter<'a> {
    type Item = &'a Sample;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.buffer.get(self.index)?;
        self.index += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.buffer.len().saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for HistoryIter<'_> {}
