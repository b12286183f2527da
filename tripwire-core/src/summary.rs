//! Rolling Statistics over History Buffers
//!
//! ## Overview
//!
//! Two pieces cooperate here:
//!
//! - [`Accumulator`]: `{count, sum, sum_of_squares, min, max}` updated in
//!   O(1) on every insert and eviction. The [`HistoryBuffer`] owns one that
//!   always covers exactly its retained samples.
//! - [`RollingSummary`]: a read-only view borrowing a buffer and a window
//!   size. When the window covers the whole buffer it reads the buffer's
//!   accumulator directly, and when it matches the buffer's tracked window
//!   it reads that one. Only other window sizes fold the newest `window`
//!   samples.
//!
//! ## Numerics
//!
//! Variance is the population variance
//! `sum_of_squares / count - (sum / count)^2`, clamped to zero so
//! cancellation never yields a negative result. When the last sample is
//! removed the accumulator resets exactly rather than carrying residue.
//!
//! ## Text Rendering
//!
//! ```text
//! [1.0, 2.0, 3.0]  →  "avg=2.00, max=3.00 🡑"
//! [3.0, 2.0, 1.0]  →  "avg=2.00, max=3.00 🡓"
//! [2.0, 3.0, 2.0]  →  "avg=2.33, max=3.00"
//! []               →  "no data"
//! ```

use core::fmt;

use crate::buffer::HistoryBuffer;

/// Incremental min/max/mean/variance accumulator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Accumulator {
    count: usize,
    sum: f64,
    sum_sq: f64,
    min: f64,
    max: f64,
}

impl Default for Accumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Accumulator {
    pub const fn new() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            sum_sq: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    pub fn add(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.sum_sq += value * value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    /// Removes a previously added value.
    ///
    /// Returns `true` when the removed value was a current extreme, in which
    /// case the caller must supply fresh extremes via [`set_extremes`].
    ///
    /// [`set_extremes`]: Accumulator::set_extremes
    pub fn remove(&mut self, value: f64) -> bool {
        if self.count <= 1 {
            *self = Self::new();
            return false;
        }

        self.count -= 1;
        self.sum -= value;
        self.sum_sq -= value * value;
        value == self.min || value == self.max
    }

    pub fn set_extremes(&mut self, min: f64, max: f64) {
        self.min = min;
        self.max = max;
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn min(&self) -> Option<f64> {
        (self.count > 0).then_some(self.min)
    }

    pub fn max(&self) -> Option<f64> {
        (self.count > 0).then_some(self.max)
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }

    /// Population variance, never negative
    pub fn variance(&self) -> Option<f64> {
        let mean = self.mean()?;
        let v = self.sum_sq / self.count as f64 - mean * mean;
        Some(v.max(0.0))
    }
}

impl FromIterator<f64> for Accumulator {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut acc = Self::new();
        iter.into_iter().for_each(|v| acc.add(v));
        acc
    }
}

/// Direction of change across a window, comparing its first and last values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Rising,
    Falling,
    Stable,
}

impl Trend {
    fn between(first: f64, last: f64) -> Self {
        if last > first {
            Trend::Rising
        } else if last < first {
            Trend::Falling
        } else {
            Trend::Stable
        }
    }

    /// Arrow appended to rendered summaries, empty for `Stable`
    pub fn arrow(self) -> &'static str {
        match self {
            Trend::Rising => " 🡑",
            Trend::Falling => " 🡓",
            Trend::Stable => "",
        }
    }
}

/// Read-only statistics over the newest `window` samples of a buffer
#[derive(Debug, Clone, Copy)]
pub struct RollingSummary<'a> {
    buffer: &'a HistoryBuffer,
    window: usize,
}

impl<'a> RollingSummary<'a> {
    pub fn new(buffer: &'a HistoryBuffer, window: usize) -> Self {
        Self { buffer, window }
    }

    /// Number of samples the window actually covers
    pub fn count(&self) -> usize {
        self.window.min(self.buffer.len())
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    fn accumulator(&self) -> Accumulator {
        let count = self.count();
        if count == self.buffer.len() {
            return *self.buffer.stats();
        }
        match self.buffer.window_stats() {
            Some(tracked) if tracked.count() == count => *tracked,
            _ => self.buffer.tail(self.window).map(|s| s.value).collect(),
        }
    }

    /// Whether reads come from an incrementally maintained accumulator
    pub fn is_incremental(&self) -> bool {
        let count = self.count();
        count == self.buffer.len()
            || self
                .buffer
                .window_stats()
                .is_some_and(|tracked| tracked.count() == count)
    }

    pub fn min(&self) -> Option<f64> {
        self.accumulator().min()
    }

    pub fn max(&self) -> Option<f64> {
        self.accumulator().max()
    }

    pub fn mean(&self) -> Option<f64> {
        self.accumulator().mean()
    }

    pub fn variance(&self) -> Option<f64> {
        self.accumulator().variance()
    }

    pub fn std_dev(&self) -> Option<f64> {
        self.variance().map(f64::sqrt)
    }

    /// `None` with fewer than two samples in the window
    pub fn trend(&self) -> Option<Trend> {
        if self.count() < 2 {
            return None;
        }
        let first = self.buffer.tail(self.window).next()?.value;
        let last = self.buffer.last()?.value;
        Some(Trend::between(first, last))
    }

    /// Owned copy of every statistic, detached from the buffer borrow
    pub fn snapshot(&self) -> Option<SummarySnapshot> {
        let acc = self.accumulator();
        Some(SummarySnapshot {
            count: acc.count(),
            min: acc.min()?,
            max: acc.max()?,
            mean: acc.mean()?,
            variance: acc.variance()?,
            trend: self.trend(),
        })
    }

    /// Renders `avg=.., max=..` with `precision` decimals and a trend arrow
    pub fn to_text(&self, precision: usize) -> String {
        match self.snapshot() {
            Some(snapshot) => snapshot.to_text(precision),
            None => String::from("no data"),
        }
    }
}

/// Summary statistics detached from their buffer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SummarySnapshot {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub variance: f64,
    pub trend: Option<Trend>,
}

impl SummarySnapshot {
    pub fn to_text(&self, precision: usize) -> String {
        format!(
            "avg={:.p$}, max={:.p$}{}",
            self.mean,
            self.max,
            self.trend.map_or("", Trend::arrow),
            p = precision
        )
    }
}

impl fmt::Display for SummarySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let precision = f
            .precision()
            .unwrap_or(crate::constants::buffers::DEFAULT_SUMMARY_PRECISION);
        f.write_str(&self.to_text(precision))
    }
}
