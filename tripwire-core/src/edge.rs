//! Rising-edge detection
//!
//! An [`EdgeDetector`] remembers the previous boolean it saw and reports
//! `true` only on a false→true transition. Each usage site owns its own
//! cell: every registered rule, every `sequence` step and every
//! [`Condition::rising`](crate::condition::Condition::rising) node.
//!
//! ```text
//! input:   T  T  F  T
//! output:  T  F  F  T
//! ```

/// Single-cell false→true transition detector
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EdgeDetector {
    previous: bool,
}

impl EdgeDetector {
    /// Detector whose previous value is `false`
    pub const fn new() -> Self {
        Self { previous: false }
    }

    /// Detector primed with a known previous value
    pub const fn seeded(previous: bool) -> Self {
        Self { previous }
    }

    /// Returns `current && !previous`, then stores `current`
    pub fn detect(&mut self, current: bool) -> bool {
        let rising = current && !self.previous;
        self.previous = current;
        rising
    }

    pub fn previous(&self) -> bool {
        self.previous
    }

    pub fn reset(&mut self) {
        self.previous = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_only_rising_edges() {
        let mut edge = EdgeDetector::new();
        let out: Vec<bool> = [true, true, false, true]
            .into_iter()
            .map(|v| edge.detect(v))
            .collect();
        assert_eq!(out, vec![true, false, false, true]);
    }

    #[test]
    fn seeded_true_suppresses_first_edge() {
        let mut edge = EdgeDetector::seeded(true);
        assert!(!edge.detect(true));
        assert!(!edge.detect(false));
        assert!(edge.detect(true));
    }

    #[test]
    fn reset_forgets_previous() {
        let mut edge = EdgeDetector::new();
        edge.detect(true);
        edge.reset();
        assert!(!edge.previous());
        assert!(edge.detect(true));
    }
}
