//! Temporal Operators
//!
//! ## Overview
//!
//! Two stateful condition nodes extend the boolean tree with time:
//!
//! - [`within`]: true once the inner condition has held on every pass for a
//!   continuous span of at least `duration`.
//! - [`sequence`]: a one-pass pulse when each step has a rising edge in
//!   order, first to last no more than `window` apart.
//!
//! Both measure time with the pass timestamp from the
//! [`EvalContext`](crate::condition::EvalContext), never with their own
//! clock reads, so every node in one pass agrees on `now`.
//!
//! ## `within` State Machine
//!
//! ```text
//! inner false            → pending_since = None,  output false
//! inner true, no pending → pending_since = now,   output duration == 0
//! inner true, pending    → output now - pending_since >= duration
//! ```
//!
//! A single false pass clears progress. With a 3 s duration and the inner
//! condition true from t=1 s on, the outputs at t=0..4 s are
//! `false, false, false, false, true`.
//!
//! ## `sequence` State Machine
//!
//! Every step owns an [`EdgeDetector`] that is updated on every pass, even
//! when the step is not the one being waited for, so an edge is only ever
//! seen on the pass where the step actually turns true.
//!
//! ```text
//! expecting > 0 and now - first_match > window  → reset to 0
//! rising edge on steps[expecting]               → advance (stamp first_match at 0)
//! expecting == len                              → output true once, reset
//! ```
//!
//! At most one step advances per pass; edges on any other step are ignored.

use core::fmt;
use std::time::Duration;

use log::{debug, trace};
use parking_lot::Mutex;

use crate::condition::{Condition, EvalContext, Memo, Node};
use crate::constants::MIN_SEQUENCE_LEN;
use crate::edge::EdgeDetector;
use crate::errors::{ConfigResult, ConfigurationError};
use crate::time::{duration_to_ms, elapsed_ms, seconds_to_ms, Timestamp};

/// Sustained-true over `duration_s` seconds
///
/// Fails for negative, NaN or infinite durations. A zero duration makes the
/// node follow `condition` directly.
///
/// ```rust
/// use tripwire_core::{within, Condition};
///
/// let held = within(3.0, Condition::new(|| true)).unwrap();
/// assert!(!held.evaluate_at(1_000));
/// assert!(!held.evaluate_at(3_999));
/// assert!(held.evaluate_at(4_000));
/// ```
pub fn within(duration_s: f64, condition: Condition) -> ConfigResult<Condition> {
    Ok(Within::condition(seconds_to_ms(duration_s)?, condition))
}

/// [`within`] taking a `Duration`, which cannot be negative
pub fn within_duration(duration: Duration, condition: Condition) -> Condition {
    Within::condition(duration_to_ms(duration), condition)
}

/// Ordered rising edges of every step inside `within_s` seconds
///
/// Requires at least two steps and a valid window.
pub fn sequence<I>(conditions: I, within_s: f64) -> ConfigResult<Condition>
where
    I: IntoIterator<Item = Condition>,
{
    let steps: Vec<Condition> = conditions.into_iter().collect();
    if steps.len() < MIN_SEQUENCE_LEN {
        return Err(ConfigurationError::SequenceTooShort {
            got: steps.len(),
            min: MIN_SEQUENCE_LEN,
        });
    }
    let window_ms = seconds_to_ms(within_s)?;

    Ok(Condition::from_node(Node::Sequence(Sequence::new(
        steps, window_ms,
    ))))
}

#[derive(Debug, Default)]
struct WithinState {
    pending_since: Option<Timestamp>,
    memo: Memo,
}

/// Node state for [`within`]
pub(crate) struct Within {
    duration_ms: u64,
    inner: Condition,
    state: Mutex<WithinState>,
}

impl Within {
    fn condition(duration_ms: u64, inner: Condition) -> Condition {
        Condition::from_node(Node::Within(Self {
            duration_ms,
            inner,
            state: Mutex::new(WithinState::default()),
        }))
    }

    pub(crate) fn evaluate(&self, ctx: &mut EvalContext) -> bool {
        if let Some(cached) = self.state.lock().memo.get(ctx.pass()) {
            return cached;
        }

        // Inner nodes may lock their own state, so ours is not held here.
        let holds = self.inner.evaluate(ctx);
        let now = ctx.now();

        let mut state = self.state.lock();
        let output = if !holds {
            state.pending_since = None;
            false
        } else {
            match state.pending_since {
                None => {
                    state.pending_since = Some(now);
                    self.duration_ms == 0
                }
                Some(since) => elapsed_ms(since, now) >= self.duration_ms,
            }
        };
        state.memo.set(ctx.pass(), output)
    }
}

impl fmt::Debug for Within {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Within")
            .field("duration_ms", &self.duration_ms)
            .field("inner", &self.inner)
            .finish()
    }
}

#[derive(Debug)]
struct SequenceState {
    edges: Vec<EdgeDetector>,
    expecting: usize,
    first_match: Option<Timestamp>,
    memo: Memo,
}

impl SequenceState {
    fn restart(&mut self) {
        self.expecting = 0;
        self.first_match = None;
    }
}

/// Node state for [`sequence`]
pub(crate) struct Sequence {
    steps: Vec<Condition>,
    window_ms: u64,
    state: Mutex<SequenceState>,
}

impl Sequence {
    fn new(steps: Vec<Condition>, window_ms: u64) -> Self {
        let state = SequenceState {
            edges: vec![EdgeDetector::new(); steps.len()],
            expecting: 0,
            first_match: None,
            memo: Memo::default(),
        };
        Self {
            steps,
            window_ms,
            state: Mutex::new(state),
        }
    }

    pub(crate) fn evaluate(&self, ctx: &mut EvalContext) -> bool {
        if let Some(cached) = self.state.lock().memo.get(ctx.pass()) {
            return cached;
        }

        let current: Vec<bool> = self.steps.iter().map(|step| step.evaluate(ctx)).collect();
        let now = ctx.now();

        let mut state = self.state.lock();
        let rising: Vec<bool> = state
            .edges
            .iter_mut()
            .zip(&current)
            .map(|(edge, &value)| edge.detect(value))
            .collect();

        if state.expecting > 0 {
            if let Some(first) = state.first_match {
                if elapsed_ms(first, now) > self.window_ms {
                    trace!(
                        "sequence timed out after step {} of {}",
                        state.expecting,
                        self.steps.len()
                    );
                    state.restart();
                }
            }
        }

        let mut fired = false;
        if rising[state.expecting] {
            if state.expecting == 0 {
                state.first_match = Some(now);
            }
            state.expecting += 1;

            if state.expecting == self.steps.len() {
                debug!(
                    "sequence of {} steps completed at {} ms",
                    self.steps.len(),
                    now
                );
                fired = true;
                state.restart();
            }
        }

        state.memo.set(ctx.pass(), fired)
    }
}

impl fmt::Debug for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sequence")
            .field("window_ms", &self.window_ms)
            .field("steps", &self.steps)
            .finish()
    }
}
