//! Condition Expression Trees
//!
//! ## Overview
//!
//! A [`Condition`] is a cheaply clonable handle to an immutable expression
//! node. Leaves wrap a [`Predicate`]; internal nodes combine children:
//!
//! ```text
//!              Or
//!            /    \
//!         And      Within(5s)
//!        /   \          |
//!   Leaf(t>30) Not    Leaf(door)
//!               |
//!           Leaf(fan)
//! ```
//!
//! Trees are built with the free functions [`and`], [`or`], [`not`], the
//! `&`, `|` and `!` operators, and the temporal constructors in
//! [`temporal`](crate::temporal). Rust's own operator precedence (`!` over
//! `&` over `|`) decides the tree shape, so `a | b & !c` is
//! `Or(a, And(b, Not(c)))`.
//!
//! ## Evaluation Passes
//!
//! Every evaluation runs inside an [`EvalContext`] that carries one `now`
//! for the whole pass and a unique pass id. Stateful nodes (`within`,
//! `sequence`, `rising`) remember the pass id of their last evaluation, so a
//! node shared between two rules or two branches advances its state machine
//! once per pass and hands the cached result to later visitors.
//!
//! State belongs to the node instance. Two structurally identical
//! `within(...)` calls produce two independent state machines; cloning a
//! `Condition` shares the same one.
//!
//! ## Short-Circuiting
//!
//! `And` skips its right child when the left is false, `Or` skips it when
//! the left is true. A stateful node on a skipped branch does not advance
//! on that pass.
//!
//! ## Read Failures
//!
//! Sensor-backed leaves that fail to read evaluate `false` and record the
//! failure in the context. Several leaves over the same sensor record it
//! once between two drains. The scheduler turns recorded failures into
//! [`RuleFailure::SourceRead`](crate::errors::RuleFailure) entries.

use core::cell::RefCell;
use core::fmt;
use core::ops::{BitAnd, BitOr, Not};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::warn;
use parking_lot::{Mutex, ReentrantMutex};

use crate::edge::EdgeDetector;
use crate::errors::SourceError;
use crate::sensor::Sensor;
use crate::temporal::{Sequence, Within};
use crate::time::Timestamp;

static NEXT_PASS: AtomicU64 = AtomicU64::new(1);

/// A sensor read that failed while evaluating a leaf
#[derive(Debug, Clone, PartialEq)]
pub struct ReadFailure {
    pub sensor: String,
    pub error: SourceError,
}

/// Per-pass evaluation state
#[derive(Debug)]
pub struct EvalContext {
    now: Timestamp,
    pass: u64,
    failures: Vec<ReadFailure>,
}

impl EvalContext {
    /// Opens a fresh evaluation pass at `now`
    pub fn new(now: Timestamp) -> Self {
        Self {
            now,
            pass: NEXT_PASS.fetch_add(1, Ordering::Relaxed),
            failures: Vec::new(),
        }
    }

    pub fn now(&self) -> Timestamp {
        self.now
    }

    pub fn pass(&self) -> u64 {
        self.pass
    }

    /// Records a failed read unless `sensor` already failed since the last drain
    pub fn record_failure(&mut self, sensor: impl Into<String>, error: SourceError) {
        let sensor = sensor.into();
        if self.failures.iter().any(|f| f.sensor == sensor) {
            return;
        }
        self.failures.push(ReadFailure { sensor, error });
    }

    pub fn failures(&self) -> &[ReadFailure] {
        &self.failures
    }

    /// Drains failures recorded since the last call
    pub fn take_failures(&mut self) -> Vec<ReadFailure> {
        core::mem::take(&mut self.failures)
    }
}

/// Capability to produce a boolean for the current pass
pub trait Predicate: Send + Sync {
    fn test(&self, ctx: &mut EvalContext) -> bool;
}

/// Predicate over a zero-argument closure
///
/// Calls are serialized across threads. A closure that evaluates a
/// condition containing its own leaf re-enters on the same thread; the
/// inner call is logged and answers `false` instead of deadlocking.
pub struct FnPredicate<F> {
    f: ReentrantMutex<RefCell<F>>,
}

impl<F> FnPredicate<F>
where
    F: FnMut() -> bool + Send,
{
    pub fn new(f: F) -> Self {
        Self {
            f: ReentrantMutex::new(RefCell::new(f)),
        }
    }
}

impl<F> Predicate for FnPredicate<F>
where
    F: FnMut() -> bool + Send,
{
    fn test(&self, _ctx: &mut EvalContext) -> bool {
        let guard = self.f.lock();
        let Ok(mut f) = guard.try_borrow_mut() else {
            warn!("closure predicate re-entered from its own evaluation, answering false");
            return false;
        };
        (*f)()
    }
}

/// Predicate applying a test to a sensor's value for the pass timestamp
pub struct SensorPredicate<F> {
    sensor: Arc<Sensor>,
    test: F,
}

impl<F> Predicate for SensorPredicate<F>
where
    F: Fn(f64) -> bool + Send + Sync,
{
    fn test(&self, ctx: &mut EvalContext) -> bool {
        match self.sensor.read_at(ctx.now()) {
            Ok(value) => (self.test)(value),
            Err(error) => {
                ctx.record_failure(self.sensor.name(), error);
                false
            }
        }
    }
}

/// Cached result of a stateful node for one pass
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Memo {
    pass: u64,
    value: bool,
}

impl Memo {
    pub(crate) fn get(&self, pass: u64) -> Option<bool> {
        (self.pass == pass).then_some(self.value)
    }

    pub(crate) fn set(&mut self, pass: u64, value: bool) -> bool {
        self.pass = pass;
        self.value = value;
        value
    }
}

pub(crate) struct RisingState {
    edge: EdgeDetector,
    memo: Memo,
}

pub(crate) enum Node {
    Leaf {
        label: Option<String>,
        predicate: Box<dyn Predicate>,
    },
    And(Condition, Condition),
    Or(Condition, Condition),
    Not(Condition),
    Within(Within),
    Sequence(Sequence),
    Rising {
        inner: Condition,
        state: Mutex<RisingState>,
    },
}

/// Shared handle to a boolean expression node
#[derive(Clone)]
pub struct Condition {
    node: Arc<Node>,
}

impl Condition {
    pub(crate) fn from_node(node: Node) -> Self {
        Self {
            node: Arc::new(node),
        }
    }

    /// Leaf over a zero-argument closure
    ///
    /// ```rust
    /// use tripwire_core::Condition;
    ///
    /// let hot = Condition::new(|| 31.0 > 30.0);
    /// assert!(hot.evaluate_at(0));
    /// ```
    pub fn new<F>(f: F) -> Self
    where
        F: FnMut() -> bool + Send + 'static,
    {
        Self::leaf(None, FnPredicate::new(f))
    }

    /// Closure leaf with a label shown in `Debug` output
    pub fn named<F>(label: impl Into<String>, f: F) -> Self
    where
        F: FnMut() -> bool + Send + 'static,
    {
        Self::leaf(Some(label.into()), FnPredicate::new(f))
    }

    /// Leaf over any [`Predicate`] implementation
    pub fn from_predicate<P: Predicate + 'static>(predicate: P) -> Self {
        Self::leaf(None, predicate)
    }

    /// Leaf testing a sensor's current value
    ///
    /// The sensor is read at the pass timestamp, so several leaves over the
    /// same sensor in one pass observe one physical read.
    pub fn sensor<F>(sensor: &Arc<Sensor>, test: F) -> Self
    where
        F: Fn(f64) -> bool + Send + Sync + 'static,
    {
        Self::leaf(
            Some(sensor.name().to_string()),
            SensorPredicate {
                sensor: Arc::clone(sensor),
                test,
            },
        )
    }

    fn leaf<P: Predicate + 'static>(label: Option<String>, predicate: P) -> Self {
        Self::from_node(Node::Leaf {
            label,
            predicate: Box::new(predicate),
        })
    }

    /// True only on passes where `inner` goes from false to true
    pub fn rising(inner: Condition) -> Self {
        Self::from_node(Node::Rising {
            inner,
            state: Mutex::new(RisingState {
                edge: EdgeDetector::new(),
                memo: Memo::default(),
            }),
        })
    }

    /// Evaluates within an existing pass
    pub fn evaluate(&self, ctx: &mut EvalContext) -> bool {
        match &*self.node {
            Node::Leaf { predicate, .. } => predicate.test(ctx),
            Node::And(a, b) => a.evaluate(ctx) && b.evaluate(ctx),
            Node::Or(a, b) => a.evaluate(ctx) || b.evaluate(ctx),
            Node::Not(inner) => !inner.evaluate(ctx),
            Node::Within(within) => within.evaluate(ctx),
            Node::Sequence(sequence) => sequence.evaluate(ctx),
            Node::Rising { inner, state } => {
                if let Some(cached) = state.lock().memo.get(ctx.pass()) {
                    return cached;
                }
                let current = inner.evaluate(ctx);
                let mut state = state.lock();
                let rising = state.edge.detect(current);
                state.memo.set(ctx.pass(), rising)
            }
        }
    }

    /// Evaluates in a fresh pass at `now`, discarding read failures
    pub fn evaluate_at(&self, now: Timestamp) -> bool {
        self.evaluate(&mut EvalContext::new(now))
    }

    /// Whether two handles share one node (and therefore its state)
    pub fn ptr_eq(&self, other: &Condition) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }

    /// Whether this node or any descendant carries temporal state
    pub fn is_stateful(&self) -> bool {
        match &*self.node {
            Node::Leaf { .. } => false,
            Node::And(a, b) | Node::Or(a, b) => a.is_stateful() || b.is_stateful(),
            Node::Not(inner) => inner.is_stateful(),
            Node::Within(_) | Node::Sequence(_) | Node::Rising { .. } => true,
        }
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.node {
            Node::Leaf { label: Some(label), .. } => write!(f, "Leaf({label:?})"),
            Node::Leaf { label: None, .. } => f.write_str("Leaf"),
            Node::And(a, b) => f.debug_tuple("And").field(a).field(b).finish(),
            Node::Or(a, b) => f.debug_tuple("Or").field(a).field(b).finish(),
            Node::Not(inner) => f.debug_tuple("Not").field(inner).finish(),
            Node::Within(within) => fmt::Debug::fmt(within, f),
            Node::Sequence(sequence) => fmt::Debug::fmt(sequence, f),
            Node::Rising { inner, .. } => f.debug_tuple("Rising").field(inner).finish(),
        }
    }
}

/// Both must hold; `b` is skipped when `a` is false
pub fn and(a: Condition, b: Condition) -> Condition {
    Condition::from_node(Node::And(a, b))
}

/// Either must hold; `b` is skipped when `a` is true
pub fn or(a: Condition, b: Condition) -> Condition {
    Condition::from_node(Node::Or(a, b))
}

pub fn not(inner: Condition) -> Condition {
    Condition::from_node(Node::Not(inner))
}

impl BitAnd for Condition {
    type Output = Condition;

    fn bitand(self, rhs: Condition) -> Condition {
        and(self, rhs)
    }
}

impl BitAnd for &Condition {
    type Output = Condition;

    fn bitand(self, rhs: &Condition) -> Condition {
        and(self.clone(), rhs.clone())
    }
}

impl BitOr for Condition {
    type Output = Condition;

    fn bitor(self, rhs: Condition) -> Condition {
        or(self, rhs)
    }
}

impl BitOr for &Condition {
    type Output = Condition;

    fn bitor(self, rhs: &Condition) -> Condition {
        or(self.clone(), rhs.clone())
    }
}

impl Not for Condition {
    type Output = Condition;

    fn not(self) -> Condition {
        not(self)
    }
}

impl Not for &Condition {
    type Output = Condition;

    fn not(self) -> Condition {
        not(self.clone())
    }
}
