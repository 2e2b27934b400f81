//! Reducer - three-operation reduction protocol
//!
//! Defines how values are pushed through an operator into a downstream
//! accumulator: `init` once, `step` per value, `complete` exactly once.

use crate::SyncError;

/// Result of a single reduction step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step<A> {
    /// Keep feeding values
    Continue(A),
    /// Downstream wants no more values
    Terminal(A),
}

impl<A> Step<A> {
    /// Unwrap the accumulator regardless of the variant
    pub fn into_inner(self) -> A {
        match self {
            Step::Continue(acc) | Step::Terminal(acc) => acc,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Step::Terminal(_))
    }
}

/// Reduction protocol consumed by stream operators.
///
/// The accumulator is opaque to operators: they only thread it between
/// `step` and `complete` calls.
pub trait Reducer<T> {
    /// Accumulated state
    type Acc;

    /// Produce the initial accumulator
    fn init(&mut self) -> Self::Acc;

    /// Fold one input into the accumulator
    ///
    /// # Errors
    /// Errors abort the reduction; `complete` is not called afterwards.
    fn step(&mut self, acc: Self::Acc, input: T) -> Result<Step<Self::Acc>, SyncError>;

    /// Finish the reduction
    fn complete(&mut self, acc: Self::Acc) -> Result<Self::Acc, SyncError>;
}

impl<T, R: Reducer<T> + ?Sized> Reducer<T> for &mut R {
    type Acc = R::Acc;

    fn init(&mut self) -> Self::Acc {
        (**self).init()
    }

    fn step(&mut self, acc: Self::Acc, input: T) -> Result<Step<Self::Acc>, SyncError> {
        (**self).step(acc, input)
    }

    fn complete(&mut self, acc: Self::Acc) -> Result<Self::Acc, SyncError> {
        (**self).complete(acc)
    }
}

/// Drive `input` through `reducer`.
///
/// Stops pulling from `input` as soon as a step returns [`Step::Terminal`],
/// then calls `complete` exactly once.
pub fn reduce<T, R, I>(mut reducer: R, input: I) -> Result<R::Acc, SyncError>
where
    R: Reducer<T>,
    I: IntoIterator<Item = T>,
{
    let mut acc = reducer.init();
    for item in input {
        match reducer.step(acc, item)? {
            Step::Continue(next) => acc = next,
            Step::Terminal(last) => {
                acc = last;
                break;
            }
        }
    }
    reducer.complete(acc)
}

/// Downstream reducer collecting every input into a `Vec`
#[derive(Debug)]
pub struct Collect<T> {
    _marker: std::marker::PhantomData<fn(T)>,
}

impl<T> Collect<T> {
    pub fn new() -> Self {
        Self {
            _marker: std::marker::PhantomData,
        }
    }
}

impl<T> Default for Collect<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Reducer<T> for Collect<T> {
    type Acc = Vec<T>;

    fn init(&mut self) -> Vec<T> {
        Vec::new()
    }

    fn step(&mut self, mut acc: Vec<T>, input: T) -> Result<Step<Vec<T>>, SyncError> {
        acc.push(input);
        Ok(Step::Continue(acc))
    }

    fn complete(&mut self, acc: Vec<T>) -> Result<Vec<T>, SyncError> {
        Ok(acc)
    }
}
