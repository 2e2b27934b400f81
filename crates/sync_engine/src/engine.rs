//! Main synchronizer implementation.

use std::collections::HashMap;
use std::fmt;

use contracts::{
    BufferMode, EmitTrigger, Label, LabelSet, Step, SyncError, SyncOptions, SyncedTuple,
    TupleMeta,
};
use tracing::{debug, instrument, trace, warn};

use crate::buffer::FifoBuffers;
use crate::latest::LatestTuple;

/// Synchronizer state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Nothing buffered
    Idle,
    /// Some labels present, waiting for the rest
    Buffering,
    /// Downstream signalled termination
    Stopped,
    /// A queue overflowed
    Failed,
    /// `complete` has run
    Completed,
}

impl SyncState {
    /// Whether the synchronizer still accepts values
    pub fn is_open(&self) -> bool {
        matches!(self, SyncState::Idle | SyncState::Buffering)
    }
}

/// Running counters of a synchronizer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Values offered through `ingest`
    pub ingested: u64,
    /// Values whose label was outside the set
    pub ignored: u64,
    /// Latest-mode values that replaced a stored value
    pub overwritten: u64,
    /// Tuples handed downstream
    pub tuples_emitted: u64,
    /// Emitted tuples missing at least one required label
    pub partial_tuples: u64,
    /// Labels discarded after being removed from the set
    pub pruned_labels: u64,
    /// Deepest any FIFO queue has been
    pub max_queue_depth: usize,
}

enum Buffers<L, T> {
    Latest(LatestTuple<L, T>),
    Fifo(FifoBuffers<L, T>),
}

impl<L: Label, T: Clone> Buffers<L, T> {
    fn is_empty(&self) -> bool {
        match self {
            Buffers::Latest(latest) => latest.is_empty(),
            Buffers::Fifo(fifo) => fifo.is_empty(),
        }
    }

    fn buffered(&self) -> usize {
        match self {
            Buffers::Latest(latest) => latest.len(),
            Buffers::Fifo(fifo) => fifo.buffered(),
        }
    }

    fn present_labels(&self) -> Vec<L> {
        match self {
            Buffers::Latest(latest) => latest.present_labels(),
            Buffers::Fifo(fifo) => fifo.present_labels(),
        }
    }

    fn prune(&mut self, labels: &LabelSet<L>) -> Vec<L> {
        match self {
            Buffers::Latest(latest) => latest.prune(labels),
            Buffers::Fifo(fifo) => fifo.prune(labels),
        }
    }

    fn clear(&mut self) -> usize {
        match self {
            Buffers::Latest(latest) => latest.clear(),
            Buffers::Fifo(fifo) => fifo.clear(),
        }
    }
}

/// Numbers tuples and keeps the emission counters
#[derive(Debug, Default)]
struct TupleEmitter {
    tuple_counter: u64,
    stats: SyncStats,
}

impl TupleEmitter {
    fn build<L: Label, T>(
        &mut self,
        labels: &LabelSet<L>,
        values: HashMap<L, T>,
        trigger: EmitTrigger,
    ) -> SyncedTuple<L, T> {
        let missing_labels: Vec<L> = labels
            .labels()
            .into_iter()
            .filter(|label| !values.contains_key(label))
            .collect();

        self.tuple_counter += 1;
        self.stats.tuples_emitted += 1;
        if !missing_labels.is_empty() {
            self.stats.partial_tuples += 1;
        }

        metrics::counter!("label_sync_tuples_total", "trigger" => trigger.as_str()).increment(1);
        metrics::histogram!("label_sync_tuple_width").record(values.len() as f64);

        debug!(
            tuple_id = self.tuple_counter,
            trigger = trigger.as_str(),
            width = values.len(),
            missing = missing_labels.len(),
            "tuple emitted"
        );

        SyncedTuple {
            tuple_id: self.tuple_counter,
            values,
            meta: TupleMeta {
                trigger,
                missing_labels,
            },
        }
    }
}

/// Labeled stream synchronizer
///
/// Consumes values one at a time, routes them by the label returned from the
/// key function and emits [`SyncedTuple`]s through a reduction `step`
/// function.
///
/// The [`LabelSet`] is held as a shared handle and read live on every
/// `ingest`/`complete` call: labels added or removed elsewhere take effect on
/// the next call. State kept for a removed label is discarded at that point.
/// All work happens synchronously inside the call; there is no background
/// task and nothing to tear down.
pub struct TupleSynchronizer<L, T, K> {
    labels: LabelSet<L>,
    key: K,
    options: SyncOptions,
    mode: BufferMode,
    buffers: Buffers<L, T>,
    state: SyncState,
    emitter: TupleEmitter,
    emitted_any: bool,
    failure: Option<(String, usize)>,
}

impl<L: Label, T: Clone, K> fmt::Debug for TupleSynchronizer<L, T, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TupleSynchronizer")
            .field("labels", &self.labels)
            .field("mode", &self.mode)
            .field("state", &self.state)
            .field("buffered", &self.buffers.buffered())
            .field("tuples", &self.emitter.tuple_counter)
            .finish()
    }
}

fn collect_step<L, T>(
    mut acc: Vec<SyncedTuple<L, T>>,
    tuple: SyncedTuple<L, T>,
) -> Result<Step<Vec<SyncedTuple<L, T>>>, SyncError> {
    acc.push(tuple);
    Ok(Step::Continue(acc))
}

impl<L: Label> TupleSynchronizer<L, L, fn(&L) -> L> {
    /// Synchronizer whose values are their own labels
    pub fn identity(labels: LabelSet<L>, options: SyncOptions) -> Self {
        Self::new(labels, options, L::clone)
    }
}

impl<L, T, K> TupleSynchronizer<L, T, K>
where
    L: Label,
    T: Clone,
    K: FnMut(&T) -> L,
{
    /// Create a synchronizer reading `labels` live and labelling values with `key`
    pub fn new(labels: LabelSet<L>, options: SyncOptions, key: K) -> Self {
        let mode = options.mode();
        let buffers = match mode {
            BufferMode::UnboundedLatest => Buffers::Latest(LatestTuple::new()),
            BufferMode::BoundedFifo { limit } => Buffers::Fifo(FifoBuffers::new(limit)),
        };

        let ignored = options.ignored_flags();
        if !ignored.is_empty() {
            debug!(?ignored, "options have no effect in bounded FIFO mode");
        }

        Self {
            labels,
            key,
            options,
            mode,
            buffers,
            state: SyncState::Idle,
            emitter: TupleEmitter::default(),
            emitted_any: false,
            failure: None,
        }
    }

    /// Offer one value; the reduction-protocol step.
    ///
    /// `step` is the downstream step function. It may be called several
    /// times in bounded FIFO mode when one value completes several matched
    /// rounds. A [`Step::Terminal`] from downstream stops the drain at once
    /// and is returned; every later call is a no-op returning `Terminal`.
    ///
    /// # Errors
    /// `BackpressureOverflow` when the value's label queue is full. The
    /// synchronizer is then failed and keeps returning that error. Errors
    /// from `step` are propagated unchanged.
    #[instrument(
        level = "trace",
        name = "label_sync_ingest",
        skip_all,
        fields(mode = ?self.mode, state = ?self.state)
    )]
    pub fn ingest_with<A, F>(&mut self, acc: A, value: T, mut step: F) -> Result<Step<A>, SyncError>
    where
        F: FnMut(A, SyncedTuple<L, T>) -> Result<Step<A>, SyncError>,
    {
        match self.state {
            SyncState::Failed => return Err(self.failure_error()),
            SyncState::Stopped => return Ok(Step::Terminal(acc)),
            SyncState::Completed => {
                trace!("value offered after completion, ignoring");
                return Ok(Step::Continue(acc));
            }
            SyncState::Idle | SyncState::Buffering => {}
        }

        self.prune_removed_labels();
        self.emitter.stats.ingested += 1;

        let label = (self.key)(&value);
        if !self.labels.contains(&label) {
            self.emitter.stats.ignored += 1;
            metrics::counter!("label_sync_values_ignored_total").increment(1);
            trace!(label = %label, "label not in set, ignoring");
            return Ok(Step::Continue(acc));
        }

        let result = match self.mode {
            BufferMode::UnboundedLatest => self.ingest_latest(acc, label, value, &mut step),
            BufferMode::BoundedFifo { .. } => self.ingest_fifo(acc, label, value, &mut step),
        };

        if self.state.is_open() {
            self.refresh_state();
        }
        result
    }

    fn ingest_latest<A, F>(
        &mut self,
        acc: A,
        label: L,
        value: T,
        step: &mut F,
    ) -> Result<Step<A>, SyncError>
    where
        F: FnMut(A, SyncedTuple<L, T>) -> Result<Step<A>, SyncError>,
    {
        let Buffers::Latest(latest) = &mut self.buffers else {
            return Ok(Step::Continue(acc));
        };

        if latest.insert(label, value) {
            self.emitter.stats.overwritten += 1;
        }

        let Some(trigger) = latest.ready(&self.labels, self.options.merge_only) else {
            return Ok(Step::Continue(acc));
        };

        let values = latest.emit(self.options.reset);
        let tuple = self.emitter.build(&self.labels, values, trigger);
        self.emitted_any = true;

        let next = step(acc, tuple)?;
        if next.is_terminal() {
            self.stop();
        }
        Ok(next)
    }

    #[instrument(
        level = "trace",
        name = "label_sync_fifo_drain",
        skip_all,
        fields(label = %label)
    )]
    fn ingest_fifo<A, F>(
        &mut self,
        mut acc: A,
        label: L,
        value: T,
        step: &mut F,
    ) -> Result<Step<A>, SyncError>
    where
        F: FnMut(A, SyncedTuple<L, T>) -> Result<Step<A>, SyncError>,
    {
        let Buffers::Fifo(fifo) = &mut self.buffers else {
            return Ok(Step::Continue(acc));
        };

        let depth = match fifo.push(label.clone(), value) {
            Ok(depth) => depth,
            Err(err) => {
                warn!(label = %label, error = %err, "backpressure limit exceeded");
                metrics::counter!(
                    "label_sync_backpressure_overflow_total",
                    "label" => label.to_string()
                )
                .increment(1);
                if let SyncError::BackpressureOverflow { label, limit } = &err {
                    self.failure = Some((label.clone(), *limit));
                }
                self.state = SyncState::Failed;
                return Err(err);
            }
        };

        metrics::gauge!("label_sync_queue_depth", "label" => label.to_string()).set(depth as f64);
        let stats = &mut self.emitter.stats;
        stats.max_queue_depth = stats.max_queue_depth.max(fifo.high_water());

        // Each round pops at least one value, so the buffered count bounds the loop
        let max_rounds = fifo.buffered();
        for _ in 0..max_rounds {
            if fifo.is_empty() || !fifo.covers(&self.labels) {
                break;
            }

            let values = fifo.take_round();
            let tuple = self.emitter.build(&self.labels, values, EmitTrigger::Drain);
            self.emitted_any = true;

            match step(acc, tuple)? {
                Step::Continue(next) => acc = next,
                Step::Terminal(last) => {
                    self.stop();
                    return Ok(Step::Terminal(last));
                }
            }
        }

        Ok(Step::Continue(acc))
    }

    /// Run the completion flush; the caller then completes downstream.
    ///
    /// Emits at most one final tuple over the lifetime of the synchronizer:
    /// - latest mode: when `all` is set, some label is present and either
    ///   `reset` is set or nothing was emitted yet
    /// - FIFO mode: when `all` is set and any queue is non-empty, one round
    ///   built like a drain step, possibly partial
    ///
    /// Whatever remains buffered is discarded. Later calls emit nothing.
    ///
    /// # Errors
    /// The stored overflow error if the synchronizer failed, or an error
    /// from `step`.
    #[instrument(
        level = "trace",
        name = "label_sync_complete",
        skip_all,
        fields(mode = ?self.mode, state = ?self.state)
    )]
    pub fn complete_with<A, F>(&mut self, acc: A, mut step: F) -> Result<A, SyncError>
    where
        F: FnMut(A, SyncedTuple<L, T>) -> Result<Step<A>, SyncError>,
    {
        match self.state {
            SyncState::Failed => return Err(self.failure_error()),
            SyncState::Completed => {
                trace!("already completed");
                return Ok(acc);
            }
            SyncState::Stopped => {
                self.buffers.clear();
                self.state = SyncState::Completed;
                return Ok(acc);
            }
            SyncState::Idle | SyncState::Buffering => {}
        }

        self.prune_removed_labels();

        let all = self.options.all;
        let flush = match &mut self.buffers {
            Buffers::Latest(latest) => {
                let due = all && !latest.is_empty() && (self.options.reset || !self.emitted_any);
                due.then(|| latest.take())
            }
            Buffers::Fifo(fifo) => (all && !fifo.is_empty()).then(|| fifo.take_round()),
        };

        let discarded = self.buffers.clear();
        if discarded > 0 {
            debug!(discarded, "discarding buffered values on completion");
        }
        self.state = SyncState::Completed;

        match flush {
            Some(values) => {
                let tuple = self.emitter.build(&self.labels, values, EmitTrigger::Flush);
                self.emitted_any = true;
                Ok(step(acc, tuple)?.into_inner())
            }
            None => Ok(acc),
        }
    }

    /// Offer one value, collecting whatever it emits
    pub fn push(&mut self, value: T) -> Result<Vec<SyncedTuple<L, T>>, SyncError> {
        self.ingest_with(Vec::new(), value, collect_step)
            .map(Step::into_inner)
    }

    /// Complete, returning the final flushed tuple if any
    pub fn finish(&mut self) -> Result<Option<SyncedTuple<L, T>>, SyncError> {
        let mut flushed = self.complete_with(Vec::new(), collect_step)?;
        Ok(flushed.pop())
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn mode(&self) -> BufferMode {
        self.mode
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Handle to the live label set
    pub fn labels(&self) -> &LabelSet<L> {
        &self.labels
    }

    /// Number of tuples emitted so far
    pub fn tuple_count(&self) -> u64 {
        self.emitter.tuple_counter
    }

    /// Values currently buffered
    pub fn buffered(&self) -> usize {
        self.buffers.buffered()
    }

    /// Labels currently holding a value
    pub fn present_labels(&self) -> Vec<L> {
        self.buffers.present_labels()
    }

    pub fn stats(&self) -> SyncStats {
        self.emitter.stats.clone()
    }

    fn prune_removed_labels(&mut self) {
        let removed = self.buffers.prune(&self.labels);
        if !removed.is_empty() {
            debug!(removed = ?removed, "labels left the set, discarding their state");
            self.emitter.stats.pruned_labels += removed.len() as u64;
        }
    }

    fn refresh_state(&mut self) {
        self.state = if self.buffers.is_empty() {
            SyncState::Idle
        } else {
            SyncState::Buffering
        };
    }

    fn stop(&mut self) {
        debug!("downstream terminated, stopping");
        self.state = SyncState::Stopped;
    }

    fn failure_error(&self) -> SyncError {
        match &self.failure {
            Some((label, limit)) => SyncError::BackpressureOverflow {
                label: label.clone(),
                limit: *limit,
            },
            None => SyncError::Other("synchronizer failed".to_string()),
        }
    }
}
