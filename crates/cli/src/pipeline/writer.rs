//! Downstream reducer writing tuples as JSON.

use std::io::Write;

use contracts::{LabelId, OutputFormat, Reducer, Step, SyncError, SyncedTuple};
use observability::{record_tuple_metrics, SyncMetricsAggregator};
use serde_json::Value;
use tracing::{debug, info};

pub type RecordTuple = SyncedTuple<LabelId, Value>;

/// Writes each tuple to `out`, one JSON document per tuple
///
/// Signals termination once `max_tuples` tuples have been written.
pub struct TupleWriter<W> {
    out: W,
    format: OutputFormat,
    max_tuples: Option<u64>,
    metrics: SyncMetricsAggregator,
}

impl<W: Write> TupleWriter<W> {
    pub fn new(out: W, format: OutputFormat, max_tuples: Option<u64>) -> Self {
        Self {
            out,
            format,
            max_tuples,
            metrics: SyncMetricsAggregator::new(),
        }
    }

    pub fn into_metrics(self) -> SyncMetricsAggregator {
        self.metrics
    }

    fn write_tuple(&mut self, tuple: &RecordTuple) -> Result<(), SyncError> {
        let encoded = match self.format {
            OutputFormat::JsonLines => serde_json::to_writer(&mut self.out, tuple),
            OutputFormat::Pretty => serde_json::to_writer_pretty(&mut self.out, tuple),
        };
        encoded.map_err(|e| {
            SyncError::Other(format!("failed to encode tuple {}: {e}", tuple.tuple_id))
        })?;
        self.out.write_all(b"\n")?;
        Ok(())
    }
}

impl<W: Write> Reducer<RecordTuple> for TupleWriter<W> {
    /// Tuples written so far
    type Acc = u64;

    fn init(&mut self) -> u64 {
        0
    }

    fn step(&mut self, written: u64, tuple: RecordTuple) -> Result<Step<u64>, SyncError> {
        self.write_tuple(&tuple)?;
        record_tuple_metrics(&tuple.meta, tuple.tuple_id);
        self.metrics.update(&tuple.meta, tuple.len());

        debug!(
            tuple_id = tuple.tuple_id,
            trigger = tuple.meta.trigger.as_str(),
            width = tuple.len(),
            missing = tuple.meta.missing_labels.len(),
            "tuple written"
        );

        let written = written + 1;
        match self.max_tuples {
            Some(max) if written >= max => {
                info!(tuples = written, "Reached max tuples limit");
                Ok(Step::Terminal(written))
            }
            _ => Ok(Step::Continue(written)),
        }
    }

    fn complete(&mut self, written: u64) -> Result<u64, SyncError> {
        self.out.flush()?;
        Ok(written)
    }
}
