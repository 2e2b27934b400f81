//! Pipeline statistics and metrics.

use std::time::Duration;

use observability::SyncMetricsAggregator;
use sync_engine::SyncStats;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Lines received from the input
    pub lines_read: u64,

    /// Labeled records handed to the synchronizer
    pub records: u64,

    /// Lines that were not valid JSON
    pub malformed: u64,

    /// Records without a usable label field
    pub unlabeled: u64,

    /// Tuples written to the output
    pub tuples_written: u64,

    /// Total duration of the pipeline run
    pub duration: Duration,

    /// Stopped by a shutdown signal before the input ended
    pub interrupted: bool,

    /// Stopped because the output tuple limit was reached
    pub max_tuples_reached: bool,

    /// Synchronizer counters
    pub sync: SyncStats,

    /// Per-tuple metrics aggregator
    pub sync_metrics: SyncMetricsAggregator,
}

impl PipelineStats {
    /// Records processed per second
    pub fn records_per_sec(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.records as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Share of synchronizer input that was outside the label set, in percent
    pub fn ignored_rate(&self) -> f64 {
        if self.sync.ingested > 0 {
            (self.sync.ignored as f64 / self.sync.ingested as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Print detailed summary to stderr
    pub fn print_summary(&self) {
        eprintln!("\n╔══════════════════════════════════════════════════════════════╗");
        eprintln!("║                    Pipeline Statistics                       ║");
        eprintln!("╚══════════════════════════════════════════════════════════════╝\n");

        eprintln!("📊 Overview");
        eprintln!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        eprintln!("   ├─ Lines read: {}", self.lines_read);
        eprintln!("   ├─ Records: {}", self.records);
        eprintln!("   ├─ Malformed lines: {}", self.malformed);
        eprintln!("   ├─ Unlabeled records: {}", self.unlabeled);
        eprintln!("   ├─ Records/s: {:.2}", self.records_per_sec());
        eprintln!("   └─ Tuples written: {}", self.tuples_written);

        eprintln!("\n📈 Synchronizer");
        eprintln!(
            "   ├─ Ignored values: {} ({:.2}%)",
            self.sync.ignored,
            self.ignored_rate()
        );
        eprintln!("   ├─ Overwritten values: {}", self.sync.overwritten);
        eprintln!("   ├─ Partial tuples: {}", self.sync.partial_tuples);
        eprintln!("   └─ Max queue depth: {}", self.sync.max_queue_depth);

        eprintln!("\n{}", self.sync_metrics.summary());

        if self.interrupted {
            eprintln!("⚠️  Interrupted before end of input");
        } else if self.max_tuples_reached {
            eprintln!("⏹  Stopped at max tuples limit");
        }
    }
}
