//! Pipeline orchestrator - reads records, synchronizes, writes tuples.
//!
//! Input lines are read on a dedicated thread and handed over a bounded
//! channel; the synchronizer runs on the calling task.

use std::fmt;
use std::fs::File;
use std::future::Future;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::time::Instant;

use contracts::{PipelineBlueprint, Reducer, Step};
use observability::{record_malformed_line, record_value_received};
use serde_json::Value;
use sync_engine::{Synchronize, TupleSynchronizer};
use tokio::sync::mpsc;
use tracing::{info, trace, warn};

use super::record::{label_of, parse_record};
use super::writer::TupleWriter;
use super::PipelineStats;
use crate::error::{CliError, Result};

/// Where records come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Stdin,
    File(PathBuf),
}

impl InputSource {
    /// `-` selects stdin, anything else is a file path
    pub fn parse(arg: &str) -> Self {
        match arg {
            "-" => Self::Stdin,
            path => Self::File(PathBuf::from(path)),
        }
    }

    fn open(&self) -> io::Result<Box<dyn BufRead + Send>> {
        match self {
            Self::Stdin => Ok(Box::new(BufReader::new(io::stdin()))),
            Self::File(path) => Ok(Box::new(BufReader::new(File::open(path)?))),
        }
    }
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdin => write!(f, "<stdin>"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Validated blueprint, CLI overrides applied
    pub blueprint: PipelineBlueprint,

    /// Record source
    pub input: InputSource,

    /// Channel buffer size
    pub buffer_size: usize,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

type Line = io::Result<(u64, String)>;

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run until the input ends, the tuple limit is hit or `shutdown` fires
    ///
    /// The synchronizer is completed in all three cases, so a final partial
    /// tuple may still be written. Overflow and output errors abort the run.
    pub async fn run<W, S>(self, out: W, shutdown: S) -> Result<PipelineStats>
    where
        W: Write,
        S: Future<Output = ()>,
    {
        let start_time = Instant::now();
        let PipelineConfig {
            blueprint,
            input,
            buffer_size,
        } = self.config;

        let reader = input
            .open()
            .map_err(|e| CliError::input(input.to_string(), e))?;
        let (tx, mut rx) = mpsc::channel::<Line>(buffer_size.max(1));
        spawn_reader(reader, tx).map_err(|e| CliError::input(input.to_string(), e))?;

        let label_field = blueprint.input.label_field.clone();
        let key_field = label_field.clone();
        let sync = TupleSynchronizer::new(
            blueprint.label_set(),
            blueprint.sync_options(),
            move |record: &Value| label_of(record, &key_field).unwrap_or_default(),
        );
        let writer = TupleWriter::new(out, blueprint.output.format, blueprint.max_tuples());
        let mut reducer = Synchronize::new(sync, writer);

        info!(
            input = %input,
            labels = blueprint.sync.labels.len(),
            mode = ?blueprint.sync_options().mode(),
            max_tuples = ?blueprint.max_tuples(),
            "Pipeline running"
        );

        let mut stats = PipelineStats::default();
        let mut read_error = None;
        let mut acc = reducer.init();
        tokio::pin!(shutdown);

        loop {
            let next = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    warn!("Received shutdown signal, completing synchronizer");
                    stats.interrupted = true;
                    break;
                }
                next = rx.recv() => next,
            };

            let (line_no, line) = match next {
                Some(Ok(item)) => item,
                Some(Err(e)) => {
                    read_error = Some(e);
                    break;
                }
                None => break,
            };
            stats.lines_read += 1;

            let record = match parse_record(line_no, &line) {
                Ok(Some(record)) => record,
                Ok(None) => continue,
                Err(e) => {
                    stats.malformed += 1;
                    record_malformed_line();
                    warn!(error = %e, "Skipping malformed record");
                    continue;
                }
            };

            let label = label_of(&record, &label_field);
            record_value_received(label.as_deref());
            if label.is_none() {
                stats.unlabeled += 1;
                trace!(line = line_no, field = %label_field, "record has no label");
                continue;
            }
            stats.records += 1;

            match reducer.step(acc, record)? {
                Step::Continue(next) => acc = next,
                Step::Terminal(next) => {
                    acc = next;
                    stats.max_tuples_reached = true;
                    break;
                }
            }
        }
        drop(rx);

        stats.tuples_written = reducer.complete(acc)?;
        let (sync, writer) = reducer.into_parts();
        stats.sync = sync.stats();
        stats.sync_metrics = writer.into_metrics();
        stats.duration = start_time.elapsed();

        if let Some(e) = read_error {
            return Err(CliError::input(input.to_string(), e));
        }

        info!(
            tuples = stats.tuples_written,
            records = stats.records,
            duration_secs = stats.duration.as_secs_f64(),
            "Pipeline finished"
        );

        Ok(stats)
    }
}

/// Read lines on a plain thread so a blocked stdin never holds the runtime
fn spawn_reader(reader: Box<dyn BufRead + Send>, tx: mpsc::Sender<Line>) -> io::Result<()> {
    std::thread::Builder::new()
        .name("input-reader".into())
        .spawn(move || {
            for (idx, line) in reader.lines().enumerate() {
                let failed = line.is_err();
                if tx.blocking_send(line.map(|l| (idx as u64 + 1, l))).is_err() || failed {
                    break;
                }
            }
        })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use config_loader::{ConfigFormat, ConfigLoader};

    fn blueprint(extra_sync: &str, max_tuples: u64) -> PipelineBlueprint {
        let content = format!(
            r#"
[input]
label_field = "stream"

[sync]
labels = ["a", "b"]
{extra_sync}

[output]
max_tuples = {max_tuples}
"#
        );
        ConfigLoader::load_from_str(&content, ConfigFormat::Toml).unwrap()
    }

    fn input_file(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file
    }

    fn config(blueprint: PipelineBlueprint, file: &tempfile::NamedTempFile) -> PipelineConfig {
        PipelineConfig {
            blueprint,
            input: InputSource::File(file.path().to_path_buf()),
            buffer_size: 4,
        }
    }

    fn output_lines(out: Vec<u8>) -> Vec<Value> {
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_input_source_parse() {
        assert_eq!(InputSource::parse("-"), InputSource::Stdin);
        assert_eq!(
            InputSource::parse("in.ndjson"),
            InputSource::File(PathBuf::from("in.ndjson"))
        );
        assert_eq!(InputSource::Stdin.to_string(), "<stdin>");
    }

    #[tokio::test]
    async fn test_pipeline_synchronizes_records() {
        let file = input_file(&[
            r#"{"stream":"a","v":1}"#,
            r#"{"stream":"a","v":2}"#,
            r#"{"stream":"d","v":0}"#,
            "",
            "not json",
            r#"{"v":99}"#,
            r#"{"stream":"b","v":1}"#,
            r#"{"stream":"b","v":2}"#,
            r#"{"stream":"a","v":3}"#,
        ]);
        let mut out = Vec::new();

        let stats = Pipeline::new(config(blueprint("", 0), &file))
            .run(&mut out, std::future::pending())
            .await
            .unwrap();

        let tuples = output_lines(out);
        assert_eq!(tuples.len(), 2);
        assert_eq!(tuples[0]["values"]["a"]["v"], 2);
        assert_eq!(tuples[0]["values"]["b"]["v"], 1);
        assert_eq!(tuples[1]["values"]["a"]["v"], 3);
        assert_eq!(tuples[1]["values"]["b"]["v"], 2);

        assert_eq!(stats.lines_read, 9);
        assert_eq!(stats.malformed, 1);
        assert_eq!(stats.unlabeled, 1);
        assert_eq!(stats.records, 6);
        assert_eq!(stats.tuples_written, 2);
        assert_eq!(stats.sync.ignored, 1);
        assert!(!stats.interrupted);
    }

    #[tokio::test]
    async fn test_pipeline_flushes_partial_tuple() {
        let file = input_file(&[r#"{"stream":"a","v":1}"#]);
        let mut out = Vec::new();

        let stats = Pipeline::new(config(blueprint("", 0), &file))
            .run(&mut out, std::future::pending())
            .await
            .unwrap();

        let tuples = output_lines(out);
        assert_eq!(tuples.len(), 1);
        assert_eq!(tuples[0]["meta"]["trigger"], "flush");
        assert_eq!(tuples[0]["meta"]["missing_labels"], serde_json::json!(["b"]));
        assert_eq!(stats.sync_metrics.partial_tuples, 1);
    }

    #[tokio::test]
    async fn test_pipeline_stops_at_max_tuples() {
        let file = input_file(&[
            r#"{"stream":"a","v":1}"#,
            r#"{"stream":"b","v":1}"#,
            r#"{"stream":"a","v":2}"#,
            r#"{"stream":"b","v":2}"#,
            r#"{"stream":"a","v":3}"#,
        ]);
        let mut out = Vec::new();

        let stats = Pipeline::new(config(blueprint("", 1), &file))
            .run(&mut out, std::future::pending())
            .await
            .unwrap();

        assert!(stats.max_tuples_reached);
        assert_eq!(stats.tuples_written, 1);
        assert_eq!(output_lines(out).len(), 1);
    }

    #[tokio::test]
    async fn test_pipeline_overflow_fails() {
        let file = input_file(&[r#"{"stream":"a","v":1}"#, r#"{"stream":"a","v":2}"#]);

        let err = Pipeline::new(config(blueprint("back_pressure = 1", 0), &file))
            .run(Vec::new(), std::future::pending())
            .await
            .unwrap_err();

        assert!(matches!(err, CliError::Sync(ref e) if e.is_overflow()));
    }

    #[tokio::test]
    async fn test_pipeline_shutdown_still_completes() {
        let file = input_file(&[r#"{"stream":"a","v":1}"#]);
        let mut out = Vec::new();

        let stats = Pipeline::new(config(blueprint("", 0), &file))
            .run(&mut out, std::future::ready(()))
            .await
            .unwrap();

        assert!(stats.interrupted);
        assert_eq!(stats.records, 0);
        assert!(output_lines(out).is_empty());
    }

    #[tokio::test]
    async fn test_missing_input_file() {
        let bp = blueprint("", 0);
        let err = Pipeline::new(PipelineConfig {
            blueprint: bp,
            input: InputSource::File(PathBuf::from("/nonexistent/records.ndjson")),
            buffer_size: 4,
        })
        .run(Vec::new(), std::future::pending())
        .await
        .unwrap_err();

        assert!(matches!(err, CliError::Input { .. }));
    }
}
