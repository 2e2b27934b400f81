//! Sync Engine 指标收集模块
//!
//! 基于 TupleMeta 收集和统计同步器的运行指标。

use std::collections::HashMap;
use std::fmt::Display;

use contracts::{EmitTrigger, TupleMeta};
use metrics::{counter, gauge};

/// 从 TupleMeta 记录输出端指标
///
/// 同步器内部已记录 `label_sync_*` 指标，这里只记录写出端看到的结果。
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_tuple_metrics;
///
/// record_tuple_metrics(&tuple.meta, tuple.tuple_id);
/// ```
pub fn record_tuple_metrics<L: Display>(meta: &TupleMeta<L>, tuple_id: u64) {
    counter!("label_syncer_tuples_written_total", "trigger" => meta.trigger.as_str())
        .increment(1);

    // tuple ID (用于检测跳号)
    gauge!("label_syncer_last_tuple_id").set(tuple_id as f64);

    // 缺失标签
    if !meta.missing_labels.is_empty() {
        counter!("label_syncer_partial_tuples_total").increment(1);
        for label in &meta.missing_labels {
            counter!("label_syncer_label_missing_total", "label" => label.to_string())
                .increment(1);
        }
    }
}

/// 记录输入记录
///
/// `label` 为 None 表示记录缺少标签字段。
pub fn record_value_received(label: Option<&str>) {
    match label {
        Some(label) => counter!(
            "label_syncer_records_total",
            "label" => label.to_string(),
            "status" => "labeled"
        )
        .increment(1),
        None => counter!("label_syncer_records_total", "status" => "unlabeled").increment(1),
    }
}

/// 记录解析失败的输入行
pub fn record_malformed_line() {
    counter!("label_syncer_malformed_lines_total").increment(1);
}

/// 同步指标聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct SyncMetricsAggregator {
    /// 总 tuple 数
    pub total_tuples: u64,

    /// 缺少标签的 tuple 数
    pub partial_tuples: u64,

    /// 按触发原因计数
    pub trigger_counts: HashMap<EmitTrigger, u64>,

    /// tuple 宽度统计
    pub width_stats: RunningStats,

    /// 各标签缺失次数
    pub missing_counts: HashMap<String, u64>,
}

impl SyncMetricsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新聚合统计
    pub fn update<L: Display>(&mut self, meta: &TupleMeta<L>, width: usize) {
        self.total_tuples += 1;
        *self.trigger_counts.entry(meta.trigger).or_insert(0) += 1;
        self.width_stats.push(width as f64);

        if !meta.missing_labels.is_empty() {
            self.partial_tuples += 1;
            for label in &meta.missing_labels {
                *self.missing_counts.entry(label.to_string()).or_insert(0) += 1;
            }
        }
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        let trigger = |t: EmitTrigger| self.trigger_counts.get(&t).copied().unwrap_or(0);
        MetricsSummary {
            total_tuples: self.total_tuples,
            partial_tuples: self.partial_tuples,
            partial_rate: if self.total_tuples > 0 {
                self.partial_tuples as f64 / self.total_tuples as f64 * 100.0
            } else {
                0.0
            },
            drained_tuples: trigger(EmitTrigger::Drain),
            flushed_tuples: trigger(EmitTrigger::Flush),
            tuple_width: StatsSummary::from(&self.width_stats),
            label_missing_counts: self.missing_counts.clone(),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_tuples: u64,
    pub partial_tuples: u64,
    pub partial_rate: f64,
    pub drained_tuples: u64,
    pub flushed_tuples: u64,
    pub tuple_width: StatsSummary,
    pub label_missing_counts: HashMap<String, u64>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Sync Metrics Summary ===")?;
        writeln!(f, "Total tuples: {}", self.total_tuples)?;
        writeln!(
            f,
            "Partial tuples: {} ({:.2}%)",
            self.partial_tuples, self.partial_rate
        )?;
        writeln!(f, "Drained tuples: {}", self.drained_tuples)?;
        writeln!(f, "Flushed tuples: {}", self.flushed_tuples)?;
        writeln!(f, "Tuple width: {}", self.tuple_width)?;

        if !self.label_missing_counts.is_empty() {
            let mut counts: Vec<_> = self.label_missing_counts.iter().collect();
            counts.sort();
            writeln!(f, "Missing label counts:")?;
            for (label, count) in counts {
                writeln!(f, "  {}: {}", label, count)?;
            }
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count(),
            min: stats.min(),
            max: stats.max(),
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.2}, max={:.2}, mean={:.2}, std={:.2} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
            return;
        }

        self.min = self.min.min(value);
        self.max = self.max.max(value);

        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
