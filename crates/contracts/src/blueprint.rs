//! PipelineBlueprint - Config Loader 输出
//!
//! 描述一次同步运行的完整配置：输入记录如何打标签、同步策略、输出方式。

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{LabelId, LabelSet, SyncOptions};

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整的同步管道配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PipelineBlueprint {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// 输入记录设置
    #[validate(nested)]
    pub input: InputConfig,

    /// 同步策略配置
    #[validate(nested)]
    pub sync: SyncSection,

    /// 输出设置
    #[serde(default)]
    pub output: OutputConfig,
}

/// 输入配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct InputConfig {
    /// 记录中保存标签的字段名 (e.g., "stream")
    #[validate(length(min = 1, message = "label_field cannot be empty"))]
    pub label_field: String,
}

/// 同步配置：必需标签集合 + 同步选项
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SyncSection {
    /// 必需标签集合，不能为空
    #[validate(length(min = 1, message = "at least one label is required"))]
    pub labels: Vec<LabelId>,

    /// merge_only / reset / all / back_pressure
    #[serde(flatten)]
    pub options: SyncOptions,
}

/// 输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// 每行一个 JSON 对象
    #[default]
    JsonLines,
    /// 多行缩进 JSON
    Pretty,
}

/// 输出配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// 输出格式
    #[serde(default)]
    pub format: OutputFormat,

    /// 最多输出的 tuple 数 (0 = 不限制)
    #[serde(default)]
    pub max_tuples: u64,
}

impl PipelineBlueprint {
    /// 构建共享标签集合
    pub fn label_set(&self) -> LabelSet<LabelId> {
        self.sync.labels.iter().cloned().collect()
    }

    /// 同步选项
    pub fn sync_options(&self) -> SyncOptions {
        self.sync.options
    }

    /// 输出上限 (None = 不限制)
    pub fn max_tuples(&self) -> Option<u64> {
        match self.output.max_tuples {
            0 => None,
            n => Some(n),
        }
    }
}
