//! 配置解析模块
//!
//! 支持 TOML (主要) 和 JSON (可选) 格式。

use contracts::{PipelineBlueprint, SyncError};

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML 格式 (推荐)
    Toml,
    /// JSON 格式
    Json,
}

impl ConfigFormat {
    /// 从文件扩展名推断格式
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// 解析 TOML 格式配置
pub fn parse_toml(content: &str) -> Result<PipelineBlueprint, SyncError> {
    toml::from_str(content).map_err(|e| SyncError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 解析 JSON 格式配置
pub fn parse_json(content: &str) -> Result<PipelineBlueprint, SyncError> {
    serde_json::from_str(content).map_err(|e| SyncError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 根据格式解析配置
pub fn parse(content: &str, format: ConfigFormat) -> Result<PipelineBlueprint, SyncError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_toml_minimal() {
        let content = r#"
[input]
label_field = "stream"

[sync]
labels = ["camera", "lidar"]
"#;
        let result = parse_toml(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let bp = result.unwrap();
        assert_eq!(bp.input.label_field, "stream");
        assert_eq!(bp.sync.labels.len(), 2);
        assert!(bp.sync.options.reset);
        assert!(bp.sync.options.all);
        assert_eq!(bp.sync.options.back_pressure, 0);
    }

    #[test]
    fn test_parse_toml_full() {
        let content = r#"
version = "V1"

[input]
label_field = "source"

[sync]
labels = ["a", "b", "c"]
merge_only = true
reset = false
all = false
back_pressure = 8

[output]
format = "pretty"
max_tuples = 100
"#;
        let bp = parse_toml(content).unwrap();
        let options = bp.sync_options();
        assert!(options.merge_only);
        assert!(!options.reset);
        assert!(!options.all);
        assert_eq!(options.back_pressure, 8);
        assert_eq!(bp.max_tuples(), Some(100));
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "input": { "label_field": "stream" },
            "sync": { "labels": ["a", "b"], "merge_only": true },
            "output": { "format": "json_lines" }
        }"#;
        let result = parse_json(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        assert!(result.unwrap().sync.options.merge_only);
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let content = "invalid toml [[[";
        let result = parse_toml(content);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, SyncError::ConfigParse { .. }));
    }

    #[test]
    fn test_parse_missing_sync_section() {
        let content = r#"
[input]
label_field = "stream"
"#;
        assert!(matches!(
            parse_toml(content),
            Err(SyncError::ConfigParse { .. })
        ));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_extension("toml"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("TOML"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("json"),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
