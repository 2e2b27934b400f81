//! 配置校验模块
//!
//! 校验规则：
//! - 字段级规则 (validator derive)：labels 非空、label_field 非空
//! - 标签唯一且非空白
//! - label_field 不能是空白字符串

use std::collections::HashSet;

use contracts::{PipelineBlueprint, SyncError};
use validator::{Validate, ValidationErrors};

/// 校验 PipelineBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &PipelineBlueprint) -> Result<(), SyncError> {
    blueprint.validate().map_err(from_validation_errors)?;
    validate_labels(blueprint)?;
    validate_input(blueprint)?;
    Ok(())
}

/// 把 validator 的错误树压平成第一个字段错误
fn from_validation_errors(errors: ValidationErrors) -> SyncError {
    fn first(path: String, errors: &ValidationErrors) -> Option<(String, String)> {
        for (field, kind) in errors.errors() {
            let path = if path.is_empty() {
                field.to_string()
            } else {
                format!("{path}.{field}")
            };
            match kind {
                validator::ValidationErrorsKind::Field(list) => {
                    if let Some(err) = list.first() {
                        let message = err
                            .message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| err.code.to_string());
                        return Some((path, message));
                    }
                }
                validator::ValidationErrorsKind::Struct(inner) => {
                    if let Some(found) = first(path, inner) {
                        return Some(found);
                    }
                }
                validator::ValidationErrorsKind::List(items) => {
                    for (idx, inner) in items {
                        if let Some(found) = first(format!("{path}[{idx}]"), inner) {
                            return Some(found);
                        }
                    }
                }
            }
        }
        None
    }

    match first(String::new(), &errors) {
        Some((field, message)) => SyncError::config_validation(field, message),
        None => SyncError::config_validation("<root>", errors.to_string()),
    }
}

/// 校验标签唯一性
fn validate_labels(blueprint: &PipelineBlueprint) -> Result<(), SyncError> {
    let mut seen = HashSet::new();
    for (idx, label) in blueprint.sync.labels.iter().enumerate() {
        if label.as_str().trim().is_empty() {
            return Err(SyncError::config_validation(
                format!("sync.labels[{idx}]"),
                "label cannot be blank",
            ));
        }
        if !seen.insert(label) {
            return Err(SyncError::config_validation(
                format!("sync.labels[{idx}]"),
                format!("duplicate label '{label}'"),
            ));
        }
    }
    Ok(())
}

/// 校验输入配置
fn validate_input(blueprint: &PipelineBlueprint) -> Result<(), SyncError> {
    if blueprint.input.label_field.trim().is_empty() {
        return Err(SyncError::config_validation(
            "input.label_field",
            "label_field cannot be blank",
        ));
    }
    Ok(())
}
