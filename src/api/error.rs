// ==========================================
// 物流器具 KPI 引擎 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，转换Repository错误为调用方可读的错误消息
// 说明: KPI 查询入口只向外暴露过滤条件校验错误，
//       数据源错误由容错层吸收为空快照
// ==========================================

use crate::api::filter_resolver::FilterValidationError;
use crate::config::ConfigError;
use crate::repository::error::RepositoryError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 输入校验错误
    // ==========================================
    #[error("过滤条件无效: {}", format_violations(.violations))]
    InvalidFilter { violations: Vec<FieldViolation> },

    #[error("配置无效: {0}")]
    InvalidConfig(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据源不可用: {0}")]
    DataSourceUnavailable(String),

    #[error("数据源查询超时: {0}")]
    Timeout(String),

    #[error("数据结构不匹配: {0}")]
    SchemaMismatch(String),

    #[error("数据库错误: {0}")]
    DatabaseError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 错误分类码
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidFilter { .. } => "INVALID_FILTER",
            ApiError::InvalidConfig(_) => "INVALID_CONFIG",
            ApiError::DataSourceUnavailable(_) => "UNAVAILABLE",
            ApiError::Timeout(_) => "TIMEOUT",
            ApiError::SchemaMismatch(_) => "SCHEMA_MISMATCH",
            ApiError::DatabaseError(_) => "QUERY_FAILED",
            ApiError::InternalError(_) => "INTERNAL",
            ApiError::Other(_) => "OTHER",
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::DataSourceUnavailable(msg) => ApiError::DataSourceUnavailable(msg),
            RepositoryError::Timeout {
                operation,
                timeout_ms,
            } => ApiError::Timeout(format!("{} ({}ms)", operation, timeout_ms)),
            RepositoryError::LockError(msg) => {
                ApiError::DataSourceUnavailable(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::SchemaMismatch(msg) => ApiError::SchemaMismatch(msg),
            RepositoryError::FieldValueError { field, message } => {
                ApiError::SchemaMismatch(format!("字段{}错误: {}", field, message))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

impl From<FilterValidationError> for ApiError {
    fn from(err: FilterValidationError) -> Self {
        ApiError::InvalidFilter {
            violations: err.violations,
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::InvalidConfig(err.to_string())
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

// ==========================================
// 校验违规详情
// ==========================================

/// 单个过滤字段的校验违规
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    /// 字段名（请求参数名，例如 plantId）
    pub field: String,
    /// 原始输入值
    pub value: String,
    /// 违规原因
    pub reason: String,
}

impl FieldViolation {
    pub fn new(field: &str, value: &str, reason: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

pub(crate) fn format_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(|v| format!("{}={:?}: {}", v.field, v.value, v.reason))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_转换() {
        let err: ApiError = RepositoryError::LockError("poisoned".to_string()).into();
        assert_eq!(err.code(), "UNAVAILABLE");

        let err: ApiError = RepositoryError::Timeout {
            operation: "list_equipment".to_string(),
            timeout_ms: 10,
        }
        .into();
        assert_eq!(err.code(), "TIMEOUT");
        assert!(err.to_string().contains("list_equipment"));
    }

    #[test]
    fn test_invalid_filter_消息包含全部字段() {
        let err = ApiError::InvalidFilter {
            violations: vec![
                FieldViolation::new("plantId", "x", "不是合法的 UUID"),
                FieldViolation::new("status", "BROKEN", "未知状态"),
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("plantId"));
        assert!(msg.contains("status"));
    }
}
