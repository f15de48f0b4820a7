// ==========================================
// 物流器具 KPI 引擎 - 仓储层错误类型
// ==========================================
// 职责: 在数据源适配边界把底层数据库错误归类
// 工具: thiserror 派生宏
// ==========================================

use rusqlite::ErrorCode;
use thiserror::Error;

/// 仓储层错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    // ===== 数据源可用性 =====
    #[error("数据源不可用: {0}")]
    DataSourceUnavailable(String),

    #[error("数据源查询超时: operation={operation}, timeout_ms={timeout_ms}")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("数据库锁获取失败: {0}")]
    LockError(String),

    // ===== 数据结构 =====
    #[error("数据结构不匹配: {0}")]
    SchemaMismatch(String),

    #[error("字段值错误 (field={field}): {message}")]
    FieldValueError { field: String, message: String },

    // ===== 查询 =====
    #[error("数据库查询失败: {0}")]
    DatabaseQueryError(String),

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RepositoryError {
    /// 错误分类代码（日志用）
    pub fn kind(&self) -> &'static str {
        match self {
            RepositoryError::DataSourceUnavailable(_) => "UNAVAILABLE",
            RepositoryError::Timeout { .. } => "TIMEOUT",
            RepositoryError::LockError(_) => "LOCK",
            RepositoryError::SchemaMismatch(_) => "SCHEMA_MISMATCH",
            RepositoryError::FieldValueError { .. } => "FIELD_VALUE",
            RepositoryError::DatabaseQueryError(_) => "QUERY_FAILED",
            RepositoryError::InternalError(_) => "INTERNAL",
            RepositoryError::Other(_) => "OTHER",
        }
    }

    /// 是否为暂时性错误（下一次请求可能成功）
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RepositoryError::DataSourceUnavailable(_)
                | RepositoryError::Timeout { .. }
                | RepositoryError::LockError(_)
        )
    }
}

// 按 SQLite 错误码归类；SQLITE_ERROR 只能通过消息区分缺表/缺列
impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, msg) => {
                let detail = msg.clone().unwrap_or_else(|| err.to_string());
                match e.code {
                    ErrorCode::DatabaseBusy
                    | ErrorCode::DatabaseLocked
                    | ErrorCode::CannotOpen
                    | ErrorCode::NotADatabase
                    | ErrorCode::DatabaseCorrupt
                    | ErrorCode::SystemIoFailure
                    | ErrorCode::PermissionDenied => RepositoryError::DataSourceUnavailable(detail),
                    ErrorCode::SchemaChanged | ErrorCode::TypeMismatch => {
                        RepositoryError::SchemaMismatch(detail)
                    }
                    ErrorCode::Unknown
                        if detail.starts_with("no such table")
                            || detail.starts_with("no such column") =>
                    {
                        RepositoryError::SchemaMismatch(detail)
                    }
                    _ => RepositoryError::DatabaseQueryError(detail),
                }
            }
            rusqlite::Error::InvalidColumnType(idx, name, ty) => RepositoryError::FieldValueError {
                field: name.clone(),
                message: format!("列 {} 类型不匹配: {}", idx, ty),
            },
            rusqlite::Error::InvalidColumnIndex(_) | rusqlite::Error::InvalidColumnName(_) => {
                RepositoryError::SchemaMismatch(err.to_string())
            }
            rusqlite::Error::FromSqlConversionFailure(idx, _, cause) => {
                RepositoryError::FieldValueError {
                    field: format!("#{}", idx),
                    message: cause.to_string(),
                }
            }
            _ => RepositoryError::DatabaseQueryError(err.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for RepositoryError {
    fn from(err: tokio::task::JoinError) -> Self {
        RepositoryError::InternalError(format!("查询任务异常退出: {}", err))
    }
}

/// Result 类型别名
pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_缺表归类为结构不匹配() {
        let conn = Connection::open_in_memory().unwrap();
        let err = conn
            .query_row("SELECT COUNT(*) FROM equipment", [], |row| row.get::<_, i64>(0))
            .unwrap_err();

        let repo_err = RepositoryError::from(err);
        assert!(matches!(repo_err, RepositoryError::SchemaMismatch(_)), "{:?}", repo_err);
        assert_eq!(repo_err.kind(), "SCHEMA_MISMATCH");
        assert!(!repo_err.is_transient());
    }

    #[test]
    fn test_类型错误归类为字段错误() {
        let conn = Connection::open_in_memory().unwrap();
        let err = conn
            .query_row("SELECT 'abc'", [], |row| row.get::<_, i64>(0))
            .unwrap_err();

        let repo_err = RepositoryError::from(err);
        assert!(matches!(repo_err, RepositoryError::FieldValueError { .. }));
    }

    #[test]
    fn test_超时为暂时性错误() {
        let err = RepositoryError::Timeout {
            operation: "list_equipment".to_string(),
            timeout_ms: 100,
        };
        assert!(err.is_transient());
        assert_eq!(err.kind(), "TIMEOUT");
    }
}
