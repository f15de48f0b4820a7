// ==========================================
// 物流器具 KPI 引擎 - API 层
// ==========================================
// 职责: 过滤条件解析 + KPI 快照查询入口
// ==========================================

pub mod error;
pub mod filter_resolver;
pub mod kpi_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult, FieldViolation};
pub use filter_resolver::{FilterResolver, FilterValidationError, RawParam};
pub use kpi_api::KpiApi;
