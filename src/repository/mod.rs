// ==========================================
// 物流器具 KPI 引擎 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑，只读不写
// ==========================================
// 职责: 提供器具数据源接口及 SQLite 实现，屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod equipment_repo;
pub mod equipment_source;
pub mod error;
pub mod sql_utils;

// 重导出核心仓储
pub use equipment_repo::SqliteEquipmentRepository;
pub use equipment_source::{AggregateMetric, EquipmentDataSource};
pub use error::{RepositoryError, RepositoryResult};
