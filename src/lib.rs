// ==========================================
// 物流器具 KPI 引擎 - 核心库
// ==========================================
// 技术栈: Rust + SQLite (rusqlite) + tokio
// 系统定位: 只读分析引擎 (不修改器具记录)
// ==========================================
// 数据流: 过滤条件 → 快照缓存 → (有界明细 ∥ 精确概览) → 单器具指标 → 明细汇总 → 快照
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与快照对象
pub mod domain;

// 数据仓储层 - 器具数据源
pub mod repository;

// 引擎层 - 指标/汇总/概览/缓存
pub mod engine;

// 配置层 - KPI 配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 查询性能统计
pub mod perf;

// 日志系统
pub mod logging;

// API 层 - 查询入口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{EquipmentKind, EquipmentStatus, StatusFilter};

// 领域实体
pub use domain::{
    DashboardSummary, EquipmentRecord, KpiFilter, PackagingKpiSnapshot, TransportKpiSnapshot,
};

// 数据源
pub use repository::{EquipmentDataSource, RepositoryError, SqliteEquipmentRepository};

// 引擎
pub use engine::{
    ItemMetricsCalculator, KpiCache, OverviewAggregator, RollupAggregator, SystemClock,
};

// 配置
pub use config::{ConfigManager, KpiConfig};

// API
pub use api::{ApiError, ApiResult, FilterResolver, KpiApi, RawParam};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "物流器具 KPI 引擎";
