// ==========================================
// 物流器具 KPI 引擎 - 引擎层
// ==========================================
// 职责: 单器具指标、明细汇总、概览聚合、快照缓存
// 红线: Engine 不拼 SQL，数据访问经由 EquipmentDataSource
// ==========================================

pub mod cache;
pub mod metrics;
pub mod overview;
pub mod rollup;

// 重导出核心引擎
pub use cache::{Clock, KpiCache, ManualClock, SystemClock};
pub use metrics::{ItemMetrics, ItemMetricsCalculator};
pub use overview::{AggregateValues, OverviewAggregator, OverviewOutcome};
pub use rollup::{GroupDimension, RollupAggregator, UNASSIGNED_KEY};
