// ==========================================
// 物流器具 KPI 引擎 - 领域模型层
// ==========================================
// 职责: 定义器具实体、过滤条件、KPI 快照
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod equipment;
pub mod filter;
pub mod kpi;
pub mod types;

// 重导出核心类型
pub use equipment::{AccessoryLink, CategoryRef, EquipmentRecord, NamedRef, PartLink};
pub use filter::KpiFilter;
pub use kpi::{
    DashboardSummary, GroupRollup, HistogramBucket, PackagingCharts, PackagingKpiSnapshot,
    PackagingOverview, PackagingTableRow, RankedItem, ScatterPoint, SnapshotMeta,
    TransportCategoryRollup, TransportCharts, TransportKpiSnapshot, TransportOverview,
};
pub use types::{EquipmentKind, EquipmentStatus, StatusFilter};
