// ==========================================
// 物流器具 KPI 引擎 - 器具数据源接口
// ==========================================
// 职责: 定义引擎所需的只读数据源操作
// - 有界明细拉取 (按更新时间倒序, LIMIT)
// - 数据源侧精确聚合 (COUNT / SUM / COUNT DISTINCT)
// 约束: 两类查询使用同一过滤谓词
// ==========================================

use async_trait::async_trait;
use std::fmt;

use crate::domain::{EquipmentKind, EquipmentRecord, KpiFilter};
use crate::repository::error::RepositoryResult;

/// 数据源侧聚合指标
///
/// 每个指标对应一条独立的聚合查询，单个失败只影响对应的概览字段。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateMetric {
    /// 记录数（类别有效的器具）
    RecordCount,
    /// Σ 数量
    TotalUnits,
    /// Σ (基础单价 + 附件单位成本) × 数量
    TotalValueFull,
    /// Σ 单台体积 (m³) × 数量
    TotalVolume,
    /// Σ 单台容量 × 数量 (包装器具)
    TotalCapacity,
    /// Σ 单台载重 × 数量 (运输工具)
    TotalLoad,
    /// Σ 最高速度 × 数量 (运输工具)
    WeightedSpeedSum,
    /// 有最高速度数据的器具数量之和 (加权平均分母)
    SpeedUnits,
    DistinctCategories,
    DistinctPlants,
    DistinctSuppliers,
    /// 覆盖的不同流向数
    DistinctFlowsCovered,
    /// 服务 ≥2 个流向的器具数
    MultiFlowCount,
    /// 运输工具可兼容的不同包装器具数
    DistinctPackagingCompatibility,
}

impl AggregateMetric {
    /// 包装器具概览所需指标
    pub const PACKAGING: [AggregateMetric; 9] = [
        AggregateMetric::RecordCount,
        AggregateMetric::TotalUnits,
        AggregateMetric::TotalValueFull,
        AggregateMetric::TotalVolume,
        AggregateMetric::TotalCapacity,
        AggregateMetric::DistinctCategories,
        AggregateMetric::DistinctPlants,
        AggregateMetric::DistinctSuppliers,
        AggregateMetric::DistinctFlowsCovered,
    ];

    /// 运输工具概览所需指标
    pub const TRANSPORT: [AggregateMetric; 10] = [
        AggregateMetric::RecordCount,
        AggregateMetric::TotalUnits,
        AggregateMetric::TotalLoad,
        AggregateMetric::WeightedSpeedSum,
        AggregateMetric::SpeedUnits,
        AggregateMetric::DistinctPackagingCompatibility,
        AggregateMetric::DistinctFlowsCovered,
        AggregateMetric::MultiFlowCount,
        AggregateMetric::DistinctCategories,
        AggregateMetric::DistinctPlants,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AggregateMetric::RecordCount => "record_count",
            AggregateMetric::TotalUnits => "total_units",
            AggregateMetric::TotalValueFull => "total_value_full",
            AggregateMetric::TotalVolume => "total_volume",
            AggregateMetric::TotalCapacity => "total_capacity",
            AggregateMetric::TotalLoad => "total_load",
            AggregateMetric::WeightedSpeedSum => "weighted_speed_sum",
            AggregateMetric::SpeedUnits => "speed_units",
            AggregateMetric::DistinctCategories => "distinct_categories",
            AggregateMetric::DistinctPlants => "distinct_plants",
            AggregateMetric::DistinctSuppliers => "distinct_suppliers",
            AggregateMetric::DistinctFlowsCovered => "distinct_flows_covered",
            AggregateMetric::MultiFlowCount => "multi_flow_count",
            AggregateMetric::DistinctPackagingCompatibility => "distinct_packaging_compatibility",
        }
    }
}

impl fmt::Display for AggregateMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 器具数据源（只读）
///
/// 实现方负责把底层错误归类为 `RepositoryError`。
#[async_trait]
pub trait EquipmentDataSource: Send + Sync {
    /// 拉取有界明细
    ///
    /// # 返回
    /// 按 updated_at DESC, id ASC 排序的至多 `limit` 条记录，
    /// 含类别/工厂/供应商、附件关联（含附件单价）、零件关联
    async fn list_equipment(
        &self,
        kind: EquipmentKind,
        filter: &KpiFilter,
        limit: usize,
    ) -> RepositoryResult<Vec<EquipmentRecord>>;

    /// 数据源侧聚合（不受 limit 限制）
    async fn aggregate(
        &self,
        kind: EquipmentKind,
        filter: &KpiFilter,
        metric: AggregateMetric,
    ) -> RepositoryResult<f64>;
}
