// ==========================================
// 物流器具 KPI 引擎 - KPI 快照对象
// ==========================================
// 职责: 定义驾驶舱输出 (概览/图表/明细表)
// ==========================================
// 口径说明（重要）:
// - overview 基于完整过滤集合精确计算（数据源侧聚合，不受 MAX_ITEMS 限制）
// - charts / table / categories 基于按更新时间倒序截取的至多 MAX_ITEMS 条明细
// - 两者不保证可互相对账：明细行求和 ≠ 概览总数 属于预期行为
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// 通用图表元素
// ==========================================

/// 分组汇总（类别/工厂/供应商/状态）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRollup {
    /// 分组键（类别 id / 工厂 id / 状态码）
    pub key: String,
    /// 展示名称
    pub label: String,
    pub count: i64,
    pub units: i64,
    pub total_value: f64,
    pub total_volume_m3: f64,
    pub total_capacity: f64,
    pub total_load_kg: f64,
}

impl GroupRollup {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            count: 0,
            units: 0,
            total_value: 0.0,
            total_volume_m3: 0.0,
            total_capacity: 0.0,
            total_load_kg: 0.0,
        }
    }
}

/// 直方图分桶
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistogramBucket {
    /// 分桶标签 (例如: "≤100", ">2000")
    pub label: String,
    /// 分桶上界（溢出桶为 None）
    pub upper_bound: Option<f64>,
    pub count: i64,
}

/// 排行项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedItem {
    pub id: String,
    pub name: String,
    pub category: String,
    pub value: f64,
}

/// 散点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScatterPoint {
    pub id: String,
    pub name: String,
    pub x: f64,
    pub y: f64,
}

/// 快照元信息
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMeta {
    /// 参与明细统计的行数（剔除类别缺失后）
    pub detail_row_count: usize,
    /// 明细行数上限
    pub max_items: usize,
    /// 明细是否触及上限（此时图表/明细只覆盖最近更新的部分器具）
    pub detail_capped: bool,
    /// 降级为 0 的概览字段
    pub degraded_fields: Vec<String>,
}

impl SnapshotMeta {
    pub fn is_degraded(&self) -> bool {
        !self.degraded_fields.is_empty()
    }
}

// ==========================================
// 包装器具 KPI
// ==========================================

/// 包装器具概览（完整集合精确值）
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackagingOverview {
    pub count_packaging_means: i64,
    pub total_units: i64,
    pub total_value_full: f64,
    pub total_volume_m3: f64,
    pub total_capacity: f64,
    pub avg_full_unit_cost: f64,
    pub distinct_categories: i64,
    pub distinct_plants: i64,
    pub distinct_suppliers: i64,
    pub distinct_flows_covered: i64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackagingCharts {
    pub value_by_category: Vec<GroupRollup>,
    pub volume_by_plant: Vec<GroupRollup>,
    pub count_by_supplier: Vec<GroupRollup>,
    pub count_by_status: Vec<GroupRollup>,
    pub capacity_histogram: Vec<HistogramBucket>,
    pub top_by_value: Vec<RankedItem>,
    pub top_by_capacity: Vec<RankedItem>,
    pub cost_volume_scatter: Vec<ScatterPoint>,
}

/// 包装器具明细行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackagingTableRow {
    pub id: String,
    pub name: String,
    pub category: String,
    pub plant: Option<String>,
    pub supplier: Option<String>,
    pub status: String,
    pub units: i64,
    pub base_price: f64,
    pub accessory_unit_cost: f64,
    pub full_unit_cost: f64,
    pub full_total_value: f64,
    pub volume_unit_m3: f64,
    pub volume_total_m3: f64,
    pub capacity_unit: f64,
    pub capacity_total: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackagingKpiSnapshot {
    pub overview: PackagingOverview,
    pub charts: PackagingCharts,
    pub table: Vec<PackagingTableRow>,
    pub meta: SnapshotMeta,
}

impl PackagingKpiSnapshot {
    /// 空快照：所有计数/求和为 0，所有数组为空
    pub fn empty(max_items: usize) -> Self {
        Self {
            meta: SnapshotMeta {
                max_items,
                ..SnapshotMeta::default()
            },
            ..Self::default()
        }
    }
}

// ==========================================
// 运输工具 KPI
// ==========================================

/// 运输工具概览（完整集合精确值）
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportOverview {
    pub count_transport_means: i64,
    pub total_units: i64,
    pub total_load_kg: f64,
    /// 按数量加权的平均最高速度
    pub avg_max_speed_kmh: f64,
    pub distinct_packaging_compatible: i64,
    pub distinct_flows_covered: i64,
    /// 服务 2 个及以上流向的运输工具数
    pub multi_flow_count: i64,
    pub distinct_categories: i64,
    pub distinct_plants: i64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportCharts {
    pub load_by_category: Vec<GroupRollup>,
    pub units_by_plant: Vec<GroupRollup>,
    pub count_by_status: Vec<GroupRollup>,
    pub load_histogram: Vec<HistogramBucket>,
    pub top_by_load: Vec<RankedItem>,
    pub speed_load_scatter: Vec<ScatterPoint>,
}

/// 运输工具类别汇总
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportCategoryRollup {
    pub category_id: String,
    pub slug: String,
    pub name: String,
    pub count: i64,
    pub units: i64,
    pub total_load_kg: f64,
    /// 类别内按器具条数的平均最高速度（无速度数据时为 0）
    pub avg_max_speed_kmh: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportKpiSnapshot {
    pub overview: TransportOverview,
    pub charts: TransportCharts,
    pub categories: Vec<TransportCategoryRollup>,
    pub meta: SnapshotMeta,
}

impl TransportKpiSnapshot {
    /// 空快照：所有计数/求和为 0，所有数组为空
    pub fn empty(max_items: usize) -> Self {
        Self {
            meta: SnapshotMeta {
                max_items,
                ..SnapshotMeta::default()
            },
            ..Self::default()
        }
    }
}

// ==========================================
// 跨域驾驶舱摘要
// ==========================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub packaging: PackagingOverview,
    pub transport: TransportOverview,
    /// 包装器具 + 运输工具 记录数
    pub total_equipment_count: i64,
    /// 包装器具 + 运输工具 数量
    pub total_units: i64,
    /// 运输工具可承载的包装器具覆盖率 (兼容包装器具数 / 包装器具记录数, 0-1)
    pub packaging_coverage_ratio: f64,
    /// 任一侧存在降级字段
    pub degraded: bool,
}
