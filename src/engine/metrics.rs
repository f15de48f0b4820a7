// ==========================================
// 物流器具 KPI 引擎 - 单器具指标计算
// ==========================================
// 职责: 由单条器具记录推导体积、成本、容量、载重
// 输入: EquipmentRecord (已加载附件/零件关联)
// 输出: ItemMetrics (类别缺失的记录不产出)
// 红线: 纯函数，无 I/O，无缓存
// ==========================================

use crate::domain::{CategoryRef, EquipmentRecord};

/// mm³ → m³
const MM3_PER_M3: f64 = 1_000_000_000.0;

/// 单器具派生指标
///
/// 借用原记录，计算结果与记录一一对应。
#[derive(Debug, Clone, PartialEq)]
pub struct ItemMetrics<'a> {
    pub record: &'a EquipmentRecord,
    /// 已解析的类别（类别缺失的记录在计算阶段即被剔除）
    pub category: &'a CategoryRef,

    pub volume_unit_m3: f64,
    pub volume_total_m3: f64,
    pub accessory_unit_cost: f64,
    pub full_unit_cost: f64,
    pub full_total_value: f64,
    pub capacity_unit: f64,
    pub capacity_total: f64,
    pub load_total_kg: f64,
}

impl<'a> ItemMetrics<'a> {
    pub fn units(&self) -> i64 {
        self.record.quantity
    }

    pub fn max_speed_kmh(&self) -> Option<f64> {
        self.record.max_speed_kmh
    }

    pub fn load_capacity_kg(&self) -> f64 {
        self.record.load_capacity_kg.unwrap_or(0.0)
    }
}

// ==========================================
// ItemMetricsCalculator - 单器具指标计算器
// ==========================================
#[derive(Debug, Default, Clone, Copy)]
pub struct ItemMetricsCalculator;

impl ItemMetricsCalculator {
    pub fn new() -> Self {
        Self
    }

    /// 计算单条记录的派生指标
    ///
    /// # 规则
    /// - volume_unit = w × l × h / 1e9 (m³)
    /// - accessory_unit_cost = Σ (override ?? unit_price) × qty_per_unit
    /// - full_unit_cost = base_price + accessory_unit_cost
    /// - capacity_unit = Σ parts_per_unit（仅包装器具）
    /// - load_total = load_capacity × quantity（仅运输工具）
    ///
    /// # 返回
    /// - None: 类别缺失
    pub fn compute<'a>(&self, record: &'a EquipmentRecord) -> Option<ItemMetrics<'a>> {
        let category = record.category.as_ref()?;
        let quantity = record.quantity as f64;

        let volume_unit_m3 = record.width_mm * record.length_mm * record.height_mm / MM3_PER_M3;

        let accessory_unit_cost: f64 = record.accessories.iter().map(|a| a.unit_cost()).sum();
        let full_unit_cost = record.base_price + accessory_unit_cost;

        let capacity_unit = if record.is_packaging() {
            record.parts.iter().map(|p| p.parts_per_unit).sum()
        } else {
            0.0
        };

        let load_total_kg = if record.is_transport() {
            record.load_capacity_kg.unwrap_or(0.0) * quantity
        } else {
            0.0
        };

        Some(ItemMetrics {
            record,
            category,
            volume_unit_m3,
            volume_total_m3: volume_unit_m3 * quantity,
            accessory_unit_cost,
            full_unit_cost,
            full_total_value: full_unit_cost * quantity,
            capacity_unit,
            capacity_total: capacity_unit * quantity,
            load_total_kg,
        })
    }

    /// 批量计算，保持输入顺序，跳过类别缺失记录
    pub fn compute_all<'a>(&self, records: &'a [EquipmentRecord]) -> Vec<ItemMetrics<'a>> {
        let metrics: Vec<ItemMetrics<'a>> =
            records.iter().filter_map(|r| self.compute(r)).collect();

        let skipped = records.len() - metrics.len();
        if skipped > 0 {
            tracing::debug!(skipped, "类别缺失的器具已剔除");
        }
        metrics
    }
}
