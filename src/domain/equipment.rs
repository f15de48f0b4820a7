// ==========================================
// 物流器具 KPI 引擎 - 器具实体
// ==========================================
// 职责: 定义包装器具/运输工具记录及其关联 (附件、零件)
// 红线: 引擎只读，不修改器具记录
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::types::{EquipmentKind, EquipmentStatus};

// ==========================================
// 关联对象引用
// ==========================================

/// 器具类别
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub id: String,
    pub name: String,
    /// 外部寻址用的 slug (例如: "plastic-bins")
    pub slug: String,
}

/// 工厂 / 供应商 / 流向 共用的简单引用
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRef {
    pub id: String,
    pub name: String,
}

impl NamedRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

// ==========================================
// 附件关联 (Accessory Link)
// ==========================================

/// 器具 → 附件 关联
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessoryLink {
    pub accessory_id: String,
    pub accessory_name: String,
    /// 附件目录单价
    pub unit_price: f64,
    /// 关联上的单价覆写（优先于目录单价）
    pub unit_price_override: Option<f64>,
    /// 每台器具所需附件数量
    pub qty_per_unit: f64,
}

impl AccessoryLink {
    /// 生效单价
    pub fn effective_unit_price(&self) -> f64 {
        self.unit_price_override.unwrap_or(self.unit_price)
    }

    /// 每台器具的附件成本
    pub fn unit_cost(&self) -> f64 {
        self.effective_unit_price() * self.qty_per_unit
    }
}

// ==========================================
// 零件关联 (Part Link) - 仅包装器具
// ==========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartLink {
    pub part_id: String,
    /// 每个包装器具可容纳的零件数
    pub parts_per_unit: f64,
}

// ==========================================
// 器具记录 (Equipment Record)
// ==========================================

/// 器具记录（包装器具 / 运输工具 结构平行）
///
/// # 说明
/// - `category` 为 None 表示类别缺失或无法解析（数据完整性缺口），下游统计一律剔除
/// - 运输工具专属字段在包装器具上为 None / 0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentRecord {
    pub id: String,
    pub kind: EquipmentKind,
    pub name: String,
    pub status: EquipmentStatus,

    pub category: Option<CategoryRef>,
    pub plant: Option<NamedRef>,
    pub supplier: Option<NamedRef>,

    /// 基础单价
    pub base_price: f64,
    /// 数量（台/个）
    pub quantity: i64,

    /// 外形尺寸 (mm)
    pub width_mm: f64,
    pub length_mm: f64,
    pub height_mm: f64,

    /// 单台载重 (kg) - 运输工具
    pub load_capacity_kg: Option<f64>,
    /// 最高速度 (km/h) - 运输工具
    pub max_speed_kmh: Option<f64>,
    /// 巡航速度 (km/h) - 运输工具
    pub cruise_speed_kmh: Option<f64>,

    /// 服务流向数量
    pub flow_count: i64,
    /// 兼容包装器具数量 - 运输工具
    pub compatible_packaging_count: i64,

    pub accessories: Vec<AccessoryLink>,
    pub parts: Vec<PartLink>,

    pub updated_at: NaiveDateTime,
}

impl EquipmentRecord {
    pub fn is_packaging(&self) -> bool {
        self.kind == EquipmentKind::Packaging
    }

    pub fn is_transport(&self) -> bool {
        self.kind == EquipmentKind::Transport
    }
}
