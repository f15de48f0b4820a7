// ==========================================
// 物流器具 KPI 引擎 - 过滤条件值对象
// ==========================================
// 职责: 规范化后的过滤条件 (工厂/流向/类别/状态)
// 约束: 不可变；序列化字段顺序固定，可直接作为缓存键
// ==========================================

use serde::{Deserialize, Serialize};

use crate::domain::types::{EquipmentKind, StatusFilter};

/// KPI 过滤条件
///
/// 由 `FilterResolver` 生成，字段均已规范化：
/// - 空值统一为 None
/// - id 为小写连字符 UUID
/// - slug 为小写
/// - status 缺省为 ACTIVE
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiFilter {
    pub plant_id: Option<String>,
    pub flow_id: Option<String>,
    pub category_slug: Option<String>,
    pub status: StatusFilter,
}

impl KpiFilter {
    pub fn with_plant(mut self, plant_id: impl Into<String>) -> Self {
        self.plant_id = Some(plant_id.into());
        self
    }

    pub fn with_flow(mut self, flow_id: impl Into<String>) -> Self {
        self.flow_id = Some(flow_id.into());
        self
    }

    pub fn with_category(mut self, slug: impl Into<String>) -> Self {
        self.category_slug = Some(slug.into());
        self
    }

    pub fn with_status(mut self, status: StatusFilter) -> Self {
        self.status = status;
        self
    }

    /// 规范化序列化（稳定字段顺序）
    pub fn canonical(&self) -> String {
        // 字段顺序即声明顺序，空值输出为 null；纯字符串字段，序列化不会失败
        serde_json::to_string(self).unwrap_or_default()
    }

    /// 缓存键: "<种类>|<规范化过滤>"
    pub fn cache_key(&self, kind: EquipmentKind) -> String {
        format!("{}|{}", kind.as_str(), self.canonical())
    }
}
