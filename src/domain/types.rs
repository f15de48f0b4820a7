// ==========================================
// 物流器具 KPI 引擎 - 领域类型定义
// ==========================================
// 职责: 器具种类、器具状态、状态过滤口径
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 器具种类 (Equipment Kind)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EquipmentKind {
    Packaging, // 包装器具
    Transport, // 运输工具
}

impl EquipmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EquipmentKind::Packaging => "PACKAGING",
            EquipmentKind::Transport => "TRANSPORT",
        }
    }
}

impl fmt::Display for EquipmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 器具状态 (Equipment Status)
// ==========================================
// 默认口径: 只统计在用器具 (ACTIVE)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EquipmentStatus {
    Active,      // 在用
    Maintenance, // 维修中
    Inactive,    // 停用
    Retired,     // 报废
}

impl EquipmentStatus {
    pub const ALL_VALUES: [EquipmentStatus; 4] = [
        EquipmentStatus::Active,
        EquipmentStatus::Maintenance,
        EquipmentStatus::Inactive,
        EquipmentStatus::Retired,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EquipmentStatus::Active => "ACTIVE",
            EquipmentStatus::Maintenance => "MAINTENANCE",
            EquipmentStatus::Inactive => "INACTIVE",
            EquipmentStatus::Retired => "RETIRED",
        }
    }

    /// 严格解析（大小写不敏感），未知值返回 None
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "ACTIVE" => Some(EquipmentStatus::Active),
            "MAINTENANCE" => Some(EquipmentStatus::Maintenance),
            "INACTIVE" => Some(EquipmentStatus::Inactive),
            "RETIRED" => Some(EquipmentStatus::Retired),
            _ => None,
        }
    }

    /// 从数据库字符串解析（未知值按停用处理，不参与默认口径）
    pub fn from_db_str(s: &str) -> Self {
        Self::parse(s).unwrap_or(EquipmentStatus::Inactive)
    }
}

impl Default for EquipmentStatus {
    fn default() -> Self {
        EquipmentStatus::Active
    }
}

impl fmt::Display for EquipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 状态过滤 (Status Filter)
// ==========================================
// "ALL" 表示不按状态过滤
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusFilter {
    Only(EquipmentStatus),
    All,
}

impl StatusFilter {
    pub const ALL_TOKEN: &'static str = "ALL";

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusFilter::Only(status) => status.as_str(),
            StatusFilter::All => Self::ALL_TOKEN,
        }
    }

    /// 需要下推到数据源的状态条件（None 表示不过滤）
    pub fn status(&self) -> Option<EquipmentStatus> {
        match self {
            StatusFilter::Only(status) => Some(*status),
            StatusFilter::All => None,
        }
    }
}

impl Default for StatusFilter {
    fn default() -> Self {
        StatusFilter::Only(EquipmentStatus::default())
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for StatusFilter {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for StatusFilter {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw.trim().eq_ignore_ascii_case(Self::ALL_TOKEN) {
            return Ok(StatusFilter::All);
        }
        EquipmentStatus::parse(&raw)
            .map(StatusFilter::Only)
            .ok_or_else(|| serde::de::Error::custom(format!("未知的器具状态: {}", raw)))
    }
}
