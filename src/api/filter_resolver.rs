// ==========================================
// 物流器具 KPI 引擎 - 过滤条件解析
// ==========================================
// 职责: 校验并规范化请求参数 → KpiFilter
// 识别键: plantId / flowId / categorySlug / status（其余键忽略）
// 红线: 无副作用，不 panic，违规字段一次性全部返回
// ==========================================

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

use crate::api::error::{format_violations, FieldViolation};
use crate::domain::{EquipmentStatus, KpiFilter, StatusFilter};

pub const PARAM_PLANT_ID: &str = "plantId";
pub const PARAM_FLOW_ID: &str = "flowId";
pub const PARAM_CATEGORY_SLUG: &str = "categorySlug";
pub const PARAM_STATUS: &str = "status";

/// 原始请求参数（查询串中同名参数可能出现多次）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawParam {
    Single(String),
    Multi(Vec<String>),
}

impl RawParam {
    /// 首个非空白值（已去除首尾空白）
    pub fn first_non_blank(&self) -> Option<&str> {
        match self {
            RawParam::Single(v) => Some(v.trim()).filter(|s| !s.is_empty()),
            RawParam::Multi(values) => values
                .iter()
                .map(|v| v.trim())
                .find(|s| !s.is_empty()),
        }
    }
}

impl From<&str> for RawParam {
    fn from(v: &str) -> Self {
        RawParam::Single(v.to_string())
    }
}

impl From<String> for RawParam {
    fn from(v: String) -> Self {
        RawParam::Single(v)
    }
}

impl From<Vec<String>> for RawParam {
    fn from(v: Vec<String>) -> Self {
        RawParam::Multi(v)
    }
}

/// 过滤条件校验失败
#[derive(Error, Debug, Clone, PartialEq)]
#[error("过滤条件无效: {}", format_violations(.violations))]
pub struct FilterValidationError {
    pub violations: Vec<FieldViolation>,
}

// ==========================================
// FilterResolver - 过滤条件解析器
// ==========================================
#[derive(Debug, Default, Clone, Copy)]
pub struct FilterResolver;

impl FilterResolver {
    pub fn new() -> Self {
        Self
    }

    /// 解析请求参数
    ///
    /// # 规则
    /// - 缺失/空白 → 不限
    /// - plantId / flowId 必须为 UUID，输出小写连字符格式
    /// - categorySlug 去空白转小写后须匹配 `[a-z0-9]+(-[a-z0-9]+)*`
    /// - status 不区分大小写；缺失 → ACTIVE；ALL → 不限；其他值 → 违规
    pub fn resolve(
        &self,
        raw: &HashMap<String, RawParam>,
    ) -> Result<KpiFilter, FilterValidationError> {
        let mut violations = Vec::new();
        let value_of = |key: &str| raw.get(key).and_then(|p| p.first_non_blank());

        let plant_id = value_of(PARAM_PLANT_ID)
            .and_then(|v| collect(&mut violations, resolve_uuid(PARAM_PLANT_ID, v)));
        let flow_id = value_of(PARAM_FLOW_ID)
            .and_then(|v| collect(&mut violations, resolve_uuid(PARAM_FLOW_ID, v)));
        let category_slug = value_of(PARAM_CATEGORY_SLUG)
            .and_then(|v| collect(&mut violations, resolve_slug(PARAM_CATEGORY_SLUG, v)));
        let status = match value_of(PARAM_STATUS) {
            Some(v) => collect(&mut violations, resolve_status(PARAM_STATUS, v)).unwrap_or_default(),
            None => StatusFilter::default(),
        };

        if !violations.is_empty() {
            tracing::debug!(count = violations.len(), "过滤条件校验失败");
            return Err(FilterValidationError { violations });
        }

        Ok(KpiFilter {
            plant_id,
            flow_id,
            category_slug,
            status,
        })
    }

    /// 从 `key=value` 形式的参数列表解析（同名参数合并为 Multi）
    pub fn resolve_pairs<I, K, V>(&self, pairs: I) -> Result<KpiFilter, FilterValidationError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut grouped: HashMap<String, Vec<String>> = HashMap::new();
        for (k, v) in pairs {
            grouped.entry(k.into()).or_default().push(v.into());
        }

        let raw: HashMap<String, RawParam> = grouped
            .into_iter()
            .map(|(k, mut values)| {
                let param = if values.len() == 1 {
                    RawParam::Single(values.remove(0))
                } else {
                    RawParam::Multi(values)
                };
                (k, param)
            })
            .collect();

        self.resolve(&raw)
    }
}

fn collect<T>(violations: &mut Vec<FieldViolation>, result: Result<T, FieldViolation>) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(violation) => {
            violations.push(violation);
            None
        }
    }
}

fn resolve_uuid(field: &str, value: &str) -> Result<String, FieldViolation> {
    Uuid::parse_str(value)
        .map(|id| id.hyphenated().to_string())
        .map_err(|_| FieldViolation::new(field, value, "不是合法的 UUID"))
}

fn resolve_slug(field: &str, value: &str) -> Result<String, FieldViolation> {
    let slug = value.to_lowercase();
    if is_valid_slug(&slug) {
        Ok(slug)
    } else {
        Err(FieldViolation::new(
            field,
            value,
            "slug 只能包含小写字母、数字和单个连字符",
        ))
    }
}

/// `[a-z0-9]+(-[a-z0-9]+)*`
fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug.split('-').all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        })
}

fn resolve_status(field: &str, value: &str) -> Result<StatusFilter, FieldViolation> {
    if value.eq_ignore_ascii_case(StatusFilter::ALL_TOKEN) {
        return Ok(StatusFilter::All);
    }
    EquipmentStatus::parse(value)
        .map(StatusFilter::Only)
        .ok_or_else(|| {
            let allowed: Vec<&str> = EquipmentStatus::ALL_VALUES.iter().map(|s| s.as_str()).collect();
            FieldViolation::new(
                field,
                value,
                format!("未知状态，可选值: {} / {}", allowed.join(" / "), StatusFilter::ALL_TOKEN),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pairs: &[(&str, &str)]) -> HashMap<String, RawParam> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), RawParam::from(*v)))
            .collect()
    }

    #[test]
    fn test_resolve_空参数默认仅在用() {
        let filter = FilterResolver::new().resolve(&HashMap::new()).unwrap();
        assert_eq!(filter, KpiFilter::default());
        assert_eq!(filter.status, StatusFilter::Only(EquipmentStatus::Active));
    }

    #[test]
    fn test_resolve_uuid规范化() {
        let filter = FilterResolver::new()
            .resolve(&raw(&[(PARAM_PLANT_ID, " 0B7C3C1E4A8F4F7A9A3B2F1D9E6C5B4A ")]))
            .unwrap();
        assert_eq!(
            filter.plant_id.as_deref(),
            Some("0b7c3c1e-4a8f-4f7a-9a3b-2f1d9e6c5b4a")
        );
    }

    #[test]
    fn test_is_valid_slug() {
        assert!(is_valid_slug("plastic-bins"));
        assert!(is_valid_slug("a1"));
        assert!(!is_valid_slug("-bins"));
        assert!(!is_valid_slug("bins--big"));
        assert!(!is_valid_slug("bins_big"));
        assert!(!is_valid_slug(""));
    }

    #[test]
    fn test_resolve_多值取首个非空() {
        let mut map = HashMap::new();
        map.insert(
            PARAM_STATUS.to_string(),
            RawParam::Multi(vec!["  ".to_string(), "all".to_string(), "RETIRED".to_string()]),
        );
        let filter = FilterResolver::new().resolve(&map).unwrap();
        assert_eq!(filter.status, StatusFilter::All);
    }

    #[test]
    fn test_resolve_违规字段全部返回() {
        let err = FilterResolver::new()
            .resolve(&raw(&[
                (PARAM_PLANT_ID, "not-a-uuid"),
                (PARAM_CATEGORY_SLUG, "Bad Slug"),
                (PARAM_STATUS, "broken"),
                ("unknown", "ignored"),
            ]))
            .unwrap_err();

        let fields: Vec<&str> = err.violations.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, vec![PARAM_PLANT_ID, PARAM_CATEGORY_SLUG, PARAM_STATUS]);
        assert_eq!(err.violations[2].value, "broken");
    }
}
