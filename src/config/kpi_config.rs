// ==========================================
// 物流器具 KPI 引擎 - KPI 配置项
// ==========================================
// 职责: 明细上限、缓存 TTL、图表截断与分桶边界
// 存储: config_kv 表覆写，缺省使用内置默认值
// ==========================================

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 明细拉取上限 (MAX_ITEMS)
pub const DEFAULT_MAX_ITEMS: usize = 500;
/// 快照缓存 TTL（秒）
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;
/// 快照缓存 TTL 上限（秒，1 天）
pub const MAX_CACHE_TTL_SECS: u64 = 86_400;
/// 散点图截断上限
pub const DEFAULT_SCATTER_CAP: usize = 80;
pub const DEFAULT_TOP_N_SMALL: usize = 10;
pub const DEFAULT_TOP_N_LARGE: usize = 20;
/// 单次数据源调用超时（毫秒）
pub const DEFAULT_QUERY_TIMEOUT_MS: u64 = 10_000;

/// 载重分桶边界 (kg)
pub const DEFAULT_LOAD_BOUNDARIES: [f64; 7] = [0.0, 100.0, 250.0, 500.0, 750.0, 1000.0, 2000.0];
/// 容量分桶边界 (零件数/器具)
pub const DEFAULT_CAPACITY_BOUNDARIES: [f64; 7] = [0.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0];

/// 配置错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("配置值无效 (key={key}): {message}")]
    InvalidValue { key: String, message: String },
}

/// KPI 配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiConfig {
    pub max_items: usize,
    pub cache_ttl_secs: u64,
    pub scatter_cap: usize,
    pub top_n_small: usize,
    pub top_n_large: usize,
    pub load_histogram_boundaries: Vec<f64>,
    pub capacity_histogram_boundaries: Vec<f64>,
    pub query_timeout_ms: u64,
}

impl Default for KpiConfig {
    fn default() -> Self {
        Self {
            max_items: DEFAULT_MAX_ITEMS,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            scatter_cap: DEFAULT_SCATTER_CAP,
            top_n_small: DEFAULT_TOP_N_SMALL,
            top_n_large: DEFAULT_TOP_N_LARGE,
            load_histogram_boundaries: DEFAULT_LOAD_BOUNDARIES.to_vec(),
            capacity_histogram_boundaries: DEFAULT_CAPACITY_BOUNDARIES.to_vec(),
            query_timeout_ms: DEFAULT_QUERY_TIMEOUT_MS,
        }
    }
}

impl KpiConfig {
    /// 缓存 TTL（超出 chrono 可表示范围时返回错误）
    pub fn cache_ttl(&self) -> Result<chrono::Duration, ConfigError> {
        i64::try_from(self.cache_ttl_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .ok_or_else(|| ConfigError::InvalidValue {
                key: "cache_ttl_secs".to_string(),
                message: format!("超出可表示范围: {}", self.cache_ttl_secs),
            })
    }

    pub fn query_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.query_timeout_ms)
    }

    /// 整体校验
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_positive("max_items", self.max_items as u64)?;
        check_positive("cache_ttl_secs", self.cache_ttl_secs)?;
        check_at_most("cache_ttl_secs", self.cache_ttl_secs, MAX_CACHE_TTL_SECS)?;
        check_positive("scatter_cap", self.scatter_cap as u64)?;
        check_positive("top_n_small", self.top_n_small as u64)?;
        check_positive("top_n_large", self.top_n_large as u64)?;
        check_positive("query_timeout_ms", self.query_timeout_ms)?;
        check_boundaries("load_histogram_boundaries", &self.load_histogram_boundaries)?;
        check_boundaries(
            "capacity_histogram_boundaries",
            &self.capacity_histogram_boundaries,
        )?;
        Ok(())
    }
}

pub(crate) fn check_positive(key: &str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "必须大于 0".to_string(),
        });
    }
    Ok(())
}

pub(crate) fn check_at_most(key: &str, value: u64, max: u64) -> Result<(), ConfigError> {
    if value > max {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("不能超过 {}", max),
        });
    }
    Ok(())
}

/// 分桶边界: 非空、有限值、严格升序
pub(crate) fn check_boundaries(key: &str, boundaries: &[f64]) -> Result<(), ConfigError> {
    if boundaries.is_empty() {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "分桶边界不能为空".to_string(),
        });
    }
    if boundaries.iter().any(|b| !b.is_finite()) {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "分桶边界必须为有限数值".to_string(),
        });
    }
    if boundaries.windows(2).any(|w| w[0] >= w[1]) {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("分桶边界必须严格升序: {:?}", boundaries),
        });
    }
    Ok(())
}
