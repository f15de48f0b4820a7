// ==========================================
// 物流器具 KPI 引擎 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::kpi_config::{check_boundaries, KpiConfig, MAX_CACHE_TTL_SECS};
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::error::Error;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

/// 配置作用域（当前仅 global）
pub const GLOBAL_SCOPE: &str = "global";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
            params![GLOBAL_SCOPE, key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 写入 global 配置（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?3, updated_at = datetime('now')",
            params![GLOBAL_SCOPE, key, value],
        )?;

        Ok(())
    }

    /// 获取所有 global 配置的快照
    pub fn get_config_snapshot(&self) -> Result<HashMap<String, String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = ?1 ORDER BY key")?;
        let rows = stmt.query_map(params![GLOBAL_SCOPE], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut config_map = HashMap::new();
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }
        Ok(config_map)
    }

    // ===== KPI 配置 =====

    /// 加载 KPI 配置
    ///
    /// # 说明
    /// - 未配置的键使用默认值
    /// - 格式错误或不合法（0 值、超出上限、非升序边界）的键告警后回退默认值
    /// - 数据库读取失败返回错误
    pub fn load_kpi_config(&self) -> Result<KpiConfig, Box<dyn Error>> {
        let defaults = KpiConfig::default();

        let config = KpiConfig {
            max_items: self.positive_or_default(
                config_keys::MAX_ITEMS,
                defaults.max_items,
                usize::MAX,
            )?,
            cache_ttl_secs: self.positive_or_default(
                config_keys::CACHE_TTL_SECS,
                defaults.cache_ttl_secs,
                MAX_CACHE_TTL_SECS,
            )?,
            scatter_cap: self.positive_or_default(
                config_keys::SCATTER_CAP,
                defaults.scatter_cap,
                usize::MAX,
            )?,
            top_n_small: self.positive_or_default(
                config_keys::TOP_N_SMALL,
                defaults.top_n_small,
                usize::MAX,
            )?,
            top_n_large: self.positive_or_default(
                config_keys::TOP_N_LARGE,
                defaults.top_n_large,
                usize::MAX,
            )?,
            load_histogram_boundaries: self.boundaries_or_default(
                config_keys::LOAD_HISTOGRAM_BOUNDARIES,
                defaults.load_histogram_boundaries,
            )?,
            capacity_histogram_boundaries: self.boundaries_or_default(
                config_keys::CAPACITY_HISTOGRAM_BOUNDARIES,
                defaults.capacity_histogram_boundaries,
            )?,
            query_timeout_ms: self.positive_or_default(
                config_keys::QUERY_TIMEOUT_MS,
                defaults.query_timeout_ms,
                u64::MAX,
            )?,
        };

        config.validate()?;
        tracing::info!(?config, "KPI 配置已加载");
        Ok(config)
    }

    /// 读取正整数配置（0 < v <= max），非法时回退默认值
    fn positive_or_default<T>(&self, key: &str, default: T, max: T) -> Result<T, Box<dyn Error>>
    where
        T: FromStr + Copy + PartialOrd + Default,
    {
        let raw = match self.get_global_config_value(key)? {
            Some(v) => v,
            None => return Ok(default),
        };

        match raw.trim().parse::<T>() {
            Ok(v) if v > T::default() && v <= max => Ok(v),
            _ => {
                tracing::warn!(key, value = %raw, "配置值无效，使用默认值");
                Ok(default)
            }
        }
    }

    /// 读取分桶边界（JSON 数组），非法时回退默认值
    fn boundaries_or_default(
        &self,
        key: &str,
        default: Vec<f64>,
    ) -> Result<Vec<f64>, Box<dyn Error>> {
        let raw = match self.get_global_config_value(key)? {
            Some(v) => v,
            None => return Ok(default),
        };

        match serde_json::from_str::<Vec<f64>>(&raw) {
            Ok(v) if check_boundaries(key, &v).is_ok() => Ok(v),
            _ => {
                tracing::warn!(key, value = %raw, "分桶边界配置无效，使用默认值");
                Ok(default)
            }
        }
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 明细上限
    pub const MAX_ITEMS: &str = "kpi_max_items";

    // 缓存
    pub const CACHE_TTL_SECS: &str = "kpi_cache_ttl_secs";

    // 图表截断
    pub const SCATTER_CAP: &str = "kpi_scatter_cap";
    pub const TOP_N_SMALL: &str = "kpi_top_n_small";
    pub const TOP_N_LARGE: &str = "kpi_top_n_large";

    // 分桶边界 (JSON 数组)
    pub const LOAD_HISTOGRAM_BOUNDARIES: &str = "kpi_load_histogram_boundaries";
    pub const CAPACITY_HISTOGRAM_BOUNDARIES: &str = "kpi_capacity_histogram_boundaries";

    // 数据源超时
    pub const QUERY_TIMEOUT_MS: &str = "kpi_query_timeout_ms";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::ensure_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[test]
    fn test_load_kpi_config_无覆写使用默认() {
        let manager = setup_manager();
        assert_eq!(manager.load_kpi_config().unwrap(), KpiConfig::default());
    }

    #[test]
    fn test_load_kpi_config_覆写生效() {
        let manager = setup_manager();
        manager.set_global_config_value(config_keys::MAX_ITEMS, "50").unwrap();
        manager
            .set_global_config_value(config_keys::LOAD_HISTOGRAM_BOUNDARIES, "[0, 500, 1500]")
            .unwrap();

        let config = manager.load_kpi_config().unwrap();
        assert_eq!(config.max_items, 50);
        assert_eq!(config.load_histogram_boundaries, vec![0.0, 500.0, 1500.0]);
    }

    #[test]
    fn test_load_kpi_config_非法值回退默认() {
        let manager = setup_manager();
        manager.set_global_config_value(config_keys::SCATTER_CAP, "0").unwrap();
        manager.set_global_config_value(config_keys::CACHE_TTL_SECS, "abc").unwrap();
        manager
            .set_global_config_value(config_keys::CAPACITY_HISTOGRAM_BOUNDARIES, "[10, 5]")
            .unwrap();

        let config = manager.load_kpi_config().unwrap();
        let defaults = KpiConfig::default();
        assert_eq!(config.scatter_cap, defaults.scatter_cap);
        assert_eq!(config.cache_ttl_secs, defaults.cache_ttl_secs);
        assert_eq!(
            config.capacity_histogram_boundaries,
            defaults.capacity_histogram_boundaries
        );
    }

    #[test]
    fn test_load_kpi_config_超大缓存ttl回退默认() {
        let manager = setup_manager();
        manager
            .set_global_config_value(config_keys::CACHE_TTL_SECS, "10000000000000000")
            .unwrap();
        manager
            .set_global_config_value(config_keys::MAX_ITEMS, "99999999999999999999999")
            .unwrap();

        let config = manager.load_kpi_config().unwrap();
        assert_eq!(config.cache_ttl_secs, KpiConfig::default().cache_ttl_secs);
        assert_eq!(config.max_items, KpiConfig::default().max_items);
        assert!(config.cache_ttl().is_ok());
    }

    #[test]
    fn test_set_global_config_value_覆盖() {
        let manager = setup_manager();
        manager.set_global_config_value("k", "1").unwrap();
        manager.set_global_config_value("k", "2").unwrap();

        assert_eq!(manager.get_global_config_value("k").unwrap(), Some("2".to_string()));
        assert_eq!(manager.get_config_snapshot().unwrap().len(), 1);
    }
}
