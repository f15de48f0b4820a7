// ==========================================
// 物流器具 KPI 引擎 - 配置层
// ==========================================
// 职责: KPI 配置默认值、校验与 config_kv 覆写
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod kpi_config;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager};
pub use kpi_config::{ConfigError, KpiConfig};
