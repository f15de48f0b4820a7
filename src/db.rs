// ==========================================
// 物流器具 KPI 引擎 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少并发读写时的偶发 busy 错误
// - 提供器具只读库的建表脚本（测试与演示库使用）
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::path::PathBuf;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
///
/// 用于提示/告警（不做自动迁移），避免静默在旧库上运行导致统计口径错误。
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 默认数据库文件名
pub const DEFAULT_DB_FILE: &str = "fleet_kpi.db";

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要"每个连接"单独开启
/// - busy_timeout 需要"每个连接"单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 默认数据库路径: <系统数据目录>/fleet-kpi/fleet_kpi.db
///
/// 系统数据目录不可用时退回当前目录。
pub fn default_db_path() -> PathBuf {
    match dirs::data_dir() {
        Some(dir) => dir.join("fleet-kpi").join(DEFAULT_DB_FILE),
        None => PathBuf::from(DEFAULT_DB_FILE),
    }
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 检查 schema_version 并在不一致时告警
pub fn warn_on_schema_drift(conn: &Connection) {
    match read_schema_version(conn) {
        Ok(Some(v)) if v == CURRENT_SCHEMA_VERSION => {}
        Ok(Some(v)) => tracing::warn!(
            found = v,
            expected = CURRENT_SCHEMA_VERSION,
            "schema_version 与当前代码不一致，统计结果可能不准确"
        ),
        Ok(None) => tracing::warn!("未找到 schema_version 表"),
        Err(e) => tracing::warn!(error = %e, "读取 schema_version 失败"),
    }
}

/// 器具只读库建表脚本
///
/// 说明：
/// - equipment.category_id 不加外键：类别缺失/悬空是上游数据缺口，由引擎剔除
/// - updated_at 存储为 "YYYY-MM-DD HH:MM:SS"
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS config_kv (
    scope_id TEXT NOT NULL,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (scope_id, key)
);

CREATE TABLE IF NOT EXISTS category (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    slug TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS plant (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS supplier (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS flow (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS accessory (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    unit_price REAL NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS part (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS equipment (
    id TEXT PRIMARY KEY,
    kind TEXT NOT NULL CHECK (kind IN ('PACKAGING', 'TRANSPORT')),
    name TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'ACTIVE',
    category_id TEXT,
    plant_id TEXT,
    supplier_id TEXT,
    base_price REAL NOT NULL DEFAULT 0,
    quantity INTEGER NOT NULL DEFAULT 0,
    width_mm REAL NOT NULL DEFAULT 0,
    length_mm REAL NOT NULL DEFAULT 0,
    height_mm REAL NOT NULL DEFAULT 0,
    load_capacity_kg REAL,
    max_speed_kmh REAL,
    cruise_speed_kmh REAL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_equipment_kind_status_updated
    ON equipment (kind, status, updated_at DESC);

CREATE TABLE IF NOT EXISTS equipment_accessory (
    equipment_id TEXT NOT NULL REFERENCES equipment (id) ON DELETE CASCADE,
    accessory_id TEXT NOT NULL REFERENCES accessory (id) ON DELETE CASCADE,
    qty_per_unit REAL NOT NULL DEFAULT 1,
    unit_price_override REAL,
    PRIMARY KEY (equipment_id, accessory_id)
);

CREATE TABLE IF NOT EXISTS equipment_part (
    equipment_id TEXT NOT NULL REFERENCES equipment (id) ON DELETE CASCADE,
    part_id TEXT NOT NULL REFERENCES part (id) ON DELETE CASCADE,
    parts_per_unit REAL NOT NULL DEFAULT 0,
    PRIMARY KEY (equipment_id, part_id)
);

CREATE TABLE IF NOT EXISTS equipment_flow (
    equipment_id TEXT NOT NULL REFERENCES equipment (id) ON DELETE CASCADE,
    flow_id TEXT NOT NULL REFERENCES flow (id) ON DELETE CASCADE,
    PRIMARY KEY (equipment_id, flow_id)
);

CREATE TABLE IF NOT EXISTS transport_packaging (
    transport_id TEXT NOT NULL REFERENCES equipment (id) ON DELETE CASCADE,
    packaging_id TEXT NOT NULL REFERENCES equipment (id) ON DELETE CASCADE,
    PRIMARY KEY (transport_id, packaging_id)
);
"#;

/// 建表（幂等）并登记 schema_version
pub fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_schema_幂等() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();

        ensure_schema(&conn).unwrap();
        ensure_schema(&conn).unwrap();

        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
    }

    #[test]
    fn test_read_schema_version_无表() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), None);
    }

    #[test]
    fn test_default_db_path_文件名() {
        assert!(default_db_path().ends_with(DEFAULT_DB_FILE));
    }
}
