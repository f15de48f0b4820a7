// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 临时测试数据库初始化 + 基础参照数据
// ==========================================
#![allow(dead_code)]

use rusqlite::{params, Connection};
use std::error::Error;
use tempfile::NamedTempFile;

// ==========================================
// 参照数据 (id, name[, slug / price])
// ==========================================

pub const CAT_BINS: (&str, &str, &str) = ("cat-bins", "周转箱", "bins");
pub const CAT_RACKS: (&str, &str, &str) = ("cat-racks", "料架", "steel-racks");
pub const CAT_FORKLIFT: (&str, &str, &str) = ("cat-forklift", "叉车", "forklifts");
pub const CAT_TRACTOR: (&str, &str, &str) = ("cat-tractor", "牵引车", "tractors");

pub const PLANT_A: (&str, &str) = ("0b7c3c1e-4a8f-4f7a-9a3b-2f1d9e6c5b4a", "总装一厂");
pub const PLANT_B: (&str, &str) = ("5d1f7a2b-3c4e-4d5f-8a6b-7c8d9e0f1a2b", "冲压厂");

pub const SUPPLIER_1: (&str, &str) = ("sup-1", "华东物流器具");
pub const SUPPLIER_2: (&str, &str) = ("sup-2", "北方钢构");

pub const FLOW_1: (&str, &str) = ("7f1e2d3c-4b5a-4697-8877-665544332211", "总装线");
pub const FLOW_2: (&str, &str) = ("7f1e2d3c-4b5a-4697-8877-665544332222", "焊装线");

pub const ACC_LID: (&str, &str, f64) = ("acc-lid", "盖板", 10.0);
pub const ACC_DIVIDER: (&str, &str, f64) = ("acc-divider", "隔板", 4.0);

pub const PART_DOOR: (&str, &str) = ("part-door", "车门内板");
pub const PART_SEAT: (&str, &str) = ("part-seat", "座椅骨架");

/// 创建临时测试数据库并初始化 schema + 参照数据
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_str().unwrap().to_string();

    let conn = open_test_connection(&db_path)?;
    fleet_kpi::db::ensure_schema(&conn)?;
    seed_reference_data(&conn)?;

    Ok((temp_file, db_path))
}

/// 打开测试数据库连接（统一 PRAGMA）
pub fn open_test_connection(db_path: &str) -> Result<Connection, Box<dyn Error>> {
    Ok(fleet_kpi::db::open_sqlite_connection(db_path)?)
}

/// 插入参照数据（类别/工厂/供应商/流向/附件/零件）
pub fn seed_reference_data(conn: &Connection) -> Result<(), Box<dyn Error>> {
    for (id, name, slug) in [CAT_BINS, CAT_RACKS, CAT_FORKLIFT, CAT_TRACTOR] {
        conn.execute(
            "INSERT INTO category (id, name, slug) VALUES (?1, ?2, ?3)",
            params![id, name, slug],
        )?;
    }
    for (id, name) in [PLANT_A, PLANT_B] {
        conn.execute("INSERT INTO plant (id, name) VALUES (?1, ?2)", params![id, name])?;
    }
    for (id, name) in [SUPPLIER_1, SUPPLIER_2] {
        conn.execute("INSERT INTO supplier (id, name) VALUES (?1, ?2)", params![id, name])?;
    }
    for (id, name) in [FLOW_1, FLOW_2] {
        conn.execute("INSERT INTO flow (id, name) VALUES (?1, ?2)", params![id, name])?;
    }
    for (id, name, price) in [ACC_LID, ACC_DIVIDER] {
        conn.execute(
            "INSERT INTO accessory (id, name, unit_price) VALUES (?1, ?2, ?3)",
            params![id, name, price],
        )?;
    }
    for (id, name) in [PART_DOOR, PART_SEAT] {
        conn.execute("INSERT INTO part (id, name) VALUES (?1, ?2)", params![id, name])?;
    }
    Ok(())
}

/// 写入 global 配置覆写
pub fn set_config(conn: &Connection, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
    conn.execute(
        "INSERT OR REPLACE INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)",
        params![key, value],
    )?;
    Ok(())
}
