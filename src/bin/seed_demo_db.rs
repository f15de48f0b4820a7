// ==========================================
// 物流器具 KPI 引擎 - 演示数据库生成
// ==========================================
// 用法: seed_demo_db [DB_PATH] [EQUIPMENT_COUNT]
// 说明: 已存在的数据库先备份再重建
// ==========================================

use chrono::{Duration, Local, NaiveDate};
use rusqlite::{params, Connection};
use std::error::Error;
use std::fs;
use std::path::Path;
use uuid::Uuid;

use fleet_kpi::db::{default_db_path, ensure_schema, open_sqlite_connection};
use fleet_kpi::domain::EquipmentStatus;

const DEFAULT_EQUIPMENT_COUNT: usize = 1200;

const PACKAGING_CATEGORIES: [(&str, &str); 4] = [
    ("plastic-bins", "塑料周转箱"),
    ("steel-racks", "钢制料架"),
    ("pallets", "托盘"),
    ("foldable-crates", "折叠箱"),
];

const TRANSPORT_CATEGORIES: [(&str, &str); 3] = [
    ("forklifts", "叉车"),
    ("tractors", "牵引车"),
    ("agv", "AGV 小车"),
];

const PLANTS: [&str; 3] = ["总装一厂", "总装二厂", "冲压厂"];
const SUPPLIERS: [&str; 4] = ["华东物流器具", "北方钢构", "南方塑业", "联合装备"];
const FLOWS: [&str; 5] = ["总装线", "焊装线", "涂装线", "冲压线", "发动机线"];
const ACCESSORIES: [(&str, f64); 3] = [("盖板", 12.5), ("隔板", 4.0), ("标签夹", 0.8)];
const PARTS: [&str; 4] = ["车门内板", "座椅骨架", "线束总成", "保险杠"];

fn main() -> Result<(), Box<dyn Error>> {
    let db_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| default_db_path().to_string_lossy().into_owned());

    let equipment_count = std::env::args()
        .nth(2)
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(DEFAULT_EQUIPMENT_COUNT)
        .max(10);

    if let Some(parent) = Path::new(&db_path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    backup_and_reset_db(&db_path)?;

    let mut conn = open_sqlite_connection(&db_path)?;
    ensure_schema(&conn)?;
    seed_demo(&mut conn, equipment_count)?;
    print_quick_counts(&conn)?;

    Ok(())
}

fn backup_and_reset_db(db_path: &str) -> Result<(), Box<dyn Error>> {
    let path = Path::new(db_path);
    if !path.exists() {
        return Ok(());
    }

    let ts = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let backup_path = format!("{}.bak.{}", db_path, ts);
    fs::copy(path, &backup_path)?;
    fs::remove_file(path)?;

    eprintln!("Backed up {} -> {}", db_path, backup_path);
    Ok(())
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn seed_demo(conn: &mut Connection, equipment_count: usize) -> Result<(), Box<dyn Error>> {
    let tx = conn.transaction()?;

    let packaging_categories = insert_categories(&tx, &PACKAGING_CATEGORIES)?;
    let transport_categories = insert_categories(&tx, &TRANSPORT_CATEGORIES)?;
    let plants = insert_named(&tx, "plant", &PLANTS)?;
    let suppliers = insert_named(&tx, "supplier", &SUPPLIERS)?;
    let flows = insert_named(&tx, "flow", &FLOWS)?;
    let parts = insert_named(&tx, "part", &PARTS)?;

    let mut accessories = Vec::new();
    for (name, price) in ACCESSORIES {
        let id = new_id();
        tx.execute(
            "INSERT INTO accessory (id, name, unit_price) VALUES (?1, ?2, ?3)",
            params![id, name, price],
        )?;
        accessories.push(id);
    }

    let base_time = NaiveDate::from_ymd_opt(2026, 1, 1)
        .and_then(|d| d.and_hms_opt(8, 0, 0))
        .ok_or("invalid base time")?;

    let transport_count = equipment_count / 4;
    let packaging_count = equipment_count - transport_count;
    let mut packaging_ids = Vec::with_capacity(packaging_count);

    for i in 0..packaging_count {
        let id = new_id();
        // 每 97 条留一条类别缺失的记录，模拟数据完整性缺口
        let category = if i % 97 == 96 {
            None
        } else {
            Some(&packaging_categories[i % packaging_categories.len()])
        };
        let updated_at = base_time + Duration::minutes(i as i64 * 7);

        tx.execute(
            r#"INSERT INTO equipment (id, kind, name, status, category_id, plant_id, supplier_id,
                                      base_price, quantity, width_mm, length_mm, height_mm, updated_at)
               VALUES (?1, 'PACKAGING', ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"#,
            params![
                id,
                format!("PK-{:05}", i),
                status_for(i).as_str(),
                category,
                plants[i % plants.len()],
                if i % 11 == 0 { None } else { Some(&suppliers[i % suppliers.len()]) },
                20.0 + (i % 40) as f64 * 7.5,
                1 + (i % 60) as i64,
                300.0 + (i % 5) as f64 * 100.0,
                400.0 + (i % 4) as f64 * 100.0,
                200.0 + (i % 3) as f64 * 150.0,
                updated_at,
            ],
        )?;

        if i % 3 != 0 {
            tx.execute(
                "INSERT INTO equipment_accessory (equipment_id, accessory_id, qty_per_unit, unit_price_override)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    id,
                    accessories[i % accessories.len()],
                    1.0 + (i % 4) as f64,
                    if i % 10 == 0 { Some(9.9) } else { None },
                ],
            )?;
        }
        tx.execute(
            "INSERT INTO equipment_part (equipment_id, part_id, parts_per_unit) VALUES (?1, ?2, ?3)",
            params![id, parts[i % parts.len()], (4 + (i % 120)) as f64],
        )?;
        link_flows(&tx, &id, &flows, i)?;

        packaging_ids.push(id);
    }

    for i in 0..transport_count {
        let id = new_id();
        let updated_at = base_time + Duration::minutes(i as i64 * 13);

        tx.execute(
            r#"INSERT INTO equipment (id, kind, name, status, category_id, plant_id, supplier_id,
                                      base_price, quantity, load_capacity_kg, max_speed_kmh,
                                      cruise_speed_kmh, updated_at)
               VALUES (?1, 'TRANSPORT', ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"#,
            params![
                id,
                format!("TR-{:05}", i),
                status_for(i).as_str(),
                transport_categories[i % transport_categories.len()],
                plants[i % plants.len()],
                suppliers[i % suppliers.len()],
                15_000.0 + (i % 9) as f64 * 2_500.0,
                1 + (i % 6) as i64,
                80.0 + (i % 25) as f64 * 90.0,
                if i % 8 == 0 { None } else { Some(6.0 + (i % 5) as f64 * 4.0) },
                if i % 8 == 0 { None } else { Some(4.0 + (i % 5) as f64 * 3.0) },
                updated_at,
            ],
        )?;

        link_flows(&tx, &id, &flows, i)?;
        for offset in 0..(i % 4) {
            let packaging_id = &packaging_ids[(i * 5 + offset * 17) % packaging_ids.len()];
            tx.execute(
                "INSERT OR IGNORE INTO transport_packaging (transport_id, packaging_id) VALUES (?1, ?2)",
                params![id, packaging_id],
            )?;
        }
    }

    tx.commit()?;
    Ok(())
}

/// 状态分布: 约 80% 在用
fn status_for(i: usize) -> EquipmentStatus {
    match i % 10 {
        7 => EquipmentStatus::Maintenance,
        8 => EquipmentStatus::Inactive,
        9 if i % 20 == 19 => EquipmentStatus::Retired,
        _ => EquipmentStatus::Active,
    }
}

fn link_flows(
    conn: &Connection,
    equipment_id: &str,
    flows: &[String],
    i: usize,
) -> Result<(), Box<dyn Error>> {
    let flow_count = i % 3;
    for offset in 0..flow_count {
        conn.execute(
            "INSERT OR IGNORE INTO equipment_flow (equipment_id, flow_id) VALUES (?1, ?2)",
            params![equipment_id, flows[(i + offset) % flows.len()]],
        )?;
    }
    Ok(())
}

fn insert_categories(
    conn: &Connection,
    categories: &[(&str, &str)],
) -> Result<Vec<String>, Box<dyn Error>> {
    let mut ids = Vec::with_capacity(categories.len());
    for (slug, name) in categories {
        let id = new_id();
        conn.execute(
            "INSERT INTO category (id, name, slug) VALUES (?1, ?2, ?3)",
            params![id, name, slug],
        )?;
        ids.push(id);
    }
    Ok(ids)
}

fn insert_named(conn: &Connection, table: &str, names: &[&str]) -> Result<Vec<String>, Box<dyn Error>> {
    let sql = format!("INSERT INTO {} (id, name) VALUES (?1, ?2)", table);
    let mut ids = Vec::with_capacity(names.len());
    for name in names {
        let id = new_id();
        conn.execute(&sql, params![id, name])?;
        ids.push(id);
    }
    Ok(ids)
}

fn print_quick_counts(conn: &Connection) -> Result<(), Box<dyn Error>> {
    let mut stmt = conn.prepare(
        "SELECT kind, status, COUNT(*), SUM(quantity) FROM equipment GROUP BY kind, status ORDER BY kind, status",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, i64>(2)?,
            row.get::<_, i64>(3)?,
        ))
    })?;

    eprintln!("{:<10} {:<12} {:>6} {:>8}", "kind", "status", "count", "units");
    for row in rows {
        let (kind, status, count, units) = row?;
        eprintln!("{:<10} {:<12} {:>6} {:>8}", kind, status, count, units);
    }
    Ok(())
}
