use super::core::SqliteEquipmentRepository;
use crate::domain::{
    AccessoryLink, CategoryRef, EquipmentKind, EquipmentRecord, EquipmentStatus, KpiFilter,
    NamedRef, PartLink,
};
use crate::perf::PerfGuard;
use crate::repository::equipment_source::AggregateMetric;
use crate::repository::error::RepositoryResult;
use crate::repository::sql_utils::{build_in_clause, FilterPredicate, EQUIPMENT_FROM};
use chrono::NaiveDateTime;
use rusqlite::{params_from_iter, Connection, Result as SqliteResult, Row};
use std::collections::HashMap;

/// 关联表按 id 分批加载的批大小（远低于 SQLite 绑定参数上限）
const LINK_CHUNK_SIZE: usize = 500;

/// 单台附件成本子查询（与 AccessoryLink::unit_cost 口径一致）
const ACCESSORY_UNIT_COST_SQL: &str = r#"COALESCE((
    SELECT SUM(COALESCE(ea.unit_price_override, a.unit_price) * ea.qty_per_unit)
    FROM equipment_accessory ea
    JOIN accessory a ON a.id = ea.accessory_id
    WHERE ea.equipment_id = e.id
), 0)"#;

/// 单台容量子查询（Σ parts_per_unit）
const CAPACITY_UNIT_SQL: &str = r#"COALESCE((
    SELECT SUM(ep.parts_per_unit)
    FROM equipment_part ep
    WHERE ep.equipment_id = e.id
), 0)"#;

impl SqliteEquipmentRepository {
    // ==========================================
    // 有界明细
    // ==========================================

    /// 拉取至多 `limit` 条器具（按更新时间倒序）
    pub fn list_equipment_blocking(
        &self,
        kind: EquipmentKind,
        filter: &KpiFilter,
        limit: usize,
    ) -> RepositoryResult<Vec<EquipmentRecord>> {
        let _perf = PerfGuard::new("list_equipment");
        let conn = self.get_conn()?;

        let predicate = FilterPredicate::build(kind, filter);
        let sql = format!(
            r#"
            SELECT e.id, e.name, e.status,
                   c.id, c.name, c.slug,
                   p.id, p.name,
                   s.id, s.name,
                   e.base_price, e.quantity,
                   e.width_mm, e.length_mm, e.height_mm,
                   e.load_capacity_kg, e.max_speed_kmh, e.cruise_speed_kmh,
                   (SELECT COUNT(*) FROM equipment_flow ef_cnt WHERE ef_cnt.equipment_id = e.id),
                   (SELECT COUNT(*) FROM transport_packaging tp WHERE tp.transport_id = e.id),
                   e.updated_at
            {from}
            LEFT JOIN plant p ON p.id = e.plant_id
            LEFT JOIN supplier s ON s.id = e.supplier_id
            WHERE {clause}
            ORDER BY e.updated_at DESC, e.id ASC
            LIMIT {limit}
            "#,
            from = EQUIPMENT_FROM,
            clause = predicate.clause,
            limit = limit,
        );

        let mut stmt = conn.prepare(&sql)?;
        let mut records = stmt
            .query_map(params_from_iter(predicate.params.iter()), |row| {
                map_equipment_row(row, kind)
            })?
            .collect::<SqliteResult<Vec<_>>>()?;

        if records.is_empty() {
            return Ok(records);
        }

        let ids: Vec<String> = records.iter().map(|r| r.id.clone()).collect();
        let mut accessories = load_accessory_links(&conn, &ids)?;
        let mut parts = match kind {
            EquipmentKind::Packaging => load_part_links(&conn, &ids)?,
            EquipmentKind::Transport => HashMap::new(),
        };

        for record in &mut records {
            record.accessories = accessories.remove(&record.id).unwrap_or_default();
            record.parts = parts.remove(&record.id).unwrap_or_default();
        }

        tracing::debug!(kind = %kind, rows = records.len(), limit, "器具明细已加载");
        Ok(records)
    }

    // ==========================================
    // 数据源侧聚合
    // ==========================================

    /// 执行单个聚合指标查询（剔除类别缺失记录）
    pub fn aggregate_blocking(
        &self,
        kind: EquipmentKind,
        filter: &KpiFilter,
        metric: AggregateMetric,
    ) -> RepositoryResult<f64> {
        let _perf = PerfGuard::new(metric.as_str());
        let conn = self.get_conn()?;

        let predicate = FilterPredicate::build(kind, filter).with_resolved_category();
        let sql = aggregate_sql(metric, &predicate);

        let value: Option<f64> = conn.query_row(
            &sql,
            params_from_iter(predicate.params.iter()),
            |row| row.get(0),
        )?;

        Ok(value.unwrap_or(0.0))
    }
}

/// 生成聚合 SQL（谓词参数在 SQL 中恰好出现一次）
pub(super) fn aggregate_sql(metric: AggregateMetric, predicate: &FilterPredicate) -> String {
    let scoped = format!("{} WHERE {}", EQUIPMENT_FROM, predicate.clause);

    match metric {
        AggregateMetric::RecordCount => format!("SELECT COUNT(*) {}", scoped),
        AggregateMetric::TotalUnits => format!("SELECT COALESCE(SUM(e.quantity), 0) {}", scoped),
        AggregateMetric::TotalValueFull => format!(
            "SELECT COALESCE(SUM((e.base_price + {}) * e.quantity), 0) {}",
            ACCESSORY_UNIT_COST_SQL, scoped
        ),
        AggregateMetric::TotalVolume => format!(
            "SELECT COALESCE(SUM(e.width_mm * e.length_mm * e.height_mm / 1000000000.0 * e.quantity), 0) {}",
            scoped
        ),
        AggregateMetric::TotalCapacity => format!(
            "SELECT COALESCE(SUM({} * e.quantity), 0) {}",
            CAPACITY_UNIT_SQL, scoped
        ),
        AggregateMetric::TotalLoad => format!(
            "SELECT COALESCE(SUM(COALESCE(e.load_capacity_kg, 0) * e.quantity), 0) {}",
            scoped
        ),
        AggregateMetric::WeightedSpeedSum => format!(
            "SELECT COALESCE(SUM(e.max_speed_kmh * e.quantity), 0) {}",
            scoped
        ),
        AggregateMetric::SpeedUnits => format!(
            "SELECT COALESCE(SUM(CASE WHEN e.max_speed_kmh IS NOT NULL THEN e.quantity ELSE 0 END), 0) {}",
            scoped
        ),
        AggregateMetric::DistinctCategories => format!("SELECT COUNT(DISTINCT c.id) {}", scoped),
        // 悬空的工厂/供应商 id 与明细汇总一致，不计入（归入 unassigned）
        AggregateMetric::DistinctPlants => format!(
            "SELECT COUNT(DISTINCT p.id) {} LEFT JOIN plant p ON p.id = e.plant_id WHERE {}",
            EQUIPMENT_FROM, predicate.clause
        ),
        AggregateMetric::DistinctSuppliers => format!(
            "SELECT COUNT(DISTINCT s.id) {} LEFT JOIN supplier s ON s.id = e.supplier_id WHERE {}",
            EQUIPMENT_FROM, predicate.clause
        ),
        AggregateMetric::DistinctFlowsCovered => format!(
            "SELECT COUNT(DISTINCT ef_all.flow_id) FROM equipment_flow ef_all WHERE ef_all.equipment_id IN ({})",
            predicate.scoped_ids_sql()
        ),
        AggregateMetric::MultiFlowCount => format!(
            "SELECT COUNT(*) {} AND (SELECT COUNT(*) FROM equipment_flow ef_multi WHERE ef_multi.equipment_id = e.id) >= 2",
            scoped
        ),
        AggregateMetric::DistinctPackagingCompatibility => format!(
            "SELECT COUNT(DISTINCT tp.packaging_id) FROM transport_packaging tp WHERE tp.transport_id IN ({})",
            predicate.scoped_ids_sql()
        ),
    }
}

// ==========================================
// 行映射
// ==========================================

fn map_equipment_row(row: &Row, kind: EquipmentKind) -> SqliteResult<EquipmentRecord> {
    let status: String = row.get(2)?;

    let category = match row.get::<_, Option<String>>(3)? {
        Some(id) => Some(CategoryRef {
            id,
            name: row.get(4)?,
            slug: row.get(5)?,
        }),
        None => None,
    };
    let plant = named_ref(row, 6)?;
    let supplier = named_ref(row, 8)?;

    let updated_at: NaiveDateTime = row.get(20)?;

    Ok(EquipmentRecord {
        id: row.get(0)?,
        kind,
        name: row.get(1)?,
        status: EquipmentStatus::from_db_str(&status),
        category,
        plant,
        supplier,
        base_price: row.get::<_, Option<f64>>(10)?.unwrap_or(0.0),
        quantity: row.get::<_, Option<i64>>(11)?.unwrap_or(0),
        width_mm: row.get::<_, Option<f64>>(12)?.unwrap_or(0.0),
        length_mm: row.get::<_, Option<f64>>(13)?.unwrap_or(0.0),
        height_mm: row.get::<_, Option<f64>>(14)?.unwrap_or(0.0),
        load_capacity_kg: row.get(15)?,
        max_speed_kmh: row.get(16)?,
        cruise_speed_kmh: row.get(17)?,
        flow_count: row.get(18)?,
        compatible_packaging_count: row.get(19)?,
        accessories: Vec::new(),
        parts: Vec::new(),
        updated_at,
    })
}

/// 读取 (id, name) 两列；id 为 NULL 表示未关联或关联悬空
fn named_ref(row: &Row, id_idx: usize) -> SqliteResult<Option<NamedRef>> {
    match row.get::<_, Option<String>>(id_idx)? {
        Some(id) => Ok(Some(NamedRef {
            id,
            name: row.get(id_idx + 1)?,
        })),
        None => Ok(None),
    }
}

fn load_accessory_links(
    conn: &Connection,
    ids: &[String],
) -> SqliteResult<HashMap<String, Vec<AccessoryLink>>> {
    let mut links: HashMap<String, Vec<AccessoryLink>> = HashMap::new();

    for chunk in ids.chunks(LINK_CHUNK_SIZE) {
        let sql = format!(
            r#"
            SELECT ea.equipment_id, a.id, a.name, a.unit_price, ea.unit_price_override, ea.qty_per_unit
            FROM equipment_accessory ea
            JOIN accessory a ON a.id = ea.accessory_id
            WHERE {}
            ORDER BY ea.equipment_id, a.id
            "#,
            build_in_clause("ea.equipment_id", chunk)
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(chunk.iter()), |row| {
            Ok((
                row.get::<_, String>(0)?,
                AccessoryLink {
                    accessory_id: row.get(1)?,
                    accessory_name: row.get(2)?,
                    unit_price: row.get(3)?,
                    unit_price_override: row.get(4)?,
                    qty_per_unit: row.get(5)?,
                },
            ))
        })?;

        for row in rows {
            let (equipment_id, link) = row?;
            links.entry(equipment_id).or_default().push(link);
        }
    }

    Ok(links)
}

fn load_part_links(
    conn: &Connection,
    ids: &[String],
) -> SqliteResult<HashMap<String, Vec<PartLink>>> {
    let mut links: HashMap<String, Vec<PartLink>> = HashMap::new();

    for chunk in ids.chunks(LINK_CHUNK_SIZE) {
        let sql = format!(
            r#"
            SELECT ep.equipment_id, ep.part_id, ep.parts_per_unit
            FROM equipment_part ep
            WHERE {}
            ORDER BY ep.equipment_id, ep.part_id
            "#,
            build_in_clause("ep.equipment_id", chunk)
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(chunk.iter()), |row| {
            Ok((
                row.get::<_, String>(0)?,
                PartLink {
                    part_id: row.get(1)?,
                    parts_per_unit: row.get(2)?,
                },
            ))
        })?;

        for row in rows {
            let (equipment_id, link) = row?;
            links.entry(equipment_id).or_default().push(link);
        }
    }

    Ok(links)
}
