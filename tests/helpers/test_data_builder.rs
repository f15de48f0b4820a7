// ==========================================
// 测试数据构建器 - 用于集成测试
// ==========================================
// 同一份描述既可写入 SQLite（insert），也可直接构造 EquipmentRecord（build）
// ==========================================
#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection};

use fleet_kpi::domain::{
    AccessoryLink, CategoryRef, EquipmentKind, EquipmentRecord, EquipmentStatus, NamedRef,
    PartLink,
};

/// 基准更新时间: 2026-01-01 08:00:00
pub fn base_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 1, 1)
        .unwrap()
        .and_hms_opt(8, 0, 0)
        .unwrap()
}

// ==========================================
// EquipmentRecord 构建器
// ==========================================

pub struct EquipmentBuilder {
    id: String,
    kind: EquipmentKind,
    name: String,
    status: EquipmentStatus,
    category: Option<(String, String, String)>,
    plant: Option<(String, String)>,
    supplier: Option<(String, String)>,
    base_price: f64,
    quantity: i64,
    dims_mm: (f64, f64, f64),
    load_capacity_kg: Option<f64>,
    max_speed_kmh: Option<f64>,
    accessories: Vec<(String, String, f64, f64, Option<f64>)>,
    parts: Vec<(String, f64)>,
    flows: Vec<String>,
    compatible_packaging: Vec<String>,
    updated_at: NaiveDateTime,
}

impl EquipmentBuilder {
    pub fn packaging(id: &str) -> Self {
        Self::new(id, EquipmentKind::Packaging)
    }

    pub fn transport(id: &str) -> Self {
        Self::new(id, EquipmentKind::Transport)
    }

    fn new(id: &str, kind: EquipmentKind) -> Self {
        Self {
            id: id.to_string(),
            kind,
            name: id.to_uppercase(),
            status: EquipmentStatus::Active,
            category: None,
            plant: None,
            supplier: None,
            base_price: 0.0,
            quantity: 0,
            dims_mm: (0.0, 0.0, 0.0),
            load_capacity_kg: None,
            max_speed_kmh: None,
            accessories: Vec::new(),
            parts: Vec::new(),
            flows: Vec::new(),
            compatible_packaging: Vec::new(),
            updated_at: base_time(),
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn status(mut self, status: EquipmentStatus) -> Self {
        self.status = status;
        self
    }

    pub fn category(mut self, category: (&str, &str, &str)) -> Self {
        self.category = Some((
            category.0.to_string(),
            category.1.to_string(),
            category.2.to_string(),
        ));
        self
    }

    pub fn plant(mut self, plant: (&str, &str)) -> Self {
        self.plant = Some((plant.0.to_string(), plant.1.to_string()));
        self
    }

    pub fn supplier(mut self, supplier: (&str, &str)) -> Self {
        self.supplier = Some((supplier.0.to_string(), supplier.1.to_string()));
        self
    }

    pub fn price(mut self, price: f64) -> Self {
        self.base_price = price;
        self
    }

    pub fn quantity(mut self, quantity: i64) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn dims(mut self, width: f64, length: f64, height: f64) -> Self {
        self.dims_mm = (width, length, height);
        self
    }

    pub fn load(mut self, kg: f64) -> Self {
        self.load_capacity_kg = Some(kg);
        self
    }

    pub fn speed(mut self, kmh: f64) -> Self {
        self.max_speed_kmh = Some(kmh);
        self
    }

    pub fn accessory(mut self, accessory: (&str, &str, f64), qty_per_unit: f64) -> Self {
        self.accessories.push((
            accessory.0.to_string(),
            accessory.1.to_string(),
            accessory.2,
            qty_per_unit,
            None,
        ));
        self
    }

    pub fn accessory_override(
        mut self,
        accessory: (&str, &str, f64),
        qty_per_unit: f64,
        unit_price_override: f64,
    ) -> Self {
        self.accessories.push((
            accessory.0.to_string(),
            accessory.1.to_string(),
            accessory.2,
            qty_per_unit,
            Some(unit_price_override),
        ));
        self
    }

    pub fn part(mut self, part: (&str, &str), parts_per_unit: f64) -> Self {
        self.parts.push((part.0.to_string(), parts_per_unit));
        self
    }

    pub fn flow(mut self, flow: (&str, &str)) -> Self {
        self.flows.push(flow.0.to_string());
        self
    }

    pub fn compatible_with(mut self, packaging_id: &str) -> Self {
        self.compatible_packaging.push(packaging_id.to_string());
        self
    }

    /// 相对基准时间偏移的更新时间（分钟）
    pub fn updated_minutes_after_base(mut self, minutes: i64) -> Self {
        self.updated_at = base_time() + Duration::minutes(minutes);
        self
    }

    /// 直接构造内存记录（用于 mock 数据源）
    pub fn build(self) -> EquipmentRecord {
        EquipmentRecord {
            category: self.category.map(|(id, name, slug)| CategoryRef { id, name, slug }),
            plant: self.plant.map(|(id, name)| NamedRef::new(id, name)),
            supplier: self.supplier.map(|(id, name)| NamedRef::new(id, name)),
            base_price: self.base_price,
            quantity: self.quantity,
            width_mm: self.dims_mm.0,
            length_mm: self.dims_mm.1,
            height_mm: self.dims_mm.2,
            load_capacity_kg: self.load_capacity_kg,
            max_speed_kmh: self.max_speed_kmh,
            cruise_speed_kmh: None,
            flow_count: self.flows.len() as i64,
            compatible_packaging_count: self.compatible_packaging.len() as i64,
            accessories: self
                .accessories
                .into_iter()
                .map(|(accessory_id, accessory_name, unit_price, qty_per_unit, unit_price_override)| {
                    AccessoryLink {
                        accessory_id,
                        accessory_name,
                        unit_price,
                        unit_price_override,
                        qty_per_unit,
                    }
                })
                .collect(),
            parts: self
                .parts
                .into_iter()
                .map(|(part_id, parts_per_unit)| PartLink {
                    part_id,
                    parts_per_unit,
                })
                .collect(),
            updated_at: self.updated_at,
            id: self.id,
            kind: self.kind,
            name: self.name,
            status: self.status,
        }
    }

    /// 写入 SQLite（参照数据需已存在）
    pub fn insert(self, conn: &Connection) -> rusqlite::Result<()> {
        conn.execute(
            r#"
            INSERT INTO equipment (id, kind, name, status, category_id, plant_id, supplier_id,
                                   base_price, quantity, width_mm, length_mm, height_mm,
                                   load_capacity_kg, max_speed_kmh, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            "#,
            params![
                self.id,
                self.kind.as_str(),
                self.name,
                self.status.as_str(),
                self.category.as_ref().map(|c| c.0.clone()),
                self.plant.as_ref().map(|p| p.0.clone()),
                self.supplier.as_ref().map(|s| s.0.clone()),
                self.base_price,
                self.quantity,
                self.dims_mm.0,
                self.dims_mm.1,
                self.dims_mm.2,
                self.load_capacity_kg,
                self.max_speed_kmh,
                self.updated_at,
            ],
        )?;

        for (accessory_id, _, _, qty, unit_price_override) in &self.accessories {
            conn.execute(
                "INSERT INTO equipment_accessory (equipment_id, accessory_id, qty_per_unit, unit_price_override)
                 VALUES (?1, ?2, ?3, ?4)",
                params![self.id, accessory_id, qty, unit_price_override],
            )?;
        }
        for (part_id, parts_per_unit) in &self.parts {
            conn.execute(
                "INSERT INTO equipment_part (equipment_id, part_id, parts_per_unit) VALUES (?1, ?2, ?3)",
                params![self.id, part_id, parts_per_unit],
            )?;
        }
        for flow_id in &self.flows {
            conn.execute(
                "INSERT INTO equipment_flow (equipment_id, flow_id) VALUES (?1, ?2)",
                params![self.id, flow_id],
            )?;
        }
        for packaging_id in &self.compatible_packaging {
            conn.execute(
                "INSERT INTO transport_packaging (transport_id, packaging_id) VALUES (?1, ?2)",
                params![self.id, packaging_id],
            )?;
        }
        Ok(())
    }
}
