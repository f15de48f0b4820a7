// ==========================================
// 物流器具 KPI 引擎 - 器具数据仓储 (SQLite)
// ==========================================
// 职责: EquipmentDataSource 的 SQLite 实现
// 红线: 只读；Repository 不做业务逻辑,只做数据映射
// ==========================================

mod core;
mod queries;


pub use core::SqliteEquipmentRepository;
