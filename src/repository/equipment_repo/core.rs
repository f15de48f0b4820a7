use crate::domain::{EquipmentKind, EquipmentRecord, KpiFilter};
use crate::repository::equipment_source::{AggregateMetric, EquipmentDataSource};
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

// ==========================================
// SqliteEquipmentRepository - 器具仓储
// ==========================================
// 说明: rusqlite 为阻塞 API，异步接口统一走 spawn_blocking
#[derive(Clone)]
pub struct SqliteEquipmentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteEquipmentRepository {
    /// 基于共享连接创建仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 打开数据库文件并创建仓储
    ///
    /// 会应用统一 PRAGMA、安装 SQL 性能追踪，并在 schema_version 不一致时告警。
    pub fn open(db_path: &str) -> RepositoryResult<Self> {
        let mut conn = crate::db::open_sqlite_connection(db_path)?;
        crate::perf::install_sqlite_tracing(&mut conn);
        crate::db::warn_on_schema_drift(&conn);

        tracing::info!(db_path, "器具数据源已打开");
        Ok(Self::new(Arc::new(Mutex::new(conn))))
    }

    /// 共享连接（供 ConfigManager 复用同一数据库）
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.conn)
    }

    /// 获取数据库连接
    pub(super) fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }
}

#[async_trait]
impl EquipmentDataSource for SqliteEquipmentRepository {
    async fn list_equipment(
        &self,
        kind: EquipmentKind,
        filter: &KpiFilter,
        limit: usize,
    ) -> RepositoryResult<Vec<EquipmentRecord>> {
        let repo = self.clone();
        let filter = filter.clone();
        tokio::task::spawn_blocking(move || repo.list_equipment_blocking(kind, &filter, limit))
            .await?
    }

    async fn aggregate(
        &self,
        kind: EquipmentKind,
        filter: &KpiFilter,
        metric: AggregateMetric,
    ) -> RepositoryResult<f64> {
        let repo = self.clone();
        let filter = filter.clone();
        tokio::task::spawn_blocking(move || repo.aggregate_blocking(kind, &filter, metric)).await?
    }
}
