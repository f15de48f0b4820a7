// ==========================================
// 物流器具 KPI 引擎 - KPI 查询 API
// ==========================================
// 职责: 过滤 → 缓存 → (明细 ∥ 概览) → 指标 → 汇总 → 快照
// 容错: 明细拉取失败/超时返回空快照；概览单指标失败降级为 0
// 缓存: 只缓存完全成功的快照；失败与降级快照不缓存
// 架构: API 层 → Engine 层 → EquipmentDataSource
// ==========================================

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use crate::api::error::ApiResult;
use crate::api::filter_resolver::{FilterResolver, RawParam};
use crate::config::{ConfigManager, KpiConfig};
use crate::domain::{
    DashboardSummary, EquipmentKind, EquipmentRecord, KpiFilter, PackagingKpiSnapshot,
    SnapshotMeta, TransportKpiSnapshot,
};
use crate::engine::{
    Clock, ItemMetricsCalculator, KpiCache, OverviewAggregator, RollupAggregator, SystemClock,
};
use crate::repository::{
    EquipmentDataSource, RepositoryError, RepositoryResult, SqliteEquipmentRepository,
};

/// 不可缓存的快照（仍返回给调用方）
#[derive(Debug)]
enum Uncacheable<T> {
    /// 明细拉取失败，返回空快照
    Failed(T),
    /// 部分概览字段降级
    Degraded(T),
}

impl<T> Uncacheable<T> {
    fn into_inner(self) -> T {
        match self {
            Uncacheable::Failed(v) | Uncacheable::Degraded(v) => v,
        }
    }
}

// ==========================================
// KpiApi - KPI 查询 API
// ==========================================

/// KPI 查询API
///
/// 进程内共享（`Arc<KpiApi>`），包装器具与运输工具各持有一个快照缓存。
pub struct KpiApi {
    source: Arc<dyn EquipmentDataSource>,
    config: KpiConfig,
    resolver: FilterResolver,
    calculator: ItemMetricsCalculator,
    rollup: RollupAggregator,
    overview: OverviewAggregator,
    packaging_cache: KpiCache<PackagingKpiSnapshot>,
    transport_cache: KpiCache<TransportKpiSnapshot>,
}

impl KpiApi {
    /// 创建KpiApi（系统时钟）
    pub fn new(source: Arc<dyn EquipmentDataSource>, config: KpiConfig) -> ApiResult<Self> {
        Self::with_clock(source, config, Arc::new(SystemClock))
    }

    /// 创建KpiApi（注入时钟）
    ///
    /// # 参数
    /// - source: 器具数据源
    /// - config: KPI 配置（创建时校验）
    /// - clock: 缓存过期判定所用时钟
    pub fn with_clock(
        source: Arc<dyn EquipmentDataSource>,
        config: KpiConfig,
        clock: Arc<dyn Clock>,
    ) -> ApiResult<Self> {
        config.validate()?;

        let ttl = config.cache_ttl()?;
        Ok(Self {
            overview: OverviewAggregator::new(Arc::clone(&source), config.query_timeout()),
            rollup: RollupAggregator::new(config.clone()),
            resolver: FilterResolver::new(),
            calculator: ItemMetricsCalculator::new(),
            packaging_cache: KpiCache::new(ttl, Arc::clone(&clock)),
            transport_cache: KpiCache::new(ttl, clock),
            source,
            config,
        })
    }

    /// 打开 SQLite 数据库并创建KpiApi
    ///
    /// 配置从同库 config_kv 读取；读取失败时告警并使用默认配置。
    pub fn open(db_path: &str) -> ApiResult<Self> {
        let repo = SqliteEquipmentRepository::open(db_path)?;

        let config = match ConfigManager::from_connection(repo.connection())
            .and_then(|manager| manager.load_kpi_config())
        {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %e, "KPI 配置加载失败，使用默认配置");
                KpiConfig::default()
            }
        };

        Self::new(Arc::new(repo), config)
    }

    pub fn config(&self) -> &KpiConfig {
        &self.config
    }

    /// 清空两个快照缓存
    pub fn invalidate_caches(&self) {
        self.packaging_cache.invalidate_all();
        self.transport_cache.invalidate_all();
        tracing::info!("KPI 快照缓存已清空");
    }

    /// 两个快照缓存当前持有的条目数
    pub fn cached_snapshot_count(&self) -> usize {
        self.packaging_cache.len() + self.transport_cache.len()
    }

    // ==========================================
    // 包装器具
    // ==========================================

    /// 包装器具 KPI 快照
    ///
    /// 数据源错误不外抛：失败时返回空快照（不缓存）。
    pub async fn get_packaging_kpis(&self, filter: &KpiFilter) -> Arc<PackagingKpiSnapshot> {
        let key = filter.cache_key(EquipmentKind::Packaging);
        match self
            .packaging_cache
            .get_or_try_compute(&key, || self.compute_packaging(filter))
            .await
        {
            Ok(snapshot) => snapshot,
            Err(uncached) => Arc::new(uncached.into_inner()),
        }
    }

    /// 包装器具 KPI 快照（原始请求参数）
    pub async fn get_packaging_kpis_raw(
        &self,
        raw: &HashMap<String, RawParam>,
    ) -> ApiResult<Arc<PackagingKpiSnapshot>> {
        let filter = self.resolver.resolve(raw)?;
        Ok(self.get_packaging_kpis(&filter).await)
    }

    async fn compute_packaging(
        &self,
        filter: &KpiFilter,
    ) -> Result<PackagingKpiSnapshot, Uncacheable<PackagingKpiSnapshot>> {
        let kind = EquipmentKind::Packaging;
        let (rows, values) = tokio::join!(
            self.list_bounded(kind, filter),
            self.overview.fetch_packaging(filter)
        );

        let rows = match rows {
            Ok(rows) => rows,
            Err(e) => {
                log_listing_failure(kind, filter, &e);
                return Err(Uncacheable::Failed(PackagingKpiSnapshot::empty(
                    self.config.max_items,
                )));
            }
        };

        let metrics = self.calculator.compute_all(&rows);
        let outcome = OverviewAggregator::packaging_overview(&values, &metrics);

        let snapshot = PackagingKpiSnapshot {
            overview: outcome.overview,
            charts: self.rollup.packaging_charts(&metrics),
            table: self.rollup.packaging_table(&metrics),
            meta: self.meta(rows.len(), metrics.len(), outcome.degraded_fields),
        };

        finish(kind, filter, snapshot, |s| &s.meta)
    }

    // ==========================================
    // 运输工具
    // ==========================================

    /// 运输工具 KPI 快照
    ///
    /// 数据源错误不外抛：失败时返回空快照（不缓存）。
    pub async fn get_transport_kpis(&self, filter: &KpiFilter) -> Arc<TransportKpiSnapshot> {
        let key = filter.cache_key(EquipmentKind::Transport);
        match self
            .transport_cache
            .get_or_try_compute(&key, || self.compute_transport(filter))
            .await
        {
            Ok(snapshot) => snapshot,
            Err(uncached) => Arc::new(uncached.into_inner()),
        }
    }

    /// 运输工具 KPI 快照（原始请求参数）
    pub async fn get_transport_kpis_raw(
        &self,
        raw: &HashMap<String, RawParam>,
    ) -> ApiResult<Arc<TransportKpiSnapshot>> {
        let filter = self.resolver.resolve(raw)?;
        Ok(self.get_transport_kpis(&filter).await)
    }

    async fn compute_transport(
        &self,
        filter: &KpiFilter,
    ) -> Result<TransportKpiSnapshot, Uncacheable<TransportKpiSnapshot>> {
        let kind = EquipmentKind::Transport;
        let (rows, values) = tokio::join!(
            self.list_bounded(kind, filter),
            self.overview.fetch_transport(filter)
        );

        let rows = match rows {
            Ok(rows) => rows,
            Err(e) => {
                log_listing_failure(kind, filter, &e);
                return Err(Uncacheable::Failed(TransportKpiSnapshot::empty(
                    self.config.max_items,
                )));
            }
        };

        let metrics = self.calculator.compute_all(&rows);
        let outcome = OverviewAggregator::transport_overview(&values, &metrics);

        let snapshot = TransportKpiSnapshot {
            overview: outcome.overview,
            charts: self.rollup.transport_charts(&metrics),
            categories: self.rollup.transport_categories(&metrics),
            meta: self.meta(rows.len(), metrics.len(), outcome.degraded_fields),
        };

        finish(kind, filter, snapshot, |s| &s.meta)
    }

    // ==========================================
    // 跨域摘要
    // ==========================================

    /// 驾驶舱摘要：同一过滤条件下包装器具与运输工具概览合并
    pub async fn get_dashboard_summary(&self, filter: &KpiFilter) -> DashboardSummary {
        let (packaging, transport) = tokio::join!(
            self.get_packaging_kpis(filter),
            self.get_transport_kpis(filter)
        );

        let p = &packaging.overview;
        let t = &transport.overview;

        let packaging_coverage_ratio = if p.count_packaging_means > 0 {
            (t.distinct_packaging_compatible as f64 / p.count_packaging_means as f64).min(1.0)
        } else {
            0.0
        };

        DashboardSummary {
            packaging: p.clone(),
            transport: t.clone(),
            total_equipment_count: p.count_packaging_means + t.count_transport_means,
            total_units: p.total_units + t.total_units,
            packaging_coverage_ratio,
            degraded: packaging.meta.is_degraded() || transport.meta.is_degraded(),
        }
    }

    // ==========================================
    // 内部辅助
    // ==========================================

    /// 有界明细拉取（受 query_timeout 约束）
    async fn list_bounded(
        &self,
        kind: EquipmentKind,
        filter: &KpiFilter,
    ) -> RepositoryResult<Vec<EquipmentRecord>> {
        self.with_timeout(
            "list_equipment",
            self.source.list_equipment(kind, filter, self.config.max_items),
        )
        .await
    }

    async fn with_timeout<T, F>(&self, operation: &str, fut: F) -> RepositoryResult<T>
    where
        F: Future<Output = RepositoryResult<T>>,
    {
        let timeout = self.config.query_timeout();
        match tokio::time::timeout(timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(RepositoryError::Timeout {
                operation: operation.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }

    fn meta(&self, fetched: usize, detail_rows: usize, degraded_fields: Vec<String>) -> SnapshotMeta {
        SnapshotMeta {
            detail_row_count: detail_rows,
            max_items: self.config.max_items,
            detail_capped: fetched >= self.config.max_items,
            degraded_fields,
        }
    }
}

fn log_listing_failure(kind: EquipmentKind, filter: &KpiFilter, err: &RepositoryError) {
    tracing::error!(
        kind = %kind,
        filter = %filter.canonical(),
        query = "list_equipment",
        error_kind = err.kind(),
        error = %err,
        "KPI 明细查询失败，返回空快照"
    );
}

/// 降级快照照常返回，但不写入缓存
fn finish<T>(
    kind: EquipmentKind,
    filter: &KpiFilter,
    snapshot: T,
    meta_of: impl Fn(&T) -> &SnapshotMeta,
) -> Result<T, Uncacheable<T>> {
    let meta = meta_of(&snapshot);
    if meta.is_degraded() {
        tracing::warn!(
            kind = %kind,
            filter = %filter.canonical(),
            degraded = ?meta.degraded_fields,
            "KPI 快照存在降级字段，不缓存"
        );
        return Err(Uncacheable::Degraded(snapshot));
    }

    tracing::info!(
        kind = %kind,
        filter = %filter.canonical(),
        detail_rows = meta.detail_row_count,
        capped = meta.detail_capped,
        "KPI 快照已计算"
    );
    Ok(snapshot)
}

impl std::fmt::Debug for KpiApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KpiApi")
            .field("config", &self.config)
            .field("packaging_cached", &self.packaging_cache.len())
            .field("transport_cached", &self.transport_cache.len())
            .finish()
    }
}

