// ==========================================
// Mock 器具数据源 - 调用计数 / 故障注入
// ==========================================
#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use fleet_kpi::domain::{EquipmentKind, EquipmentRecord, KpiFilter};
use fleet_kpi::engine::ItemMetricsCalculator;
use fleet_kpi::repository::{
    AggregateMetric, EquipmentDataSource, RepositoryError, RepositoryResult,
};

/// 内存数据源
///
/// 聚合值基于全部记录在内存中计算（与 SQLite 口径一致的常用指标），
/// 其余指标返回 0。
#[derive(Default)]
pub struct MockDataSource {
    records: Vec<EquipmentRecord>,
    fail_list: bool,
    fail_metrics: Vec<AggregateMetric>,
    list_delay: Option<Duration>,
    list_calls: AtomicUsize,
    aggregate_calls: AtomicUsize,
}

impl MockDataSource {
    pub fn new(records: Vec<EquipmentRecord>) -> Self {
        Self {
            records,
            ..Self::default()
        }
    }

    /// 明细拉取总是失败（数据源不可用）
    pub fn failing() -> Self {
        Self {
            fail_list: true,
            fail_metrics: AggregateMetric::PACKAGING
                .iter()
                .chain(AggregateMetric::TRANSPORT.iter())
                .copied()
                .collect(),
            ..Self::default()
        }
    }

    pub fn with_failing_metric(mut self, metric: AggregateMetric) -> Self {
        self.fail_metrics.push(metric);
        self
    }

    pub fn with_list_delay(mut self, delay: Duration) -> Self {
        self.list_delay = Some(delay);
        self
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn aggregate_calls(&self) -> usize {
        self.aggregate_calls.load(Ordering::SeqCst)
    }

    fn scoped<'a>(
        &'a self,
        kind: EquipmentKind,
        filter: &'a KpiFilter,
    ) -> impl Iterator<Item = &'a EquipmentRecord> + 'a {
        self.records.iter().filter(move |r| {
            r.kind == kind
                && filter.status.status().map_or(true, |s| r.status == s)
                && filter
                    .plant_id
                    .as_ref()
                    .map_or(true, |p| r.plant.as_ref().map(|x| &x.id) == Some(p))
                && filter.category_slug.as_ref().map_or(true, |slug| {
                    r.category.as_ref().map(|c| &c.slug) == Some(slug)
                })
        })
    }
}

#[async_trait]
impl EquipmentDataSource for MockDataSource {
    async fn list_equipment(
        &self,
        kind: EquipmentKind,
        filter: &KpiFilter,
        limit: usize,
    ) -> RepositoryResult<Vec<EquipmentRecord>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.list_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_list {
            return Err(RepositoryError::DataSourceUnavailable(
                "mock: connection refused".to_string(),
            ));
        }

        let mut rows: Vec<EquipmentRecord> = self.scoped(kind, filter).cloned().collect();
        rows.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
        rows.truncate(limit);
        Ok(rows)
    }

    async fn aggregate(
        &self,
        kind: EquipmentKind,
        filter: &KpiFilter,
        metric: AggregateMetric,
    ) -> RepositoryResult<f64> {
        self.aggregate_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_metrics.contains(&metric) {
            return Err(RepositoryError::DatabaseQueryError(format!(
                "mock: {} failed",
                metric
            )));
        }

        let all: Vec<EquipmentRecord> = self.scoped(kind, filter).cloned().collect();
        let calc = ItemMetricsCalculator::new();
        let metrics = calc.compute_all(&all);

        let value = match metric {
            AggregateMetric::RecordCount => metrics.len() as f64,
            AggregateMetric::TotalUnits => metrics.iter().map(|m| m.units() as f64).sum(),
            AggregateMetric::TotalValueFull => metrics.iter().map(|m| m.full_total_value).sum(),
            AggregateMetric::TotalVolume => metrics.iter().map(|m| m.volume_total_m3).sum(),
            AggregateMetric::TotalCapacity => metrics.iter().map(|m| m.capacity_total).sum(),
            AggregateMetric::TotalLoad => metrics.iter().map(|m| m.load_total_kg).sum(),
            AggregateMetric::WeightedSpeedSum => metrics
                .iter()
                .filter_map(|m| m.max_speed_kmh().map(|s| s * m.units() as f64))
                .sum(),
            AggregateMetric::SpeedUnits => metrics
                .iter()
                .filter(|m| m.max_speed_kmh().is_some())
                .map(|m| m.units() as f64)
                .sum(),
            _ => 0.0,
        };
        Ok(value)
    }
}
