// ==========================================
// 物流器具 KPI 引擎 - 概览聚合
// ==========================================
// 职责: 基于数据源侧聚合计算完整过滤集合的精确概览
// 输入: KpiFilter + 指标清单 (AggregateMetric)
// 输出: PackagingOverview / TransportOverview + 降级字段列表
// ==========================================
// 口径: 每个指标一条查询并发执行；单个指标失败只把对应字段降级为 0
// ==========================================

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;

use crate::domain::{EquipmentKind, KpiFilter, PackagingOverview, TransportOverview};
use crate::engine::metrics::ItemMetrics;
use crate::repository::{AggregateMetric, EquipmentDataSource, RepositoryError};

/// 一次概览查询的原始聚合值（失败指标不写入）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateValues {
    values: HashMap<AggregateMetric, f64>,
}

impl AggregateValues {
    pub fn insert(&mut self, metric: AggregateMetric, value: f64) {
        self.values.insert(metric, value);
    }

    /// 指标值（失败或缺失时为 None）
    pub fn get(&self, metric: AggregateMetric) -> Option<f64> {
        self.values.get(&metric).copied()
    }
}

/// 概览 + 降级字段
#[derive(Debug, Clone, PartialEq)]
pub struct OverviewOutcome<T> {
    pub overview: T,
    /// 降级为 0（或回退口径）的概览字段名（camelCase）
    pub degraded_fields: Vec<String>,
}

// ==========================================
// OverviewAggregator - 概览聚合器
// ==========================================
pub struct OverviewAggregator {
    source: Arc<dyn EquipmentDataSource>,
    query_timeout: Duration,
}

impl OverviewAggregator {
    pub fn new(source: Arc<dyn EquipmentDataSource>, query_timeout: Duration) -> Self {
        Self {
            source,
            query_timeout,
        }
    }

    /// 并发执行指标查询
    ///
    /// 每条查询单独受 `query_timeout` 约束；失败的指标记录告警后留空。
    pub async fn fetch(
        &self,
        kind: EquipmentKind,
        filter: &KpiFilter,
        metrics: &[AggregateMetric],
    ) -> AggregateValues {
        let queries = metrics.iter().map(|&metric| async move {
            let result =
                match tokio::time::timeout(self.query_timeout, self.source.aggregate(kind, filter, metric))
                    .await
                {
                    Ok(r) => r,
                    Err(_) => Err(RepositoryError::Timeout {
                        operation: format!("aggregate:{}", metric),
                        timeout_ms: self.query_timeout.as_millis() as u64,
                    }),
                };
            (metric, result)
        });

        let mut values = AggregateValues::default();
        for (metric, result) in join_all(queries).await {
            match result {
                Ok(v) => values.insert(metric, v),
                Err(e) => {
                    tracing::warn!(
                        kind = %kind,
                        filter = %filter.canonical(),
                        metric = %metric,
                        error_kind = e.kind(),
                        error = %e,
                        "概览指标查询失败，字段降级"
                    );
                }
            }
        }
        values
    }

    pub async fn fetch_packaging(&self, filter: &KpiFilter) -> AggregateValues {
        self.fetch(EquipmentKind::Packaging, filter, &AggregateMetric::PACKAGING)
            .await
    }

    pub async fn fetch_transport(&self, filter: &KpiFilter) -> AggregateValues {
        self.fetch(EquipmentKind::Transport, filter, &AggregateMetric::TRANSPORT)
            .await
    }

    // ==========================================
    // 概览组装（纯计算）
    // ==========================================

    /// 组装包装器具概览
    ///
    /// avg_full_unit_cost = total_value_full / total_units；
    /// 分子分母任一不可用或数量为 0 时，回退为有界明细的简单平均。
    pub fn packaging_overview(
        values: &AggregateValues,
        bounded: &[ItemMetrics<'_>],
    ) -> OverviewOutcome<PackagingOverview> {
        let mut degraded = DegradedFields::new(values);

        let count = degraded.int(AggregateMetric::RecordCount, "countPackagingMeans");
        let total_units = degraded.int(AggregateMetric::TotalUnits, "totalUnits");
        let total_value_full = degraded.float(AggregateMetric::TotalValueFull, "totalValueFull");

        let avg_full_unit_cost = match (
            values.get(AggregateMetric::TotalValueFull),
            values.get(AggregateMetric::TotalUnits),
        ) {
            (Some(value), Some(units)) if units > 0.0 => value / units,
            (Some(_), Some(_)) => simple_mean(bounded.iter().map(|m| m.full_unit_cost)),
            _ => {
                degraded.push("avgFullUnitCost");
                simple_mean(bounded.iter().map(|m| m.full_unit_cost))
            }
        };

        let overview = PackagingOverview {
            count_packaging_means: count,
            total_units,
            total_value_full,
            total_volume_m3: degraded.float(AggregateMetric::TotalVolume, "totalVolumeM3"),
            total_capacity: degraded.float(AggregateMetric::TotalCapacity, "totalCapacity"),
            avg_full_unit_cost,
            distinct_categories: degraded.int(AggregateMetric::DistinctCategories, "distinctCategories"),
            distinct_plants: degraded.int(AggregateMetric::DistinctPlants, "distinctPlants"),
            distinct_suppliers: degraded.int(AggregateMetric::DistinctSuppliers, "distinctSuppliers"),
            distinct_flows_covered: degraded
                .int(AggregateMetric::DistinctFlowsCovered, "distinctFlowsCovered"),
        };

        OverviewOutcome {
            overview,
            degraded_fields: degraded.into_fields(),
        }
    }

    /// 组装运输工具概览
    ///
    /// avg_max_speed_kmh = Σ(speed × units) / Σ units(有速度数据)；
    /// 分母为 0 或任一查询失败时，回退为有界明细按条数的简单平均。
    pub fn transport_overview(
        values: &AggregateValues,
        bounded: &[ItemMetrics<'_>],
    ) -> OverviewOutcome<TransportOverview> {
        let mut degraded = DegradedFields::new(values);

        let bounded_speed_mean = || simple_mean(bounded.iter().filter_map(|m| m.max_speed_kmh()));
        let avg_max_speed_kmh = match (
            values.get(AggregateMetric::WeightedSpeedSum),
            values.get(AggregateMetric::SpeedUnits),
        ) {
            (Some(weighted), Some(units)) if units > 0.0 => weighted / units,
            (Some(_), Some(_)) => bounded_speed_mean(),
            _ => {
                degraded.push("avgMaxSpeedKmh");
                bounded_speed_mean()
            }
        };

        let overview = TransportOverview {
            count_transport_means: degraded.int(AggregateMetric::RecordCount, "countTransportMeans"),
            total_units: degraded.int(AggregateMetric::TotalUnits, "totalUnits"),
            total_load_kg: degraded.float(AggregateMetric::TotalLoad, "totalLoadKg"),
            avg_max_speed_kmh,
            distinct_packaging_compatible: degraded.int(
                AggregateMetric::DistinctPackagingCompatibility,
                "distinctPackagingCompatible",
            ),
            distinct_flows_covered: degraded
                .int(AggregateMetric::DistinctFlowsCovered, "distinctFlowsCovered"),
            multi_flow_count: degraded.int(AggregateMetric::MultiFlowCount, "multiFlowCount"),
            distinct_categories: degraded.int(AggregateMetric::DistinctCategories, "distinctCategories"),
            distinct_plants: degraded.int(AggregateMetric::DistinctPlants, "distinctPlants"),
        };

        OverviewOutcome {
            overview,
            degraded_fields: degraded.into_fields(),
        }
    }
}

/// 概览字段读取器：失败的指标取 0 并记录字段名
struct DegradedFields<'v> {
    values: &'v AggregateValues,
    fields: Vec<String>,
}

impl<'v> DegradedFields<'v> {
    fn new(values: &'v AggregateValues) -> Self {
        Self {
            values,
            fields: Vec::new(),
        }
    }

    fn float(&mut self, metric: AggregateMetric, field: &str) -> f64 {
        match self.values.get(metric) {
            Some(v) => v,
            None => {
                self.push(field);
                0.0
            }
        }
    }

    fn int(&mut self, metric: AggregateMetric, field: &str) -> i64 {
        self.float(metric, field).round() as i64
    }

    fn push(&mut self, field: &str) {
        self.fields.push(field.to_string());
    }

    fn into_fields(self) -> Vec<String> {
        self.fields
    }
}

fn simple_mean<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let (sum, n) = values
        .into_iter()
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}
