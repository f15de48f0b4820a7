// ==========================================
// 物流器具 KPI 引擎 - 明细汇总
// ==========================================
// 职责: 分组汇总、直方图、Top-N 排行、散点采样
// 输入: 有界明细的 ItemMetrics（按更新时间倒序）
// 输出: 图表数组 / 明细表 / 运输工具类别汇总
// 红线: 确定性输出，无 I/O
// ==========================================

use std::collections::HashMap;

use crate::config::KpiConfig;
use crate::domain::{
    GroupRollup, HistogramBucket, NamedRef, PackagingCharts, PackagingTableRow, RankedItem,
    ScatterPoint, TransportCategoryRollup, TransportCharts,
};
use crate::engine::metrics::ItemMetrics;

/// 无工厂/供应商的器具归入此分组
pub const UNASSIGNED_KEY: &str = "unassigned";

/// 分组维度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupDimension {
    Category,
    Plant,
    Supplier,
    Status,
}

impl GroupDimension {
    /// (分组键, 展示名称)
    fn key_of(&self, m: &ItemMetrics<'_>) -> (String, String) {
        match self {
            GroupDimension::Category => (m.category.id.clone(), m.category.name.clone()),
            GroupDimension::Plant => named_or_unassigned(m.record.plant.as_ref()),
            GroupDimension::Supplier => named_or_unassigned(m.record.supplier.as_ref()),
            GroupDimension::Status => {
                let code = m.record.status.as_str();
                (code.to_string(), code.to_string())
            }
        }
    }
}

fn named_or_unassigned(named: Option<&NamedRef>) -> (String, String) {
    match named {
        Some(n) => (n.id.clone(), n.name.clone()),
        None => (UNASSIGNED_KEY.to_string(), UNASSIGNED_KEY.to_string()),
    }
}

// ==========================================
// RollupAggregator - 明细汇总器
// ==========================================
#[derive(Debug, Clone)]
pub struct RollupAggregator {
    config: KpiConfig,
}

impl RollupAggregator {
    pub fn new(config: KpiConfig) -> Self {
        Self { config }
    }

    // ==========================================
    // 基础运算
    // ==========================================

    /// 分组汇总，输出顺序 = 首次出现顺序
    pub fn group_by(&self, metrics: &[ItemMetrics<'_>], dimension: GroupDimension) -> Vec<GroupRollup> {
        let mut groups: Vec<GroupRollup> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for m in metrics {
            let (key, label) = dimension.key_of(m);
            let slot = match index.get(&key) {
                Some(&i) => i,
                None => {
                    index.insert(key.clone(), groups.len());
                    groups.push(GroupRollup::new(key, label));
                    groups.len() - 1
                }
            };

            let g = &mut groups[slot];
            g.count += 1;
            g.units += m.units();
            g.total_value += m.full_total_value;
            g.total_volume_m3 += m.volume_total_m3;
            g.total_capacity += m.capacity_total;
            g.total_load_kg += m.load_total_kg;
        }

        groups
    }

    /// 直方图
    ///
    /// 每个值落入第一个 ≥ 值的边界桶，超过最后边界的进入溢出桶。
    /// 输出恒为 `boundaries.len() + 1` 个桶（含空桶）。
    pub fn histogram<I>(&self, values: I, boundaries: &[f64]) -> Vec<HistogramBucket>
    where
        I: IntoIterator<Item = f64>,
    {
        let mut counts = vec![0i64; boundaries.len() + 1];

        for v in values {
            let slot = boundaries
                .iter()
                .position(|b| v <= *b)
                .unwrap_or(boundaries.len());
            counts[slot] += 1;
        }

        let mut buckets: Vec<HistogramBucket> = boundaries
            .iter()
            .zip(counts.iter())
            .map(|(b, c)| HistogramBucket {
                label: format!("≤{}", b),
                upper_bound: Some(*b),
                count: *c,
            })
            .collect();

        let overflow_label = match boundaries.last() {
            Some(last) => format!(">{}", last),
            None => "all".to_string(),
        };
        buckets.push(HistogramBucket {
            label: overflow_label,
            upper_bound: None,
            count: counts[boundaries.len()],
        });

        buckets
    }

    /// Top-N 排行（稳定排序，降序，并列保持输入顺序）
    pub fn top_n<F>(&self, metrics: &[ItemMetrics<'_>], n: usize, value_of: F) -> Vec<RankedItem>
    where
        F: Fn(&ItemMetrics<'_>) -> f64,
    {
        let mut ranked: Vec<RankedItem> = metrics
            .iter()
            .map(|m| RankedItem {
                id: m.record.id.clone(),
                name: m.record.name.clone(),
                category: m.category.name.clone(),
                value: value_of(m),
            })
            .collect();

        ranked.sort_by(|a, b| b.value.total_cmp(&a.value));
        ranked.truncate(n);
        ranked
    }

    /// 散点采样：取前 `scatter_cap` 条（按更新时间倒序的头部）
    pub fn scatter<F>(&self, metrics: &[ItemMetrics<'_>], point_of: F) -> Vec<ScatterPoint>
    where
        F: Fn(&ItemMetrics<'_>) -> (f64, f64),
    {
        metrics
            .iter()
            .take(self.config.scatter_cap)
            .map(|m| {
                let (x, y) = point_of(m);
                ScatterPoint {
                    id: m.record.id.clone(),
                    name: m.record.name.clone(),
                    x,
                    y,
                }
            })
            .collect()
    }

    // ==========================================
    // 包装器具
    // ==========================================

    pub fn packaging_charts(&self, metrics: &[ItemMetrics<'_>]) -> PackagingCharts {
        PackagingCharts {
            value_by_category: self.group_by(metrics, GroupDimension::Category),
            volume_by_plant: self.group_by(metrics, GroupDimension::Plant),
            count_by_supplier: self.group_by(metrics, GroupDimension::Supplier),
            count_by_status: self.group_by(metrics, GroupDimension::Status),
            capacity_histogram: self.histogram(
                metrics.iter().map(|m| m.capacity_unit),
                &self.config.capacity_histogram_boundaries,
            ),
            top_by_value: self.top_n(metrics, self.config.top_n_small, |m| m.full_total_value),
            top_by_capacity: self.top_n(metrics, self.config.top_n_small, |m| m.capacity_total),
            cost_volume_scatter: self.scatter(metrics, |m| (m.volume_unit_m3, m.full_unit_cost)),
        }
    }

    /// 明细表：全部有界明细，保持更新时间倒序
    pub fn packaging_table(&self, metrics: &[ItemMetrics<'_>]) -> Vec<PackagingTableRow> {
        metrics
            .iter()
            .map(|m| PackagingTableRow {
                id: m.record.id.clone(),
                name: m.record.name.clone(),
                category: m.category.name.clone(),
                plant: m.record.plant.as_ref().map(|p| p.name.clone()),
                supplier: m.record.supplier.as_ref().map(|s| s.name.clone()),
                status: m.record.status.as_str().to_string(),
                units: m.units(),
                base_price: m.record.base_price,
                accessory_unit_cost: m.accessory_unit_cost,
                full_unit_cost: m.full_unit_cost,
                full_total_value: m.full_total_value,
                volume_unit_m3: m.volume_unit_m3,
                volume_total_m3: m.volume_total_m3,
                capacity_unit: m.capacity_unit,
                capacity_total: m.capacity_total,
            })
            .collect()
    }

    // ==========================================
    // 运输工具
    // ==========================================

    pub fn transport_charts(&self, metrics: &[ItemMetrics<'_>]) -> TransportCharts {
        TransportCharts {
            load_by_category: self.group_by(metrics, GroupDimension::Category),
            units_by_plant: self.group_by(metrics, GroupDimension::Plant),
            count_by_status: self.group_by(metrics, GroupDimension::Status),
            load_histogram: self.histogram(
                metrics.iter().map(|m| m.load_capacity_kg()),
                &self.config.load_histogram_boundaries,
            ),
            top_by_load: self.top_n(metrics, self.config.top_n_large, |m| m.load_total_kg),
            speed_load_scatter: self.scatter(metrics, |m| {
                (m.max_speed_kmh().unwrap_or(0.0), m.load_capacity_kg())
            }),
        }
    }

    /// 运输工具类别汇总（首次出现顺序）
    ///
    /// 平均最高速度按器具条数计算，只统计有速度数据的器具。
    pub fn transport_categories(&self, metrics: &[ItemMetrics<'_>]) -> Vec<TransportCategoryRollup> {
        struct Acc {
            rollup: TransportCategoryRollup,
            speed_sum: f64,
            speed_count: i64,
        }

        let mut accs: Vec<Acc> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();

        for m in metrics {
            let slot = match index.get(m.category.id.as_str()) {
                Some(&i) => i,
                None => {
                    index.insert(m.category.id.as_str(), accs.len());
                    accs.push(Acc {
                        rollup: TransportCategoryRollup {
                            category_id: m.category.id.clone(),
                            slug: m.category.slug.clone(),
                            name: m.category.name.clone(),
                            count: 0,
                            units: 0,
                            total_load_kg: 0.0,
                            avg_max_speed_kmh: 0.0,
                        },
                        speed_sum: 0.0,
                        speed_count: 0,
                    });
                    accs.len() - 1
                }
            };

            let acc = &mut accs[slot];
            acc.rollup.count += 1;
            acc.rollup.units += m.units();
            acc.rollup.total_load_kg += m.load_total_kg;
            if let Some(speed) = m.max_speed_kmh() {
                acc.speed_sum += speed;
                acc.speed_count += 1;
            }
        }

        accs.into_iter()
            .map(|acc| {
                let mut rollup = acc.rollup;
                if acc.speed_count > 0 {
                    rollup.avg_max_speed_kmh = acc.speed_sum / acc.speed_count as f64;
                }
                rollup
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CategoryRef, EquipmentKind, EquipmentRecord, EquipmentStatus};
    use crate::engine::metrics::ItemMetricsCalculator;
    use chrono::NaiveDate;

    fn record(id: &str, category: (&str, &str), plant: Option<&str>) -> EquipmentRecord {
        EquipmentRecord {
            id: id.to_string(),
            kind: EquipmentKind::Transport,
            name: id.to_string(),
            status: EquipmentStatus::Active,
            category: Some(CategoryRef {
                id: category.0.to_string(),
                name: category.1.to_string(),
                slug: category.0.to_string(),
            }),
            plant: plant.map(|p| NamedRef::new(p, p)),
            supplier: None,
            base_price: 0.0,
            quantity: 1,
            width_mm: 0.0,
            length_mm: 0.0,
            height_mm: 0.0,
            load_capacity_kg: None,
            max_speed_kmh: None,
            cruise_speed_kmh: None,
            flow_count: 0,
            compatible_packaging_count: 0,
            accessories: Vec::new(),
            parts: Vec::new(),
            updated_at: NaiveDate::from_ymd_opt(2026, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        }
    }

    fn aggregator() -> RollupAggregator {
        RollupAggregator::new(KpiConfig::default())
    }

    #[test]
    fn test_group_by_首次出现顺序与未分配() {
        let records = vec![
            record("t1", ("forklift", "叉车"), Some("p2")),
            record("t2", ("tractor", "牵引车"), None),
            record("t3", ("forklift", "叉车"), Some("p1")),
            record("t4", ("tractor", "牵引车"), Some("p2")),
        ];
        let metrics = ItemMetricsCalculator::new().compute_all(&records);
        let agg = aggregator();

        let by_category = agg.group_by(&metrics, GroupDimension::Category);
        let keys: Vec<&str> = by_category.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, vec!["forklift", "tractor"]);
        assert_eq!(by_category[0].count, 2);

        let by_plant = agg.group_by(&metrics, GroupDimension::Plant);
        let keys: Vec<&str> = by_plant.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, vec!["p2", UNASSIGNED_KEY, "p1"]);
    }

    #[test]
    fn test_histogram_桶数恒定() {
        let agg = aggregator();
        let boundaries = [0.0, 100.0, 250.0];

        let buckets = agg.histogram(vec![0.0, 50.0, 100.0, 101.0, 999.0], &boundaries);
        assert_eq!(buckets.len(), boundaries.len() + 1);

        let counts: Vec<i64> = buckets.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![1, 2, 1, 1]);
        assert_eq!(buckets[1].label, "≤100");
        assert_eq!(buckets[3].label, ">250");
        assert_eq!(buckets[3].upper_bound, None);

        let empty = agg.histogram(Vec::new(), &boundaries);
        assert_eq!(empty.len(), 4);
        assert!(empty.iter().all(|b| b.count == 0));
    }

    #[test]
    fn test_top_n_稳定排序() {
        let mut records = vec![
            record("a", ("c", "C"), None),
            record("b", ("c", "C"), None),
            record("c", ("c", "C"), None),
        ];
        records[0].load_capacity_kg = Some(100.0);
        records[1].load_capacity_kg = Some(300.0);
        records[2].load_capacity_kg = Some(100.0);
        let metrics = ItemMetricsCalculator::new().compute_all(&records);

        let top = aggregator().top_n(&metrics, 2, |m| m.load_total_kg);
        let ids: Vec<&str> = top.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn test_scatter_头部截断() {
        let records: Vec<EquipmentRecord> = (0..100)
            .map(|i| record(&format!("t{:03}", i), ("c", "C"), None))
            .collect();
        let metrics = ItemMetricsCalculator::new().compute_all(&records);

        let points = aggregator().scatter(&metrics, |m| (m.units() as f64, 0.0));
        assert_eq!(points.len(), 80);
        assert_eq!(points[0].id, "t000");
        assert_eq!(points[79].id, "t079");
    }

    #[test]
    fn test_transport_categories_平均速度() {
        let mut records = vec![
            record("t1", ("forklift", "叉车"), None),
            record("t2", ("forklift", "叉车"), None),
            record("t3", ("forklift", "叉车"), None),
        ];
        records[0].max_speed_kmh = Some(10.0);
        records[1].max_speed_kmh = Some(20.0);
        records[0].load_capacity_kg = Some(500.0);
        records[0].quantity = 2;
        let metrics = ItemMetricsCalculator::new().compute_all(&records);

        let cats = aggregator().transport_categories(&metrics);
        assert_eq!(cats.len(), 1);
        assert_eq!(cats[0].count, 3);
        assert_eq!(cats[0].units, 4);
        assert_eq!(cats[0].total_load_kg, 1000.0);
        assert_eq!(cats[0].avg_max_speed_kmh, 15.0);
    }
}
