// ==========================================
// 物流器具 KPI 引擎 - SQL 构建工具
// ==========================================
// 职责: 过滤谓词与 IN 子句的统一构建
// 约束: 所有值走参数绑定，不拼接用户输入
// ==========================================

use crate::domain::{EquipmentKind, KpiFilter};

/// 器具查询的公共 FROM 子句（类别左连接，便于区分"类别缺失"）
pub const EQUIPMENT_FROM: &str =
    "FROM equipment e LEFT JOIN category c ON c.id = e.category_id";

/// 构建 IN 子句的 SQL 片段
///
/// # 示例
/// ```
/// use fleet_kpi::repository::sql_utils::build_in_clause;
///
/// let ids = vec!["a".to_string(), "b".to_string()];
/// assert_eq!(build_in_clause("e.id", &ids), "e.id IN (?, ?)");
///
/// // 空列表返回永假条件
/// let empty: Vec<String> = vec![];
/// assert_eq!(build_in_clause("e.id", &empty), "1 = 0");
/// ```
pub fn build_in_clause<T: AsRef<str>>(column_name: &str, values: &[T]) -> String {
    if values.is_empty() {
        // 空列表时返回永假条件，确保 SQL 语法正确
        return "1 = 0".to_string();
    }

    let placeholders = values.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
    format!("{} IN ({})", column_name, placeholders)
}

/// 过滤谓词（WHERE 子句 + 绑定参数）
///
/// 明细拉取与聚合查询共用同一谓词，保证口径一致。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterPredicate {
    pub clause: String,
    pub params: Vec<String>,
}

impl FilterPredicate {
    /// 由种类与过滤条件构建谓词（作用于别名 e / c）
    ///
    /// # 示例
    /// ```
    /// use fleet_kpi::domain::{EquipmentKind, KpiFilter};
    /// use fleet_kpi::repository::sql_utils::FilterPredicate;
    ///
    /// let p = FilterPredicate::build(EquipmentKind::Packaging, &KpiFilter::default().with_category("bins"));
    /// assert_eq!(p.clause, "e.kind = ? AND e.status = ? AND c.slug = ?");
    /// assert_eq!(p.params, vec!["PACKAGING", "ACTIVE", "bins"]);
    /// ```
    pub fn build(kind: EquipmentKind, filter: &KpiFilter) -> Self {
        let mut conditions = vec!["e.kind = ?".to_string()];
        let mut params = vec![kind.as_str().to_string()];

        if let Some(status) = filter.status.status() {
            conditions.push("e.status = ?".to_string());
            params.push(status.as_str().to_string());
        }
        if let Some(plant_id) = &filter.plant_id {
            conditions.push("e.plant_id = ?".to_string());
            params.push(plant_id.clone());
        }
        if let Some(slug) = &filter.category_slug {
            conditions.push("c.slug = ?".to_string());
            params.push(slug.clone());
        }
        if let Some(flow_id) = &filter.flow_id {
            conditions.push(
                "EXISTS (SELECT 1 FROM equipment_flow ef WHERE ef.equipment_id = e.id AND ef.flow_id = ?)"
                    .to_string(),
            );
            params.push(flow_id.clone());
        }

        Self {
            clause: conditions.join(" AND "),
            params,
        }
    }

    /// 追加"类别有效"条件（聚合口径：剔除类别缺失/悬空的记录）
    pub fn with_resolved_category(mut self) -> Self {
        self.clause.push_str(" AND c.id IS NOT NULL");
        self
    }

    /// 过滤后器具 id 的子查询
    pub fn scoped_ids_sql(&self) -> String {
        format!("SELECT e.id {} WHERE {}", EQUIPMENT_FROM, self.clause)
    }
}
