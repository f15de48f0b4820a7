// ==========================================
// 物流器具 KPI 引擎 - 查询耗时统计
// ==========================================
// 职责: 慢 SQL 语句日志 + 数据源操作（明细/单个指标）耗时
// 开关:
// - FLEET_KPI_PERF_SQL=1 强制开启语句级 profile（Debug 默认开启）
// - FLEET_KPI_SLOW_SQL_MS 慢查询阈值（毫秒），语句与操作共用
// ==========================================

use rusqlite::Connection;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

pub const ENV_PERF_SQL: &str = "FLEET_KPI_PERF_SQL";
pub const ENV_SLOW_SQL_MS: &str = "FLEET_KPI_SLOW_SQL_MS";

const SQL_LOG_MAX_CHARS: usize = 420;

/// 性能统计开关（进程内首次读取环境变量后固定）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PerfSettings {
    pub profile_sql: bool,
    pub slow_threshold: Duration,
}

impl PerfSettings {
    fn resolve(perf_sql: Option<&str>, slow_ms: Option<&str>, debug_build: bool) -> Self {
        let profile_sql = perf_sql.map_or(debug_build, |v| {
            matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
        });
        let slow_ms = slow_ms
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(if debug_build { 50 } else { 200 });

        Self {
            profile_sql,
            slow_threshold: Duration::from_millis(slow_ms),
        }
    }

    pub fn current() -> Self {
        static SETTINGS: OnceLock<PerfSettings> = OnceLock::new();
        *SETTINGS.get_or_init(|| {
            Self::resolve(
                std::env::var(ENV_PERF_SQL).ok().as_deref(),
                std::env::var(ENV_SLOW_SQL_MS).ok().as_deref(),
                cfg!(debug_assertions),
            )
        })
    }
}

/// 压缩空白后按字符截断
fn compact_sql(sql: &str) -> String {
    let s = sql.split_whitespace().collect::<Vec<_>>().join(" ");
    if s.chars().count() <= SQL_LOG_MAX_CHARS {
        return s;
    }
    let head: String = s.chars().take(SQL_LOG_MAX_CHARS).collect();
    format!("{}…", head)
}

/// 为连接安装语句级 profile（仅记录超过阈值的语句）
///
/// 聚合按指标拆成独立 SQL，慢语句日志可直接对应到具体指标。
pub fn install_sqlite_tracing(conn: &mut Connection) {
    if PerfSettings::current().profile_sql {
        conn.profile(Some(log_slow_statement));
    } else {
        conn.profile(None);
    }
}

fn log_slow_statement(sql: &str, elapsed: Duration) {
    if elapsed >= PerfSettings::current().slow_threshold {
        tracing::warn!(
            target: "slow_sql",
            elapsed_ms = elapsed.as_millis() as u64,
            sql = %compact_sql(sql),
            "慢 SQL"
        );
    }
}

/// 数据源操作计时，drop 时输出耗时
///
/// ```ignore
/// let _perf = fleet_kpi::perf::PerfGuard::new("list_equipment");
/// ```
pub struct PerfGuard {
    op: &'static str,
    start: Instant,
}

impl PerfGuard {
    pub fn new(op: &'static str) -> Self {
        Self {
            op,
            start: Instant::now(),
        }
    }
}

impl Drop for PerfGuard {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        let elapsed_ms = elapsed.as_millis() as u64;
        if elapsed >= PerfSettings::current().slow_threshold {
            tracing::info!(target: "perf", op = self.op, elapsed_ms, "数据源操作较慢");
        } else {
            tracing::debug!(target: "perf", op = self.op, elapsed_ms, "done");
        }
    }
}
