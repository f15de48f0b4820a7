// ==========================================
// 物流器具 KPI 引擎 - 命令行入口
// ==========================================
// 用法: fleet-kpi [--db PATH] <packaging|transport|summary> [key=value ...]
// 输出: 快照 JSON (stdout)；日志写入 stderr
// ==========================================

use anyhow::{bail, Context, Result};

use fleet_kpi::db::default_db_path;
use fleet_kpi::{logging, FilterResolver, KpiApi};

const USAGE: &str = "用法: fleet-kpi [--db PATH] <packaging|transport|summary> [plantId=..] [flowId=..] [categorySlug=..] [status=..]";

#[derive(Debug)]
struct CliArgs {
    db_path: String,
    command: String,
    params: Vec<(String, String)>,
}

fn parse_args<I>(args: I) -> Result<CliArgs>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let mut db_path: Option<String> = None;
    let mut command: Option<String> = None;
    let mut params = Vec::new();

    while let Some(arg) = args.next() {
        if arg == "--db" {
            db_path = Some(args.next().context("--db 缺少路径参数")?);
        } else if let Some(path) = arg.strip_prefix("--db=") {
            db_path = Some(path.to_string());
        } else if command.is_none() {
            command = Some(arg);
        } else {
            match arg.split_once('=') {
                Some((k, v)) => params.push((k.to_string(), v.to_string())),
                None => bail!("无法识别的参数 {:?}\n{}", arg, USAGE),
            }
        }
    }

    let command = command.context(USAGE)?;
    let db_path = db_path.unwrap_or_else(|| default_db_path().to_string_lossy().into_owned());

    Ok(CliArgs {
        db_path,
        command,
        params,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let args = parse_args(std::env::args().skip(1))?;

    tracing::info!("==================================================");
    tracing::info!("{} v{}", fleet_kpi::APP_NAME, fleet_kpi::VERSION);
    tracing::info!("使用数据库: {}", args.db_path);
    tracing::info!("==================================================");

    let filter = FilterResolver::new()
        .resolve_pairs(args.params)
        .context("过滤条件无效")?;

    let api = KpiApi::open(&args.db_path).context("无法初始化 KPI 引擎")?;

    let json = match args.command.as_str() {
        "packaging" => serde_json::to_string_pretty(&*api.get_packaging_kpis(&filter).await)?,
        "transport" => serde_json::to_string_pretty(&*api.get_transport_kpis(&filter).await)?,
        "summary" => serde_json::to_string_pretty(&api.get_dashboard_summary(&filter).await)?,
        other => bail!("未知命令 {:?}\n{}", other, USAGE),
    };

    println!("{}", json);
    Ok(())
}
