//! car-doctor CLI 分发：`run`、`doctor`、`seed-services`、`version`。

use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow, bail};
use cd_shared_protocol::SERVICES_COLLECTION;
use serde_json::{Value, json};

use crate::{
    config::Config,
    store::{
        Document, DocumentStore,
        persist::{load_collections, resolve_data_path},
    },
};

/// CLI 分发结果。
pub(crate) enum CliDispatch {
    /// 继续进入服务主循环。
    Run,
    /// 命令已处理完成，主程序应退出。
    Exit,
}

/// 解析后的命令。
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Run,
    Help,
    Doctor(DoctorFormat),
    SeedServices(PathBuf),
    Version,
}

/// `doctor` 输出格式。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DoctorFormat {
    Text,
    Json,
}

/// 解析并执行 CLI。
pub(crate) async fn dispatch(args: &[String]) -> anyhow::Result<CliDispatch> {
    match parse_command(args)? {
        Command::Run => Ok(CliDispatch::Run),
        Command::Help => {
            print_root_help();
            Ok(CliDispatch::Exit)
        }
        Command::Doctor(format) => {
            if !run_doctor(format) {
                std::process::exit(1);
            }
            Ok(CliDispatch::Exit)
        }
        Command::SeedServices(file) => {
            let inserted = seed_services(&file).await?;
            println!("seeded {inserted} service(s) from {}", file.display());
            Ok(CliDispatch::Exit)
        }
        Command::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(CliDispatch::Exit)
        }
    }
}

fn parse_command(args: &[String]) -> anyhow::Result<Command> {
    let Some(first) = args.first() else {
        return Ok(Command::Run);
    };

    match first.trim() {
        "" | "run" => Ok(Command::Run),
        "-h" | "--help" | "help" => Ok(Command::Help),
        "doctor" => Ok(Command::Doctor(parse_doctor_format(&args[1..])?)),
        "seed-services" => match &args[1..] {
            [file] if !file.trim().is_empty() => Ok(Command::SeedServices(PathBuf::from(file))),
            _ => Err(anyhow!("usage: car-doctor seed-services <file.json>")),
        },
        "version" | "--version" | "-V" => Ok(Command::Version),
        other => Err(anyhow!(
            "unknown command: {other}; run `car-doctor --help` for usage"
        )),
    }
}

/// 解析 doctor 的 `--format` 参数。
fn parse_doctor_format(args: &[String]) -> anyhow::Result<DoctorFormat> {
    match args {
        [] => Ok(DoctorFormat::Text),
        [flag, value] if flag == "--format" => match value.as_str() {
            "text" => Ok(DoctorFormat::Text),
            "json" => Ok(DoctorFormat::Json),
            other => Err(anyhow!("unsupported doctor format: {other}")),
        },
        _ => Err(anyhow!("usage: car-doctor doctor [--format text|json]")),
    }
}

/// 打印配置与存储自检结果，返回是否健康。存储只读加载，不与运行中的服务争用文件锁。
fn run_doctor(format: DoctorFormat) -> bool {
    let config = Config::from_env();
    let data_path = match &config {
        Ok(config) => config.data_path.clone(),
        Err(_) => resolve_data_path(std::env::var("CD_DATA_PATH").ok().as_deref()),
    };
    let store = load_collections(&data_path);
    let counts = store.as_ref().ok().map(|collections| {
        collections
            .iter()
            .map(|(name, docs)| (name.clone(), docs.len()))
            .collect::<std::collections::BTreeMap<_, _>>()
    });
    let healthy = config.is_ok() && store.is_ok();

    match format {
        DoctorFormat::Text => {
            match &config {
                Ok(config) => println!("config: ok ({})", config.bind_addr),
                Err(err) => println!("config: error ({err:#})"),
            }
            println!("data-path: {}", data_path.display());
            match (&store, &counts) {
                (Ok(_), Some(counts)) => {
                    println!("store: ok");
                    for (name, count) in counts {
                        println!("  {name}: {count}");
                    }
                }
                (Err(err), _) => println!("store: error ({err})"),
                _ => {}
            }
        }
        DoctorFormat::Json => {
            let payload = json!({
                "healthy": healthy,
                "config": match &config {
                    Ok(config) => config.redacted_json(),
                    Err(err) => json!({ "error": format!("{err:#}") }),
                },
                "dataPath": data_path.display().to_string(),
                "store": match &store {
                    Ok(_) => json!({ "ok": true, "collections": counts }),
                    Err(err) => json!({ "ok": false, "error": err.to_string() }),
                },
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&payload).unwrap_or_else(|_| "{}".to_string())
            );
        }
    }

    healthy
}

/// 从 JSON 数组文件导入服务项目目录；已存在的 `_id` 跳过。
async fn seed_services(file: &Path) -> anyhow::Result<usize> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("read seed file {}", file.display()))?;
    let docs = parse_seed_documents(&raw)?;
    let data_path = resolve_data_path(std::env::var("CD_DATA_PATH").ok().as_deref());
    let store = DocumentStore::open(&data_path)
        .with_context(|| format!("open document store {}", data_path.display()))?;
    let inserted = store
        .insert_many_if_absent(SERVICES_COLLECTION, docs)
        .await
        .context("write seeded services")?;
    Ok(inserted)
}

fn parse_seed_documents(raw: &str) -> anyhow::Result<Vec<Document>> {
    let value: Value = serde_json::from_str(raw).context("seed file is not valid JSON")?;
    let Value::Array(items) = value else {
        bail!("seed file must contain a JSON array of service documents");
    };
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(doc) => Ok(doc),
            _ => Err(anyhow!("seed entry #{index} is not a JSON object")),
        })
        .collect()
}

fn print_root_help() {
    println!(
        "car-doctor {}\n\nUSAGE:\n  car-doctor [run]\n  car-doctor doctor [--format text|json]\n  car-doctor seed-services <file.json>\n  car-doctor version\n  car-doctor help",
        env!("CARGO_PKG_VERSION")
    );
}
