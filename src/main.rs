use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use elements::{AppMode, Application};
use elements_core::config::AppConfig;
use elements_core::logging::{init_tracing, LogConfig};
use elements_core::models::{RequestContext, SlotLayout};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // 解析命令行参数
    let matches = Command::new("elements")
        .version("1.0.0")
        .about("页面元素调度引擎")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("配置文件路径，未指定时尝试默认路径"),
        )
        .arg(
            Arg::new("mode")
                .short('m')
                .long("mode")
                .value_name("MODE")
                .help("运行模式")
                .value_parser(["check", "render", "element"])
                .default_value("check"),
        )
        .arg(
            Arg::new("layout")
                .long("layout")
                .value_name("FILE")
                .help("插槽布局JSON文件 (仅在render模式下使用)")
                .required_if_eq("mode", "render"),
        )
        .arg(
            Arg::new("element")
                .short('e')
                .long("element")
                .value_name("ID")
                .help("元素标识 (仅在element模式下使用)")
                .required_if_eq("mode", "element"),
        )
        .arg(
            Arg::new("request")
                .short('r')
                .long("request")
                .value_name("FILE")
                .help("请求上下文JSON文件"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("日志级别，覆盖配置文件")
                .value_parser(["trace", "debug", "info", "warn", "error"]),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .value_name("FORMAT")
                .help("日志格式，覆盖配置文件")
                .value_parser(["json", "pretty"]),
        )
        .get_matches();

    let config_path = matches.get_one::<String>("config").map(String::as_str);
    let mode: AppMode = matches
        .get_one::<String>("mode")
        .map_or("check", String::as_str)
        .parse()?;

    // 加载配置
    let config = AppConfig::load(config_path).with_context(|| match config_path {
        Some(path) => format!("加载配置文件失败: {path}"),
        None => "加载默认配置失败".to_string(),
    })?;

    // 初始化日志系统
    init_logging(&matches, &config)?;

    info!("启动页面元素调度引擎");
    info!("运行模式: {mode:?}");

    tokio::select! {
        result = run(mode, &matches, config) => result,
        _ = wait_for_shutdown_signal() => {
            warn!("收到关闭信号，放弃本次调度");
            Ok(())
        }
    }
}

async fn run(mode: AppMode, matches: &ArgMatches, config: AppConfig) -> Result<()> {
    let app = Application::new(config).await?;

    let output = match mode {
        AppMode::Check => app.check(),
        AppMode::Render => {
            let layout_path = required(matches, "layout")?;
            let layout: SlotLayout = read_json(layout_path)?;
            app.render(&layout, read_request(matches)?).await?
        }
        AppMode::Element => {
            let id = required(matches, "element")?;
            let result = app.element(id, read_request(matches)?, None).await?;
            serde_json::to_value(result).context("序列化调度结果失败")?
        }
    };

    println!(
        "{}",
        serde_json::to_string_pretty(&output).context("序列化输出失败")?
    );
    Ok(())
}

/// 初始化日志系统，命令行参数优先于配置文件
fn init_logging(matches: &ArgMatches, config: &AppConfig) -> Result<()> {
    let mut log_config = LogConfig::from_observability(&config.observability)?;
    if let Some(level) = matches.get_one::<String>("log-level") {
        log_config.level = level.parse()?;
    }
    if let Some(format) = matches.get_one::<String>("log-format") {
        log_config.format = format.parse()?;
    }
    init_tracing(&log_config).context("初始化日志系统失败")?;
    Ok(())
}

fn required<'a>(matches: &'a ArgMatches, name: &str) -> Result<&'a str> {
    matches
        .get_one::<String>(name)
        .map(String::as_str)
        .ok_or_else(|| anyhow::anyhow!("缺少参数: --{name}"))
}

fn read_json<T: DeserializeOwned>(path: &str) -> Result<T> {
    let content =
        fs::read_to_string(Path::new(path)).with_context(|| format!("读取文件失败: {path}"))?;
    serde_json::from_str(&content).with_context(|| format!("解析JSON失败: {path}"))
}

fn read_request(matches: &ArgMatches) -> Result<RequestContext> {
    match matches.get_one::<String>("request") {
        Some(path) => read_json(path),
        None => Ok(RequestContext::default()),
    }
}

/// 等待关闭信号
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("安装Ctrl+C信号处理器失败: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("安装SIGTERM信号处理器失败: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("收到Ctrl+C信号");
        },
        _ = terminate => {
            info!("收到SIGTERM信号");
        },
    }
}
