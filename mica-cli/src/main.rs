//! MICA导入命令行工具

mod config;

use clap::Parser;
use config::MicaConfig;
use mica_catalog::{CatalogPool, CatalogQueries};
use mica_core::Result;
use mica_formats::default_registry;
use mica_importer::{ImportEvent, ImportGate, ImportOutcome, ImportRequest, Importer};
use mica_storage::StorageRoot;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::mpsc::unbounded_channel;
use tracing::{error, info, warn};

/// 命令行参数
#[derive(Parser, Debug)]
#[command(name = "mica")]
#[command(about = "MICA 医学影像导入与归档目录工具")]
struct Args {
    /// 待导入的文件或目录
    source: PathBuf,

    /// 仅索引：登记目录元数据，不把像素数据复制进存储区
    #[arg(long)]
    index_only: bool,

    /// 目录数据库连接串
    #[arg(short, long)]
    database_url: Option<String>,

    /// 受管存储根目录
    #[arg(short = 's', long)]
    data_location: Option<String>,

    /// 配置文件路径
    #[arg(short, long)]
    config: Option<String>,

    /// 日志级别
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = MicaConfig::load(args.config.as_deref())?;
    // 命令行参数覆盖配置文件与环境变量
    if let Some(url) = args.database_url {
        config.database.url = url;
    }
    if let Some(location) = args.data_location {
        config.storage.data_location = location;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }

    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(config.logging.level.as_str())
        .init();

    info!("启动MICA导入...");
    info!("  目录库: {}", config.database.url);
    info!("  存储区: {}", config.storage.data_location);
    info!("  输入: {}", args.source.display());

    let pool = CatalogPool::connect(&config.database.url).await?;
    CatalogQueries::new(pool.pool()).create_tables().await?;

    let importer = Arc::new(Importer::new(
        pool.pool().clone(),
        StorageRoot::new(&config.storage.data_location),
        Arc::new(default_registry()),
        Arc::new(ImportGate::new()),
    ));

    let (events, mut event_stream) = unbounded_channel();
    let handle = importer.start(
        ImportRequest {
            source: args.source,
            index_only: args.index_only,
        },
        Some(events),
    );

    // Ctrl-C 请求协作式取消，当前组写完后生效
    let cancel = handle.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("收到中断信号，正在请求取消...");
            cancel.store(true, Ordering::SeqCst);
        }
    });

    let printer = tokio::spawn(async move {
        while let Some(event) = event_stream.recv().await {
            match event {
                ImportEvent::Progress(percent) => info!("进度: {percent}%"),
                ImportEvent::Error(message) => error!("{message}"),
            }
        }
    });

    let outcome = handle.wait().await?;
    let _ = printer.await;

    match outcome {
        ImportOutcome::Success {
            conflict_summary,
            imported,
            ..
        } => {
            info!("导入完成: {} 个系列", imported.len());
            if let Some(summary) = conflict_summary {
                warn!("{summary}");
            }
        }
        ImportOutcome::Failure { message } => {
            error!("导入失败: {message}");
            std::process::exit(1);
        }
        ImportOutcome::Cancelled => {
            warn!("导入已取消，已完成的目录写入保持有效");
        }
    }

    Ok(())
}
