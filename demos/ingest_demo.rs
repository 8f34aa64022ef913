//! 端到端导入演示
//!
//! 先用 MetaImage 编码器造一个演示卷，再把它走完整条导入流水线：
//! 发现 → 过滤分组 → 聚合提交 → 目录落表，过程事件打印到日志。

use anyhow::Result;
use mica_catalog::{CatalogPool, CatalogQueries};
use mica_core::{DataKind, DecodedRecord};
use mica_formats::meta_image::MetaImageWriter;
use mica_formats::{default_registry, VolumeWriter};
use mica_importer::{ImportEvent, ImportGate, ImportOutcome, ImportRequest, Importer};
use mica_storage::StorageRoot;
use std::sync::Arc;
use tokio::sync::mpsc::unbounded_channel;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let workspace = tempfile::tempdir()?;
    let input_dir = workspace.path().join("input");
    std::fs::create_dir_all(&input_dir)?;

    // 造一个 8x8x2 的演示卷
    let mut volume = DecodedRecord {
        kind: DataKind::Image,
        dimensions: [8, 8, 2],
        payload: (0..128u32).map(|v| v as u8).collect(),
        ..Default::default()
    };
    volume.metadata.columns = "8".to_string();
    volume.metadata.rows = "8".to_string();

    let source = input_dir.join("demo_volume.mha");
    MetaImageWriter.write(&source, &volume)?;
    info!("演示卷已生成: {}", source.display());

    // 临时目录库 + 临时存储区
    let pool = CatalogPool::in_memory().await?;
    CatalogQueries::new(pool.pool()).create_tables().await?;

    let importer = Arc::new(Importer::new(
        pool.pool().clone(),
        StorageRoot::new(workspace.path().join("archive")),
        Arc::new(default_registry()),
        Arc::new(ImportGate::new()),
    ));

    let (events, mut event_stream) = unbounded_channel();
    let handle = importer.start(
        ImportRequest {
            source: input_dir,
            index_only: false,
        },
        Some(events),
    );

    let printer = tokio::spawn(async move {
        while let Some(event) = event_stream.recv().await {
            match event {
                ImportEvent::Progress(percent) => info!("进度: {percent}%"),
                ImportEvent::Error(message) => tracing::error!("{message}"),
            }
        }
    });

    let outcome = handle.wait().await?;
    let _ = printer.await;

    match outcome {
        ImportOutcome::Success { imported, .. } => {
            info!("导入完成: {} 个系列", imported.len());
            let queries = CatalogQueries::new(pool.pool());
            let (patients, studies, series, images) = queries.level_counts().await?;
            info!("目录层级: {patients} 患者 / {studies} 检查 / {series} 系列 / {images} 影像");
        }
        other => info!("终态: {other:?}"),
    }

    Ok(())
}
