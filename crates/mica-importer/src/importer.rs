//! 导入流水线编排
//!
//! 算法分两遍走完全不同的关注点：
//! 1. 发现与过滤（进度 0–50%）：逐文件读头、归一化、算体标识键、
//!    分配体编号、确定聚合输出名，过滤读不了或已入目录的文件；
//! 2. 聚合与提交（进度 50–100%）：逐组完整解码、冲突检测、写出
//!    聚合文件、生成缩略图、落目录表。
//!
//! 取消是协作式的：第一遍逐文件轮询，第二遍只在组间轮询，保证
//! 任何一组的目录写入不会写一半。

use crate::conflict::ConflictDetector;
use crate::events::{ImportEvent, ImportOutcome, ProgressReporter};
use crate::gate::ImportGate;
use crate::identity;
use crate::job::ImportJob;
use crate::scan;
use mica_catalog::CatalogQueries;
use mica_core::utils::storage_component;
use mica_core::{CatalogLocation, DecodedRecord, ImageMetadata, MicaError, Result};
use mica_formats::FormatRegistry;
use mica_storage::{StorageRoot, ThumbnailGenerator};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::slice;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// 一次导入请求
#[derive(Debug, Clone)]
pub struct ImportRequest {
    /// 文件或目录
    pub source: PathBuf,
    /// 仅索引：只登记目录元数据，不把像素数据复制进存储区
    pub index_only: bool,
}

/// 正在运行的导入任务句柄
pub struct ImportHandle {
    cancel: Arc<AtomicBool>,
    task: JoinHandle<Result<ImportOutcome>>,
}

impl ImportHandle {
    /// 请求协作式取消；在途IO不会被强行打断
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// 取消标志的共享句柄，供信号处理等独立任务置位
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    /// 等待运行结束并取回终态
    pub async fn wait(self) -> Result<ImportOutcome> {
        self.task
            .await
            .map_err(|e| MicaError::Internal(format!("import task panicked: {e}")))?
    }
}

/// 导入流水线
pub struct Importer {
    pool: SqlitePool,
    storage: StorageRoot,
    registry: Arc<FormatRegistry>,
    gate: Arc<ImportGate>,
}

impl Importer {
    pub fn new(
        pool: SqlitePool,
        storage: StorageRoot,
        registry: Arc<FormatRegistry>,
        gate: Arc<ImportGate>,
    ) -> Self {
        Self {
            pool,
            storage,
            registry,
            gate,
        }
    }

    /// 把一次导入作为后台任务启动
    ///
    /// 调用线程保持空闲，可随时通过句柄请求取消。
    pub fn start(
        self: Arc<Self>,
        request: ImportRequest,
        events: Option<UnboundedSender<ImportEvent>>,
    ) -> ImportHandle {
        let cancel = Arc::new(AtomicBool::new(false));
        let flag = cancel.clone();
        let task = tokio::spawn(async move { self.run(request, flag, events).await });
        ImportHandle { cancel, task }
    }

    /// 执行一次完整的导入运行
    pub async fn run(
        &self,
        request: ImportRequest,
        cancel: Arc<AtomicBool>,
        events: Option<UnboundedSender<ImportEvent>>,
    ) -> Result<ImportOutcome> {
        // 整个运行持有目录写临界区：体编号与冲突检测都是运行级状态，
        // 并发运行交错写入会造成重复的患者/检查/系列行
        let _lease = self.gate.acquire().await;

        let mut progress = ProgressReporter::new(events);
        let mut job = ImportJob::new(request.index_only, self.registry.clone(), cancel);
        let detector = ConflictDetector::new(&self.pool);
        let queries = CatalogQueries::new(&self.pool);

        info!(
            job = %job.id,
            source = %request.source.display(),
            index_only = request.index_only,
            "starting ingestion run"
        );

        // ---- 第一遍：发现与过滤 ----

        let files = scan::collect_candidates(&request.source);
        let total = files.len();

        for (index, file) in files.iter().enumerate() {
            if job.is_cancelled() {
                break;
            }

            progress.progress((index * 50 / total) as u8);

            let Some(reader) = job.resolver.resolve_reader(slice::from_ref(file)) else {
                warn!("No suitable reader found for file: {}", file.display());
                continue;
            };

            let mut record = match reader.read_header(slice::from_ref(file)) {
                Ok(record) => record,
                Err(e) => {
                    warn!("Reader was unable to read {}: {e}", file.display());
                    continue;
                }
            };

            record.metadata.normalize(&base_label(file));

            let key = identity::volume_key(&record.metadata);
            let volume_number = job.volume_number(&key);
            let mut stored_name = stored_base_name(&record.metadata, volume_number);

            if !request.index_only {
                // 导入模式必须能为该逻辑类型选出目标编码
                let Some(extension) = record.kind.output_extension() else {
                    progress.error(format!(
                        "Could not save file due to unhandled data type: {:?}",
                        record.kind
                    ));
                    continue;
                };
                stored_name.push_str(extension);
            }

            let image_name = file_name_of(file);
            let already = detector
                .is_file_cataloged(&record.metadata, &image_name)
                .await
                .unwrap_or_else(|e| {
                    tracing::error!("catalog lookup failed for {}: {e}", file.display());
                    false
                });

            if !already {
                job.add_to_group(&stored_name, file.clone());
            }
        }

        if job.is_cancelled() {
            progress.error("User cancelled import process");
            return Ok(ImportOutcome::Cancelled);
        }

        // 全部被过滤：要么没有可读文件，要么都已在目录里
        if !job.has_groups() {
            return Ok(ImportOutcome::Failure {
                message: "No compatible image found or all of them had been already imported."
                    .to_string(),
            });
        }

        // ---- 第二遍：聚合与提交 ----

        let groups = job.take_groups();
        let group_count = groups.len();
        let mut imported = Vec::new();

        for (index, group) in groups.iter().enumerate() {
            // 组间轮询取消：当前组的目录写入永远完整落地
            if job.is_cancelled() {
                progress.error("User cancelled import process");
                return Ok(ImportOutcome::Cancelled);
            }

            progress.progress((50 + index * 50 / group_count) as u8);

            let first_file = &group.files[0];

            let Some(reader) = job.resolver.resolve_reader(&group.files) else {
                progress.error(format!("Could not read data: {}", first_file.display()));
                continue;
            };

            let mut record = match reader.read(&group.files) {
                Ok(record) => record,
                Err(e) => {
                    warn!("Could not re-read group {}: {e}", group.stored_name);
                    progress.error(format!("Could not read data: {}", first_file.display()));
                    continue;
                }
            };

            record.metadata.normalize(&base_label(first_file));
            attach_run_metadata(&mut record, group.stored_name.clone(), group.files.clone());

            // 聚合级冲突检测：整组要么全收要么全跳
            match detector
                .check_series(&record.metadata, &first_file.display().to_string())
                .await
            {
                Ok(Some(conflict)) => {
                    job.record_conflict(conflict);
                    continue;
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::error!("conflict lookup failed for {}: {e}", group.stored_name);
                    continue;
                }
            }

            if !request.index_only {
                let destination = match self.storage.prepare_file(&group.stored_name).await {
                    Ok(path) => path,
                    Err(e) => {
                        progress.error(format!(
                            "Cannot create directory for {}: {e}",
                            group.stored_name
                        ));
                        continue;
                    }
                };

                let Some(writer) = job.resolver.resolve_writer(&destination, &record) else {
                    progress.error(format!(
                        "Could not save data file: {}",
                        first_file.display()
                    ));
                    continue;
                };

                if let Err(e) = writer.write(&destination, &record) {
                    warn!("writer failed on {}: {e}", destination.display());
                    progress.error(format!(
                        "Could not save data file: {}",
                        first_file.display()
                    ));
                    continue;
                }
            }

            // 缩略图目录创建失败视为整组失败
            let thumbnails = match ThumbnailGenerator::new(&self.storage)
                .generate(&mut record, &thumbnail_dir(&group.stored_name))
            {
                Ok(set) => set,
                Err(e) => {
                    progress.error(format!("Cannot create directory: {e}"));
                    continue;
                }
            };

            match commit_catalog(&queries, &record, &thumbnails.slice_paths, request.index_only)
                .await
            {
                Ok(location) => imported.push(location),
                Err(e) => {
                    tracing::error!("catalog write failed for {}: {e}", group.stored_name);
                    continue;
                }
            }
        }

        let conflicts = job.take_conflicts();
        let conflict_summary = build_conflict_summary(&conflicts, request.index_only);

        progress.progress(100);
        info!(
            job = %job.id,
            imported = imported.len(),
            conflicts = conflicts.len(),
            "ingestion run finished"
        );

        Ok(ImportOutcome::Success {
            conflict_summary,
            conflicts,
            imported,
        })
    }
}

/// 按患者/检查/系列名与体编号拼聚合输出名（不含扩展名）
fn stored_base_name(meta: &ImageMetadata, volume_number: i32) -> String {
    format!(
        "/{}/{}/{}{}",
        storage_component(&meta.patient_name),
        storage_component(&meta.study_description),
        storage_component(&meta.series_description),
        volume_number
    )
}

/// 聚合体的缩略图目录：输出名去扩展名后的同名目录
fn thumbnail_dir(stored_name: &str) -> String {
    format!("{}/", Path::new(stored_name).with_extension("").display())
}

fn base_label(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// 第二遍补充的运行级元数据：切片数、导入日期、文件清单与输出名
fn attach_run_metadata(record: &mut DecodedRecord, stored_name: String, files: Vec<PathBuf>) {
    record.metadata.size = record.dimensions[2] as i64;
    if record.metadata.importation_date.is_empty() {
        record.metadata.importation_date = chrono::Utc::now().format("%Y-%m-%d").to_string();
    }
    record.stored_name = stored_name;
    record.source_paths = files;
}

/// 严格顺序的目录落表：患者 → 检查 → 系列 → 影像
async fn commit_catalog(
    queries: &CatalogQueries<'_>,
    record: &DecodedRecord,
    thumbnails: &[String],
    index_only: bool,
) -> Result<CatalogLocation> {
    let patient_id = queries.get_or_create_patient(&record.metadata).await?;
    let study_id = queries
        .get_or_create_study(&record.metadata, patient_id)
        .await?;
    let series_id = queries
        .get_or_create_series(&record.metadata, study_id, &record.stored_name, index_only)
        .await?;
    queries
        .create_missing_images(
            series_id,
            &record.source_paths,
            thumbnails,
            &record.stored_name,
            index_only,
        )
        .await?;

    Ok(CatalogLocation {
        patient_id,
        study_id,
        series_id,
    })
}

/// 冲突汇总文本，告诉操作者哪些已入库的系列挡住了这次导入
fn build_conflict_summary(
    conflicts: &[crate::conflict::ConflictRecord],
    index_only: bool,
) -> Option<String> {
    if conflicts.is_empty() {
        return None;
    }

    let process = if index_only { "index" } else { "import" };
    let mut message = format!(
        "It seems you are trying to {process} some images that belong to a volume \
         which is already in the database.\n\
         For a more accurate {process} please first delete the following series:\n\n"
    );
    for conflict in conflicts {
        message.push_str(&format!(
            "Series: {} (from patient: {} and study: {})\n",
            conflict.series_name, conflict.patient_name, conflict.study_name
        ));
    }
    Some(message)
}
