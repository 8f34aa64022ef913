//! 目录查询操作
//!
//! 四级层次的精确匹配查找与取或建写入。所有写入都是幂等的：
//! 先按该层的标识元组查找，命中即返回已有行id，未命中才插入。
//! 名称一律在查询边界压缩空白，保证分组、去重、写入三方对
//! "同一系列"的判断一致。

use crate::models::{DbImage, DbSeries};
use mica_core::utils::simplified;
use mica_core::{ImageMetadata, MicaError, Result};
use sqlx::SqlitePool;
use std::path::Path;

/// 目录查询操作接口
pub struct CatalogQueries<'a> {
    pool: &'a SqlitePool,
}

impl<'a> CatalogQueries<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// 创建目录表
    pub async fn create_tables(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS patient (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                thumbnail TEXT NOT NULL DEFAULT '',
                birth_date TEXT NOT NULL DEFAULT '',
                gender TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
        "#,
        )
        .execute(self.pool)
        .await
        .map_err(|e| MicaError::Catalog(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS study (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                patient INTEGER NOT NULL REFERENCES patient(id),
                name TEXT NOT NULL,
                uid TEXT NOT NULL,
                thumbnail TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
        "#,
        )
        .execute(self.pool)
        .await
        .map_err(|e| MicaError::Catalog(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS series (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                study INTEGER NOT NULL REFERENCES study(id),
                size INTEGER NOT NULL DEFAULT 0,
                name TEXT NOT NULL,
                path TEXT NOT NULL DEFAULT '',
                uid TEXT NOT NULL,
                orientation TEXT NOT NULL,
                series_number TEXT NOT NULL,
                sequence_name TEXT NOT NULL,
                slice_thickness TEXT NOT NULL,
                rows TEXT NOT NULL,
                columns TEXT NOT NULL,
                thumbnail TEXT NOT NULL DEFAULT '',
                age TEXT NOT NULL DEFAULT '',
                description TEXT NOT NULL DEFAULT '',
                modality TEXT NOT NULL DEFAULT '',
                protocol TEXT NOT NULL DEFAULT '',
                comments TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL DEFAULT '',
                acquisition_date TEXT NOT NULL DEFAULT '',
                importation_date TEXT NOT NULL DEFAULT '',
                referee TEXT NOT NULL DEFAULT '',
                performer TEXT NOT NULL DEFAULT '',
                institution TEXT NOT NULL DEFAULT '',
                report TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
        "#,
        )
        .execute(self.pool)
        .await
        .map_err(|e| MicaError::Catalog(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS image (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                series INTEGER NOT NULL REFERENCES series(id),
                name TEXT NOT NULL,
                path TEXT NOT NULL,
                instance_path TEXT NOT NULL DEFAULT '',
                thumbnail TEXT NOT NULL DEFAULT '',
                is_indexed INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
        "#,
        )
        .execute(self.pool)
        .await
        .map_err(|e| MicaError::Catalog(e.to_string()))?;

        self.create_indexes().await?;

        tracing::debug!("Catalog tables ready");
        Ok(())
    }

    /// 创建查询索引
    async fn create_indexes(&self) -> Result<()> {
        let indexes = vec![
            "CREATE INDEX IF NOT EXISTS idx_patient_name ON patient(name)",
            "CREATE INDEX IF NOT EXISTS idx_study_patient ON study(patient)",
            "CREATE INDEX IF NOT EXISTS idx_study_identity ON study(patient, name, uid)",
            "CREATE INDEX IF NOT EXISTS idx_series_study ON series(study)",
            "CREATE INDEX IF NOT EXISTS idx_image_series ON image(series)",
            "CREATE INDEX IF NOT EXISTS idx_image_identity ON image(series, name)",
        ];

        for index_sql in indexes {
            sqlx::query(index_sql)
                .execute(self.pool)
                .await
                .map_err(|e| MicaError::Catalog(e.to_string()))?;
        }

        Ok(())
    }

    // ========== 精确匹配查找 ==========

    /// 按归一化姓名查找患者
    pub async fn find_patient(&self, patient_name: &str) -> Result<Option<i64>> {
        sqlx::query_scalar::<_, i64>("SELECT id FROM patient WHERE name = ?")
            .bind(simplified(patient_name))
            .fetch_optional(self.pool)
            .await
            .map_err(|e| MicaError::Catalog(e.to_string()))
    }

    /// 按 (患者, 名称, uid) 查找检查
    pub async fn find_study(
        &self,
        patient_id: i64,
        study_name: &str,
        study_uid: &str,
    ) -> Result<Option<i64>> {
        sqlx::query_scalar::<_, i64>(
            "SELECT id FROM study WHERE patient = ? AND name = ? AND uid = ?",
        )
        .bind(patient_id)
        .bind(simplified(study_name))
        .bind(study_uid)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| MicaError::Catalog(e.to_string()))
    }

    /// 按完整几何元组查找系列
    ///
    /// 元组与体标识键使用同一组字段，保证分组与去重判据一致。
    pub async fn find_series(&self, study_id: i64, meta: &ImageMetadata) -> Result<Option<i64>> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT id FROM series
            WHERE study = ? AND name = ? AND uid = ? AND orientation = ?
              AND series_number = ? AND sequence_name = ? AND slice_thickness = ?
              AND rows = ? AND columns = ?
        "#,
        )
        .bind(study_id)
        .bind(simplified(&meta.series_description))
        .bind(&meta.series_uid)
        .bind(&meta.orientation)
        .bind(&meta.series_number)
        .bind(&meta.sequence_name)
        .bind(&meta.slice_thickness)
        .bind(&meta.rows)
        .bind(&meta.columns)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| MicaError::Catalog(e.to_string()))
    }

    /// 按 (系列, 名称) 查找影像行
    pub async fn find_image(&self, series_id: i64, image_name: &str) -> Result<Option<i64>> {
        sqlx::query_scalar::<_, i64>("SELECT id FROM image WHERE series = ? AND name = ?")
            .bind(series_id)
            .bind(image_name)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| MicaError::Catalog(e.to_string()))
    }

    // ========== 取或建写入 ==========

    /// 取或建患者
    pub async fn get_or_create_patient(&self, meta: &ImageMetadata) -> Result<i64> {
        if let Some(id) = self.find_patient(&meta.patient_name).await? {
            return Ok(id);
        }

        let result = sqlx::query(
            "INSERT INTO patient (name, thumbnail, birth_date, gender) VALUES (?, ?, ?, ?)",
        )
        .bind(simplified(&meta.patient_name))
        .bind(&meta.thumbnail_path)
        .bind(&meta.birth_date)
        .bind(&meta.gender)
        .execute(self.pool)
        .await
        .map_err(|e| MicaError::Catalog(e.to_string()))?;

        Ok(result.last_insert_rowid())
    }

    /// 取或建检查
    pub async fn get_or_create_study(&self, meta: &ImageMetadata, patient_id: i64) -> Result<i64> {
        if let Some(id) = self
            .find_study(patient_id, &meta.study_description, &meta.study_uid)
            .await?
        {
            return Ok(id);
        }

        let result =
            sqlx::query("INSERT INTO study (patient, name, uid, thumbnail) VALUES (?, ?, ?, ?)")
                .bind(patient_id)
                .bind(simplified(&meta.study_description))
                .bind(&meta.study_uid)
                .bind(&meta.thumbnail_path)
                .execute(self.pool)
                .await
                .map_err(|e| MicaError::Catalog(e.to_string()))?;

        Ok(result.last_insert_rowid())
    }

    /// 取或建系列
    ///
    /// 仅索引模式下 path 列留空：没有聚合输出文件可指。
    pub async fn get_or_create_series(
        &self,
        meta: &ImageMetadata,
        study_id: i64,
        stored_path: &str,
        index_only: bool,
    ) -> Result<i64> {
        if let Some(id) = self.find_series(study_id, meta).await? {
            return Ok(id);
        }

        let series_path = if index_only { "" } else { stored_path };

        let result = sqlx::query(
            r#"
            INSERT INTO series (
                study, size, name, path, uid, orientation, series_number,
                sequence_name, slice_thickness, rows, columns, thumbnail,
                age, description, modality, protocol, comments, status,
                acquisition_date, importation_date, referee, performer,
                institution, report
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
        )
        .bind(study_id)
        .bind(meta.size)
        .bind(simplified(&meta.series_description))
        .bind(series_path)
        .bind(&meta.series_uid)
        .bind(&meta.orientation)
        .bind(&meta.series_number)
        .bind(&meta.sequence_name)
        .bind(&meta.slice_thickness)
        .bind(&meta.rows)
        .bind(&meta.columns)
        .bind(&meta.thumbnail_path)
        .bind(&meta.age)
        .bind(&meta.description)
        .bind(&meta.modality)
        .bind(&meta.protocol)
        .bind(&meta.comments)
        .bind(&meta.status)
        .bind(&meta.acquisition_date)
        .bind(&meta.importation_date)
        .bind(&meta.referee)
        .bind(&meta.performer)
        .bind(&meta.institution)
        .bind(&meta.report)
        .execute(self.pool)
        .await
        .map_err(|e| MicaError::Catalog(e.to_string()))?;

        Ok(result.last_insert_rowid())
    }

    /// 为系列补齐影像行
    ///
    /// 常规情形一源文件一行，名称取文件名；单文件展开出多张缩略图
    /// 时（多帧容器）按 `<文件名><帧号>` 逐帧建行。已存在的行跳过。
    /// 仅索引模式下 instance_path 留空，path 列的全路径是权威来源。
    pub async fn create_missing_images(
        &self,
        series_id: i64,
        source_paths: &[std::path::PathBuf],
        thumbnails: &[String],
        instance_path: &str,
        index_only: bool,
    ) -> Result<()> {
        let stored = if index_only { "" } else { instance_path };

        if source_paths.len() == 1 && thumbnails.len() > 1 {
            let base = file_name_of(&source_paths[0]);
            for (i, thumbnail) in thumbnails.iter().enumerate() {
                let name = format!("{base}{i}");
                self.insert_image_if_missing(series_id, &name, &source_paths[0], thumbnail, stored, index_only)
                    .await?;
            }
            return Ok(());
        }

        for (i, path) in source_paths.iter().enumerate() {
            let name = file_name_of(path);
            let thumbnail = thumbnails.get(i).map(String::as_str).unwrap_or("");
            self.insert_image_if_missing(series_id, &name, path, thumbnail, stored, index_only)
                .await?;
        }
        Ok(())
    }

    async fn insert_image_if_missing(
        &self,
        series_id: i64,
        name: &str,
        source_path: &Path,
        thumbnail: &str,
        instance_path: &str,
        index_only: bool,
    ) -> Result<()> {
        if self.find_image(series_id, name).await?.is_some() {
            return Ok(());
        }

        sqlx::query(
            r#"
            INSERT INTO image (series, name, path, instance_path, thumbnail, is_indexed)
            VALUES (?, ?, ?, ?, ?, ?)
        "#,
        )
        .bind(series_id)
        .bind(name)
        .bind(source_path.to_string_lossy().as_ref())
        .bind(instance_path)
        .bind(thumbnail)
        .bind(index_only)
        .execute(self.pool)
        .await
        .map_err(|e| MicaError::Catalog(e.to_string()))?;

        Ok(())
    }

    // ========== 行读取与统计 ==========

    /// 读取系列行
    pub async fn get_series(&self, series_id: i64) -> Result<Option<DbSeries>> {
        sqlx::query_as::<_, DbSeries>("SELECT * FROM series WHERE id = ?")
            .bind(series_id)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| MicaError::Catalog(e.to_string()))
    }

    /// 读取系列下的全部影像行
    pub async fn images_of_series(&self, series_id: i64) -> Result<Vec<DbImage>> {
        sqlx::query_as::<_, DbImage>("SELECT * FROM image WHERE series = ? ORDER BY name")
            .bind(series_id)
            .fetch_all(self.pool)
            .await
            .map_err(|e| MicaError::Catalog(e.to_string()))
    }

    /// 各层级行数，依次为患者/检查/系列/影像
    pub async fn level_counts(&self) -> Result<(i64, i64, i64, i64)> {
        let patients = self.count_rows("patient").await?;
        let studies = self.count_rows("study").await?;
        let series = self.count_rows("series").await?;
        let images = self.count_rows("image").await?;
        Ok((patients, studies, series, images))
    }

    async fn count_rows(&self, table: &str) -> Result<i64> {
        sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(self.pool)
            .await
            .map_err(|e| MicaError::Catalog(e.to_string()))
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
