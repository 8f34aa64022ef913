//! 目录冲突检测
//!
//! 在提交新数据之前检查患者/检查/系列链是否已在目录中。链上任何
//! 一环不匹配都不算冲突：部分匹配是正常的增量导入。

use mica_catalog::CatalogQueries;
use mica_core::utils::simplified;
use mica_core::{ImageMetadata, Result};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

/// 一次被跳过的重复系列
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConflictRecord {
    pub patient_name: String,
    pub study_name: String,
    pub series_name: String,
    /// 冲突组的第一个源文件，供操作者定位
    pub sample_path: String,
}

/// 冲突检测器
pub struct ConflictDetector<'a> {
    queries: CatalogQueries<'a>,
}

impl<'a> ConflictDetector<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self {
            queries: CatalogQueries::new(pool),
        }
    }

    /// 聚合记录的系列级冲突检查
    ///
    /// 患者按归一化姓名、检查按 (名称, uid)、系列按完整几何元组
    /// 逐级匹配；全链命中返回冲突记录，调用方跳过该组并累计汇总。
    pub async fn check_series(
        &self,
        meta: &ImageMetadata,
        sample_path: &str,
    ) -> Result<Option<ConflictRecord>> {
        let Some(patient_id) = self.queries.find_patient(&meta.patient_name).await? else {
            return Ok(None);
        };
        let Some(study_id) = self
            .queries
            .find_study(patient_id, &meta.study_description, &meta.study_uid)
            .await?
        else {
            return Ok(None);
        };
        if self.queries.find_series(study_id, meta).await?.is_none() {
            return Ok(None);
        }

        Ok(Some(ConflictRecord {
            patient_name: simplified(&meta.patient_name),
            study_name: simplified(&meta.study_description),
            series_name: simplified(&meta.series_description),
            sample_path: sample_path.to_string(),
        }))
    }

    /// 第一遍的单文件检查：链一路匹配到影像行
    ///
    /// 影像行按 (系列, 文件名) 匹配，因此同一系列里尚未入目录的
    /// 新文件会放行到第二遍，由系列级检查判定冲突。
    pub async fn is_file_cataloged(&self, meta: &ImageMetadata, image_name: &str) -> Result<bool> {
        let Some(patient_id) = self.queries.find_patient(&meta.patient_name).await? else {
            return Ok(false);
        };
        let Some(study_id) = self
            .queries
            .find_study(patient_id, &meta.study_description, &meta.study_uid)
            .await?
        else {
            return Ok(false);
        };
        let Some(series_id) = self.queries.find_series(study_id, meta).await? else {
            return Ok(false);
        };

        Ok(self
            .queries
            .find_image(series_id, image_name)
            .await?
            .is_some())
    }
}
