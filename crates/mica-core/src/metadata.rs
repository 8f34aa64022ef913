//! 目录元数据记录
//!
//! 固定字段的元数据结构：所有字段始终存在，缺失值在归一化时一次性
//! 填充为空串哨兵，消费端不再做逐键存在性检查。

use serde::{Deserialize, Serialize};

/// 缺省患者占位名
pub const UNKNOWN_PATIENT: &str = "unknown patient";

/// 一条影像记录携带的目录相关属性
///
/// 字段与目录库 patient/study/series 各表的列一一对应。文本字段的
/// 空串即"缺失"哨兵。
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageMetadata {
    // 患者层
    pub patient_name: String,
    pub birth_date: String,
    pub gender: String,
    pub age: String,

    // 检查层
    pub study_description: String,
    pub study_uid: String,

    // 系列层（几何元组参与体标识与去重）
    pub series_description: String,
    pub series_uid: String,
    pub orientation: String,
    pub series_number: String,
    pub sequence_name: String,
    pub slice_thickness: String,
    pub rows: String,
    pub columns: String,

    // 描述性字段
    pub description: String,
    pub modality: String,
    pub protocol: String,
    pub comments: String,
    pub status: String,
    pub acquisition_date: String,
    pub importation_date: String,
    pub referee: String,
    pub performer: String,
    pub institution: String,
    pub report: String,

    /// 代表性缩略图的存储相对路径，由缩略图生成器回填
    pub thumbnail_path: String,
    /// 聚合后的切片数，第二遍解码后回填
    pub size: i64,
}

impl ImageMetadata {
    /// 归一化：为缺失字段填充缺省值
    ///
    /// 患者名缺省为 [`UNKNOWN_PATIENT`]，系列描述缺省为调用方给出的
    /// 回退标签（通常是源文件基名），其余文本字段保持空串哨兵。
    /// 已有值一律不覆盖，因此重复归一化是无操作。
    pub fn normalize(&mut self, fallback_series_label: &str) {
        if self.patient_name.is_empty() {
            self.patient_name = UNKNOWN_PATIENT.to_string();
        }
        if self.series_description.is_empty() {
            self.series_description = fallback_series_label.to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_fills_defaults() {
        let mut meta = ImageMetadata::default();
        meta.normalize("brain_t1");

        assert_eq!(meta.patient_name, UNKNOWN_PATIENT);
        assert_eq!(meta.series_description, "brain_t1");
        // 其余字段保持空串哨兵
        assert_eq!(meta.study_description, "");
        assert_eq!(meta.orientation, "");
    }

    #[test]
    fn test_normalize_never_overwrites() {
        let mut meta = ImageMetadata {
            patient_name: "DOE^JANE".to_string(),
            series_description: "ep2d_diff".to_string(),
            ..Default::default()
        };
        meta.normalize("fallback");

        assert_eq!(meta.patient_name, "DOE^JANE");
        assert_eq!(meta.series_description, "ep2d_diff");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let mut meta = ImageMetadata::default();
        meta.normalize("label");
        let once = meta.clone();
        meta.normalize("other-label");

        assert_eq!(meta, once);
    }
}
