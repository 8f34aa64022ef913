//! 缩略图输出
//!
//! 每个聚合体在存储区里有自己的缩略图目录：逐切片写 `<帧号>.png`，
//! 另写一张代表图 `ref.png` 并把其相对路径回填到记录元数据，供
//! 患者/检查/系列行展示使用。

use crate::storage::StorageRoot;
use image::RgbaImage;
use mica_core::{DecodedRecord, MicaError, PreviewImage, Result};
use std::fs;

/// 代表性缩略图文件名
const REFERENCE_NAME: &str = "ref.png";

/// 一次生成的缩略图路径集合，全部为存储相对路径
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThumbnailSet {
    /// 逐切片缩略图，顺序与切片一致
    pub slice_paths: Vec<String>,
    /// 代表性缩略图；记录没有代表图时为空串
    pub reference_path: String,
}

/// 缩略图生成器
pub struct ThumbnailGenerator<'a> {
    root: &'a StorageRoot,
}

impl<'a> ThumbnailGenerator<'a> {
    pub fn new(root: &'a StorageRoot) -> Self {
        Self { root }
    }

    /// 为一条聚合记录生成缩略图
    ///
    /// `relative_dir` 是该体在存储区内的缩略图目录。目录创建失败
    /// 直接返回错误，调用方以此判定整组失败。
    pub fn generate(
        &self,
        record: &mut DecodedRecord,
        relative_dir: &str,
    ) -> Result<ThumbnailSet> {
        let dir = self.root.absolute(relative_dir);
        fs::create_dir_all(&dir)
            .map_err(|e| MicaError::Storage(format!("cannot create {}: {e}", dir.display())))?;

        let prefix = relative_dir.trim_end_matches('/');
        let mut set = ThumbnailSet::default();

        for (index, preview) in record.previews.iter().enumerate() {
            let relative = format!("{prefix}/{index}.png");
            self.save_png(preview, &relative)?;
            set.slice_paths.push(relative);
        }

        if let Some(reference) = &record.reference_preview {
            let relative = format!("{prefix}/{REFERENCE_NAME}");
            self.save_png(reference, &relative)?;
            record.metadata.thumbnail_path = relative.clone();
            set.reference_path = relative;
        }

        Ok(set)
    }

    fn save_png(&self, preview: &PreviewImage, relative: &str) -> Result<()> {
        let bitmap = RgbaImage::from_raw(preview.width, preview.height, preview.rgba.clone())
            .ok_or_else(|| {
                MicaError::Format(format!(
                    "preview buffer does not match {}x{}",
                    preview.width, preview.height
                ))
            })?;

        bitmap
            .save(self.root.absolute(relative))
            .map_err(|e| MicaError::Storage(format!("cannot write {relative}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn preview(value: u8) -> PreviewImage {
        PreviewImage {
            width: 2,
            height: 2,
            rgba: vec![value; 16],
        }
    }

    #[test]
    fn test_generate_writes_slices_and_reference() {
        let dir = tempdir().unwrap();
        let root = StorageRoot::new(dir.path());

        let mut record = DecodedRecord::default();
        record.previews = vec![preview(10), preview(20)];
        record.reference_preview = Some(preview(30));

        let set = ThumbnailGenerator::new(&root)
            .generate(&mut record, "/p/s/vol1/")
            .unwrap();

        assert_eq!(set.slice_paths, vec!["/p/s/vol1/0.png", "/p/s/vol1/1.png"]);
        assert_eq!(set.reference_path, "/p/s/vol1/ref.png");
        assert_eq!(record.metadata.thumbnail_path, "/p/s/vol1/ref.png");
        assert!(root.absolute("/p/s/vol1/0.png").is_file());
        assert!(root.absolute("/p/s/vol1/ref.png").is_file());
    }

    #[test]
    fn test_generate_without_previews_yields_empty_set() {
        let dir = tempdir().unwrap();
        let root = StorageRoot::new(dir.path());

        let mut record = DecodedRecord::default();
        let set = ThumbnailGenerator::new(&root)
            .generate(&mut record, "/p/s/vol1/")
            .unwrap();

        assert!(set.slice_paths.is_empty());
        assert_eq!(set.reference_path, "");
        assert_eq!(record.metadata.thumbnail_path, "");
    }

    #[test]
    fn test_generate_rejects_malformed_preview() {
        let dir = tempdir().unwrap();
        let root = StorageRoot::new(dir.path());

        let mut record = DecodedRecord::default();
        record.previews = vec![PreviewImage {
            width: 4,
            height: 4,
            rgba: vec![0; 3],
        }];

        assert!(ThumbnailGenerator::new(&root)
            .generate(&mut record, "/p/s/vol1/")
            .is_err());
    }
}
