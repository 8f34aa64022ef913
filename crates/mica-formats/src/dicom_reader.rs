//! DICOM 切片解码器
//!
//! 把一组单切片（或单个多帧）DICOM文件解码为一条记录：头信息阶段
//! 只读到像素数据之前，完整阶段解码像素并生成逐帧缩略图。

use crate::registry::VolumeReader;
use dicom::core::Tag;
use dicom::object::{open_file, DefaultDicomObject, OpenFileOptions};
use dicom_dictionary_std::tags;
use dicom_pixeldata::{ConvertOptions, PixelDecoder, VoiLutOption};
use mica_core::{DataKind, DecodedRecord, ImageMetadata, MicaError, PreviewImage, Result};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// 缩略图边长上限
const PREVIEW_EDGE: u32 = 128;

/// DICOM 切片解码器
pub struct DicomSliceReader;

impl DicomSliceReader {
    /// 按 DICM 魔数（偏移128）识别文件，读不到魔数时退回扩展名判断
    fn looks_like_dicom(path: &Path) -> bool {
        let mut magic = [0u8; 4];
        let by_magic = File::open(path)
            .and_then(|mut f| {
                f.seek(SeekFrom::Start(128))?;
                f.read_exact(&mut magic)?;
                Ok(())
            })
            .is_ok()
            && &magic == b"DICM";

        by_magic
            || path
                .extension()
                .is_some_and(|e| e.eq_ignore_ascii_case("dcm") || e.eq_ignore_ascii_case("dicom"))
    }

    fn element_str(obj: &DefaultDicomObject, tag: Tag) -> String {
        obj.element(tag)
            .ok()
            .and_then(|e| e.to_str().ok())
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    }

    /// 方向余弦：DICOM 用反斜杠分隔，目录里统一成空格分隔的数字串
    fn orientation_str(obj: &DefaultDicomObject) -> String {
        obj.element(tags::IMAGE_ORIENTATION_PATIENT)
            .ok()
            .and_then(|e| e.to_multi_float64().ok())
            .map(|components| {
                components
                    .iter()
                    .map(|c| c.to_string())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default()
    }

    fn extract_metadata(obj: &DefaultDicomObject) -> ImageMetadata {
        ImageMetadata {
            patient_name: Self::element_str(obj, tags::PATIENT_NAME),
            birth_date: Self::element_str(obj, tags::PATIENT_BIRTH_DATE),
            gender: Self::element_str(obj, tags::PATIENT_SEX),
            age: Self::element_str(obj, tags::PATIENT_AGE),
            study_description: Self::element_str(obj, tags::STUDY_DESCRIPTION),
            study_uid: Self::element_str(obj, tags::STUDY_INSTANCE_UID),
            series_description: Self::element_str(obj, tags::SERIES_DESCRIPTION),
            series_uid: Self::element_str(obj, tags::SERIES_INSTANCE_UID),
            orientation: Self::orientation_str(obj),
            series_number: Self::element_str(obj, tags::SERIES_NUMBER),
            sequence_name: Self::element_str(obj, tags::SEQUENCE_NAME),
            slice_thickness: Self::element_str(obj, tags::SLICE_THICKNESS),
            rows: Self::element_str(obj, tags::ROWS),
            columns: Self::element_str(obj, tags::COLUMNS),
            modality: Self::element_str(obj, tags::MODALITY),
            protocol: Self::element_str(obj, tags::PROTOCOL_NAME),
            comments: Self::element_str(obj, tags::IMAGE_COMMENTS),
            acquisition_date: Self::element_str(obj, tags::ACQUISITION_DATE),
            referee: Self::element_str(obj, tags::REFERRING_PHYSICIAN_NAME),
            performer: Self::element_str(obj, tags::PERFORMING_PHYSICIAN_NAME),
            institution: Self::element_str(obj, tags::INSTITUTION_NAME),
            ..Default::default()
        }
    }

    fn dims_from(obj: &DefaultDicomObject) -> (u32, u32) {
        let rows = obj
            .element(tags::ROWS)
            .ok()
            .and_then(|e| e.to_int::<u16>().ok())
            .unwrap_or(0) as u32;
        let columns = obj
            .element(tags::COLUMNS)
            .ok()
            .and_then(|e| e.to_int::<u16>().ok())
            .unwrap_or(0) as u32;
        (columns, rows)
    }
}

impl VolumeReader for DicomSliceReader {
    fn name(&self) -> &str {
        "dicom-slice-reader"
    }

    fn can_read(&self, paths: &[PathBuf]) -> bool {
        !paths.is_empty() && paths.iter().all(|p| Self::looks_like_dicom(p))
    }

    fn read_header(&self, paths: &[PathBuf]) -> Result<DecodedRecord> {
        let first = paths
            .first()
            .ok_or_else(|| MicaError::Format("empty path group".to_string()))?;

        // 头信息阶段停在像素数据之前，避免加载大载荷
        let obj = OpenFileOptions::new()
            .read_until(tags::PIXEL_DATA)
            .open_file(first)
            .map_err(|e| MicaError::Format(e.to_string()))?;

        let metadata = Self::extract_metadata(&obj);
        let (columns, rows) = Self::dims_from(&obj);

        Ok(DecodedRecord {
            kind: DataKind::Image,
            metadata,
            dimensions: [columns, rows, paths.len() as u32],
            source_paths: paths.to_vec(),
            ..Default::default()
        })
    }

    fn read(&self, paths: &[PathBuf]) -> Result<DecodedRecord> {
        let first = paths
            .first()
            .ok_or_else(|| MicaError::Format("empty path group".to_string()))?;

        let first_obj = open_file(first).map_err(|e| MicaError::Format(e.to_string()))?;
        let metadata = Self::extract_metadata(&first_obj);

        let options = ConvertOptions::new().with_voi_lut(VoiLutOption::First);

        let mut payload = Vec::new();
        let mut previews = Vec::new();
        let mut frame_dims: Option<(u32, u32)> = None;

        for path in paths {
            let obj = if path == first {
                first_obj.clone()
            } else {
                open_file(path).map_err(|e| MicaError::Format(e.to_string()))?
            };

            let decoded = obj
                .decode_pixel_data()
                .map_err(|e| MicaError::Format(e.to_string()))?;

            for frame in 0..decoded.number_of_frames() {
                let dynamic = decoded
                    .to_dynamic_image_with_options(frame, &options)
                    .map_err(|e| MicaError::Format(e.to_string()))?;

                let luma = dynamic.to_luma8();
                let dims = (luma.width(), luma.height());
                match frame_dims {
                    None => frame_dims = Some(dims),
                    Some(expected) if expected != dims => {
                        return Err(MicaError::Format(format!(
                            "inconsistent slice dimensions: {:?} vs {:?}",
                            expected, dims
                        )))
                    }
                    _ => {}
                }
                payload.extend_from_slice(luma.as_raw());

                let thumb = dynamic.thumbnail(PREVIEW_EDGE, PREVIEW_EDGE).to_rgba8();
                previews.push(PreviewImage {
                    width: thumb.width(),
                    height: thumb.height(),
                    rgba: thumb.into_raw(),
                });
            }
        }

        let (columns, rows) = frame_dims
            .ok_or_else(|| MicaError::Format("no decodable frames in path group".to_string()))?;
        let slices = previews.len() as u32;

        // 代表性缩略图取中间一帧
        let reference_preview = previews.get(previews.len() / 2).cloned();

        let mut record = DecodedRecord {
            kind: DataKind::Image,
            metadata,
            dimensions: [columns, rows, slices],
            payload,
            previews,
            reference_preview,
            source_paths: paths.to_vec(),
            ..Default::default()
        };
        // 头里缺行列时用实际解码尺寸补齐
        if record.metadata.rows.is_empty() {
            record.metadata.rows = rows.to_string();
        }
        if record.metadata.columns.is_empty() {
            record.metadata.columns = columns.to_string();
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_looks_like_dicom_by_magic() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("slice.bin");
        let mut file = File::create(&path).unwrap();
        file.write_all(&[0u8; 128]).unwrap();
        file.write_all(b"DICM").unwrap();

        assert!(DicomSliceReader::looks_like_dicom(&path));
    }

    #[test]
    fn test_looks_like_dicom_rejects_other_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"definitely not an image").unwrap();

        assert!(!DicomSliceReader::looks_like_dicom(&path));
    }

    #[test]
    fn test_extension_fallback() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("headerless.dcm");
        std::fs::write(&path, b"short").unwrap();

        // 无前导魔数但扩展名是 dcm
        assert!(DicomSliceReader::looks_like_dicom(&path));
        assert!(DicomSliceReader.can_read(&[path]));
    }
}
