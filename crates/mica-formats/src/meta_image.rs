//! MetaImage (.mha) 读写
//!
//! 聚合体数据的落盘格式：文本键值头 + 原始像素载荷（单文件 LOCAL
//! 模式）。头部只写本系统需要的键，读取时容忍未知键。

use crate::registry::{VolumeReader, VolumeWriter};
use mica_core::{DataKind, DecodedRecord, MicaError, Result};
use std::fs;
use std::path::{Path, PathBuf};

const ELEMENT_TYPE_U8: &str = "MET_UCHAR";
const DATA_FILE_LOCAL: &str = "LOCAL";

/// MetaImage 编码器
pub struct MetaImageWriter;

impl VolumeWriter for MetaImageWriter {
    fn name(&self) -> &str {
        "meta-image-writer"
    }

    fn handled(&self) -> &[DataKind] {
        &[DataKind::Image]
    }

    fn can_write(&self, path: &Path) -> bool {
        path.extension().is_some_and(|e| e.eq_ignore_ascii_case("mha"))
    }

    fn write(&self, path: &Path, record: &DecodedRecord) -> Result<()> {
        let [columns, rows, slices] = record.dimensions;
        let expected = columns as usize * rows as usize * slices as usize;
        if expected == 0 || record.payload.len() != expected {
            return Err(MicaError::Format(format!(
                "payload size {} does not match dimensions {}x{}x{}",
                record.payload.len(),
                columns,
                rows,
                slices
            )));
        }

        let header = format!(
            "ObjectType = Image\n\
             NDims = 3\n\
             BinaryData = True\n\
             BinaryDataByteOrderMSB = False\n\
             CompressedData = False\n\
             DimSize = {} {} {}\n\
             ElementType = {}\n\
             ElementDataFile = {}\n",
            columns, rows, slices, ELEMENT_TYPE_U8, DATA_FILE_LOCAL
        );

        let mut bytes = header.into_bytes();
        bytes.extend_from_slice(&record.payload);
        fs::write(path, bytes)?;
        Ok(())
    }
}

/// MetaImage 解码器
pub struct MetaImageReader;

impl MetaImageReader {
    /// 解析文本头，返回 (键值对, 载荷起始偏移)
    ///
    /// 头部以 `ElementDataFile` 行结束，载荷紧随其后。
    fn parse_header(bytes: &[u8]) -> Result<(Vec<(String, String)>, usize)> {
        let mut fields = Vec::new();
        let mut offset = 0;

        while offset < bytes.len() {
            let line_end = bytes[offset..]
                .iter()
                .position(|&b| b == b'\n')
                .map(|p| offset + p)
                .ok_or_else(|| MicaError::Format("unterminated MetaImage header".to_string()))?;

            let line = std::str::from_utf8(&bytes[offset..line_end])
                .map_err(|e| MicaError::Format(e.to_string()))?;
            offset = line_end + 1;

            let (key, value) = line
                .split_once('=')
                .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
                .ok_or_else(|| {
                    MicaError::Format(format!("malformed MetaImage header line: {line}"))
                })?;

            let done = key == "ElementDataFile";
            fields.push((key, value));
            if done {
                return Ok((fields, offset));
            }
        }

        Err(MicaError::Format(
            "MetaImage header missing ElementDataFile".to_string(),
        ))
    }

    fn field<'a>(fields: &'a [(String, String)], key: &str) -> Option<&'a str> {
        fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn record_from_fields(fields: &[(String, String)]) -> Result<DecodedRecord> {
        let dim_size = Self::field(fields, "DimSize")
            .ok_or_else(|| MicaError::Format("MetaImage header missing DimSize".to_string()))?;
        let dims: Vec<u32> = dim_size
            .split_whitespace()
            .map(|t| {
                t.parse::<u32>()
                    .map_err(|e| MicaError::Format(format!("bad DimSize component {t}: {e}")))
            })
            .collect::<Result<_>>()?;
        if dims.len() != 3 {
            return Err(MicaError::Format(format!(
                "expected 3 dimensions, got {}",
                dims.len()
            )));
        }

        let element_type = Self::field(fields, "ElementType").unwrap_or_default();
        if element_type != ELEMENT_TYPE_U8 {
            return Err(MicaError::Format(format!(
                "unsupported ElementType: {element_type}"
            )));
        }

        let mut record = DecodedRecord {
            kind: DataKind::Image,
            dimensions: [dims[0], dims[1], dims[2]],
            ..Default::default()
        };
        record.metadata.columns = dims[0].to_string();
        record.metadata.rows = dims[1].to_string();
        Ok(record)
    }
}

impl VolumeReader for MetaImageReader {
    fn name(&self) -> &str {
        "meta-image-reader"
    }

    fn can_read(&self, paths: &[PathBuf]) -> bool {
        // 聚合文件是单文件，多路径组不属于本解码器
        paths.len() == 1
            && paths[0]
                .extension()
                .is_some_and(|e| e.eq_ignore_ascii_case("mha"))
    }

    fn read_header(&self, paths: &[PathBuf]) -> Result<DecodedRecord> {
        let bytes = fs::read(&paths[0])?;
        let (fields, _) = Self::parse_header(&bytes)?;
        let mut record = Self::record_from_fields(&fields)?;
        record.source_paths = paths.to_vec();
        Ok(record)
    }

    fn read(&self, paths: &[PathBuf]) -> Result<DecodedRecord> {
        let bytes = fs::read(&paths[0])?;
        let (fields, payload_offset) = Self::parse_header(&bytes)?;
        let mut record = Self::record_from_fields(&fields)?;

        if Self::field(&fields, "ElementDataFile") != Some(DATA_FILE_LOCAL) {
            return Err(MicaError::Format(
                "only LOCAL MetaImage payloads are supported".to_string(),
            ));
        }

        let [columns, rows, slices] = record.dimensions;
        let expected = columns as usize * rows as usize * slices as usize;
        let payload = &bytes[payload_offset..];
        if payload.len() < expected {
            return Err(MicaError::Format(format!(
                "truncated MetaImage payload: {} of {} bytes",
                payload.len(),
                expected
            )));
        }

        record.payload = payload[..expected].to_vec();
        record.source_paths = paths.to_vec();
        Ok(record)
    }
}
