//! # MICA Formats
//!
//! 影像格式层：解码器/编码器注册表、带粘性缓存的格式解析，
//! 以及内置的DICOM切片解码器与MetaImage读写器。

pub mod dicom_reader;
pub mod meta_image;
pub mod registry;
pub mod resolver;

pub use registry::{FormatRegistry, VolumeReader, VolumeWriter};
pub use resolver::FormatResolver;

use std::sync::Arc;

/// 构造带内置格式的注册表
///
/// 注册顺序即解析时的扫描顺序：DICOM优先，其次MetaImage。
pub fn default_registry() -> FormatRegistry {
    let mut registry = FormatRegistry::new();
    registry.register_reader(Arc::new(dicom_reader::DicomSliceReader));
    registry.register_reader(Arc::new(meta_image::MetaImageReader));
    registry.register_writer(Arc::new(meta_image::MetaImageWriter));
    registry
}
