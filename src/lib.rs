//! # MICA
//!
//! 医学影像导入与归档目录系统的顶层便捷入口：把常用类型从各子
//! crate 重导出到一个命名空间，示例与下游集成只需依赖本 crate。

pub use mica_catalog::{CatalogPool, CatalogQueries};
pub use mica_core::{
    CatalogLocation, DataKind, DecodedRecord, ImageMetadata, MicaError, PreviewImage, Result,
};
pub use mica_formats::{default_registry, FormatRegistry, FormatResolver, VolumeReader, VolumeWriter};
pub use mica_importer::{
    ConflictDetector, ConflictRecord, ImportEvent, ImportGate, ImportHandle, ImportOutcome,
    ImportRequest, Importer,
};
pub use mica_storage::{StorageRoot, ThumbnailGenerator, ThumbnailSet};
