//! 格式注册表
//!
//! 解码器/编码器以能力查询接口暴露，注册顺序是解析扫描顺序的一部分，
//! 属于注册表的显式契约。

use mica_core::{DataKind, DecodedRecord, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// 影像解码器能力接口
pub trait VolumeReader: Send + Sync {
    /// 注册表内的唯一名称
    fn name(&self) -> &str;

    /// 能力探测：是否能解码给定的一组文件
    fn can_read(&self, paths: &[PathBuf]) -> bool;

    /// 仅解码头信息，不加载像素
    fn read_header(&self, paths: &[PathBuf]) -> Result<DecodedRecord>;

    /// 完整解码，含像素载荷与缩略图
    fn read(&self, paths: &[PathBuf]) -> Result<DecodedRecord>;
}

/// 影像编码器能力接口
pub trait VolumeWriter: Send + Sync {
    /// 注册表内的唯一名称
    fn name(&self) -> &str;

    /// 能处理的逻辑数据类型集合
    fn handled(&self) -> &[DataKind];

    /// 能力探测：是否能写出到给定路径
    fn can_write(&self, path: &Path) -> bool;

    /// 把记录编码写出到目标路径
    fn write(&self, path: &Path, record: &DecodedRecord) -> Result<()>;
}

/// 解码器/编码器注册表
#[derive(Default)]
pub struct FormatRegistry {
    readers: Vec<Arc<dyn VolumeReader>>,
    writers: Vec<Arc<dyn VolumeWriter>>,
}

impl FormatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册解码器，追加到扫描顺序末尾
    pub fn register_reader(&mut self, reader: Arc<dyn VolumeReader>) {
        self.readers.push(reader);
    }

    /// 注册编码器，追加到扫描顺序末尾
    pub fn register_writer(&mut self, writer: Arc<dyn VolumeWriter>) {
        self.writers.push(writer);
    }

    /// 注册顺序的解码器列表
    pub fn readers(&self) -> &[Arc<dyn VolumeReader>] {
        &self.readers
    }

    /// 注册顺序的编码器列表
    pub fn writers(&self) -> &[Arc<dyn VolumeWriter>] {
        &self.writers
    }
}
