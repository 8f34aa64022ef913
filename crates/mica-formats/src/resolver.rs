//! 格式解析
//!
//! 为一组文件挑选解码器、为一条记录挑选编码器。上一次成功的选择
//! 会被缓存并在下次解析时优先尝试：真实导入里常见长串同构文件，
//! 缓存把 O(n) 的注册表扫描摊薄到 O(1)，缓存未命中时回退全量扫描
//! 保证正确性。缓存是逐次运行的状态，随运行结束一起丢弃。

use crate::registry::{FormatRegistry, VolumeReader, VolumeWriter};
use mica_core::DecodedRecord;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// 带粘性缓存的解码器/编码器选择器
pub struct FormatResolver {
    registry: Arc<FormatRegistry>,
    last_reader: Option<String>,
    last_writer: Option<String>,
}

impl FormatResolver {
    /// 创建空缓存的解析器，每次导入运行各建一个
    pub fn new(registry: Arc<FormatRegistry>) -> Self {
        Self {
            registry,
            last_reader: None,
            last_writer: None,
        }
    }

    /// 为一组文件解析解码器
    ///
    /// 先探测上次成功的解码器，未命中再按注册顺序全量扫描，
    /// 返回第一个声明可读的解码器并记入缓存。
    pub fn resolve_reader(&mut self, paths: &[PathBuf]) -> Option<Arc<dyn VolumeReader>> {
        if let Some(last) = &self.last_reader {
            if let Some(reader) = self
                .registry
                .readers()
                .iter()
                .find(|r| r.name() == last.as_str())
            {
                if reader.can_read(paths) {
                    return Some(reader.clone());
                }
            }
        }

        for reader in self.registry.readers() {
            if reader.can_read(paths) {
                tracing::debug!("reader {} selected after full scan", reader.name());
                self.last_reader = Some(reader.name().to_string());
                return Some(reader.clone());
            }
        }

        tracing::warn!("no suitable reader found");
        None
    }

    /// 为一条记录解析编码器
    ///
    /// 编码器须同时声明处理该记录的逻辑类型并能写出到目标路径。
    pub fn resolve_writer(
        &mut self,
        path: &Path,
        record: &DecodedRecord,
    ) -> Option<Arc<dyn VolumeWriter>> {
        if let Some(last) = &self.last_writer {
            if let Some(writer) = self
                .registry
                .writers()
                .iter()
                .find(|w| w.name() == last.as_str())
            {
                if writer.handled().contains(&record.kind) && writer.can_write(path) {
                    return Some(writer.clone());
                }
            }
        }

        for writer in self.registry.writers() {
            if writer.handled().contains(&record.kind) && writer.can_write(path) {
                tracing::debug!("writer {} selected after full scan", writer.name());
                self.last_writer = Some(writer.name().to_string());
                return Some(writer.clone());
            }
        }

        tracing::warn!("no suitable writer found for {:?}", record.kind);
        None
    }
}
