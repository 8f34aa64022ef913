//! 影像存储管理

use mica_core::Result;
use std::path::{Path, PathBuf};

/// 受管存储根目录
///
/// 目录内的行寻址一律用相对路径（习惯上以 `/` 开头），绝对路径
/// 只在落盘一刻拼出，便于整个存储区搬迁。
#[derive(Debug, Clone)]
pub struct StorageRoot {
    base: PathBuf,
}

impl StorageRoot {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// 存储区数据根路径
    pub fn data_location(&self) -> &Path {
        &self.base
    }

    /// 相对路径转绝对路径
    pub fn absolute(&self, relative: &str) -> PathBuf {
        self.base.join(relative.trim_start_matches(['/', '\\']))
    }

    /// 递归创建存储区内的目录
    pub async fn mkpath(&self, relative: &str) -> Result<PathBuf> {
        let dir = self.absolute(relative);
        tokio::fs::create_dir_all(&dir).await?;
        Ok(dir)
    }

    /// 为一个将要写出的文件准备父目录，返回其绝对路径
    pub async fn prepare_file(&self, relative: &str) -> Result<PathBuf> {
        let path = self.absolute(relative);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(path)
    }

    /// 写出一个存储区文件
    pub async fn store_file(&self, relative: &str, data: &[u8]) -> Result<PathBuf> {
        let path = self.prepare_file(relative).await?;
        tokio::fs::write(&path, data).await?;
        Ok(path)
    }
}
