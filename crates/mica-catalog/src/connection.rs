//! 数据库连接管理

use mica_core::{MicaError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

/// 目录数据库连接池
pub struct CatalogPool {
    pool: SqlitePool,
}

impl CatalogPool {
    /// 按连接串打开目录库，文件不存在时自动创建
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| MicaError::Catalog(e.to_string()))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .map_err(|e| MicaError::Catalog(e.to_string()))?;

        Ok(Self { pool })
    }

    /// 打开进程内存目录库
    ///
    /// 内存库必须限制为单连接：每条 SQLite 内存连接各自是一张空库。
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| MicaError::Catalog(e.to_string()))?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
