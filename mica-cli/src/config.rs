//! 配置管理
//!
//! 分层加载：内置缺省值 < 可选的TOML配置文件 < `MICA_*` 环境变量，
//! 命令行参数在 main 里最后覆盖。

use config::{Config, ConfigError, Environment, File};
use mica_core::{MicaError, Result};
use serde::{Deserialize, Serialize};

const DEFAULT_DATABASE_URL: &str = "sqlite://mica-catalog.db";
const DEFAULT_DATA_LOCATION: &str = "./data/mica";
const DEFAULT_LOG_LEVEL: &str = "info";

/// MICA导入工具完整配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MicaConfig {
    /// 目录数据库配置
    pub database: DatabaseConfig,
    /// 存储区配置
    pub storage: StorageConfig,
    /// 日志配置
    pub logging: LoggingConfig,
}

/// 目录数据库配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite 连接串
    pub url: String,
}

/// 存储区配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// 受管存储根目录
    pub data_location: String,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// env-filter 形式的日志级别
    pub level: String,
}

impl MicaConfig {
    /// 加载配置；`path` 为空时只用缺省值与环境变量
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("database.url", DEFAULT_DATABASE_URL)
            .map_err(config_error)?
            .set_default("storage.data_location", DEFAULT_DATA_LOCATION)
            .map_err(config_error)?
            .set_default("logging.level", DEFAULT_LOG_LEVEL)
            .map_err(config_error)?;

        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path));
        }
        builder = builder.add_source(Environment::with_prefix("MICA").separator("__"));

        builder
            .build()
            .and_then(|config| config.try_deserialize())
            .map_err(config_error)
    }
}

fn config_error(e: ConfigError) -> MicaError {
    MicaError::Config(e.to_string())
}
