//! 错误定义模块

use thiserror::Error;

/// MICA系统统一错误类型
#[derive(Error, Debug)]
pub enum MicaError {
    #[error("配置错误: {0}")]
    Config(String),

    #[error("目录数据库错误: {0}")]
    Catalog(String),

    #[error("影像格式错误: {0}")]
    Format(String),

    #[error("存储错误: {0}")]
    Storage(String),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("系统内部错误: {0}")]
    Internal(String),
}

/// MICA系统统一结果类型
pub type Result<T> = std::result::Result<T, MicaError>;
