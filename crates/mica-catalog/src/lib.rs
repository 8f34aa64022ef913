//! # MICA Catalog
//!
//! 患者/检查/系列/影像四级目录的关系型存储：连接管理、建表、
//! 精确匹配查找与幂等的取或建写入。

pub mod connection;
pub mod models;
pub mod queries;

pub use connection::CatalogPool;
pub use queries::CatalogQueries;
