//! # MICA Storage
//!
//! 受管存储区：按相对路径寻址的数据根目录（递归建目录、文件写入）
//! 与缩略图输出。

pub mod storage;
pub mod thumbnails;

pub use storage::StorageRoot;
pub use thumbnails::{ThumbnailGenerator, ThumbnailSet};
