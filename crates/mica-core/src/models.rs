//! 核心数据模型定义

use crate::metadata::ImageMetadata;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 逻辑数据类型
///
/// 由格式注册表在解码时标注，封闭枚举。导入时的目标文件扩展名
/// 由该类型唯一决定。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DataKind {
    /// 普通体数据影像
    Image,
    /// Vistal厂商格式影像
    VistalImage,
    /// 三维网格
    Mesh,
    /// 四维网格序列
    Mesh4D,
    /// 纤维束数据
    FiberBundle,
    /// 其他不支持写出的类型
    Other,
}

impl DataKind {
    /// 导入模式下写出文件使用的扩展名
    ///
    /// `Other` 没有对应的编码器，返回 `None`，导入模式下该文件会被跳过。
    pub fn output_extension(&self) -> Option<&'static str> {
        match self {
            DataKind::Mesh => Some(".vtk"),
            DataKind::Mesh4D => Some(".v4d"),
            DataKind::FiberBundle => Some(".xml"),
            DataKind::VistalImage => Some(".dim"),
            DataKind::Image => Some(".mha"),
            DataKind::Other => None,
        }
    }
}

/// 解码后的缩略图位图，RGBA8 像素
#[derive(Debug, Clone)]
pub struct PreviewImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// 一次解码产生的内存数据
///
/// 既可以是仅含头信息的轻量记录（第一遍过滤用），也可以是带像素
/// 载荷和缩略图的完整记录（第二遍聚合写入用）。记录只在当前处理
/// 步骤中存活，写入目录后即丢弃。
#[derive(Debug, Clone, Default)]
pub struct DecodedRecord {
    /// 逻辑数据类型
    pub kind: DataKind,
    /// 目录相关属性
    pub metadata: ImageMetadata,
    /// 体数据尺寸 [columns, rows, slices]
    pub dimensions: [u32; 3],
    /// 原始像素载荷，仅完整解码时填充
    pub payload: Vec<u8>,
    /// 逐切片缩略图
    pub previews: Vec<PreviewImage>,
    /// 代表性缩略图
    pub reference_preview: Option<PreviewImage>,
    /// 参与聚合的源文件路径
    pub source_paths: Vec<PathBuf>,
    /// 聚合输出的存储相对路径（含扩展名）
    pub stored_name: String,
}

impl Default for DataKind {
    fn default() -> Self {
        DataKind::Other
    }
}

/// 目录层级定位：一次导入新建（或命中）的患者/检查/系列行
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogLocation {
    pub patient_id: i64,
    pub study_id: i64,
    pub series_id: i64,
}
