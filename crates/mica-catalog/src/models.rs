//! 数据库行模型

use sqlx::FromRow;

// 查询用行模型 - FromRow 映射 SELECT 结果

/// 患者表行
#[derive(Debug, Clone, FromRow)]
pub struct DbPatient {
    pub id: i64,
    pub name: String,
    pub thumbnail: String,
    pub birth_date: String,
    pub gender: String,
}

/// 检查表行
#[derive(Debug, Clone, FromRow)]
pub struct DbStudy {
    pub id: i64,
    pub patient: i64,
    pub name: String,
    pub uid: String,
    pub thumbnail: String,
}

/// 系列表行
#[derive(Debug, Clone, FromRow)]
pub struct DbSeries {
    pub id: i64,
    pub study: i64,
    pub size: i64,
    pub name: String,
    pub path: String,
    pub uid: String,
    pub orientation: String,
    pub series_number: String,
    pub sequence_name: String,
    pub slice_thickness: String,
    pub rows: String,
    pub columns: String,
    pub thumbnail: String,
    pub age: String,
    pub description: String,
    pub modality: String,
    pub protocol: String,
    pub comments: String,
    pub status: String,
    pub acquisition_date: String,
    pub importation_date: String,
    pub referee: String,
    pub performer: String,
    pub institution: String,
    pub report: String,
}

/// 影像表行
#[derive(Debug, Clone, FromRow)]
pub struct DbImage {
    pub id: i64,
    pub series: i64,
    pub name: String,
    pub path: String,
    pub instance_path: String,
    pub thumbnail: String,
    pub is_indexed: bool,
}
