//! # MICA Importer
//!
//! 影像导入流水线：候选文件发现、体标识分组、目录冲突检测、
//! 两遍式"过滤-聚合提交"编排，带进度上报与协作式取消。

pub mod conflict;
pub mod events;
pub mod gate;
pub mod identity;
pub mod importer;
pub mod job;
pub mod scan;

pub use conflict::{ConflictDetector, ConflictRecord};
pub use events::{ImportEvent, ImportOutcome};
pub use gate::ImportGate;
pub use importer::{ImportHandle, ImportRequest, Importer};
