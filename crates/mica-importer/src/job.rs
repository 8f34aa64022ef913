//! 运行上下文
//!
//! 一次导入运行独占的全部状态：取消标志、粘性格式解析缓存、体
//! 编号表、聚合分组、冲突累计。随运行创建，运行结束即销毁，
//! 不跨运行泄漏。

use crate::conflict::ConflictRecord;
use mica_formats::{FormatRegistry, FormatResolver};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// 一个聚合输出单元：输出名与共享同一体标识键的源文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationGroup {
    /// 聚合输出的存储相对路径（导入模式含扩展名）
    pub stored_name: String,
    /// 按发现顺序排列的源文件
    pub files: Vec<PathBuf>,
}

/// 单次导入运行的上下文
pub struct ImportJob {
    /// 运行标识，只用于日志关联
    pub id: Uuid,
    /// 仅索引模式标志
    pub index_only: bool,
    /// 粘性解码器/编码器缓存，运行开始时为空
    pub resolver: FormatResolver,
    cancel: Arc<AtomicBool>,
    volume_numbers: HashMap<String, i32>,
    groups: Vec<AggregationGroup>,
    group_index: HashMap<String, usize>,
    conflicts: Vec<ConflictRecord>,
}

impl ImportJob {
    pub fn new(index_only: bool, registry: Arc<FormatRegistry>, cancel: Arc<AtomicBool>) -> Self {
        Self {
            id: Uuid::new_v4(),
            index_only,
            resolver: FormatResolver::new(registry),
            cancel,
            volume_numbers: HashMap::new(),
            groups: Vec::new(),
            group_index: HashMap::new(),
            conflicts: Vec::new(),
        }
    }

    /// 协作式取消标志是否已置位
    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// 取体标识键的体编号
    ///
    /// 新键按首见顺序从 1 起分配；同键复用已有编号。编号只在本次
    /// 运行内稳定。
    pub fn volume_number(&mut self, volume_key: &str) -> i32 {
        let next = self.volume_numbers.len() as i32 + 1;
        *self
            .volume_numbers
            .entry(volume_key.to_string())
            .or_insert(next)
    }

    /// 把源文件挂到其输出单元上，分组保持插入顺序
    pub fn add_to_group(&mut self, stored_name: &str, file: PathBuf) {
        match self.group_index.get(stored_name) {
            Some(&index) => self.groups[index].files.push(file),
            None => {
                self.group_index
                    .insert(stored_name.to_string(), self.groups.len());
                self.groups.push(AggregationGroup {
                    stored_name: stored_name.to_string(),
                    files: vec![file],
                });
            }
        }
    }

    /// 第一遍结束后取走全部分组
    pub fn take_groups(&mut self) -> Vec<AggregationGroup> {
        self.group_index.clear();
        std::mem::take(&mut self.groups)
    }

    pub fn has_groups(&self) -> bool {
        !self.groups.is_empty()
    }

    /// 累计一条冲突记录
    pub fn record_conflict(&mut self, conflict: ConflictRecord) {
        self.conflicts.push(conflict);
    }

    /// 取走累计的冲突记录
    pub fn take_conflicts(&mut self) -> Vec<ConflictRecord> {
        std::mem::take(&mut self.conflicts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> ImportJob {
        ImportJob::new(
            false,
            Arc::new(FormatRegistry::new()),
            Arc::new(AtomicBool::new(false)),
        )
    }

    #[test]
    fn test_volume_numbers_follow_first_seen_order() {
        let mut job = job();

        assert_eq!(job.volume_number("A"), 1);
        assert_eq!(job.volume_number("B"), 2);
        // A 的第二次出现复用 1
        assert_eq!(job.volume_number("A"), 1);
        assert_eq!(job.volume_number("C"), 3);
    }

    #[test]
    fn test_groups_keep_insertion_order() {
        let mut job = job();
        job.add_to_group("/p/s/b1.mha", PathBuf::from("/in/1.dcm"));
        job.add_to_group("/p/s/a2.mha", PathBuf::from("/in/2.dcm"));
        job.add_to_group("/p/s/b1.mha", PathBuf::from("/in/3.dcm"));

        let groups = job.take_groups();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].stored_name, "/p/s/b1.mha");
        assert_eq!(
            groups[0].files,
            vec![PathBuf::from("/in/1.dcm"), PathBuf::from("/in/3.dcm")]
        );
        assert_eq!(groups[1].stored_name, "/p/s/a2.mha");
    }

    #[test]
    fn test_cancel_flag_is_shared() {
        let cancel = Arc::new(AtomicBool::new(false));
        let job = ImportJob::new(true, Arc::new(FormatRegistry::new()), cancel.clone());

        assert!(!job.is_cancelled());
        cancel.store(true, Ordering::SeqCst);
        assert!(job.is_cancelled());
    }
}
