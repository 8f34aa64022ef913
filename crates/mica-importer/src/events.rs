//! 运行事件与终态
//!
//! 进度与错误以事件通道送达调用方（通常是界面层），终态由运行
//! 返回值给出。事件是建议性的：消费方不得阻塞流水线任务。

use crate::conflict::ConflictRecord;
use mica_core::CatalogLocation;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;

/// 运行过程事件
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ImportEvent {
    /// 进度百分比，单调不减，0–100
    Progress(u8),
    /// 需要呈现给操作者的错误（文件/组级，运行继续）
    Error(String),
}

/// 运行终态，三者互斥
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ImportOutcome {
    /// 导入完成；可能携带被跳过系列的冲突汇总
    Success {
        /// 操作者可读的冲突汇总文本
        conflict_summary: Option<String>,
        /// 逐系列的冲突记录
        conflicts: Vec<ConflictRecord>,
        /// 本次运行新建（或命中）的目录位置，供界面立即展示
        imported: Vec<CatalogLocation>,
    },
    /// 第一遍后没有任何文件可导入
    Failure { message: String },
    /// 操作者请求取消；已完成的目录写入保持有效
    Cancelled,
}

/// 进度上报器
///
/// 保证对外进度单调不减；没有事件通道时仅记录日志。
pub struct ProgressReporter {
    sender: Option<UnboundedSender<ImportEvent>>,
    last: u8,
}

impl ProgressReporter {
    pub fn new(sender: Option<UnboundedSender<ImportEvent>>) -> Self {
        Self { sender, last: 0 }
    }

    /// 上报进度，回退值被钳制为上一次的值
    pub fn progress(&mut self, percent: u8) {
        let percent = percent.min(100).max(self.last);
        self.last = percent;
        self.send(ImportEvent::Progress(percent));
    }

    /// 上报需要呈现的错误
    pub fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::error!("{message}");
        self.send(ImportEvent::Error(message));
    }

    fn send(&self, event: ImportEvent) {
        if let Some(sender) = &self.sender {
            // 接收端先走是正常情况，丢弃即可
            let _ = sender.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::unbounded_channel;

    #[test]
    fn test_progress_is_monotonic() {
        let (tx, mut rx) = unbounded_channel();
        let mut reporter = ProgressReporter::new(Some(tx));

        reporter.progress(10);
        reporter.progress(5);
        reporter.progress(50);
        reporter.progress(120);

        let mut seen = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let ImportEvent::Progress(p) = event {
                seen.push(p);
            }
        }
        assert_eq!(seen, vec![10, 10, 50, 100]);
    }

    #[test]
    fn test_reporter_without_channel_is_silent() {
        let mut reporter = ProgressReporter::new(None);
        reporter.progress(42);
        reporter.error("nothing listens");
    }
}
