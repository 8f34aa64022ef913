//! 运行准入
//!
//! 全进程同一时刻只允许一个导入运行持有目录写临界区：两个并发
//! 运行交错写入会各自创建重复的患者/检查/系列行。临界区覆盖整个
//! 运行（两遍都在内），因为体编号与冲突检测都是运行级状态。

use tokio::sync::{Mutex, MutexGuard};

/// 导入运行准入闸
///
/// 公平队列语义：后到的运行排队等待，先到先得。
#[derive(Debug, Default)]
pub struct ImportGate {
    inner: Mutex<()>,
}

/// 运行租约，持有期间独占目录写临界区
pub struct RunLease<'a> {
    _permit: MutexGuard<'a, ()>,
}

impl ImportGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// 申请准入，已有运行在进行时挂起等待其完成
    pub async fn acquire(&self) -> RunLease<'_> {
        RunLease {
            _permit: self.inner.lock().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_second_run_blocks_until_lease_released() {
        let gate = Arc::new(ImportGate::new());

        let lease = gate.acquire().await;

        // 租约未释放时第二个申请应一直挂起
        let contender = gate.clone();
        let blocked = timeout(Duration::from_millis(50), contender.acquire()).await;
        assert!(blocked.is_err());

        drop(lease);
        let admitted = timeout(Duration::from_millis(50), gate.acquire()).await;
        assert!(admitted.is_ok());
    }

    #[tokio::test]
    async fn test_runs_are_serialized() {
        let gate = Arc::new(ImportGate::new());
        let active = Arc::new(std::sync::atomic::AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..4 {
            let gate = gate.clone();
            let active = active.clone();
            tasks.push(tokio::spawn(async move {
                let _lease = gate.acquire().await;
                let now = active.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                assert_eq!(now, 0, "two runs inside the critical section");
                tokio::time::sleep(Duration::from_millis(5)).await;
                active.fetch_sub(1, std::sync::atomic::Ordering::SeqCst);
            }));
        }

        for task in tasks {
            task.await.unwrap();
        }
    }
}
