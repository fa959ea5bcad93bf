//! 高优先级策略缓存
//!
//! 快照整体替换（copy-on-write）：刷新时先完整构建新集合，再原子替换指针。
//! 读者拿到的永远是某一个完整快照，不会看到新旧集合的混合。

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::store::{PolicyPriority, PolicyStore};

/// 一次刷新的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Updated { count: usize },
    /// 存储不可达，沿用旧快照
    Retained,
}

#[derive(Debug)]
pub struct PolicyCache {
    store: Arc<dyn PolicyStore>,
    snapshot: ArcSwap<HashSet<String>>,
}

impl PolicyCache {
    /// 初始快照为空；调用方负责首次 `refresh()`。
    pub fn new(store: Arc<dyn PolicyStore>) -> Self {
        Self {
            store,
            snapshot: ArcSwap::from_pointee(HashSet::new()),
        }
    }

    /// 无锁、无分配的查询
    pub fn is_priority(&self, app_type: &str) -> bool {
        self.snapshot.load().contains(app_type)
    }

    /// 当前快照（用于诊断和测试）
    pub fn snapshot(&self) -> Arc<HashSet<String>> {
        self.snapshot.load_full()
    }

    #[tracing::instrument(skip(self))]
    pub async fn refresh(&self) -> RefreshOutcome {
        match self.store.list_active_policies(PolicyPriority::High).await {
            Ok(names) => {
                let count = names.len();
                self.snapshot.store(Arc::new(names));
                debug!(count, "QoS policies refreshed");
                RefreshOutcome::Updated { count }
            }
            Err(err) => {
                warn!(%err, "policy refresh failed; keeping previous snapshot");
                RefreshOutcome::Retained
            }
        }
    }

    /// 立即刷新一次，然后按周期刷新，直到 `cancel` 被触发。
    pub async fn run(&self, period: Duration, cancel: CancellationToken) {
        info!(period_ms = period.as_millis() as u64, "▶️  策略刷新启动");
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    // 慢存储不能拖住停机
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = self.refresh() => {}
                    }
                }
            }
        }
        info!("⏹️  策略刷新停止");
    }
}
