//! 接收端指标
//!
//! 每类流量保留定长延迟历史，按需计算平均延迟、丢包率与 jitter。

mod aggregator;
mod history;
mod receiver;

pub use aggregator::{JITTER_MAX, Metrics, MetricsAggregator, StalePriorityGuard};
pub use history::LatencyHistory;
pub use receiver::LocalReceiver;
