//! 分类与准入
//!
//! 入口数据包先由 `Classifier` 按策略快照定级，再由 `AdmissionController`
//! 放入优先级队列或普通队列。

mod classifier;
mod controller;
mod counters;

pub use classifier::Classifier;
pub use controller::{AdmissionController, AdmissionResult, QueueDepths};
pub use counters::{DropCounters, DropCounts};
