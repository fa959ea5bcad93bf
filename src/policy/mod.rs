//! QoS 策略
//!
//! 外部策略存储接口，以及供分类器并发读取的快照缓存。

mod cache;
mod store;

pub use cache::{PolicyCache, RefreshOutcome};
pub use store::{InMemoryPolicyStore, PolicyPriority, PolicyStore, QosPolicy};
