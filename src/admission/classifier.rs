//! 分类器：按策略快照给数据包打上优先级

use std::sync::Arc;

use crate::policy::PolicyCache;
use crate::traffic::{Packet, PriorityClass, RawPacket};

#[derive(Debug, Clone)]
pub struct Classifier {
    policies: Arc<PolicyCache>,
}

impl Classifier {
    pub fn new(policies: Arc<PolicyCache>) -> Self {
        Self { policies }
    }

    /// 分类结果在此固定，之后不随策略刷新而改变。
    pub fn classify(&self, raw: RawPacket) -> Packet {
        let class = PriorityClass::from_flag(self.policies.is_priority(&raw.app_type));
        Packet::classified(raw.id, raw.app_type, raw.enqueued_at, class)
    }
}
