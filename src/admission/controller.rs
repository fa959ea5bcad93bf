//! 准入控制
//!
//! 两条队列各自持有独立的锁。优先级队列无上限，普通队列容量为 `Q`，
//! 满时尾丢弃并计数。准入是 O(1) 且不阻塞的。

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, trace};

use super::classifier::Classifier;
use super::counters::{DropCounters, DropCounts};
use crate::error::IngressError;
use crate::policy::PolicyCache;
use crate::queue::{DropTailQueue, FifoQueue, PacketQueue};
use crate::traffic::{IngressRequest, IngressStatus, Packet, PriorityClass, RawPacket};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionResult {
    Accepted(PriorityClass),
    Dropped,
}

impl AdmissionResult {
    pub fn status(self) -> IngressStatus {
        match self {
            AdmissionResult::Accepted(PriorityClass::High) => IngressStatus::QueuedHigh,
            AdmissionResult::Accepted(PriorityClass::Normal) => IngressStatus::QueuedNormal,
            AdmissionResult::Dropped => IngressStatus::DroppedCongestion,
        }
    }
}

/// 队列深度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueDepths {
    pub priority: usize,
    pub normal: usize,
    pub normal_capacity: usize,
}

#[derive(Debug)]
pub struct AdmissionController {
    classifier: Classifier,
    pub(crate) priority_q: Mutex<FifoQueue>,
    pub(crate) normal_q: Mutex<DropTailQueue>,
    normal_capacity: usize,
    drops: DropCounters,
}

impl AdmissionController {
    pub fn new(policies: Arc<PolicyCache>, normal_capacity: usize) -> Self {
        Self {
            classifier: Classifier::new(policies),
            priority_q: Mutex::new(FifoQueue::new()),
            normal_q: Mutex::new(DropTailQueue::new(normal_capacity)),
            normal_capacity,
            drops: DropCounters::default(),
        }
    }

    /// ingress 接口：校验、分类、入队。
    pub fn ingress(&self, req: IngressRequest) -> Result<IngressStatus, IngressError> {
        let raw = req.validate()?;
        Ok(self.admit(raw).status())
    }

    #[tracing::instrument(skip(self, raw), fields(pkt_id = %raw.id, app_type = %raw.app_type))]
    pub fn admit(&self, raw: RawPacket) -> AdmissionResult {
        let pkt = self.classifier.classify(raw);
        // 任何时刻最多持有一把队列锁
        match pkt.class() {
            PriorityClass::High => {
                let mut q = self.priority_q.lock();
                // FifoQueue 不会拒绝
                let _ = q.enqueue(pkt);
                trace!(queue_len = q.len(), class = "high", "packet queued");
                AdmissionResult::Accepted(PriorityClass::High)
            }
            PriorityClass::Normal => {
                let mut q = self.normal_q.lock();
                match q.enqueue(pkt) {
                    Ok(()) => {
                        trace!(queue_len = q.len(), class = "normal", "packet queued");
                        AdmissionResult::Accepted(PriorityClass::Normal)
                    }
                    Err(dropped) => {
                        drop(q);
                        self.drops.record_normal_drop();
                        debug!(pkt_id = dropped.id(), "normal queue full, tail-drop");
                        AdmissionResult::Dropped
                    }
                }
            }
        }
    }

    /// 严格优先级出队：只要优先级队列非空，就不服务普通队列。
    ///
    /// 从普通队列出队期间一直持有优先级队列的锁（加锁顺序 priority -> normal），
    /// 否则并发到达的优先级包可能落在两次加锁之间。
    pub fn pop_next(&self) -> Option<Packet> {
        let mut hi = self.priority_q.lock();
        if let Some(pkt) = hi.dequeue() {
            return Some(pkt);
        }
        self.normal_q.lock().dequeue()
    }

    pub fn queue_depths(&self) -> QueueDepths {
        let priority = self.priority_q.lock().len();
        let normal = self.normal_q.lock().len();
        QueueDepths {
            priority,
            normal,
            normal_capacity: self.normal_capacity,
        }
    }

    pub fn record_forward_loss(&self, class: PriorityClass) {
        self.drops.record_forward_loss(class);
    }

    pub fn peek_drop_counts(&self) -> DropCounts {
        self.drops.peek()
    }

    /// 读取并清零丢包计数
    pub fn take_drop_counts(&self) -> DropCounts {
        self.drops.take()
    }
}
