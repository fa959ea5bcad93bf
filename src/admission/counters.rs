//! 丢包计数
//!
//! 准入丢包与转发失败是两个独立的故障域，分开计数。
//! `take()` 读取并清零，由指标阶段调用以划定报告窗口。

use std::sync::atomic::{AtomicU64, Ordering};

use crate::traffic::PriorityClass;

#[derive(Debug, Default)]
pub struct DropCounters {
    priority_admission: AtomicU64,
    normal_admission: AtomicU64,
    priority_forward: AtomicU64,
    normal_forward: AtomicU64,
}

/// 一个报告窗口内的计数快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DropCounts {
    pub priority_admission: u64,
    pub normal_admission: u64,
    pub priority_forward: u64,
    pub normal_forward: u64,
}

impl DropCounts {
    pub fn priority_total(&self) -> u64 {
        self.priority_admission.saturating_add(self.priority_forward)
    }

    pub fn normal_total(&self) -> u64 {
        self.normal_admission.saturating_add(self.normal_forward)
    }
}

impl DropCounters {
    /// 普通队列尾丢弃。优先级流量没有对应的入口：其准入计数恒为 0。
    pub fn record_normal_drop(&self) {
        self.normal_admission.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_forward_loss(&self, class: PriorityClass) {
        match class {
            PriorityClass::High => self.priority_forward.fetch_add(1, Ordering::Relaxed),
            PriorityClass::Normal => self.normal_forward.fetch_add(1, Ordering::Relaxed),
        };
    }

    /// 只读，不清零
    pub fn peek(&self) -> DropCounts {
        DropCounts {
            priority_admission: self.priority_admission.load(Ordering::Relaxed),
            normal_admission: self.normal_admission.load(Ordering::Relaxed),
            priority_forward: self.priority_forward.load(Ordering::Relaxed),
            normal_forward: self.normal_forward.load(Ordering::Relaxed),
        }
    }

    pub fn take(&self) -> DropCounts {
        DropCounts {
            priority_admission: self.priority_admission.swap(0, Ordering::Relaxed),
            normal_admission: self.normal_admission.swap(0, Ordering::Relaxed),
            priority_forward: self.priority_forward.swap(0, Ordering::Relaxed),
            normal_forward: self.normal_forward.swap(0, Ordering::Relaxed),
        }
    }
}
