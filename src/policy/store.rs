//! 策略存储（外部协作方）
//!
//! 核心只消费 `list_active_policies(High)`；CRUD 操作用于驱动仿真与测试。

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::PolicyStoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PolicyPriority {
    High,
    #[default]
    Normal,
}

/// 一条 QoS 策略，`name` 即应用类型标签
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QosPolicy {
    pub name: String,
    #[serde(default)]
    pub priority: PolicyPriority,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl QosPolicy {
    pub fn high(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            priority: PolicyPriority::High,
            description: None,
            is_active: true,
        }
    }
}

#[async_trait]
pub trait PolicyStore: Send + Sync + std::fmt::Debug {
    /// 返回给定优先级下所有启用策略的名字
    async fn list_active_policies(
        &self,
        priority: PolicyPriority,
    ) -> Result<HashSet<String>, PolicyStoreError>;
}

/// 进程内策略存储，可模拟不可达
#[derive(Debug)]
pub struct InMemoryPolicyStore {
    policies: RwLock<BTreeMap<String, QosPolicy>>,
    reachable: AtomicBool,
}

impl Default for InMemoryPolicyStore {
    fn default() -> Self {
        Self {
            policies: RwLock::new(BTreeMap::new()),
            reachable: AtomicBool::new(true),
        }
    }
}

impl InMemoryPolicyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policies(policies: impl IntoIterator<Item = QosPolicy>) -> Self {
        let store = Self::default();
        for p in policies {
            store.upsert(p);
        }
        store
    }

    /// 按名字插入或覆盖
    pub fn upsert(&self, policy: QosPolicy) {
        self.policies.write().insert(policy.name.clone(), policy);
    }

    /// 切换启用状态，返回新状态；策略不存在时返回 None
    pub fn toggle(&self, name: &str) -> Option<bool> {
        let mut policies = self.policies.write();
        let p = policies.get_mut(name)?;
        p.is_active = !p.is_active;
        Some(p.is_active)
    }

    pub fn remove(&self, name: &str) -> Option<QosPolicy> {
        self.policies.write().remove(name)
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }
}

#[async_trait]
impl PolicyStore for InMemoryPolicyStore {
    async fn list_active_policies(
        &self,
        priority: PolicyPriority,
    ) -> Result<HashSet<String>, PolicyStoreError> {
        if !self.reachable.load(Ordering::SeqCst) {
            return Err(PolicyStoreError::Unreachable("in-memory store offline".into()));
        }
        Ok(self
            .policies
            .read()
            .values()
            .filter(|p| p.is_active && p.priority == priority)
            .map(|p| p.name.clone())
            .collect())
    }
}
