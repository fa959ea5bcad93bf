//! 数据包类型
//!
//! 数据包只在各阶段之间流转，不做持久化。优先级由分类器一次性确定，之后不可变。

use serde::{Deserialize, Serialize};

use super::time::Timestamp;

/// 流量类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityClass {
    High,
    Normal,
}

impl PriorityClass {
    pub fn from_flag(is_priority: bool) -> Self {
        if is_priority {
            PriorityClass::High
        } else {
            PriorityClass::Normal
        }
    }

    pub fn is_high(self) -> bool {
        matches!(self, PriorityClass::High)
    }
}

impl std::fmt::Display for PriorityClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PriorityClass::High => f.write_str("high"),
            PriorityClass::Normal => f.write_str("normal"),
        }
    }
}

/// 已分类的数据包（同时也是 receive 接口的报文格式）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Packet {
    id: String,
    app_type: String,
    #[serde(rename = "timestamp")]
    enqueued_at: Timestamp,
    is_priority: bool,
}

impl Packet {
    /// 只由分类器调用
    pub(crate) fn classified(
        id: String,
        app_type: String,
        enqueued_at: Timestamp,
        class: PriorityClass,
    ) -> Self {
        Self {
            id,
            app_type,
            enqueued_at,
            is_priority: class.is_high(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn app_type(&self) -> &str {
        &self.app_type
    }

    pub fn enqueued_at(&self) -> Timestamp {
        self.enqueued_at
    }

    pub fn class(&self) -> PriorityClass {
        PriorityClass::from_flag(self.is_priority)
    }
}
