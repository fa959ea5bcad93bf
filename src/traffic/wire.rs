//! 入口报文与应答
//!
//! `IngressRequest` 是生成器提交的原始报文；校验通过后得到 `RawPacket`，
//! 再交由分类器打上优先级。客户端携带的 `isPriority` 会被忽略。

use serde::{Deserialize, Serialize};

use super::time::Timestamp;
use crate::error::IngressError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngressRequest {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub app_type: Option<String>,
    #[serde(default)]
    pub timestamp: Option<Timestamp>,
    #[serde(default, skip_serializing)]
    pub is_priority: Option<bool>,
}

impl IngressRequest {
    pub fn new(id: impl Into<String>, app_type: impl Into<String>, timestamp: Timestamp) -> Self {
        Self {
            id: Some(id.into()),
            app_type: Some(app_type.into()),
            timestamp: Some(timestamp),
            is_priority: None,
        }
    }

    /// 校验必填字段，得到尚未分类的数据包。
    pub fn validate(self) -> Result<RawPacket, IngressError> {
        let id = required_str(self.id, "id")?;
        let app_type = required_str(self.app_type, "appType")?;
        let enqueued_at = self.timestamp.ok_or(IngressError::MissingField("timestamp"))?;
        Ok(RawPacket {
            id,
            app_type,
            enqueued_at,
        })
    }
}

fn required_str(v: Option<String>, field: &'static str) -> Result<String, IngressError> {
    match v {
        None => Err(IngressError::MissingField(field)),
        Some(s) if s.trim().is_empty() => Err(IngressError::EmptyField(field)),
        Some(s) => Ok(s),
    }
}

/// 通过校验、尚未分类的数据包
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPacket {
    pub id: String,
    pub app_type: String,
    pub enqueued_at: Timestamp,
}

/// ingress 的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IngressStatus {
    #[serde(rename = "Queued (High)")]
    QueuedHigh,
    #[serde(rename = "Queued (Normal)")]
    QueuedNormal,
    #[serde(rename = "Dropped (Congestion)")]
    DroppedCongestion,
}

impl IngressStatus {
    pub fn http_status(self) -> u16 {
        match self {
            IngressStatus::QueuedHigh | IngressStatus::QueuedNormal => 200,
            IngressStatus::DroppedCongestion => 503,
        }
    }
}

impl std::fmt::Display for IngressStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            IngressStatus::QueuedHigh => "Queued (High)",
            IngressStatus::QueuedNormal => "Queued (Normal)",
            IngressStatus::DroppedCongestion => "Dropped (Congestion)",
        })
    }
}
