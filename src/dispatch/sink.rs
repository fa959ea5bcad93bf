//! 下游接收方接口

use async_trait::async_trait;

use crate::error::ForwardError;
use crate::traffic::Packet;

/// 接收 Dispatcher 转发的数据包。从 Dispatcher 的角度看是 fire-and-forget。
#[async_trait]
pub trait PacketSink: Send + Sync + std::fmt::Debug {
    async fn receive(&self, pkt: Packet) -> Result<(), ForwardError>;
}

/// 单次转发的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForwardOutcome {
    Forwarded,
    TimedOut,
    Failed(ForwardError),
}

impl ForwardOutcome {
    pub fn is_forwarded(&self) -> bool {
        matches!(self, ForwardOutcome::Forwarded)
    }
}
