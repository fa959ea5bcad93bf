//! 队列策略（Queue disciplines）
//!
//! 两种 FIFO：优先级流量使用不设上限的 `FifoQueue`（从不丢包），
//! 普通流量使用按包数限长的 `DropTailQueue`（满则尾丢弃）。

use crate::traffic::Packet;

mod drop_tail;
mod fifo;

pub use drop_tail::DropTailQueue;
pub use fifo::FifoQueue;

/// Packet 队列抽象
pub trait PacketQueue: std::fmt::Debug + Send {
    /// 入队：成功返回 Ok；若被丢弃则返回 Err(pkt)
    fn enqueue(&mut self, pkt: Packet) -> Result<(), Packet>;
    /// 出队：返回最早入队的 packet
    fn dequeue(&mut self) -> Option<Packet>;

    fn len(&self) -> usize;
    /// 容量（包数）；None 表示不设上限
    fn capacity(&self) -> Option<usize>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
