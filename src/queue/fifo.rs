//! 不限长 FIFO
//!
//! 承载关键流量：入队永不失败。持续过载时内存无界增长。

use std::collections::VecDeque;

use crate::traffic::Packet;

use super::PacketQueue;

#[derive(Debug, Default)]
pub struct FifoQueue {
    q: VecDeque<Packet>,
}

impl FifoQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PacketQueue for FifoQueue {
    fn enqueue(&mut self, pkt: Packet) -> Result<(), Packet> {
        self.q.push_back(pkt);
        Ok(())
    }

    fn dequeue(&mut self) -> Option<Packet> {
        self.q.pop_front()
    }

    fn len(&self) -> usize {
        self.q.len()
    }

    fn capacity(&self) -> Option<usize> {
        None
    }
}
