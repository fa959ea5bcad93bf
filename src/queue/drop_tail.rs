//! DropTail（尾丢弃）队列
//!
//! 队列已满时直接拒绝新到达的 packet，从不驱逐已入队的 packet。

use std::collections::VecDeque;

use crate::traffic::Packet;

use super::PacketQueue;

#[derive(Debug)]
pub struct DropTailQueue {
    max_pkts: usize,
    q: VecDeque<Packet>,
}

impl DropTailQueue {
    pub fn new(max_pkts: usize) -> Self {
        Self {
            max_pkts,
            q: VecDeque::new(),
        }
    }
}

impl PacketQueue for DropTailQueue {
    fn enqueue(&mut self, pkt: Packet) -> Result<(), Packet> {
        if self.q.len() >= self.max_pkts {
            return Err(pkt);
        }
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
        Some(self.max_pkts)
    }
}
