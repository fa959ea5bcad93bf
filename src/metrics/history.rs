//! 定长延迟历史（环形缓冲）
//!
//! 满了之后插入新样本会先淘汰最旧的样本。

use std::collections::VecDeque;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct LatencyHistory {
    cap: usize,
    samples_ms: VecDeque<u64>,
}

impl LatencyHistory {
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            samples_ms: VecDeque::new(),
        }
    }

    pub fn push(&mut self, latency: Duration) {
        if self.cap == 0 {
            return;
        }
        if self.samples_ms.len() >= self.cap {
            self.samples_ms.pop_front();
        }
        let ms = latency.as_millis().min(u64::MAX as u128) as u64;
        self.samples_ms.push_back(ms);
    }

    pub fn len(&self) -> usize {
        self.samples_ms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples_ms.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples_ms.clear();
    }

    /// 从旧到新
    pub fn iter_ms(&self) -> impl Iterator<Item = u64> + '_ {
        self.samples_ms.iter().copied()
    }

    /// 空历史的平均值为 0
    pub fn average_ms(&self) -> f64 {
        if self.samples_ms.is_empty() {
            return 0.0;
        }
        let sum: u128 = self.samples_ms.iter().map(|&v| v as u128).sum();
        sum as f64 / self.samples_ms.len() as f64
    }

    /// 相邻样本差值的平均绝对值；样本少于 2 个时为 0
    pub fn mean_abs_delta_ms(&self) -> f64 {
        if self.samples_ms.len() < 2 {
            return 0.0;
        }
        let (sum, n) = self
            .samples_ms
            .iter()
            .zip(self.samples_ms.iter().skip(1))
            .fold((0u128, 0u64), |(sum, n), (&a, &b)| {
                (sum + a.abs_diff(b) as u128, n + 1)
            });
        sum as f64 / n as f64
    }
}
