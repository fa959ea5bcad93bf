//! 合成流量生成器
//!
//! 每个周期随机挑一个应用类型生成一个数据包，经 ingress 提交。
//! 拥塞丢弃（503）是预期行为，不记为错误。

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::time::Clock;
use super::wire::{IngressRequest, IngressStatus};
use crate::admission::AdmissionController;
use crate::error::IngressError;

/// 校园网常见应用
pub const APP_TYPES: [&str; 6] = [
    "Zoom (Video Conf)",
    "Netflix (Streaming)",
    "Microsoft Teams",
    "General Browsing",
    "YouTube",
    "Moodle (Assessment)",
];

#[derive(Debug)]
pub struct TrafficGenerator {
    admission: Arc<AdmissionController>,
    clock: Arc<dyn Clock>,
    rng: Mutex<StdRng>,
    packet_count: AtomicU64,
}

impl TrafficGenerator {
    pub fn new(admission: Arc<AdmissionController>, clock: Arc<dyn Clock>, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Self {
            admission,
            clock,
            rng: Mutex::new(rng),
            packet_count: AtomicU64::new(0),
        }
    }

    pub fn packets_emitted(&self) -> u64 {
        self.packet_count.load(Ordering::Relaxed)
    }

    /// 生成一个数据包并提交到 ingress。
    pub fn emit_one(&self) -> Result<IngressStatus, IngressError> {
        let n = self.packet_count.fetch_add(1, Ordering::Relaxed) + 1;
        let app_type = {
            let mut rng = self.rng.lock();
            APP_TYPES[rng.gen_range(0..APP_TYPES.len())]
        };
        let now = self.clock.now();
        let req = IngressRequest::new(format!("pkt_{}_{n}", now.as_millis()), app_type, now);
        self.admission.ingress(req)
    }

    /// 按固定周期生成流量，直到 `cancel` 被触发。
    pub async fn run(&self, period: Duration, cancel: CancellationToken) {
        info!(period_ms = period.as_millis() as u64, "▶️  流量生成器启动");
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => match self.emit_one() {
                    Ok(IngressStatus::DroppedCongestion) => {
                        debug!("generated packet dropped by congestion control");
                    }
                    Ok(_) => {}
                    Err(err) => warn!(%err, "generated packet rejected at ingress"),
                },
            }
        }
        info!(emitted = self.packets_emitted(), "⏹️  流量生成器停止");
    }
}
