//! 延迟/丢包聚合
//!
//! - 到达时按类别记录延迟（dispatch 时刻 - 入队时刻）
//! - 计算快照时：先做优先级过期检查，再求平均、读取并清零丢包计数
//! - 没有优先级样本时，优先级指标镜像普通指标（baseline sync）

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::history::LatencyHistory;
use crate::admission::AdmissionController;
use crate::config::{JitterMode, QosConfig};
use crate::traffic::{Clock, Packet, PriorityClass, Timestamp};

/// jitter 的上限（含）
pub const JITTER_MAX: u64 = 4;

/// 指标快照，字段名与仪表盘约定一致
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub timestamp: Timestamp,
    pub priority_latency: u64,
    pub general_latency: u64,
    pub priority_packet_loss: f64,
    pub general_packet_loss: f64,
    pub jitter: u64,
}

/// 最近一次优先级到达的时间。超过窗口 `W` 没有新到达即视为过期。
#[derive(Debug, Clone, Copy)]
pub struct StalePriorityGuard {
    last_arrival: Option<Timestamp>,
    window: Duration,
}

impl StalePriorityGuard {
    pub fn new(window: Duration) -> Self {
        Self {
            last_arrival: None,
            window,
        }
    }

    pub fn touch(&mut self, at: Timestamp) {
        self.last_arrival = Some(at);
    }

    pub fn last_arrival(&self) -> Option<Timestamp> {
        self.last_arrival
    }

    /// 从未有过优先级到达也算过期
    pub fn is_stale(&self, now: Timestamp) -> bool {
        match self.last_arrival {
            None => true,
            Some(last) => now.saturating_since(last) > self.window,
        }
    }
}

#[derive(Debug)]
struct PriorityTrack {
    history: LatencyHistory,
    guard: StalePriorityGuard,
}

#[derive(Debug)]
enum JitterSource {
    Synthetic(Mutex<StdRng>),
    Measured,
}

#[derive(Debug)]
pub struct MetricsAggregator {
    clock: Arc<dyn Clock>,
    admission: Arc<AdmissionController>,
    priority: Mutex<PriorityTrack>,
    general: Mutex<LatencyHistory>,
    loss_window_samples: u64,
    jitter: JitterSource,
}

impl MetricsAggregator {
    pub fn new(cfg: &QosConfig, admission: Arc<AdmissionController>, clock: Arc<dyn Clock>) -> Self {
        let jitter = match cfg.jitter {
            JitterMode::Synthetic => {
                let rng = match cfg.jitter_seed {
                    Some(seed) => StdRng::seed_from_u64(seed),
                    None => StdRng::from_entropy(),
                };
                JitterSource::Synthetic(Mutex::new(rng))
            }
            JitterMode::Measured => JitterSource::Measured,
        };
        Self {
            clock,
            admission,
            priority: Mutex::new(PriorityTrack {
                history: LatencyHistory::new(cfg.latency_history_capacity),
                guard: StalePriorityGuard::new(Duration::from_millis(cfg.staleness_window_ms)),
            }),
            general: Mutex::new(LatencyHistory::new(cfg.latency_history_capacity)),
            loss_window_samples: cfg.loss_window_samples,
            jitter,
        }
    }

    /// 记录一次到达，返回观测到的延迟。
    pub fn record_arrival(&self, pkt: &Packet) -> Duration {
        let now = self.clock.now();
        let latency = now.saturating_since(pkt.enqueued_at());
        match pkt.class() {
            PriorityClass::High => {
                let mut track = self.priority.lock();
                track.history.push(latency);
                track.guard.touch(now);
            }
            PriorityClass::Normal => self.general.lock().push(latency),
        }
        latency
    }

    /// (优先级样本数, 普通样本数)
    pub fn history_lens(&self) -> (usize, usize) {
        let p = self.priority.lock().history.len();
        let g = self.general.lock().len();
        (p, g)
    }

    #[tracing::instrument(skip(self))]
    pub fn compute_snapshot(&self) -> Metrics {
        let now = self.clock.now();

        let (priority_avg, priority_empty) = {
            let mut track = self.priority.lock();
            if track.guard.is_stale(now) && !track.history.is_empty() {
                debug!(
                    last_arrival = ?track.guard.last_arrival(),
                    "priority traffic stale, clearing history"
                );
                track.history.clear();
            }
            (track.history.average_ms(), track.history.is_empty())
        };
        let (general_avg, measured_jitter) = {
            let general = self.general.lock();
            (general.average_ms(), general.mean_abs_delta_ms())
        };

        let drops = self.admission.take_drop_counts();
        // 转发失败是否计入由 Dispatcher 决定：关闭时它不会递增转发计数
        let general_loss = self.loss_percent(drops.normal_total());
        let mut priority_loss = self.loss_percent(drops.priority_total());

        let mut priority_latency = priority_avg;
        if priority_empty {
            priority_latency = general_avg;
            priority_loss = general_loss;
        }

        let jitter = match &self.jitter {
            JitterSource::Synthetic(rng) => rng.lock().gen_range(0..=JITTER_MAX),
            JitterSource::Measured => (measured_jitter.round() as u64).min(JITTER_MAX),
        };

        Metrics {
            timestamp: now,
            priority_latency: priority_latency.round() as u64,
            general_latency: general_avg.round() as u64,
            priority_packet_loss: priority_loss,
            general_packet_loss: general_loss,
            jitter,
        }
    }

    /// drops / (drops + window) * 100，保留一位小数
    fn loss_percent(&self, drops: u64) -> f64 {
        if drops == 0 {
            return 0.0;
        }
        let pct = drops as f64 / (drops as f64 + self.loss_window_samples as f64) * 100.0;
        (pct * 10.0).round() / 10.0
    }
}
