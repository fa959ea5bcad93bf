//! 严格优先级调度器
//!
//! 每个 tick 最多取出一个数据包转发。调度周期刻意慢于到达间隔，
//! 使过载在队列中积压。转发有超时上限，失败的包直接丢弃，不重试、不回队。

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use super::sink::{ForwardOutcome, PacketSink};
use crate::admission::AdmissionController;
use crate::traffic::PriorityClass;

/// 一个 tick 的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Idle,
    Dispatched {
        pkt_id: String,
        class: PriorityClass,
        outcome: ForwardOutcome,
    },
}

#[derive(Debug)]
pub struct Dispatcher {
    admission: Arc<AdmissionController>,
    sink: Arc<dyn PacketSink>,
    forward_timeout: Duration,
    count_forward_failures: bool,
}

impl Dispatcher {
    pub fn new(
        admission: Arc<AdmissionController>,
        sink: Arc<dyn PacketSink>,
        forward_timeout: Duration,
        count_forward_failures: bool,
    ) -> Self {
        Self {
            admission,
            sink,
            forward_timeout,
            count_forward_failures,
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn tick(&self) -> TickOutcome {
        let Some(pkt) = self.admission.pop_next() else {
            trace!("both queues empty");
            return TickOutcome::Idle;
        };
        let pkt_id = pkt.id().to_owned();
        let class = pkt.class();

        let outcome = match tokio::time::timeout(self.forward_timeout, self.sink.receive(pkt)).await {
            Ok(Ok(())) => ForwardOutcome::Forwarded,
            Ok(Err(err)) => ForwardOutcome::Failed(err),
            Err(_) => ForwardOutcome::TimedOut,
        };

        if !outcome.is_forwarded() {
            debug!(pkt_id = %pkt_id, %class, ?outcome, "forward failed, packet discarded");
            if self.count_forward_failures {
                self.admission.record_forward_loss(class);
            }
        }

        TickOutcome::Dispatched {
            pkt_id,
            class,
            outcome,
        }
    }

    /// 按周期调度，直到 `cancel` 被触发。
    pub async fn run(&self, period: Duration, cancel: CancellationToken) {
        info!(period_ms = period.as_millis() as u64, "▶️  调度器启动");
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ticks: u64 = 0;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    ticks += 1;
                    self.tick().await;
                }
            }
        }
        info!(ticks, "⏹️  调度器停止");
    }
}
