//! 运行时装配与生命周期
//!
//! `QosRuntime` 显式持有所有阶段（没有进程级单例），多个实例可以并行存在。
//! 三个周期任务：策略刷新、调度 tick、流量生成（可选）。
//! `stop()` 取消全部任务并等待其退出；重复调用无副作用。

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::admission::{AdmissionController, DropCounts, QueueDepths};
use crate::config::QosConfig;
use crate::dispatch::{Dispatcher, PacketSink, TickOutcome};
use crate::error::{ConfigError, IngressError};
use crate::metrics::{LocalReceiver, Metrics, MetricsAggregator};
use crate::policy::{PolicyCache, PolicyStore, RefreshOutcome};
use crate::traffic::{Clock, IngressRequest, IngressStatus, Packet, TrafficGenerator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    Running,
    Stopped,
}

#[derive(Debug)]
enum Lifecycle {
    Idle,
    Running {
        cancel: CancellationToken,
        tasks: Vec<JoinHandle<()>>,
    },
    Stopped,
}

#[derive(Debug)]
pub struct QosRuntime {
    cfg: QosConfig,
    policies: Arc<PolicyCache>,
    admission: Arc<AdmissionController>,
    aggregator: Arc<MetricsAggregator>,
    dispatcher: Arc<Dispatcher>,
    generator: Option<Arc<TrafficGenerator>>,
    lifecycle: Mutex<Lifecycle>,
}

impl QosRuntime {
    /// 使用进程内接收方
    pub fn new(
        cfg: QosConfig,
        store: Arc<dyn PolicyStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        Self::build(cfg, store, clock, None)
    }

    /// 使用自定义接收方（例如远端 receiver）
    pub fn with_sink(
        cfg: QosConfig,
        store: Arc<dyn PolicyStore>,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn PacketSink>,
    ) -> Result<Self, ConfigError> {
        Self::build(cfg, store, clock, Some(sink))
    }

    fn build(
        cfg: QosConfig,
        store: Arc<dyn PolicyStore>,
        clock: Arc<dyn Clock>,
        sink: Option<Arc<dyn PacketSink>>,
    ) -> Result<Self, ConfigError> {
        cfg.validate()?;
        let policies = Arc::new(PolicyCache::new(store));
        let admission = Arc::new(AdmissionController::new(
            Arc::clone(&policies),
            cfg.normal_queue_capacity,
        ));
        let aggregator = Arc::new(MetricsAggregator::new(
            &cfg,
            Arc::clone(&admission),
            Arc::clone(&clock),
        ));
        let sink = sink.unwrap_or_else(|| Arc::new(LocalReceiver::new(Arc::clone(&aggregator))));
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&admission),
            sink,
            cfg.forward_timeout(),
            cfg.count_forward_failures_as_loss,
        ));
        Ok(Self {
            cfg,
            policies,
            admission,
            aggregator,
            dispatcher,
            generator: None,
            lifecycle: Mutex::new(Lifecycle::Idle),
        })
    }

    /// 启用内置流量生成器
    pub fn with_generator(mut self, clock: Arc<dyn Clock>, seed: Option<u64>) -> Self {
        self.generator = Some(Arc::new(TrafficGenerator::new(
            Arc::clone(&self.admission),
            clock,
            seed,
        )));
        self
    }

    pub fn policies(&self) -> &Arc<PolicyCache> {
        &self.policies
    }

    pub fn aggregator(&self) -> &Arc<MetricsAggregator> {
        &self.aggregator
    }

    pub fn generator(&self) -> Option<&Arc<TrafficGenerator>> {
        self.generator.as_ref()
    }

    pub fn state(&self) -> LifecycleState {
        match &*self.lifecycle.lock() {
            Lifecycle::Idle => LifecycleState::Idle,
            Lifecycle::Running { .. } => LifecycleState::Running,
            Lifecycle::Stopped => LifecycleState::Stopped,
        }
    }

    /// 启动周期任务。必须在 tokio 运行时内调用；重复调用或停止后调用均为空操作。
    pub fn start(&self) {
        let mut lifecycle = self.lifecycle.lock();
        match &*lifecycle {
            Lifecycle::Running { .. } => return,
            Lifecycle::Stopped => {
                warn!("runtime already stopped; start ignored");
                return;
            }
            Lifecycle::Idle => {}
        }

        let cancel = CancellationToken::new();
        let mut tasks = Vec::with_capacity(3);

        let policies = Arc::clone(&self.policies);
        let period = self.cfg.policy_refresh_period();
        let token = cancel.clone();
        tasks.push(tokio::spawn(async move { policies.run(period, token).await }));

        let dispatcher = Arc::clone(&self.dispatcher);
        let period = self.cfg.dispatch_period();
        let token = cancel.clone();
        tasks.push(tokio::spawn(async move { dispatcher.run(period, token).await }));

        if let Some(generator) = &self.generator {
            let generator = Arc::clone(generator);
            let period = self.cfg.generator_period();
            let token = cancel.clone();
            tasks.push(tokio::spawn(async move { generator.run(period, token).await }));
        }

        info!(tasks = tasks.len(), "QoS runtime started");
        *lifecycle = Lifecycle::Running { cancel, tasks };
    }

    /// 取消所有周期任务并等待退出。幂等。
    pub async fn stop(&self) {
        let previous = {
            let mut lifecycle = self.lifecycle.lock();
            if matches!(*lifecycle, Lifecycle::Stopped) {
                return;
            }
            std::mem::replace(&mut *lifecycle, Lifecycle::Stopped)
        };
        if let Lifecycle::Running { cancel, tasks } = previous {
            cancel.cancel();
            for task in tasks {
                if let Err(err) = task.await {
                    warn!(%err, "periodic task ended abnormally");
                }
            }
            info!("QoS runtime stopped");
        }
    }

    /// POST ingress
    pub fn ingress(&self, req: IngressRequest) -> Result<IngressStatus, IngressError> {
        self.admission.ingress(req)
    }

    /// POST receive
    pub fn receive(&self, pkt: &Packet) {
        self.aggregator.record_arrival(pkt);
    }

    /// GET metrics
    pub fn metrics(&self) -> Metrics {
        self.aggregator.compute_snapshot()
    }

    pub fn queue_depths(&self) -> QueueDepths {
        self.admission.queue_depths()
    }

    pub fn pending_drops(&self) -> DropCounts {
        self.admission.peek_drop_counts()
    }

    /// 手动刷新一次策略
    pub async fn refresh_policies(&self) -> RefreshOutcome {
        self.policies.refresh().await
    }

    /// 手动执行一次调度 tick
    pub async fn dispatch_once(&self) -> TickOutcome {
        self.dispatcher.tick().await
    }
}
