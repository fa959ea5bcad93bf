use std::sync::Arc;
use std::time::Duration;

use crate::config::QosConfig;
use crate::dispatch::TickOutcome;
use crate::policy::{InMemoryPolicyStore, QosPolicy, RefreshOutcome};
use crate::runtime::{LifecycleState, QosRuntime};
use crate::traffic::{Clock, IngressRequest, IngressStatus, ManualClock, SystemClock, Timestamp};

const ZOOM: &str = "Zoom (Video Conf)";
const BROWSING: &str = "General Browsing";

fn runtime(store: Arc<InMemoryPolicyStore>) -> QosRuntime {
    QosRuntime::new(QosConfig::default(), store, Arc::new(SystemClock)).expect("runtime")
}

#[tokio::test]
async fn invalid_config_is_rejected_at_construction() {
    let cfg = QosConfig {
        normal_queue_capacity: 0,
        ..QosConfig::default()
    };
    let store = Arc::new(InMemoryPolicyStore::new());
    assert!(QosRuntime::new(cfg, store, Arc::new(SystemClock)).is_err());
}

#[tokio::test(start_paused = true)]
async fn start_then_stop_twice_is_idempotent() {
    let rt = runtime(Arc::new(InMemoryPolicyStore::new()));
    assert_eq!(rt.state(), LifecycleState::Idle);
    rt.start();
    rt.start();
    assert_eq!(rt.state(), LifecycleState::Running);

    rt.stop().await;
    assert_eq!(rt.state(), LifecycleState::Stopped);
    rt.stop().await;
    assert_eq!(rt.state(), LifecycleState::Stopped);

    // 停止后不再出队
    rt.ingress(IngressRequest::new("n1", BROWSING, Timestamp(0))).expect("ingress");
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(rt.queue_depths().normal, 1);

    rt.start();
    assert_eq!(rt.state(), LifecycleState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn started_runtime_refreshes_policies_and_drains_queues() {
    let store = Arc::new(InMemoryPolicyStore::with_policies([QosPolicy::high(ZOOM)]));
    let rt = runtime(store);
    rt.start();
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert!(rt.policies().is_priority(ZOOM));

    assert_eq!(
        rt.ingress(IngressRequest::new("p1", ZOOM, Timestamp(0))),
        Ok(IngressStatus::QueuedHigh)
    );
    for i in 0..3 {
        rt.ingress(IngressRequest::new(format!("n{i}"), BROWSING, Timestamp(0)))
            .expect("ingress");
    }
    // 4 个包，调度周期 60ms
    tokio::time::sleep(Duration::from_millis(300)).await;
    let depths = rt.queue_depths();
    assert_eq!((depths.priority, depths.normal), (0, 0));
    assert_eq!(rt.aggregator().history_lens(), (1, 3));

    rt.stop().await;
}

#[tokio::test(start_paused = true)]
async fn policy_change_is_picked_up_on_next_refresh_period() {
    let store = Arc::new(InMemoryPolicyStore::new());
    let rt = runtime(store.clone());
    rt.start();
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert!(!rt.policies().is_priority(BROWSING));

    store.upsert(QosPolicy::high(BROWSING));
    tokio::time::sleep(Duration::from_millis(4_000)).await;
    assert!(!rt.policies().is_priority(BROWSING));
    tokio::time::sleep(Duration::from_millis(1_100)).await;
    assert!(rt.policies().is_priority(BROWSING));

    rt.stop().await;
}

#[tokio::test]
async fn manual_operations_cover_scenario_without_timers() {
    let clock = Arc::new(ManualClock::new(Timestamp(10_000)));
    let store = Arc::new(InMemoryPolicyStore::with_policies([QosPolicy::high(ZOOM)]));
    let rt = QosRuntime::new(QosConfig::default(), store, clock.clone()).expect("runtime");
    assert_eq!(rt.refresh_policies().await, RefreshOutcome::Updated { count: 1 });

    rt.ingress(IngressRequest::new("n1", BROWSING, clock.now())).expect("ingress");
    rt.ingress(IngressRequest::new("p1", ZOOM, clock.now())).expect("ingress");
    clock.advance(Duration::from_millis(60));

    match rt.dispatch_once().await {
        TickOutcome::Dispatched { pkt_id, .. } => assert_eq!(pkt_id, "p1"),
        other => panic!("unexpected {other:?}"),
    }
    clock.advance(Duration::from_millis(60));
    rt.dispatch_once().await;

    let m = rt.metrics();
    assert_eq!(m.priority_latency, 60);
    assert_eq!(m.general_latency, 120);
}

#[tokio::test(start_paused = true)]
async fn generator_builds_backlog_and_congestion() {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = Arc::new(InMemoryPolicyStore::new());
    let rt = QosRuntime::new(QosConfig::default(), store, Arc::clone(&clock))
        .expect("runtime")
        .with_generator(clock, Some(42));
    rt.start();
    // 到达 50ms 一个，服务 60ms 一个：积压会增长到容量上限
    tokio::time::sleep(Duration::from_secs(10)).await;
    rt.stop().await;

    let emitted = rt.generator().expect("generator").packets_emitted();
    assert!(emitted >= 190, "emitted {emitted}");
    let depths = rt.queue_depths();
    assert!(depths.normal <= depths.normal_capacity);
    assert!(rt.pending_drops().normal_admission > 0);
    assert_eq!(rt.pending_drops().priority_admission, 0);
}

#[tokio::test]
async fn receive_endpoint_records_external_packets() {
    let clock = Arc::new(ManualClock::new(Timestamp(5_000)));
    let rt = QosRuntime::new(
        QosConfig::default(),
        Arc::new(InMemoryPolicyStore::new()),
        clock.clone(),
    )
    .expect("runtime");
    let pkt: crate::traffic::Packet = serde_json::from_value(serde_json::json!({
        "id": "remote_1",
        "appType": "Zoom (Video Conf)",
        "timestamp": 4_970,
        "isPriority": true
    }))
    .expect("packet");
    rt.receive(&pkt);
    assert_eq!(rt.aggregator().history_lens(), (1, 0));
    assert_eq!(rt.metrics().priority_latency, 30);
}

#[tokio::test]
async fn huge_capacities_do_not_preallocate() {
    let cfg = QosConfig {
        normal_queue_capacity: usize::MAX,
        latency_history_capacity: usize::MAX / 2,
        ..QosConfig::default()
    };
    let clock = Arc::new(ManualClock::new(Timestamp(1_000)));
    let rt = QosRuntime::new(cfg, Arc::new(InMemoryPolicyStore::new()), clock.clone()).expect("runtime");
    for i in 0..100 {
        assert_eq!(
            rt.ingress(IngressRequest::new(format!("n{i}"), BROWSING, clock.now())),
            Ok(IngressStatus::QueuedNormal)
        );
    }
    assert_eq!(rt.queue_depths().normal, 100);
    clock.advance(Duration::from_millis(5));
    rt.dispatch_once().await;
    assert_eq!(rt.metrics().general_latency, 5);
}

#[derive(Debug)]
struct RefusingSink;

#[async_trait::async_trait]
impl crate::dispatch::PacketSink for RefusingSink {
    async fn receive(&self, _pkt: crate::traffic::Packet) -> Result<(), crate::error::ForwardError> {
        Err(crate::error::ForwardError::Unreachable("refused".into()))
    }
}

#[tokio::test]
async fn forward_loss_switch_is_honoured_end_to_end() {
    for (count, expected) in [(true, 4.8), (false, 0.0)] {
        let cfg = QosConfig {
            count_forward_failures_as_loss: count,
            ..QosConfig::default()
        };
        let clock = Arc::new(ManualClock::new(Timestamp(1_000)));
        let rt = QosRuntime::with_sink(
            cfg,
            Arc::new(InMemoryPolicyStore::new()),
            clock.clone(),
            Arc::new(RefusingSink),
        )
        .expect("runtime");
        rt.ingress(IngressRequest::new("n1", BROWSING, clock.now())).expect("ingress");
        rt.dispatch_once().await;
        // 1 / (1 + 20)
        assert_eq!(rt.metrics().general_packet_loss, expected, "count={count}");
    }
}
