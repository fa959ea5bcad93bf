use std::sync::Arc;
use std::time::Duration;

use crate::admission::AdmissionController;
use crate::config::{JitterMode, QosConfig};
use crate::metrics::{JITTER_MAX, LatencyHistory, MetricsAggregator, StalePriorityGuard};
use crate::policy::{InMemoryPolicyStore, PolicyCache};
use crate::traffic::{ManualClock, Packet, PriorityClass, RawPacket, Timestamp};

const T0: Timestamp = Timestamp(1_000_000);

struct Fixture {
    clock: Arc<ManualClock>,
    admission: Arc<AdmissionController>,
    agg: MetricsAggregator,
}

fn fixture(cfg: QosConfig) -> Fixture {
    let clock = Arc::new(ManualClock::new(T0));
    let cache = Arc::new(PolicyCache::new(Arc::new(InMemoryPolicyStore::new())));
    let admission = Arc::new(AdmissionController::new(cache, cfg.normal_queue_capacity));
    let agg = MetricsAggregator::new(&cfg, Arc::clone(&admission), clock.clone());
    Fixture {
        clock,
        admission,
        agg,
    }
}

fn sent_at(id: &str, class: PriorityClass, at: Timestamp) -> Packet {
    Packet::classified(id.into(), "YouTube".into(), at, class)
}

fn at_ms(ms: u64) -> Timestamp {
    Timestamp(T0.0 - ms)
}

#[test]
fn latency_history_evicts_oldest_at_capacity() {
    let mut h = LatencyHistory::new(3);
    for ms in [10, 20, 30, 40, 50] {
        h.push(Duration::from_millis(ms));
        assert!(h.len() <= 3);
    }
    assert_eq!(h.iter_ms().collect::<Vec<_>>(), [30, 40, 50]);
    assert_eq!(h.average_ms(), 40.0);

    h.clear();
    assert!(h.is_empty());
    assert_eq!(h.average_ms(), 0.0);
}

#[test]
fn latency_history_mean_abs_delta() {
    let mut h = LatencyHistory::new(10);
    assert_eq!(h.mean_abs_delta_ms(), 0.0);
    for ms in [10, 14, 12, 12] {
        h.push(Duration::from_millis(ms));
    }
    // |14-10| + |12-14| + |12-12| = 6, over 3 deltas
    assert_eq!(h.mean_abs_delta_ms(), 2.0);
}

#[test]
fn stale_guard_without_arrivals_is_stale() {
    let mut g = StalePriorityGuard::new(Duration::from_secs(3));
    assert!(g.is_stale(T0));
    g.touch(T0);
    assert!(!g.is_stale(Timestamp(T0.0 + 3_000)));
    assert!(g.is_stale(Timestamp(T0.0 + 3_001)));
}

#[test]
fn record_arrival_computes_latency_per_class() {
    let f = fixture(QosConfig::default());
    let lat = f.agg.record_arrival(&sent_at("p", PriorityClass::High, at_ms(40)));
    assert_eq!(lat, Duration::from_millis(40));
    f.agg.record_arrival(&sent_at("n1", PriorityClass::Normal, at_ms(100)));
    f.agg.record_arrival(&sent_at("n2", PriorityClass::Normal, at_ms(200)));
    assert_eq!(f.agg.history_lens(), (1, 2));

    let m = f.agg.compute_snapshot();
    assert_eq!(m.timestamp, T0);
    assert_eq!(m.priority_latency, 40);
    assert_eq!(m.general_latency, 150);
    assert_eq!(m.priority_packet_loss, 0.0);
    assert_eq!(m.general_packet_loss, 0.0);
}

#[test]
fn history_never_exceeds_configured_capacity() {
    let f = fixture(QosConfig {
        latency_history_capacity: 5,
        ..QosConfig::default()
    });
    for i in 0..20 {
        f.agg.record_arrival(&sent_at(&format!("n{i}"), PriorityClass::Normal, at_ms(i)));
    }
    assert_eq!(f.agg.history_lens(), (0, 5));
    // 保留最后 5 个：15..=19
    assert_eq!(f.agg.compute_snapshot().general_latency, 17);
}

#[test]
fn baseline_sync_mirrors_general_when_no_priority_traffic() {
    let f = fixture(QosConfig {
        normal_queue_capacity: 1,
        ..QosConfig::default()
    });
    f.agg.record_arrival(&sent_at("n", PriorityClass::Normal, at_ms(90)));
    for i in 0..6 {
        f.admission.admit(RawPacket {
            id: format!("n{i}"),
            app_type: "YouTube".into(),
            enqueued_at: T0,
        });
    }
    // 5 drops: 5 / (5 + 20) = 20%
    let m = f.agg.compute_snapshot();
    assert_eq!(m.general_latency, 90);
    assert_eq!(m.priority_latency, 90);
    assert_eq!(m.general_packet_loss, 20.0);
    assert_eq!(m.priority_packet_loss, 20.0);
}

#[test]
fn stale_priority_history_is_cleared_before_snapshot() {
    let f = fixture(QosConfig::default());
    f.agg.record_arrival(&sent_at("p", PriorityClass::High, at_ms(10)));
    f.agg.record_arrival(&sent_at("n", PriorityClass::Normal, at_ms(300)));
    assert_eq!(f.agg.compute_snapshot().priority_latency, 10);

    f.clock.advance(Duration::from_millis(3_001));
    let m = f.agg.compute_snapshot();
    assert_eq!(f.agg.history_lens().0, 0);
    assert_eq!(m.priority_latency, m.general_latency);
    assert_eq!(m.general_latency, 300);
}

#[test]
fn recent_priority_history_survives_within_window() {
    let f = fixture(QosConfig::default());
    f.agg.record_arrival(&sent_at("p", PriorityClass::High, at_ms(10)));
    f.clock.advance(Duration::from_millis(3_000));
    assert_eq!(f.agg.compute_snapshot().priority_latency, 10);
}

#[test]
fn loss_reads_and_resets_counters_with_one_decimal() {
    let f = fixture(QosConfig {
        normal_queue_capacity: 1,
        ..QosConfig::default()
    });
    f.agg.record_arrival(&sent_at("p", PriorityClass::High, at_ms(5)));
    for i in 0..4 {
        f.admission.admit(RawPacket {
            id: format!("n{i}"),
            app_type: "YouTube".into(),
            enqueued_at: T0,
        });
    }
    // 3 drops: 3 / 23 = 13.04%
    let m = f.agg.compute_snapshot();
    assert_eq!(m.general_packet_loss, 13.0);
    assert_eq!(m.priority_packet_loss, 0.0);
    assert_eq!(f.agg.compute_snapshot().general_packet_loss, 0.0);
}

#[test]
fn forward_losses_feed_loss_percentages() {
    let f = fixture(QosConfig::default());
    f.agg.record_arrival(&sent_at("p", PriorityClass::High, at_ms(5)));
    f.admission.record_forward_loss(PriorityClass::High);
    f.admission.record_forward_loss(PriorityClass::Normal);
    let m = f.agg.compute_snapshot();
    // 1 / 21 = 4.76%
    assert_eq!(m.priority_packet_loss, 4.8);
    assert_eq!(m.general_packet_loss, 4.8);
}

#[test]
fn synthetic_jitter_stays_in_range() {
    let f = fixture(QosConfig {
        jitter_seed: Some(7),
        ..QosConfig::default()
    });
    for _ in 0..200 {
        assert!(f.agg.compute_snapshot().jitter <= JITTER_MAX);
    }
}

#[test]
fn measured_jitter_uses_latency_deltas_and_is_bounded() {
    let f = fixture(QosConfig {
        jitter: JitterMode::Measured,
        ..QosConfig::default()
    });
    for (i, ms) in [10, 12, 14, 16].into_iter().enumerate() {
        f.agg.record_arrival(&sent_at(&format!("n{i}"), PriorityClass::Normal, at_ms(ms)));
    }
    assert_eq!(f.agg.compute_snapshot().jitter, 2);

    f.agg.record_arrival(&sent_at("spike", PriorityClass::Normal, at_ms(500)));
    assert_eq!(f.agg.compute_snapshot().jitter, JITTER_MAX);
}

#[test]
fn metrics_serialize_with_dashboard_field_names() {
    let f = fixture(QosConfig::default());
    let v = serde_json::to_value(f.agg.compute_snapshot()).expect("ser");
    for key in [
        "timestamp",
        "priorityLatency",
        "generalLatency",
        "priorityPacketLoss",
        "generalPacketLoss",
        "jitter",
    ] {
        assert!(v.get(key).is_some(), "missing {key}");
    }
}
