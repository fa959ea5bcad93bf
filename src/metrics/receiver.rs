//! 进程内接收方：把到达的数据包交给指标聚合器

use std::sync::Arc;

use async_trait::async_trait;
use tracing::trace;

use super::aggregator::MetricsAggregator;
use crate::dispatch::PacketSink;
use crate::error::ForwardError;
use crate::traffic::Packet;

#[derive(Debug, Clone)]
pub struct LocalReceiver {
    aggregator: Arc<MetricsAggregator>,
}

impl LocalReceiver {
    pub fn new(aggregator: Arc<MetricsAggregator>) -> Self {
        Self { aggregator }
    }
}

#[async_trait]
impl PacketSink for LocalReceiver {
    async fn receive(&self, pkt: Packet) -> Result<(), ForwardError> {
        let latency = self.aggregator.record_arrival(&pkt);
        trace!(pkt_id = pkt.id(), latency_ms = latency.as_millis() as u64, "packet received");
        Ok(())
    }
}
