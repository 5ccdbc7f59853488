//! Consumption tracker: accumulates accepted trade value for a configured
//! class of buyers, one bucket per step.
//!
//! `TRADE_REQ_ACK` doesn't carry the original request's amount or buyer id
//! (design §4.1: acks are a small `{accepted}` payload, not an echo of the
//! request) — so acceptance is correlated back to the request it answers by
//! `correlation_id`, cached from the matching `TRADE_REQ` snoop copy and
//! consumed (never grown unbounded) the moment the ack arrives.

use crate::tracker::Tracker;
use agora_agent::payloads::{TradeRequest, TradeRequestAck};
use agora_core::ids::CorrelationId;
use agora_core::packet::{Packet, PacketKind};
use std::collections::HashMap;

const SNOOP_KINDS: [PacketKind; 2] = [PacketKind::TradeReq, PacketKind::TradeReqAck];

pub struct ConsumptionTracker {
    name: String,
    start_step: u64,
    /// Buyer-id substrings that count as "a consumer"; empty means every
    /// buyer counts (spec's `ConsumerClasses` setting).
    consumer_classes: Vec<String>,
    pending: HashMap<CorrelationId, TradeRequest>,
    net_consumption_cents: u64,
}

impl ConsumptionTracker {
    pub fn new(name: impl Into<String>, start_step: u64, consumer_classes: Vec<String>) -> Self {
        Self {
            name: name.into(),
            start_step,
            consumer_classes,
            pending: HashMap::new(),
            net_consumption_cents: 0,
        }
    }

    fn is_consumer(&self, buyer_id: &str) -> bool {
        self.consumer_classes.is_empty()
            || self
                .consumer_classes
                .iter()
                .any(|class| buyer_id.contains(class.as_str()))
    }
}

impl Tracker for ConsumptionTracker {
    fn name(&self) -> &str {
        &self.name
    }

    fn snoop_kinds(&self) -> &[PacketKind] {
        &SNOOP_KINDS
    }

    fn header(&self) -> &[&str] {
        &["Consumption(cents)"]
    }

    fn start_step(&self) -> u64 {
        self.start_step
    }

    fn observe(&mut self, packet: &Packet, current_step: u64) {
        if current_step < self.start_step {
            return;
        }
        match packet.kind {
            PacketKind::TradeReq => {
                let Some(correlation_id) = packet.correlation_id else {
                    return;
                };
                if let Ok(request) = serde_json::from_value::<TradeRequest>(packet.payload.clone()) {
                    self.pending.insert(correlation_id, request);
                }
            }
            PacketKind::TradeReqAck => {
                let Some(correlation_id) = packet.correlation_id else {
                    return;
                };
                let Some(request) = self.pending.remove(&correlation_id) else {
                    return;
                };
                let Ok(ack) = serde_json::from_value::<TradeRequestAck>(packet.payload.clone()) else {
                    return;
                };
                if ack.accepted && self.is_consumer(request.buyer_id.as_str()) {
                    self.net_consumption_cents += request.currency_amount.value();
                }
            }
            _ => {}
        }
    }

    fn roll_step(&mut self, step: u64) -> Option<Vec<String>> {
        if step < self.start_step {
            return None;
        }
        let row = vec![self.net_consumption_cents.to_string()];
        self.net_consumption_cents = 0;
        Some(row)
    }

    fn on_load_checkpoint(&mut self) {
        // A resume discards in-flight TRADE_REQ/ACK pairs that straddled the
        // checkpoint boundary; there is no way to recover which requests
        // were answered between the snapshot and the crash.
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_core::cents::Cents;
    use agora_core::ids::EndpointId;

    fn trade_req(correlation_id: CorrelationId, buyer: &str, cents: u64) -> Packet {
        Packet::new(
            EndpointId::new(buyer),
            Some(EndpointId::new("seller-0")),
            PacketKind::TradeReq,
            Some(correlation_id),
            serde_json::to_value(TradeRequest {
                seller_id: EndpointId::new("seller-0"),
                buyer_id: EndpointId::new(buyer),
                currency_amount: Cents::new(cents),
                item_package: Default::default(),
            })
            .unwrap(),
        )
    }

    fn trade_ack(correlation_id: CorrelationId, accepted: bool) -> Packet {
        Packet::new(
            EndpointId::new("seller-0"),
            Some(EndpointId::new("buyer-0")),
            PacketKind::TradeReqAck,
            Some(correlation_id),
            serde_json::to_value(TradeRequestAck { accepted }).unwrap(),
        )
    }

    #[test]
    fn accumulates_only_accepted_consumer_trades() {
        let mut tracker = ConsumptionTracker::new("consumption", 0, vec!["consumer".to_string()]);

        let accepted = CorrelationId::new();
        tracker.observe(&trade_req(accepted, "consumer-0", 500), 0);
        tracker.observe(&trade_ack(accepted, true), 0);

        let rejected = CorrelationId::new();
        tracker.observe(&trade_req(rejected, "consumer-1", 900), 0);
        tracker.observe(&trade_ack(rejected, false), 0);

        let non_consumer = CorrelationId::new();
        tracker.observe(&trade_req(non_consumer, "firm-0", 1200), 0);
        tracker.observe(&trade_ack(non_consumer, true), 0);

        let row = tracker.roll_step(0).unwrap();
        assert_eq!(row, vec!["500".to_string()]);
        assert_eq!(tracker.roll_step(1), Some(vec!["0".to_string()]));
    }

    #[test]
    fn warm_up_steps_before_start_step_are_skipped() {
        let mut tracker = ConsumptionTracker::new("consumption", 5, vec![]);
        assert_eq!(tracker.roll_step(0), None);
        assert_eq!(tracker.roll_step(4), None);
        assert_eq!(tracker.roll_step(5), Some(vec!["0".to_string()]));
    }
}
