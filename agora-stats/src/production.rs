//! Production tracker: accumulates reported output quantity per step.
//!
//! `PRODUCTION_NOTIFICATION`'s payload isn't otherwise specified by this
//! substrate (no producer is implemented yet — production itself is out
//! of scope beyond the wire packet kind); this tracker assumes
//! the generalized shape `{item: ItemId, quantity: Decimal}` any future
//! producer would emit.

use crate::tracker::Tracker;
use agora_core::ids::ItemId;
use agora_core::packet::{Packet, PacketKind};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;

const SNOOP_KINDS: [PacketKind; 1] = [PacketKind::ProductionNotification];

#[derive(Debug, Deserialize)]
struct ProductionNotification {
    item: ItemId,
    quantity: Decimal,
}

pub struct ProductionTracker {
    name: String,
    start_step: u64,
    item_filter: Option<ItemId>,
    net_quantity: Decimal,
}

impl ProductionTracker {
    pub fn new(name: impl Into<String>, start_step: u64, item_filter: Option<ItemId>) -> Self {
        Self {
            name: name.into(),
            start_step,
            item_filter,
            net_quantity: Decimal::ZERO,
        }
    }
}

impl Tracker for ProductionTracker {
    fn name(&self) -> &str {
        &self.name
    }

    fn snoop_kinds(&self) -> &[PacketKind] {
        &SNOOP_KINDS
    }

    fn header(&self) -> &[&str] {
        &["Production(units)"]
    }

    fn start_step(&self) -> u64 {
        self.start_step
    }

    fn observe(&mut self, packet: &Packet, current_step: u64) {
        if current_step < self.start_step {
            return;
        }
        let Ok(notification) = serde_json::from_value::<ProductionNotification>(packet.payload.clone())
        else {
            return;
        };
        let matches_filter = match &self.item_filter {
            Some(item) => *item == notification.item,
            None => true,
        };
        if matches_filter {
            self.net_quantity += notification.quantity;
        }
    }

    fn roll_step(&mut self, step: u64) -> Option<Vec<String>> {
        if step < self.start_step {
            return None;
        }
        let row = vec![self.net_quantity.to_string()];
        self.net_quantity = Decimal::ZERO;
        Some(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_core::ids::EndpointId;

    fn notification(item: &str, quantity: i64) -> Packet {
        Packet::new(
            EndpointId::new("producer-0"),
            None,
            PacketKind::ProductionNotification,
            None,
            serde_json::json!({ "item": item, "quantity": quantity.to_string() }),
        )
    }

    #[test]
    fn accumulates_quantity_filtered_by_item() {
        let mut tracker = ProductionTracker::new("wheat-production", 0, Some(ItemId::new("wheat")));
        tracker.observe(&notification("wheat", 10), 0);
        tracker.observe(&notification("wool", 5), 0);
        assert_eq!(tracker.roll_step(0), Some(vec!["10".to_string()]));
    }
}
