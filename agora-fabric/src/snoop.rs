//! The passive snoop table: `(PacketKind) -> {subscribed EndpointId}`.
//!
//! Subscriptions are additive and process-lifetime; nothing in the design
//! ever un-subscribes a snooper, so there is no `unsubscribe`. The gatherer
//! (`agora-stats`) is the only intended subscriber, but the table itself has
//! no opinion about who snoops — any endpoint may issue `SNOOP_START`.

use agora_core::ids::EndpointId;
use agora_core::packet::PacketKind;
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct SnoopTable {
    subscriptions: RwLock<HashMap<PacketKind, Vec<EndpointId>>>,
}

impl SnoopTable {
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(HashMap::new()),
        }
    }

    pub fn subscribe(&self, kind: PacketKind, subscriber: EndpointId) {
        let mut subscriptions = self.subscriptions.write();
        let entry = subscriptions.entry(kind).or_default();
        if !entry.contains(&subscriber) {
            entry.push(subscriber);
        }
    }

    /// Current subscribers for `kind`. Empty if nobody has snooped it.
    pub fn subscribers(&self, kind: PacketKind) -> Vec<EndpointId> {
        self.subscriptions
            .read()
            .get(&kind)
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribing_twice_does_not_duplicate_deliveries() {
        let table = SnoopTable::new();
        let gatherer = EndpointId::new("gatherer");
        table.subscribe(PacketKind::TradeReqAck, gatherer.clone());
        table.subscribe(PacketKind::TradeReqAck, gatherer.clone());
        assert_eq!(table.subscribers(PacketKind::TradeReqAck), vec![gatherer]);
    }

    #[test]
    fn unsubscribed_kind_has_no_subscribers() {
        let table = SnoopTable::new();
        assert!(table.subscribers(PacketKind::CurrencyTransfer).is_empty());
    }
}
