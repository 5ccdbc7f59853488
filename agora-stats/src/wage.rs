//! Labor contract tracker: tracks active contracts and reports the per-step
//! wage outlay across them, deduplicating by contract hash — duplicate
//! contract deliveries are detected by contract hash.

use crate::tracker::Tracker;
use agora_agent::labor::{ContractHash, LaborContract};
use agora_agent::payloads::LaborApplicationAck;
use agora_core::packet::{Packet, PacketKind};
use rust_decimal::Decimal;
use std::collections::HashMap;

const SNOOP_KINDS: [PacketKind; 1] = [PacketKind::LaborApplicationAck];

pub struct WageTracker {
    name: String,
    start_step: u64,
    active: HashMap<ContractHash, LaborContract>,
}

impl WageTracker {
    pub fn new(name: impl Into<String>, start_step: u64) -> Self {
        Self {
            name: name.into(),
            start_step,
            active: HashMap::new(),
        }
    }

    pub fn active_contract_count(&self) -> usize {
        self.active.len()
    }
}

impl Tracker for WageTracker {
    fn name(&self) -> &str {
        &self.name
    }

    fn snoop_kinds(&self) -> &[PacketKind] {
        &SNOOP_KINDS
    }

    fn header(&self) -> &[&str] {
        &["ActiveContracts", "WageOutlay(cents)"]
    }

    fn start_step(&self) -> u64 {
        self.start_step
    }

    fn observe(&mut self, packet: &Packet, current_step: u64) {
        if current_step < self.start_step || packet.kind != PacketKind::LaborApplicationAck {
            return;
        }
        let Ok(ack) = serde_json::from_value::<LaborApplicationAck>(packet.payload.clone()) else {
            return;
        };
        if !ack.accepted {
            return;
        }
        if let Some(contract) = ack.contract {
            // Duplicate snoop delivery of the same contract is a no-op
            // (`HashMap::insert` just overwrites the identical value).
            self.active.entry(contract.hash()).or_insert(contract);
        }
    }

    fn roll_step(&mut self, step: u64) -> Option<Vec<String>> {
        if step < self.start_step {
            return None;
        }
        self.active.retain(|_, contract| contract.end_step >= step);

        let mut wage_outlay = Decimal::ZERO;
        let mut active_count = 0u64;
        for contract in self.active.values() {
            if contract.start_step <= step && step <= contract.end_step {
                active_count += 1;
                wage_outlay += Decimal::from(contract.wage_per_tick.value())
                    * Decimal::from(contract.ticks_per_step);
            }
        }

        Some(vec![active_count.to_string(), wage_outlay.to_string()])
    }

    fn on_load_checkpoint(&mut self) {
        // A resume rewinds the simulation to an earlier step, so any
        // contract this tracker learned about between the checkpoint's
        // save-point and the crash is no longer valid and must be dropped.
        // There is no re-announcement for contracts that were *already*
        // active as of the save-point, though: nothing resends
        // LABOR_APPLICATION_ACK for an existing contract, so clearing here
        // does lose them from this tracker's view until they naturally
        // expire. Active-contract and wage-outlay rows are therefore only
        // trustworthy for contracts accepted after the most recent resume.
        self.active.clear();
    }
}
