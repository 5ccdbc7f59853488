//! A trivially rule-following controller: accepts every trade, job
//! application and land offer that is well-formed (a non-degenerate
//! currency amount and a non-empty transfer). Used for the conservation-law
//! property tests where the behavior under test is the substrate's
//! accounting, not any scientific decision logic.
//!
//! The `Controller` interface's eval callbacks take only the request being
//! evaluated, not the evaluating agent's balance or inventory (design §4.8)
//! — so "accepts every offer it can afford" is read here as "accepts every
//! offer that isn't already malformed"; an agent that genuinely cannot
//! afford a transfer still has the transfer rejected downstream, by the
//! agent runtime's own precondition checks (spec §4.3), not by this
//! controller second-guessing them.
//!
//! Tracks how many of each kind of offer it has accepted, and persists that
//! count via the save/load-checkpoint protocol — demonstrating the hook,
//! not because the count itself is load-bearing.

use agora_agent::controller::Controller;
use agora_agent::labor::LaborContract;
use agora_agent::payloads::{LandTradeRequest, TradeRequest};
use agora_core::checkpoint::Checkpoint;
use agora_core::ids::EndpointId;
use agora_core::packet::{Packet, PacketKind};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

const CHECKPOINT_SCHEMA_VERSION: u16 = 1;
const CHECKPOINT_COMPONENT: &str = "always_accept_controller";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Decisions {
    trades_accepted: u64,
    jobs_accepted: u64,
    land_trades_accepted: u64,
}

#[derive(Debug)]
pub struct AlwaysAcceptController {
    id: EndpointId,
    checkpoint_dir: PathBuf,
    decisions: Mutex<Decisions>,
}

impl AlwaysAcceptController {
    pub fn new(id: EndpointId, checkpoint_dir: impl Into<PathBuf>) -> Self {
        Self {
            id,
            checkpoint_dir: checkpoint_dir.into(),
            decisions: Mutex::new(Decisions::default()),
        }
    }

    fn checkpoint_path(&self) -> PathBuf {
        self.checkpoint_dir.join(format!("controller-{}.json", self.id))
    }

    pub fn decisions_accepted(&self) -> (u64, u64, u64) {
        let d = self.decisions.lock();
        (d.trades_accepted, d.jobs_accepted, d.land_trades_accepted)
    }

    fn save_checkpoint(&self) {
        let snapshot = self.decisions.lock().clone();
        if let Err(err) = Checkpoint::save(
            &self.checkpoint_path(),
            CHECKPOINT_COMPONENT,
            CHECKPOINT_SCHEMA_VERSION,
            &snapshot,
        ) {
            warn!(controller = %self.id, %err, "failed to save controller checkpoint");
        }
    }

    fn load_checkpoint(&self) {
        let path = self.checkpoint_path();
        if !Path::new(&path).exists() {
            return;
        }
        match Checkpoint::load::<Decisions>(&path, CHECKPOINT_COMPONENT, CHECKPOINT_SCHEMA_VERSION) {
            Ok(loaded) => *self.decisions.lock() = loaded,
            Err(err) => warn!(controller = %self.id, %err, "failed to load controller checkpoint"),
        }
    }
}

#[async_trait]
impl Controller for AlwaysAcceptController {
    async fn controller_start(&self, _initial_payload: serde_json::Value) {}

    async fn receive_msg(&self, packet: &Packet) {
        match packet.kind {
            PacketKind::SaveCheckpointBroadcast => self.save_checkpoint(),
            PacketKind::LoadCheckpointBroadcast => self.load_checkpoint(),
            _ => {}
        }
    }

    fn eval_trade_request(&self, request: &TradeRequest) -> bool {
        let well_formed = request.currency_amount.value() > 0 && !request.item_package.is_empty();
        if well_formed {
            self.decisions.lock().trades_accepted += 1;
        }
        well_formed
    }

    fn eval_job_application(&self, contract: &LaborContract) -> bool {
        let well_formed = contract.wage_per_tick.value() > 0 && contract.ticks_per_step > 0;
        if well_formed {
            self.decisions.lock().jobs_accepted += 1;
        }
        well_formed
    }

    fn eval_land_trade_request(&self, request: &LandTradeRequest) -> bool {
        let well_formed = !request.hectares.is_zero() && request.currency_amount.value() > 0;
        if well_formed {
            self.decisions.lock().land_trades_accepted += 1;
        }
        well_formed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_core::cents::Cents;
    use agora_core::ids::AllocationTag;
    use rust_decimal::Decimal;

    fn checkpoint_dir() -> PathBuf {
        let mut dir = std::env::temp_dir();
        dir.push(format!("agora-controller-test-{}", uuid::Uuid::new_v4()));
        dir
    }

    #[tokio::test]
    async fn accepts_well_formed_offers_and_counts_them() {
        let controller = AlwaysAcceptController::new(EndpointId::new("agent-0"), checkpoint_dir());

        let mut item_package = std::collections::HashMap::new();
        item_package.insert(agora_core::ids::ItemId::new("wheat"), Decimal::from(5));
        assert!(controller.eval_trade_request(&TradeRequest {
            seller_id: EndpointId::new("agent-0"),
            buyer_id: EndpointId::new("agent-1"),
            currency_amount: Cents::new(500),
            item_package,
        }));

        assert!(!controller.eval_land_trade_request(&LandTradeRequest {
            seller_id: EndpointId::new("agent-0"),
            buyer_id: EndpointId::new("agent-1"),
            currency_amount: Cents::new(0),
            allocation: AllocationTag::new("farmland-east"),
            hectares: Decimal::from(2),
        }));

        assert_eq!(controller.decisions_accepted(), (1, 0, 0));
    }

    #[tokio::test]
    async fn checkpoint_round_trip_restores_decision_counts() {
        let dir = checkpoint_dir();
        let controller = AlwaysAcceptController::new(EndpointId::new("agent-0"), dir.clone());
        controller.eval_job_application(&LaborContract {
            employer_id: EndpointId::new("agent-1"),
            worker_id: EndpointId::new("agent-0"),
            ticks_per_step: 4,
            wage_per_tick: Cents::new(10),
            worker_skill_level: Decimal::from(3).into(),
            start_step: 0,
            end_step: 10,
            contract_name: "farmhand".into(),
        });

        controller
            .receive_msg(&Packet::new(
                EndpointId::new("manager"),
                None,
                PacketKind::SaveCheckpointBroadcast,
                None,
                serde_json::json!({}),
            ))
            .await;

        let restored = AlwaysAcceptController::new(EndpointId::new("agent-0"), dir.clone());
        restored
            .receive_msg(&Packet::new(
                EndpointId::new("manager"),
                None,
                PacketKind::LoadCheckpointBroadcast,
                None,
                serde_json::json!({}),
            ))
            .await;

        assert_eq!(restored.decisions_accepted(), (0, 1, 0));
        std::fs::remove_dir_all(&dir).ok();
    }
}
