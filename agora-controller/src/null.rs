//! The inert controller: accepts nothing. Used to exercise the substrate's
//! rejection paths (the seller/employer/landlord side of a declined offer)
//! without any decision logic of its own.

use agora_agent::controller::Controller;
use agora_agent::labor::LaborContract;
use agora_agent::payloads::{LandTradeRequest, TradeRequest};
use agora_core::ids::EndpointId;
use agora_core::packet::Packet;
use async_trait::async_trait;

#[derive(Debug)]
pub struct NullController {
    id: EndpointId,
}

impl NullController {
    pub fn new(id: EndpointId) -> Self {
        Self { id }
    }
}

#[async_trait]
impl Controller for NullController {
    async fn controller_start(&self, _initial_payload: serde_json::Value) {
        tracing::debug!(controller = %self.id, "null controller started");
    }

    async fn receive_msg(&self, _packet: &Packet) {}

    fn eval_trade_request(&self, _request: &TradeRequest) -> bool {
        false
    }

    fn eval_job_application(&self, _contract: &LaborContract) -> bool {
        false
    }

    fn eval_land_trade_request(&self, _request: &LandTradeRequest) -> bool {
        false
    }
}
