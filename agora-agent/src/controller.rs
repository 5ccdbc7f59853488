//! The bound-controller interface every agent requires (spec §4.8). The
//! substrate calls these hooks; decision logic itself is scientific
//! modeling out of scope here (spec §1 Non-goals) — `agora-controller`
//! supplies only inert or trivially rule-following implementations for
//! exercising the substrate.

use crate::labor::LaborContract;
use crate::payloads::{LandTradeRequest, TradeRequest};
use agora_core::packet::Packet;
use async_trait::async_trait;

#[async_trait]
pub trait Controller: Send + Sync {
    /// Called once during the simulation start broadcast; typically
    /// subscribes to tick blocking, enables accounting channels, seeds
    /// inventory.
    async fn controller_start(&self, initial_payload: serde_json::Value);

    /// Called for every inbound packet that isn't a transfer/trade ACK (ACKs
    /// are consumed internally by the response buffer).
    async fn receive_msg(&self, packet: &Packet);

    fn eval_trade_request(&self, request: &TradeRequest) -> bool;
    fn eval_job_application(&self, contract: &LaborContract) -> bool;
    fn eval_land_trade_request(&self, request: &LandTradeRequest) -> bool;
}
