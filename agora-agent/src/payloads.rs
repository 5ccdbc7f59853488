//! Wire payload shapes carried in `Packet::payload` for the Agent Runtime's
//! protocols (spec §4.3). These are serialized as `serde_json::Value`, never
//! typed fields on `Packet` itself (spec §4.1: packets are values; only the
//! fabric and link touch the envelope, everything inside `payload` is a
//! runtime concern).

use crate::labor::LaborContract;
use agora_core::cents::Cents;
use agora_core::ids::{AllocationTag, CorrelationId, EndpointId, ItemId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrencyTransfer {
    pub transfer_id: CorrelationId,
    pub amount: Cents,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemTransfer {
    pub transfer_id: CorrelationId,
    pub item: ItemId,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LandTransfer {
    pub transfer_id: CorrelationId,
    pub allocation: AllocationTag,
    pub hectares: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferAck {
    pub transfer_id: CorrelationId,
    pub success: bool,
}

/// `TradeRequest{sellerId, buyerId, currencyAmount, itemPackage}` (spec
/// §4.3, "Trade request protocol").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRequest {
    pub seller_id: EndpointId,
    pub buyer_id: EndpointId,
    pub currency_amount: Cents,
    pub item_package: HashMap<ItemId, Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRequestAck {
    pub accepted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LandTradeRequest {
    pub seller_id: EndpointId,
    pub buyer_id: EndpointId,
    pub currency_amount: Cents,
    pub allocation: AllocationTag,
    pub hectares: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LandTradeRequestAck {
    pub accepted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaborApplication {
    pub contract: LaborContract,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaborApplicationAck {
    pub accepted: bool,
    pub contract: Option<LaborContract>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaborContractCancel {
    pub contract_hash: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaborContractCancelAck {
    pub contract_hash: u64,
}

/// `INFO_REQ` / `INFO_REQ_BROADCAST` payload (spec §4.3, "Information
/// request/response"). `agent_filter` is a substring match over agent ids
/// for the broadcast form; `None` for a targeted request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfoRequest {
    pub requester_id: EndpointId,
    pub transaction_id: CorrelationId,
    pub agent_filter: Option<String>,
    pub info_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfoResponse {
    pub transaction_id: CorrelationId,
    pub info: serde_json::Value,
}
