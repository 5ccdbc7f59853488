//! The [`Packet`] value and its [`PacketKind`] wire enum.
//!
//! Packets are values, not referenced entities (design §4.1): constructing
//! one computes its `short_hash` and assigns its correlation id once, up
//! front. Two components never share a `Packet` by reference across an
//! await point — it is cloned or moved down a [`crate::link::Link`].

use crate::ids::{CorrelationId, EndpointId};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

/// Wire packet-kind enum. Discriminants are the literal numeric values from
/// the design's external interface (§6); they are stable and must not be
/// renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum PacketKind {
    // Network (101-105)
    KillPipeAgent = 101,
    KillAllBroadcast = 102,
    KillPipeNetwork = 103,
    SnoopStart = 104,
    Error = 105,

    // Trade (201-245)
    CurrencyTransfer = 201,
    CurrencyTransferAck = 202,
    ItemTransfer = 211,
    ItemTransferAck = 212,
    TradeReq = 221,
    TradeReqAck = 222,
    LandTransfer = 231,
    LandTransferAck = 232,
    LandTradeReq = 233,
    LandTradeReqAck = 234,
    LaborApplication = 241,
    LaborApplicationAck = 242,
    LaborTimeSend = 243,
    LaborContractCancel = 244,
    LaborContractCancelAck = 245,

    // Market (301-324)
    ItemMarketUpdate = 301,
    ItemMarketRemove = 302,
    ItemMarketSample = 303,
    ItemMarketSampleAck = 304,
    LaborMarketUpdate = 311,
    LaborMarketRemove = 312,
    LaborMarketSample = 313,
    LaborMarketSampleAck = 314,
    LandMarketUpdate = 321,
    LandMarketRemove = 322,
    LandMarketSample = 323,
    LandMarketSampleAck = 324,

    // Agent (401-425)
    ProductionNotification = 401,
    InfoReq = 411,
    InfoReqBroadcast = 412,
    InfoResp = 413,
    ControllerStart = 421,
    ControllerStartBroadcast = 422,
    ErrorControllerStart = 423,
    ControllerMsg = 424,
    ControllerMsgBroadcast = 425,

    // Simulation (501-512)
    TickBlockSubscribe = 501,
    TickBlocked = 502,
    TickGrant = 503,
    TickGrantBroadcast = 504,
    /// Not in the original wire enum's literal list (design §6); added here
    /// because §4.5/§4.8 both name `SAVE_CHECKPOINT`/`LOAD_CHECKPOINT` as
    /// protocol messages a checkpointing component must receive. Numbered
    /// into the unused 505-510 gap in the Simulation block rather than
    /// renumbering anything else.
    SaveCheckpointBroadcast = 505,
    LoadCheckpointBroadcast = 506,
    TerminateSimulation = 511,
    ProcStop = 512,

    // Control (9001-9004)
    AdvanceStep = 9001,
    StopTrading = 9002,
    ProcReady = 9003,
    ProcError = 9004,
}

impl PacketKind {
    /// Kinds that are delivered to every registered endpoint (fan-out),
    /// matching the `*_BROADCAST` naming rule the fabric's routing table
    /// dispatches on (design §4.2, rule 2).
    pub fn is_broadcast(self) -> bool {
        matches!(
            self,
            PacketKind::KillAllBroadcast
                | PacketKind::ControllerStartBroadcast
                | PacketKind::ControllerMsgBroadcast
                | PacketKind::TickGrantBroadcast
                | PacketKind::InfoReqBroadcast
                | PacketKind::SaveCheckpointBroadcast
                | PacketKind::LoadCheckpointBroadcast
        )
    }
}

/// An immutable message record. `dest_id` is `None` for broadcasts (the
/// fabric computes the recipient set). `correlation_id` is `None` for
/// fire-and-forget packets (e.g. `LABOR_TIME_SEND`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Packet {
    pub sender_id: EndpointId,
    pub dest_id: Option<EndpointId>,
    pub kind: PacketKind,
    pub correlation_id: Option<CorrelationId>,
    pub payload: serde_json::Value,
    short_hash: String,
}

impl Packet {
    /// Construct a packet, computing its `short_hash` immediately. If
    /// `correlation_id` is `None` and the kind expects one, callers should
    /// mint a fresh [`CorrelationId`] before calling this constructor —
    /// construction itself never silently invents one, so correlation-id
    /// uniqueness (design §8, invariant 4) is the caller's responsibility at
    /// the one place it matters: issuing a new request.
    pub fn new(
        sender_id: EndpointId,
        dest_id: Option<EndpointId>,
        kind: PacketKind,
        correlation_id: Option<CorrelationId>,
        payload: serde_json::Value,
    ) -> Self {
        let short_hash = compute_short_hash(&sender_id, &dest_id, kind, &correlation_id, &payload);
        Self {
            sender_id,
            dest_id,
            kind,
            correlation_id,
            payload,
            short_hash,
        }
    }

    /// An 8-hex-character digest, disambiguating log lines. Not a security
    /// primitive (design §3).
    pub fn short_hash(&self) -> &str {
        &self.short_hash
    }
}

fn compute_short_hash(
    sender_id: &EndpointId,
    dest_id: &Option<EndpointId>,
    kind: PacketKind,
    correlation_id: &Option<CorrelationId>,
    payload: &serde_json::Value,
) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(sender_id.as_str().as_bytes());
    if let Some(dest) = dest_id {
        hasher.update(dest.as_str().as_bytes());
    }
    hasher.update((kind as u16).to_be_bytes());
    if let Some(cid) = correlation_id {
        hasher.update(cid.to_string().as_bytes());
    }
    hasher.update(payload.to_string().as_bytes());
    hasher.update(nanos.to_be_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..4])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_hash_is_eight_hex_chars() {
        let packet = Packet::new(
            EndpointId::new("buyer-1"),
            Some(EndpointId::new("seller-1")),
            PacketKind::TradeReq,
            Some(CorrelationId::new()),
            serde_json::json!({"currencyAmount": 10}),
        );
        assert_eq!(packet.short_hash().len(), 8);
    }

    #[test]
    fn broadcast_kinds_are_flagged() {
        assert!(PacketKind::TickGrantBroadcast.is_broadcast());
        assert!(!PacketKind::TickGrant.is_broadcast());
    }
}
