#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_crate_dependencies,
    unused_extern_crates,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms
)]
#![allow(clippy::type_complexity, clippy::too_many_arguments)]

//! # Fabric — the Connection Fabric
//!
//! Low-level, low-drama message router. Every other component talks to every
//! other component exclusively through the [`Fabric`]; nothing here peeks
//! into an agent's state, and nothing here understands what a trade or a
//! tick is — it only understands [`agora_core::packet::Packet`],
//! [`PacketKind`], and [`EndpointId`]s.
//!
//! ## Routing rules, evaluated in order (design §4.2)
//!
//! 1. `KILL_PIPE_NETWORK` from an endpoint: deregister it.
//! 2. A `*_BROADCAST` kind: snapshot the endpoint set, fan out.
//!    `KILL_ALL_BROADCAST` is additionally guarded by a one-shot flag.
//! 3. `SNOOP_START`: register a `(snooper, kind)` subscription.
//! 4. A registered destination: deliver, and copy to subscribed snoopers.
//! 5. Otherwise: synthesize an `ERROR` packet back to the sender.

mod shutdown;
mod snoop;

pub use shutdown::ShutdownSignal;
pub use snoop::SnoopTable;

use agora_core::ids::EndpointId;
use agora_core::link::FabricHandle;
use agora_core::packet::{Packet, PacketKind};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Bounded timeout for a per-endpoint send-lock acquisition (design §4.2,
/// design value ≈ 5s). Exceeding it is a logged, non-fatal failure.
pub const SEND_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum FabricError {
    #[error("endpoint {0} is already registered")]
    DuplicateEndpoint(EndpointId),
    #[error("send-lock acquisition for {0} timed out")]
    SendLockTimeout(EndpointId),
}

struct Endpoint {
    inbound: mpsc::Sender<Packet>,
    send_lock: Arc<Mutex<()>>,
    outbound: parking_lot::Mutex<Option<mpsc::Receiver<Packet>>>,
}

/// The Connection Fabric: a concrete value owned by the process hosting it
/// (design §9 — "no hidden singleton beyond the fabric itself").
///
/// Cloning a `Fabric` is cheap and shares the same routing table (it holds
/// an `Arc` internally), so cheaply-cloneable handles can be passed into
/// each `monitor` task rather than wrapping the whole thing behind a
/// call-site `Arc<Mutex<_>>`.
#[derive(Clone)]
pub struct Fabric {
    inner: Arc<FabricInner>,
}

struct FabricInner {
    endpoints: RwLock<HashMap<EndpointId, Endpoint>>,
    snoops: SnoopTable,
    kill_all_fired: AtomicBool,
    shutdown: ShutdownSignal,
}

impl std::fmt::Debug for Fabric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fabric")
            .field("endpoints", &self.inner.endpoints.read().len())
            .finish()
    }
}

impl Default for Fabric {
    fn default() -> Self {
        Self::new()
    }
}

impl Fabric {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(FabricInner {
                endpoints: RwLock::new(HashMap::new()),
                snoops: SnoopTable::new(),
                kill_all_fired: AtomicBool::new(false),
                shutdown: ShutdownSignal::new(),
            }),
        }
    }

    /// The fabric's shutdown signal. Response buffers (`agora-agent`)
    /// subscribe to this so a `KILL_ALL_BROADCAST` unblocks every
    /// outstanding waiter with a cancelled status (design §5).
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.inner.shutdown.clone()
    }

    /// Register a routable endpoint. Duplicate registration is rejected
    /// (design §4.2). The endpoint's outbound half is retained internally;
    /// call [`Fabric::monitor`] with the same id to start dispatching it.
    pub fn register(&self, endpoint_id: EndpointId, handle: FabricHandle) -> Result<(), FabricError> {
        let mut endpoints = self.inner.endpoints.write();
        if endpoints.contains_key(&endpoint_id) {
            return Err(FabricError::DuplicateEndpoint(endpoint_id));
        }
        endpoints.insert(
            endpoint_id.clone(),
            Endpoint {
                inbound: handle.inbound,
                send_lock: Arc::new(Mutex::new(())),
                outbound: parking_lot::Mutex::new(Some(handle.outbound)),
            },
        );
        debug!(%endpoint_id, "endpoint registered");
        Ok(())
    }

    fn deregister(&self, endpoint_id: &EndpointId) {
        self.inner.endpoints.write().remove(endpoint_id);
        debug!(%endpoint_id, "endpoint deregistered");
    }

    fn registered_ids(&self) -> Vec<EndpointId> {
        self.inner.endpoints.read().keys().cloned().collect()
    }

    /// Monitor one registered endpoint's outbound half, dispatching
    /// everything it sends through [`Fabric::route`] until the channel
    /// closes. Takes ownership of the receiver stashed by
    /// [`Fabric::register`]; calling it twice for the same id is a no-op
    /// the second time (there is nothing left to take).
    pub async fn monitor(&self, endpoint_id: &EndpointId) {
        let receiver = {
            let endpoints = self.inner.endpoints.read();
            endpoints.get(endpoint_id).and_then(|e| e.outbound.lock().take())
        };
        let Some(mut receiver) = receiver else {
            warn!(%endpoint_id, "monitor called with no outbound receiver available");
            return;
        };
        while let Some(packet) = receiver.recv().await {
            self.route(packet).await;
        }
    }

    /// Route a single packet according to the 5 ordered rules (design §4.2).
    pub async fn route(&self, packet: Packet) {
        // Rule 1: KILL_PIPE_NETWORK deregisters the sender.
        if packet.kind == PacketKind::KillPipeNetwork {
            self.deregister(&packet.sender_id);
            return;
        }

        // Rule 2: *_BROADCAST kinds fan out to the current endpoint set.
        if packet.kind.is_broadcast() {
            if packet.kind == PacketKind::KillAllBroadcast {
                if self.inner.kill_all_fired.swap(true, Ordering::SeqCst) {
                    debug!("duplicate KILL_ALL_BROADCAST ignored (idempotence, design §8 invariant 7)");
                    return;
                }
                self.inner.shutdown.fire();
            }
            let targets = self.registered_ids();
            for target in targets {
                let packet = packet.clone();
                let this = self.clone();
                tokio::spawn(async move {
                    this.send_to(&target, packet).await;
                });
            }
            return;
        }

        // Rule 3: SNOOP_START registers a subscription.
        if packet.kind == PacketKind::SnoopStart {
            if let Some(subscribed) = packet.payload.get("kind").and_then(|v| v.as_u64()) {
                if let Some(kind) = kind_from_u16(subscribed as u16) {
                    self.inner.snoops.subscribe(kind, packet.sender_id.clone());
                    info!(snooper = %packet.sender_id, ?kind, "snoop subscription registered");
                }
            }
            return;
        }

        // Rule 4: a registered destination gets the packet, plus snoop copies.
        if let Some(dest) = packet.dest_id.clone() {
            if self.inner.endpoints.read().contains_key(&dest) {
                for snooper in self.inner.snoops.subscribers(packet.kind) {
                    if snooper != dest {
                        let copy = packet.clone();
                        self.send_to(&snooper, copy).await;
                    }
                }
                self.send_to(&dest, packet).await;
                return;
            }
        }

        // Rule 5: destination not found — synthesize an ERROR reply.
        let reason = match &packet.dest_id {
            Some(dest) => format!("destination {dest} not registered"),
            None => "packet had no destination".to_string(),
        };
        warn!(sender = %packet.sender_id, %reason, "routing error");
        let error_packet = Packet::new(
            EndpointId::new("fabric"),
            Some(packet.sender_id.clone()),
            PacketKind::Error,
            packet.correlation_id,
            serde_json::json!({ "reason": reason }),
        );
        self.send_to(&packet.sender_id, error_packet).await;
    }

    /// Deliver `packet` to `target`'s inbox, serialized by `target`'s
    /// per-endpoint send lock (design §4.2) so two monitor tasks can never
    /// interleave sends onto the same outbound link.
    async fn send_to(&self, target: &EndpointId, packet: Packet) {
        let (inbound, lock) = {
            let endpoints = self.inner.endpoints.read();
            match endpoints.get(target) {
                Some(endpoint) => (endpoint.inbound.clone(), endpoint.send_lock.clone()),
                None => {
                    debug!(%target, "send to removed endpoint dropped");
                    return;
                }
            }
        };

        let guard = match timeout(SEND_LOCK_TIMEOUT, lock.lock()).await {
            Ok(guard) => guard,
            Err(_) => {
                warn!(%target, "send-lock acquisition timed out");
                return;
            }
        };
        if inbound.send(packet).await.is_err() {
            debug!(%target, "endpoint inbox closed, send dropped");
        }
        drop(guard);
    }

    /// Count of currently-registered endpoints; used by tests asserting
    /// broadcast fan-out reached the whole set.
    pub fn endpoint_count(&self) -> usize {
        self.inner.endpoints.read().len()
    }
}

fn kind_from_u16(value: u16) -> Option<PacketKind> {
    // SNOOP_START's payload carries the kind it's subscribing to as a plain
    // wire integer, not a typed field, so this is the one place the fabric
    // needs to go from u16 back to PacketKind.
    use PacketKind::*;
    const ALL: &[PacketKind] = &[
        KillPipeAgent, KillAllBroadcast, KillPipeNetwork, SnoopStart, Error,
        CurrencyTransfer, CurrencyTransferAck, ItemTransfer, ItemTransferAck,
        TradeReq, TradeReqAck, LandTransfer, LandTransferAck, LandTradeReq, LandTradeReqAck,
        LaborApplication, LaborApplicationAck, LaborTimeSend, LaborContractCancel, LaborContractCancelAck,
        ItemMarketUpdate, ItemMarketRemove, ItemMarketSample, ItemMarketSampleAck,
        LaborMarketUpdate, LaborMarketRemove, LaborMarketSample, LaborMarketSampleAck,
        LandMarketUpdate, LandMarketRemove, LandMarketSample, LandMarketSampleAck,
        ProductionNotification, InfoReq, InfoReqBroadcast, InfoResp,
        ControllerStart, ControllerStartBroadcast, ErrorControllerStart, ControllerMsg, ControllerMsgBroadcast,
        TickBlockSubscribe, TickBlocked, TickGrant, TickGrantBroadcast,
        SaveCheckpointBroadcast, LoadCheckpointBroadcast, TerminateSimulation, ProcStop,
        AdvanceStep, StopTrading, ProcReady, ProcError,
    ];
    ALL.iter().copied().find(|k| *k as u16 == value)
}
