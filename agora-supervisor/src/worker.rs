//! [`Worker`]: one process's share of the simulation.
//!
//! Grounded in per-process lifecycle hooks for disconnect/stop/close-out,
//! generalized
//! from "disconnect from an exchange" to "tear down this process's hosted
//! agents." On launch a `Worker` instantiates its assigned agents via a
//! caller-supplied factory (agent construction is environment-specific —
//! it needs a controller and an item catalog this crate doesn't own),
//! reports `PROC_READY`/`PROC_ERROR` to the manager, then services its
//! management link until told to stop.

use agora_core::ids::EndpointId;
use agora_core::link::Link;
use agora_core::packet::{Packet, PacketKind};
use agora_fabric::Fabric;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::SupervisorError;

struct HostedAgent {
    id: EndpointId,
    handle: JoinHandle<()>,
}

/// One worker process's management endpoint plus the agent tasks it hosts.
pub struct Worker {
    pub id: EndpointId,
    fabric: Fabric,
    manager_id: EndpointId,
    outbound: mpsc::Sender<Packet>,
    inbound: AsyncMutex<mpsc::Receiver<Packet>>,
    hosted: Mutex<Vec<HostedAgent>>,
    step: AtomicU64,
    gc_interval: u64,
}

impl Worker {
    /// Register this worker's management endpoint with `fabric`. `gc_interval`
    /// is the *K* in "run a garbage-collection pass every K steps"; `0`
    /// disables periodic collection.
    pub fn new(
        id: EndpointId,
        fabric: Fabric,
        manager_id: EndpointId,
        gc_interval: u64,
    ) -> Result<Arc<Self>, SupervisorError> {
        let (endpoint, fabric_handle) = Link::new();
        fabric.register(id.clone(), fabric_handle)?;
        Ok(Arc::new(Self {
            id,
            fabric,
            manager_id,
            outbound: endpoint.outbound,
            inbound: AsyncMutex::new(endpoint.inbound),
            hosted: Mutex::new(Vec::new()),
            step: AtomicU64::new(0),
            gc_interval,
        }))
    }

    pub fn current_step(&self) -> u64 {
        self.step.load(Ordering::Relaxed)
    }

    /// Number of agent tasks still tracked as hosted (for tests observing
    /// the garbage-collection pass).
    pub fn hosted_count(&self) -> usize {
        self.hosted.lock().len()
    }

    async fn recv(&self) -> Option<Packet> {
        self.inbound.lock().await.recv().await
    }

    async fn send_to_manager(&self, kind: PacketKind, payload: serde_json::Value) {
        let packet = Packet::new(self.id.clone(), Some(self.manager_id.clone()), kind, None, payload);
        if self.outbound.send(packet).await.is_err() {
            warn!(worker = %self.id, "management link closed; packet dropped");
        }
    }

    /// Instantiate all agents in `assigned` via `spawn`, then service the
    /// management link until `PROC_STOP`/`KILL_ALL_BROADCAST` or the link
    /// closes. Drives this worker's own outbound fan-out via
    /// [`Fabric::monitor`], so callers don't need to spawn that separately.
    pub async fn run<F>(self: Arc<Self>, assigned: Vec<EndpointId>, spawn: F)
    where
        F: Fn(EndpointId) -> Result<JoinHandle<()>, SupervisorError>,
    {
        let monitor_id = self.id.clone();
        let monitor_fabric = self.fabric.clone();
        tokio::spawn(async move { monitor_fabric.monitor(&monitor_id).await });

        let total = assigned.len();
        match self.instantiate(assigned, spawn) {
            Ok(()) => {
                info!(worker = %self.id, agents = total, "all assigned agents instantiated");
                self.send_to_manager(PacketKind::ProcReady, serde_json::json!({}))
                    .await;
            }
            Err(err) => {
                warn!(worker = %self.id, error = %err, "agent instantiation failed");
                self.send_to_manager(
                    PacketKind::ProcError,
                    serde_json::json!({ "traceback": err.to_string() }),
                )
                .await;
                return;
            }
        }

        self.service_management_link().await;
    }

    fn instantiate<F>(&self, assigned: Vec<EndpointId>, spawn: F) -> Result<(), SupervisorError>
    where
        F: Fn(EndpointId) -> Result<JoinHandle<()>, SupervisorError>,
    {
        let mut hosted = self.hosted.lock();
        for id in assigned {
            let handle = spawn(id.clone())?;
            hosted.push(HostedAgent { id, handle });
        }
        Ok(())
    }

    async fn service_management_link(&self) {
        loop {
            let packet = match self.recv().await {
                Some(packet) => packet,
                None => {
                    debug!(worker = %self.id, "management link closed");
                    return;
                }
            };

            match packet.kind {
                PacketKind::ProcStop | PacketKind::KillAllBroadcast => {
                    info!(worker = %self.id, "stop signal received, tearing down");
                    self.send_to_manager(PacketKind::KillPipeNetwork, serde_json::json!({}))
                        .await;
                    return;
                }
                PacketKind::TickGrant => {
                    let step = self.step.fetch_add(1, Ordering::SeqCst) + 1;
                    if self.gc_interval > 0 && step % self.gc_interval == 0 {
                        self.run_gc_pass();
                    }
                }
                other => {
                    debug!(worker = %self.id, ?other, "ignored on management link");
                }
            }
        }
    }

    /// Sweep hosted-agent tasks that have already finished (crashed or
    /// exited) out of the bookkeeping set, so it doesn't grow unbounded over
    /// a long-running simulation. A reference implementation called
    /// Python's `gc.collect()` on this cadence to bound interpreter memory;
    /// this is that housekeeping's idiomatic counterpart in a runtime with
    /// no equivalent manual collector.
    fn run_gc_pass(&self) {
        let mut hosted = self.hosted.lock();
        let before = hosted.len();
        hosted.retain(|agent| {
            let finished = agent.handle.is_finished();
            if finished {
                debug!(worker = %self.id, agent = %agent.id, "pruning finished hosted agent");
            }
            !finished
        });
        debug!(
            worker = %self.id,
            step = self.current_step(),
            pruned = before - hosted.len(),
            "garbage-collection pass complete"
        );
    }
}
