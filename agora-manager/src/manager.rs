//! The Simulation Manager: the tick clock state machine (design §4.5).
//!
//! Flattened from a nested `engine::{action, audit, clock, state, ...}`
//! module tree — that richness exists to support a multi-exchange trading
//! `Engine` generic over five type parameters; the manager here drives one
//! fixed protocol (`Instantiating -> Running -> Stopping -> Done`) against
//! one fixed packet vocabulary, so one file carries the whole state
//! machine.

use crate::config::SimulationConfig;
use agora_core::checkpoint::Checkpoint;
use agora_core::ids::EndpointId;
use agora_core::link::Link;
use agora_core::packet::{Packet, PacketKind};
use agora_fabric::Fabric;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, error, info, warn};

/// Bounded settling period between a broadcast and the state transition that
/// depends on its having been observed (design §4.5: "a bounded settling
/// period"). A design value, not derived from any configuration key.
pub const SETTLE_DELAY: Duration = Duration::from_millis(50);

/// How long [`Manager::run`] will wait, while `Stopping`, for registered
/// endpoints to confirm `KILL_PIPE_NETWORK` before declaring `Done` anyway.
/// The wire protocol has no explicit "I have torn down" acknowledgement
/// packet (design §6 lists no such kind) — `KILL_PIPE_NETWORK` only
/// deregisters its sender at the fabric (design §4.2 rule 1) — so `Done` is
/// resolved here by polling the fabric's registered-endpoint count down to
/// just the manager itself, bounded by this timeout. Documented as a
/// resolved open question (design §9).
pub const DONE_POLL_TIMEOUT: Duration = Duration::from_secs(5);
const DONE_POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerState {
    Instantiating,
    Running,
    Stopping,
    Done,
}

#[derive(Debug, Serialize, Deserialize)]
struct ManagerCheckpoint {
    step: u64,
    subscribers: Vec<EndpointId>,
}

const CHECKPOINT_SCHEMA_VERSION: u16 = 1;

pub struct Manager {
    fabric: Fabric,
    endpoint_id: EndpointId,
    inbound: AsyncMutex<mpsc::Receiver<Packet>>,
    outbound: mpsc::Sender<Packet>,
    config: SimulationConfig,
    checkpoint_dir: PathBuf,
    state: Mutex<ManagerState>,
    step: AtomicU64,
    subscribers: Mutex<HashSet<EndpointId>>,
    instantiation_errors: Mutex<Vec<serde_json::Value>>,
}

impl Manager {
    /// Register the manager's own endpoint with `fabric` and spawn its
    /// monitor task. Returns the manager plus its endpoint id (used by
    /// supervisors/controllers addressing it directly).
    pub fn new(
        fabric: Fabric,
        config: SimulationConfig,
        checkpoint_dir: impl Into<PathBuf>,
    ) -> (Arc<Self>, EndpointId) {
        let endpoint_id = EndpointId::new("manager");
        let (handle, fabric_handle) = Link::new();
        fabric
            .register(endpoint_id.clone(), fabric_handle)
            .expect("manager endpoint registered exactly once at startup");

        let manager = Arc::new(Self {
            fabric: fabric.clone(),
            endpoint_id: endpoint_id.clone(),
            inbound: AsyncMutex::new(handle.inbound),
            outbound: handle.outbound,
            config,
            checkpoint_dir: checkpoint_dir.into(),
            state: Mutex::new(ManagerState::Instantiating),
            step: AtomicU64::new(0),
            subscribers: Mutex::new(HashSet::new()),
            instantiation_errors: Mutex::new(Vec::new()),
        });

        {
            let fabric = fabric.clone();
            let id = endpoint_id.clone();
            tokio::spawn(async move { fabric.monitor(&id).await });
        }

        (manager, endpoint_id)
    }

    pub fn state(&self) -> ManagerState {
        *self.state.lock()
    }

    pub fn current_step(&self) -> u64 {
        self.step.load(Ordering::SeqCst)
    }

    pub fn instantiation_errors(&self) -> Vec<serde_json::Value> {
        self.instantiation_errors.lock().clone()
    }

    fn set_state(&self, state: ManagerState) {
        info!(?state, "manager state transition");
        *self.state.lock() = state;
    }

    async fn recv(&self) -> Option<Packet> {
        self.inbound.lock().await.recv().await
    }

    async fn broadcast(&self, kind: PacketKind, payload: serde_json::Value) {
        let packet = Packet::new(self.endpoint_id.clone(), None, kind, None, payload);
        if self.outbound.send(packet).await.is_err() {
            warn!(?kind, "manager outbound link closed mid-broadcast");
        }
    }

    /// Drive the whole state machine to completion: `Instantiating ->
    /// Running -> Stopping -> Done`.
    pub async fn run(self: Arc<Self>) {
        if self.await_instantiation().await {
            self.run_steps().await;
        }
        self.run_stopping().await;
        self.await_all_processes_gone().await;
        self.set_state(ManagerState::Done);
    }

    /// `Instantiating`: wait for a `PROC_READY` from every process
    /// supervisor. Aborts to `Stopping` on the first `PROC_ERROR` (design
    /// §4.5). Returns `true` if instantiation succeeded and the simulation
    /// should proceed to `Running`.
    async fn await_instantiation(&self) -> bool {
        let expected = self.config.agent_num_processes as usize;
        let mut ready = HashSet::new();

        if expected == 0 {
            self.set_state(ManagerState::Running);
            return true;
        }

        while ready.len() < expected {
            let Some(packet) = self.recv().await else {
                warn!("manager inbound link closed during instantiation");
                return false;
            };
            match packet.kind {
                PacketKind::ProcReady => {
                    ready.insert(packet.sender_id.clone());
                    debug!(process = %packet.sender_id, ready = ready.len(), expected, "process ready");
                }
                PacketKind::ProcError => {
                    error!(process = %packet.sender_id, payload = %packet.payload, "instantiation error");
                    self.instantiation_errors.lock().push(packet.payload);
                    return false;
                }
                other => {
                    debug!(?other, "ignored during instantiation");
                }
            }
        }

        self.set_state(ManagerState::Running);
        true
    }

    /// `Running`: the per-step tick-grant / tick-barrier / checkpoint loop
    /// (design §4.5, steps 1-4).
    async fn run_steps(&self) {
        for _ in 0..self.config.simulation_steps {
            if self.state() != ManagerState::Running {
                return;
            }

            self.broadcast(
                PacketKind::TickGrantBroadcast,
                serde_json::json!({ "ticks": self.config.ticks_per_step }),
            )
            .await;

            if !self.await_tick_barrier().await {
                return;
            }

            let step = self.step.fetch_add(1, Ordering::SeqCst) + 1;
            if self.config.checkpoint_due(step) {
                self.run_checkpoint_cycle(step).await;
            }
        }
    }

    /// Wait until every currently-subscribed endpoint has sent
    /// `TICK_BLOCKED` for this grant (design §4.5 step 3). Endpoints that
    /// subscribe mid-barrier via `TICK_BLOCK_SUBSCRIBE` are recorded for the
    /// *next* grant, not required for this one (design §4.5: "subscribe
    /// before the next grant"). Returns `false` if the simulation should
    /// stop (a `TERMINATE_SIMULATION` arrived, or the inbound link closed).
    async fn await_tick_barrier(&self) -> bool {
        let mut blocked = HashSet::new();

        loop {
            // Prefer whatever is already buffered (a subscription sent just
            // ahead of this grant, or a reply from an agent fast enough to
            // have already blocked) before deciding whether the barrier is
            // satisfied — only checking after a non-blocking drain avoids
            // declaring victory against a stale, pre-drain subscriber set.
            let drained = {
                let mut inbound = self.inbound.lock().await;
                match inbound.try_recv() {
                    Ok(packet) => Some(packet),
                    Err(mpsc::error::TryRecvError::Empty) => None,
                    Err(mpsc::error::TryRecvError::Disconnected) => return false,
                }
            };

            let packet = match drained {
                Some(packet) => packet,
                None => {
                    if self.subscribers.lock().is_subset(&blocked) {
                        return true;
                    }
                    match self.recv().await {
                        Some(packet) => packet,
                        None => return false,
                    }
                }
            };

            match packet.kind {
                PacketKind::TickBlocked => {
                    blocked.insert(packet.sender_id.clone());
                }
                PacketKind::TickBlockSubscribe => {
                    self.subscribers.lock().insert(packet.sender_id.clone());
                }
                PacketKind::TerminateSimulation => {
                    info!("TERMINATE_SIMULATION received, aborting to Stopping");
                    self.set_state(ManagerState::Stopping);
                    return false;
                }
                PacketKind::ProcError => {
                    warn!(process = %packet.sender_id, "process error during a running step");
                    self.instantiation_errors.lock().push(packet.payload);
                }
                other => {
                    debug!(?other, "ignored during tick barrier");
                }
            }
        }
    }

    async fn run_checkpoint_cycle(&self, step: u64) {
        info!(step, "save-checkpoint cycle starting");
        self.broadcast(
            PacketKind::SaveCheckpointBroadcast,
            serde_json::json!({ "step": step }),
        )
        .await;
        tokio::time::sleep(SETTLE_DELAY).await;
        if let Err(err) = self.save_checkpoint(step) {
            error!(step, %err, "manager failed to save its own checkpoint");
        }
    }

    fn checkpoint_path(&self) -> PathBuf {
        self.checkpoint_dir.join("manager.json")
    }

    fn save_checkpoint(&self, step: u64) -> Result<(), agora_core::checkpoint::CheckpointError> {
        let snapshot = ManagerCheckpoint {
            step,
            subscribers: self.subscribers.lock().iter().cloned().collect(),
        };
        Checkpoint::save(
            &self.checkpoint_path(),
            "manager",
            CHECKPOINT_SCHEMA_VERSION,
            &snapshot,
        )
    }

    /// Resume from a previously-written checkpoint (design §6: "loading a
    /// checkpoint ... reproduces the same observable state"). Restores the
    /// step counter and the subscriber set.
    pub fn load_checkpoint(&self) -> Result<(), agora_core::checkpoint::CheckpointError> {
        let snapshot: ManagerCheckpoint = Checkpoint::load(
            &self.checkpoint_path(),
            "manager",
            CHECKPOINT_SCHEMA_VERSION,
        )?;
        self.step.store(snapshot.step, Ordering::SeqCst);
        *self.subscribers.lock() = snapshot.subscribers.into_iter().collect();
        Ok(())
    }

    /// `Stopping`: `CONTROLLER_MSG_BROADCAST(STOP_TRADING)`, settle, then
    /// `KILL_ALL_BROADCAST` (design §4.5).
    async fn run_stopping(&self) {
        self.set_state(ManagerState::Stopping);
        self.broadcast(
            PacketKind::ControllerMsgBroadcast,
            serde_json::json!({ "command": "STOP_TRADING" }),
        )
        .await;
        tokio::time::sleep(SETTLE_DELAY).await;
        self.broadcast(PacketKind::KillAllBroadcast, serde_json::json!({}))
            .await;
    }

    /// `Done`: bounded poll until every other endpoint has deregistered
    /// itself via `KILL_PIPE_NETWORK` (see [`DONE_POLL_TIMEOUT`] docs).
    async fn await_all_processes_gone(&self) {
        let deadline = tokio::time::Instant::now() + DONE_POLL_TIMEOUT;
        while self.fabric.endpoint_count() > 1 && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(DONE_POLL_INTERVAL).await;
        }
        if self.fabric.endpoint_count() > 1 {
            warn!(
                remaining = self.fabric.endpoint_count() - 1,
                "processes still registered after the Done poll timeout"
            );
        }
    }
}

/// Directly drives a `TERMINATE_SIMULATION` control message to the manager,
/// used by a driver process or test harness to request an early, orderly
/// stop (design §4.5: "an external interrupt drives the manager ... directly
/// to Stopping").
pub async fn request_terminate(fabric: &Fabric, manager_id: &EndpointId, from: &EndpointId) {
    let (handle, fabric_handle) = Link::new();
    if fabric.register(from.clone(), fabric_handle).is_err() {
        warn!(%from, "terminate requester id already registered");
    }
    let packet = Packet::new(
        from.clone(),
        Some(manager_id.clone()),
        PacketKind::TerminateSimulation,
        None,
        serde_json::json!({}),
    );
    let _ = handle.outbound.send(packet).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_core::ids::EndpointId as Eid;

    fn minimal_config() -> SimulationConfig {
        SimulationConfig {
            simulation_steps: 2,
            ticks_per_step: 4,
            agent_num_processes: 0,
            agent_spawns: Default::default(),
            checkpoint_frequency: None,
            initial_checkpoint: None,
            statistics: None,
        }
    }

    struct TestAgent {
        id: EndpointId,
        handle: agora_core::link::EndpointHandle,
    }

    fn connect(fabric: &Fabric, id: &str) -> TestAgent {
        let (handle, fabric_handle) = Link::new();
        let id = Eid::new(id);
        fabric.register(id.clone(), fabric_handle).unwrap();
        let monitored = fabric.clone();
        let monitored_id = id.clone();
        tokio::spawn(async move { monitored.monitor(&monitored_id).await });
        TestAgent { id, handle }
    }

    #[tokio::test]
    async fn broadcast_fan_out_and_tick_barrier_across_three_agents() {
        let fabric = Fabric::new();
        let mut agents: Vec<TestAgent> = (0..3)
            .map(|i| connect(&fabric, &format!("agent-{i}")))
            .collect();

        let (manager, manager_id) = Manager::new(fabric.clone(), minimal_config(), "/tmp/unused");

        for agent in agents.iter_mut() {
            let subscribe = Packet::new(
                agent.id.clone(),
                Some(manager_id.clone()),
                PacketKind::TickBlockSubscribe,
                None,
                serde_json::json!({}),
            );
            agent.handle.outbound.send(subscribe).await.unwrap();
        }

        // Let the manager observe all three subscriptions before it starts
        // the first step — the barrier only requires endpoints subscribed
        // *before* the grant they are being asked to block on.
        tokio::time::sleep(Duration::from_millis(20)).await;

        let run_handle = tokio::spawn(manager.clone().run());

        // Each agent echoes every TICK_GRANT_BROADCAST it receives with a
        // TICK_BLOCKED reply, exactly once per ticks=4 grant (invariant 5:
        // grants-received minus blocks-sent stays in {0,1}), until its link
        // closes at KILL_ALL_BROADCAST.
        let mut responders = Vec::new();
        let mut grants_seen = Vec::new();
        for mut agent in agents.drain(..) {
            let manager_id = manager_id.clone();
            let (seen_tx, seen_rx) = tokio::sync::oneshot::channel();
            grants_seen.push(seen_rx);
            responders.push(tokio::spawn(async move {
                let mut count = 0u32;
                while let Some(packet) = agent.handle.inbound.recv().await {
                    if packet.kind != PacketKind::TickGrantBroadcast {
                        continue;
                    }
                    count += 1;
                    let blocked = Packet::new(
                        agent.id.clone(),
                        Some(manager_id.clone()),
                        PacketKind::TickBlocked,
                        None,
                        serde_json::json!({}),
                    );
                    if agent.handle.outbound.send(blocked).await.is_err() {
                        break;
                    }
                }
                let _ = seen_tx.send(count);
            }));
        }

        tokio::time::timeout(Duration::from_secs(2), run_handle)
            .await
            .expect("manager run should finish within the simulation_steps bound")
            .unwrap();

        assert_eq!(manager.current_step(), 2);
        assert_eq!(manager.state(), ManagerState::Done);

        for seen in grants_seen {
            let count = tokio::time::timeout(Duration::from_secs(1), seen)
                .await
                .unwrap()
                .unwrap();
            assert_eq!(count, 2, "each agent receives exactly one grant per step");
        }
    }

    #[tokio::test]
    async fn proc_error_during_instantiation_skips_straight_to_stopping() {
        let fabric = Fabric::new();
        let mut config = minimal_config();
        config.agent_num_processes = 1;
        let (manager, manager_id) = Manager::new(fabric.clone(), config, "/tmp/unused");
        let mut supervisor = connect(&fabric, "supervisor-0");

        let run_handle = tokio::spawn(manager.clone().run());

        let error_packet = Packet::new(
            supervisor.id.clone(),
            Some(manager_id.clone()),
            PacketKind::ProcError,
            None,
            serde_json::json!({ "reason": "bind failed" }),
        );
        supervisor.handle.outbound.send(error_packet).await.unwrap();

        tokio::time::timeout(Duration::from_secs(2), run_handle)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(manager.state(), ManagerState::Done);
        assert_eq!(manager.instantiation_errors().len(), 1);
    }
}
