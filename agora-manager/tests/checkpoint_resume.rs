//! Cross-crate checkpoint/resume integration: a real `Manager` driving a
//! checkpoint-save cycle on a fabric shared with a `Gatherer` running a
//! `WageTracker`, verifying both the manager's own step round-trip and the
//! tracker-clearing effect of a `LOAD_CHECKPOINT_BROADCAST` landing mid-run.

use agora_agent::labor::LaborContract;
use agora_agent::payloads::LaborApplicationAck;
use agora_core::cents::Cents;
use agora_core::ids::EndpointId;
use agora_core::link::{EndpointHandle, Link};
use agora_core::packet::{Packet, PacketKind};
use agora_fabric::Fabric;
use agora_manager::config::SimulationConfig;
use agora_manager::manager::Manager;
use agora_stats::{Gatherer, Tracker, WageTracker};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::time::Duration;

fn temp_dir(label: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    dir.push(format!("agora-manager-test-{label}-{}", uuid::Uuid::new_v4()));
    dir
}

fn config(simulation_steps: u64, checkpoint_frequency: Option<u64>) -> SimulationConfig {
    SimulationConfig {
        simulation_steps,
        ticks_per_step: 1,
        agent_num_processes: 0,
        agent_spawns: Default::default(),
        checkpoint_frequency,
        initial_checkpoint: None,
        statistics: None,
    }
}

fn connect(fabric: &Fabric, id: &str) -> EndpointHandle {
    let endpoint_id = EndpointId::new(id);
    let (handle, fabric_handle) = Link::new();
    fabric.register(endpoint_id.clone(), fabric_handle).unwrap();
    let monitored = fabric.clone();
    tokio::spawn(async move { monitored.monitor(&endpoint_id).await });
    handle
}

fn contract() -> LaborContract {
    LaborContract {
        employer_id: EndpointId::new("employer-0"),
        worker_id: EndpointId::new("worker-0"),
        ticks_per_step: 4,
        wage_per_tick: Cents::new(100),
        worker_skill_level: Decimal::from(2).into(),
        start_step: 0,
        end_step: 100,
        contract_name: "farmhand".into(),
    }
}

/// A save-checkpoint cycle writes a step/subscriber snapshot a later
/// `Manager` instance (pointed at the same directory) can load back.
#[tokio::test]
async fn manager_checkpoint_round_trips_its_step_counter() {
    let checkpoint_dir = temp_dir("steps");
    let fabric = Fabric::new();
    let (manager, _manager_id) = Manager::new(fabric.clone(), config(2, Some(1)), &checkpoint_dir);

    tokio::time::timeout(Duration::from_secs(2), manager.clone().run())
        .await
        .expect("manager run should finish within the simulation_steps bound");
    assert_eq!(manager.current_step(), 2);

    let (resumed, _) = Manager::new(Fabric::new(), config(2, Some(1)), &checkpoint_dir);
    resumed.load_checkpoint().expect("checkpoint written by the first manager should load");
    assert_eq!(resumed.current_step(), 2);

    std::fs::remove_dir_all(&checkpoint_dir).ok();
}

/// A `LOAD_CHECKPOINT_BROADCAST` landing mid-run clears a `WageTracker`'s
/// already-recorded contracts (the resume data loss documented on
/// `WageTracker::on_load_checkpoint`), visible here as the active-contract
/// column dropping to zero in the very next rolled row.
#[tokio::test]
async fn resume_broadcast_clears_wage_tracker_contracts_mid_run() {
    let fabric = Fabric::new();
    let output_dir = temp_dir("stats");
    let checkpoint_dir = temp_dir("checkpoint");

    let tracker: Box<dyn Tracker> = Box::new(WageTracker::new("wage", 0));
    let gatherer = Gatherer::new(EndpointId::new("gatherer"), fabric.clone(), &output_dir, vec![tracker])
        .unwrap();
    let gatherer_handle = tokio::spawn(gatherer.run());

    // Let SNOOP_START land before anything else moves.
    tokio::time::sleep(Duration::from_millis(20)).await;

    let mut employer = connect(&fabric, "employer-0");
    let _worker = connect(&fabric, "worker-0");

    let ack = Packet::new(
        EndpointId::new("employer-0"),
        Some(EndpointId::new("worker-0")),
        PacketKind::LaborApplicationAck,
        None,
        serde_json::to_value(LaborApplicationAck {
            accepted: true,
            contract: Some(contract()),
        })
        .unwrap(),
    );
    employer.outbound.send(ack).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    // checkpoint_frequency=1 gives each of the two steps below a ~50ms
    // (SETTLE_DELAY) gap between its TICK_GRANT_BROADCAST and the next, long
    // enough to land LOAD_CHECKPOINT_BROADCAST in between deterministically.
    let (manager, _manager_id) = Manager::new(fabric.clone(), config(2, Some(1)), &checkpoint_dir);
    let run_handle = tokio::spawn(manager.clone().run());

    tokio::time::sleep(Duration::from_millis(15)).await;
    let load_checkpoint = Packet::new(
        EndpointId::new("driver"),
        None,
        PacketKind::LoadCheckpointBroadcast,
        None,
        serde_json::json!({}),
    );
    fabric.route(load_checkpoint).await;

    tokio::time::timeout(Duration::from_secs(2), run_handle)
        .await
        .expect("manager run should finish within the simulation_steps bound")
        .unwrap();
    tokio::time::timeout(Duration::from_secs(1), gatherer_handle)
        .await
        .expect("gatherer should shut down on KILL_ALL_BROADCAST")
        .unwrap();

    let csv_path = output_dir.join("Statistics").join("wage.csv");
    let rolled = std::fs::read_to_string(&csv_path).unwrap();
    assert_eq!(
        rolled,
        "step,ActiveContracts,WageOutlay(cents)\n0,1,400\n1,0,0\n",
        "the contract recorded before resume must be gone from the row rolled after it"
    );

    std::fs::remove_dir_all(&output_dir).ok();
    std::fs::remove_dir_all(&checkpoint_dir).ok();
}
