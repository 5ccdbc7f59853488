//! The Statistics Gatherer: a passive observer endpoint.
//!
//! Attaches as a regular endpoint, registers `SNOOP_START` for every packet
//! kind its trackers care about, and rolls each tracker's bucket into a CSV
//! row on every `TICK_GRANT_BROADCAST`. It does not subscribe to tick
//! blocking (the barrier only waits on endpoints that sent
//! `TICK_BLOCK_SUBSCRIBE`) — being a snoop-only observer, the gatherer is
//! never itself part of the tick barrier.

use crate::csv::CsvWriter;
use crate::tracker::Tracker;
use agora_core::ids::EndpointId;
use agora_core::link::Link;
use agora_core::packet::{Packet, PacketKind};
use agora_fabric::Fabric;
use std::collections::HashSet;
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum GathererError {
    #[error("fabric error: {0}")]
    Fabric(#[from] agora_fabric::FabricError),
    #[error("csv error: {0}")]
    Csv(#[from] crate::csv::CsvError),
}

struct TrackedWriter {
    tracker: Box<dyn Tracker>,
    writer: CsvWriter,
}

pub struct Gatherer {
    id: EndpointId,
    fabric: Fabric,
    outbound: mpsc::Sender<Packet>,
    inbound: AsyncMutex<mpsc::Receiver<Packet>>,
    trackers: Vec<TrackedWriter>,
    step: std::sync::atomic::AtomicU64,
}

impl Gatherer {
    /// Register the gatherer's endpoint, open one CSV file per tracker
    /// under `output_dir/Statistics/<name>.csv`, and submit `SNOOP_START`
    /// for the union of every tracker's `snoop_kinds`.
    pub fn new(
        id: EndpointId,
        fabric: Fabric,
        output_dir: impl Into<PathBuf>,
        trackers: Vec<Box<dyn Tracker>>,
    ) -> Result<Self, GathererError> {
        let (endpoint, fabric_handle) = Link::new();
        fabric.register(id.clone(), fabric_handle)?;

        let output_dir = output_dir.into();
        let mut tracked = Vec::with_capacity(trackers.len());
        for tracker in trackers {
            let path = output_dir.join("Statistics").join(format!("{}.csv", tracker.name()));
            let writer = CsvWriter::create(&path, tracker.header())?;
            tracked.push(TrackedWriter { tracker, writer });
        }

        Ok(Self {
            id,
            fabric,
            outbound: endpoint.outbound,
            inbound: AsyncMutex::new(endpoint.inbound),
            trackers: tracked,
            step: std::sync::atomic::AtomicU64::new(0),
        })
    }

    pub fn current_step(&self) -> u64 {
        self.step.load(std::sync::atomic::Ordering::Relaxed)
    }

    async fn send(&self, kind: PacketKind, payload: serde_json::Value) {
        let packet = Packet::new(self.id.clone(), None, kind, None, payload);
        if self.outbound.send(packet).await.is_err() {
            warn!(gatherer = %self.id, "outbound link closed; packet dropped");
        }
    }

    /// Submit `SNOOP_START` for the union of every tracker's kinds, spawn
    /// this endpoint's own fan-out monitor, then service its inbox until
    /// the link closes.
    pub async fn run(mut self) {
        let monitor_id = self.id.clone();
        let monitor_fabric = self.fabric.clone();
        tokio::spawn(async move { monitor_fabric.monitor(&monitor_id).await });

        let mut seen = HashSet::new();
        for tracked in &self.trackers {
            for kind in tracked.tracker.snoop_kinds() {
                if seen.insert(*kind) {
                    self.send(PacketKind::SnoopStart, serde_json::json!({ "kind": *kind as u16 }))
                        .await;
                }
            }
        }

        loop {
            let packet = {
                let mut inbound = self.inbound.lock().await;
                match inbound.recv().await {
                    Some(packet) => packet,
                    None => break,
                }
            };

            match packet.kind {
                PacketKind::TickGrantBroadcast => self.roll_step().await,
                PacketKind::LoadCheckpointBroadcast => {
                    for tracked in &mut self.trackers {
                        tracked.tracker.on_load_checkpoint();
                    }
                }
                PacketKind::KillAllBroadcast => {
                    self.flush_all();
                    self.send(PacketKind::KillPipeNetwork, serde_json::json!({})).await;
                    break;
                }
                other => {
                    for tracked in &mut self.trackers {
                        if tracked.tracker.snoop_kinds().contains(&other) {
                            tracked.tracker.observe(&packet, self.current_step());
                        }
                    }
                }
            }
        }

        info!(gatherer = %self.id, "statistics gatherer shut down");
    }

    async fn roll_step(&mut self) {
        let step = self.step.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        for tracked in &mut self.trackers {
            if let Some(row) = tracked.tracker.roll_step(step) {
                if let Err(err) = tracked.writer.write_row(step, &row) {
                    warn!(gatherer = %self.id, tracker = tracked.tracker.name(), %err, "failed to write statistics row");
                }
            }
        }
        debug!(gatherer = %self.id, step, "rolled step across all trackers");
    }

    fn flush_all(&mut self) {
        for tracked in &mut self.trackers {
            if let Err(err) = tracked.writer.flush() {
                warn!(gatherer = %self.id, tracker = tracked.tracker.name(), %err, "failed to flush statistics writer");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consumption::ConsumptionTracker;
    use agora_agent::payloads::{TradeRequest, TradeRequestAck};
    use agora_core::cents::Cents;
    use agora_core::link::EndpointHandle;
    use std::time::Duration;

    fn connect(fabric: &Fabric, id: &str) -> EndpointHandle {
        let endpoint_id = EndpointId::new(id);
        let (handle, fabric_handle) = Link::new();
        fabric.register(endpoint_id.clone(), fabric_handle).unwrap();
        let monitored = fabric.clone();
        tokio::spawn(async move { monitored.monitor(&endpoint_id).await });
        handle
    }

    fn temp_output_dir() -> PathBuf {
        let mut dir = std::env::temp_dir();
        dir.push(format!("agora-stats-test-{}", uuid::Uuid::new_v4()));
        dir
    }

    #[tokio::test]
    async fn rolls_a_csv_row_per_tick_grant_from_snooped_trades() {
        let fabric = Fabric::new();
        let mut seller = connect(&fabric, "seller-0");
        let mut buyer = connect(&fabric, "consumer-0");

        let output_dir = temp_output_dir();
        let tracker: Box<dyn Tracker> =
            Box::new(ConsumptionTracker::new("consumption", 0, vec!["consumer".to_string()]));
        let gatherer = Gatherer::new(EndpointId::new("gatherer"), fabric.clone(), &output_dir, vec![tracker])
            .unwrap();

        let run_handle = tokio::spawn(gatherer.run());

        // Give SNOOP_START time to land before the trade happens.
        tokio::time::sleep(Duration::from_millis(20)).await;

        let correlation_id = agora_core::ids::CorrelationId::new();
        let request = Packet::new(
            EndpointId::new("consumer-0"),
            Some(EndpointId::new("seller-0")),
            PacketKind::TradeReq,
            Some(correlation_id),
            serde_json::to_value(TradeRequest {
                seller_id: EndpointId::new("seller-0"),
                buyer_id: EndpointId::new("consumer-0"),
                currency_amount: Cents::new(1234),
                item_package: Default::default(),
            })
            .unwrap(),
        );
        buyer.outbound.send(request).await.unwrap();
        // seller answers, completing the protocol the tracker observes
        let ack = Packet::new(
            EndpointId::new("seller-0"),
            Some(EndpointId::new("consumer-0")),
            PacketKind::TradeReqAck,
            Some(correlation_id),
            serde_json::to_value(TradeRequestAck { accepted: true }).unwrap(),
        );
        seller.outbound.send(ack).await.unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;

        let grant = Packet::new(
            EndpointId::new("manager"),
            None,
            PacketKind::TickGrantBroadcast,
            None,
            serde_json::json!({ "ticks": 4 }),
        );
        fabric.route(grant).await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        let kill_all = Packet::new(
            EndpointId::new("manager"),
            None,
            PacketKind::KillAllBroadcast,
            None,
            serde_json::json!({}),
        );
        fabric.route(kill_all).await;

        tokio::time::timeout(Duration::from_secs(1), run_handle)
            .await
            .unwrap()
            .unwrap();

        let csv_path = output_dir.join("Statistics").join("consumption.csv");
        let contents = std::fs::read_to_string(&csv_path).unwrap();
        assert_eq!(contents, "step,Consumption(cents)\n0,1234\n");
        std::fs::remove_dir_all(&output_dir).ok();
    }
}
