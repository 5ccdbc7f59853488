//! [`Link`]: the in-process channel pair an endpoint uses to talk to the
//! Connection Fabric (design §4.1).
//!
//! A Link preserves per-sender FIFO ordering in each direction (design §3,
//! invariant 2) because it is backed by a `tokio::sync::mpsc` channel, which
//! is itself FIFO. The fabric may still reorder *across* senders — nothing
//! here promises a global order.

use crate::packet::Packet;
use tokio::sync::mpsc;

/// Bounded channel capacity used for endpoint inboxes and the fabric-side
/// handle. A bounded channel gives natural back-pressure; an endpoint that
/// can't keep up with its inbox stalls its senders rather than growing
/// without limit.
pub const DEFAULT_LINK_CAPACITY: usize = 1024;

/// The endpoint-side half of a Link: receive inbound packets, send outbound
/// ones to the fabric.
#[derive(Debug)]
pub struct EndpointHandle {
    pub outbound: mpsc::Sender<Packet>,
    pub inbound: mpsc::Receiver<Packet>,
}

/// The fabric-side half of a Link: send packets to the endpoint's inbox,
/// read what the endpoint sends outbound.
#[derive(Debug)]
pub struct FabricHandle {
    pub inbound: mpsc::Sender<Packet>,
    pub outbound: mpsc::Receiver<Packet>,
}

/// A Link is a pair of ordered, reliable, in-process channels between one
/// endpoint and the fabric (design §4.1). Constructing one returns both
/// halves: the endpoint keeps [`EndpointHandle`], the fabric keeps
/// [`FabricHandle`].
#[derive(Debug)]
pub struct Link;

impl Link {
    /// Build a fresh Link pair with the default capacity.
    pub fn new() -> (EndpointHandle, FabricHandle) {
        Self::with_capacity(DEFAULT_LINK_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> (EndpointHandle, FabricHandle) {
        let (to_endpoint_tx, to_endpoint_rx) = mpsc::channel(capacity);
        let (to_fabric_tx, to_fabric_rx) = mpsc::channel(capacity);
        (
            EndpointHandle {
                outbound: to_fabric_tx,
                inbound: to_endpoint_rx,
            },
            FabricHandle {
                inbound: to_endpoint_tx,
                outbound: to_fabric_rx,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::EndpointId;
    use crate::packet::PacketKind;

    #[tokio::test]
    async fn fifo_order_is_preserved_per_sender() {
        let (mut endpoint, mut fabric) = Link::new();

        for i in 0..5u32 {
            endpoint
                .outbound
                .send(Packet::new(
                    EndpointId::new("a"),
                    None,
                    PacketKind::InfoReq,
                    None,
                    serde_json::json!({ "seq": i }),
                ))
                .await
                .unwrap();
        }

        for i in 0..5u32 {
            let packet = fabric.outbound.recv().await.unwrap();
            assert_eq!(packet.payload["seq"], i);
        }
    }
}
