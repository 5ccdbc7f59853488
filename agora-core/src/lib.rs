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

//! # Core — foundation types of the Agora simulation substrate
//!
//! Every other crate in this workspace (`agora-fabric`, `agora-agent`,
//! `agora-markets`, `agora-manager`, `agora-stats`, `agora-supervisor`,
//! `agora-controller`) depends on this crate and only this crate for shared
//! vocabulary. Components never share memory; the only thing that crosses a
//! component boundary is a [`packet::Packet`] travelling across a
//! [`link::Link`].
//!
//! ## Modules
//!
//! - [`ids`]: opaque identifiers (endpoint, correlation, item, allocation tag).
//! - [`packet`]: the wire [`packet::Packet`] and its [`packet::PacketKind`] enum.
//! - [`link`]: the in-process channel pair endpoints use to talk to the fabric.
//! - [`cents`]: the non-negative integer currency type.
//! - [`error`]: the shared error taxonomy (§7 of the design).
//! - [`checkpoint`]: the tagged, versioned checkpoint envelope.

pub mod cents;
pub mod checkpoint;
pub mod error;
pub mod ids;
pub mod link;
pub mod packet;

pub use cents::Cents;
pub use error::Error;
pub use ids::{AllocationTag, CorrelationId, EndpointId, ItemId};
pub use link::Link;
pub use packet::{Packet, PacketKind};

/// Result alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, Error>;
