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

//! # Agent Runtime
//!
//! One [`agent::Agent`] per simulated economic actor: balance, inventory,
//! land holdings, labor contracts and accounting, plus the two-phase value
//! transfer protocol, trade request protocol, labor lifecycle and
//! information request/response (design §4.3).
//!
//! State is mutated through short, synchronous, lock-guarded operations
//! (never held across an `.await`); protocol steps that must wait on a
//! peer's ACK do so via [`response_buffer::ResponseBuffer`]'s blocking
//! `tokio::sync::oneshot` wakeups.

pub mod accounting;
pub mod agent;
pub mod balance;
pub mod catalog;
pub mod controller;
pub mod inventory;
pub mod labor;
pub mod land;
pub mod payloads;
pub mod response_buffer;
pub mod utility;

pub use agent::Agent;
pub use controller::Controller;
