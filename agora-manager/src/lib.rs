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

//! # Simulation Manager
//!
//! Drives the tick-clock state machine that coordinates every process
//! supervisor and agent connected to a simulation: it waits for
//! `PROC_READY` from all of them, then alternates granting ticks
//! (`TICK_GRANT_BROADCAST`) and waiting for every subscribed endpoint to
//! block (`TICK_BLOCKED`) before advancing the step counter, periodically
//! checkpointing its own state, and finally winding everything down with
//! `CONTROLLER_MSG_BROADCAST(STOP_TRADING)` followed by
//! `KILL_ALL_BROADCAST`.
//!
//! ## Modules
//!
//! - [`manager`]: the state machine itself ([`Manager`], [`ManagerState`]).
//! - [`config`]: the simulation configuration schema.
//! - [`error`]: the aggregating [`error::ManagerError`].
//! - [`logging`]: tracing initialisers shared with the processes this
//!   manager supervises.
//! - [`shutdown`]: graceful-shutdown traits for manager-hosted components.

/// Simulation configuration schema: `{description?, settings: {...}}`.
pub mod config;

/// Aggregating error type for the manager's subsystem boundaries.
pub mod error;

/// Tracing initialisers.
pub mod logging;

/// The tick-clock state machine itself.
pub mod manager;

/// Graceful-shutdown traits.
pub mod shutdown;

pub use error::ManagerError;
pub use manager::{request_terminate, Manager, ManagerState};
