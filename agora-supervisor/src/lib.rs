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

//! # Process Supervisor
//!
//! Each worker process hosts a subset of agents chosen by round-robin over
//! the spawn list: on launch, instantiate all assigned
//! agents, report `PROC_READY`/`PROC_ERROR` to the Simulation Manager, then
//! service the management link until told to stop, running a periodic
//! garbage-collection pass every *K* `TICK_GRANT`s.

pub mod assign;
pub mod error;
pub mod worker;

pub use assign::assign_round_robin;
pub use error::SupervisorError;
pub use worker::Worker;
