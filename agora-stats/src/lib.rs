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

//! # Statistics Gatherer
//!
//! A passive, snoop-driven observer: each configured
//! [`tracker::Tracker`] registers `SNOOP_START` for the packet kinds it
//! cares about, accumulates a per-step bucket, and rolls it into a CSV row
//! on every `TICK_GRANT_BROADCAST`. Grounded in
//! `analytics::metric`'s per-metric trait shape, generalized from
//! financial metrics to consumption/wage/production observation.

pub mod consumption;
pub mod csv;
pub mod gatherer;
pub mod production;
pub mod tracker;
pub mod wage;

pub use consumption::ConsumptionTracker;
pub use gatherer::{Gatherer, GathererError};
pub use production::ProductionTracker;
pub use tracker::Tracker;
pub use wage::WageTracker;
