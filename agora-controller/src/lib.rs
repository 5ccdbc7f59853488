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

//! # Controller base implementations
//!
//! Base (non-decision) implementations of [`agora_agent::controller::Controller`].
//! These exist only to exercise the substrate in tests, not as scientific
//! decision logic:
//!
//! - [`NullController`] — accepts nothing; exercises rejection paths.
//! - [`AlwaysAcceptController`] — accepts every well-formed trade, job
//!   application or land offer; exercises the conservation-law property
//!   tests, and demonstrates the save/load-checkpoint hooks.

pub mod always_accept;
pub mod null;

pub use always_accept::AlwaysAcceptController;
pub use null::NullController;
