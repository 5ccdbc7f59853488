//! Manager-local errors. Mirrors `toucan_core::error::ToucanError`'s shape
//! (a small aggregating enum with `#[from]` conversions at each subsystem
//! boundary) generalized to the manager's own boundaries: configuration
//! parsing, the fabric, and checkpoint I/O.

use crate::config::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("fabric error: {0}")]
    Fabric(#[from] agora_fabric::FabricError),

    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] agora_core::checkpoint::CheckpointError),

    #[error("instantiation failed: {0}")]
    Instantiation(String),
}
