//! Process Supervisor errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("fabric error: {0}")]
    Fabric(#[from] agora_fabric::FabricError),

    #[error("agent instantiation failed: {0}")]
    Instantiation(String),
}
