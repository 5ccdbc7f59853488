//! Shared error taxonomy (design §7).
//!
//! Six kinds covering the failure taxonomy. Every crate in
//! the workspace either uses this type directly or converts its own
//! `thiserror` enum `From` one of these variants at the boundary where it
//! crosses into another component.

use thiserror::Error;

/// The shared error taxonomy. Precondition failures and peer rejections are
/// expected, non-fatal outcomes a controller should handle; routing errors
/// and lock timeouts are logged but non-fatal; protocol violations are fatal
/// to the offending task only, never to the whole process.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// A local precondition (balance, inventory, hectares) was not met.
    /// Non-fatal: the operation returns `false`/fails fast without emitting a
    /// packet.
    #[error("precondition failed: {detail}")]
    PreconditionFailed { detail: String },

    /// The remote peer's ACK carried `{success: false}`. Non-fatal: caller
    /// rolls back provisional state.
    #[error("peer rejected operation: {detail}")]
    PeerRejected { detail: String },

    /// The fabric could not find a registered destination for a packet.
    #[error("routing error: destination {destination} not registered")]
    RoutingError { destination: String },

    /// A bounded lock acquisition (design value ≈ 5s) timed out. Logged,
    /// non-fatal: the operation returns failure without holding state.
    #[error("lock acquisition timed out after {millis}ms")]
    LockTimeout { millis: u64 },

    /// An invariant was broken (e.g. an ACK rollback would underflow
    /// inventory). Logged at critical severity; the offending task aborts
    /// without propagating further; the manager continues.
    #[error("protocol violation: {detail}")]
    ProtocolViolation { detail: String },

    /// Fatal: surfaced via `PROC_ERROR`, the manager aborts the simulation
    /// cleanly.
    #[error("instantiation error: {detail}")]
    Instantiation { detail: String },
}

impl Error {
    pub fn precondition(detail: impl Into<String>) -> Self {
        Self::PreconditionFailed {
            detail: detail.into(),
        }
    }

    pub fn peer_rejected(detail: impl Into<String>) -> Self {
        Self::PeerRejected {
            detail: detail.into(),
        }
    }

    pub fn routing(destination: impl Into<String>) -> Self {
        Self::RoutingError {
            destination: destination.into(),
        }
    }

    pub fn protocol_violation(detail: impl Into<String>) -> Self {
        Self::ProtocolViolation {
            detail: detail.into(),
        }
    }

    pub fn instantiation(detail: impl Into<String>) -> Self {
        Self::Instantiation {
            detail: detail.into(),
        }
    }

    /// Whether this error should abort only the current task (`true`) versus
    /// being a routine, expected outcome a caller retries or surfaces to its
    /// controller (`false`).
    pub fn is_fatal_to_task(&self) -> bool {
        matches!(self, Error::ProtocolViolation { .. } | Error::Instantiation { .. })
    }
}
