//! Graceful-shutdown traits for manager-hosted components.
//!
//! The same `SyncShutdown` / `AsyncShutdown` trait pair pattern used
//! elsewhere, for components that can tear down immediately versus ones
//! that need to await something (flush a CSV writer, send a final
//! checkpoint). A standalone `Shutdown` marker struct would have no
//! payload beyond signalling intent; here that role is filled by
//! [`agora_fabric::ShutdownSignal`], which additionally lets waiters
//! observe *when* the signal fired, so it is re-exported rather than
//! duplicated.

use std::future::Future;

pub use agora_fabric::ShutdownSignal;

/// Components that can shut down immediately without async operations.
pub trait SyncShutdown {
    type Result;
    fn shutdown(&mut self) -> Self::Result;
}

/// Components that need to perform async operations during shutdown (flush
/// a writer, await an in-flight checkpoint save).
pub trait AsyncShutdown {
    type Result;
    fn shutdown(&mut self) -> impl Future<Output = Self::Result>;
}
