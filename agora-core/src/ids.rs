//! Opaque identifiers shared across the substrate.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt;
use uuid::Uuid;

/// Identifies a routable endpoint registered with the Connection Fabric: an
/// agent, the Simulation Manager, the Statistics Gatherer, or a process
/// supervisor's management link.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EndpointId(SmolStr);

impl EndpointId {
    pub fn new(id: impl Into<SmolStr>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl<T: Into<SmolStr>> From<T> for EndpointId {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

/// Opaque identifier echoed by a reply to match it to its originating
/// request. Minted fresh per outbound `*_TRANSFER`/`*_REQ`, or supplied by the
/// caller when a reply must correlate back to an earlier request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    /// Mint a fresh correlation id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies an item kind in the catalog (`examples/original_source` calls
/// this a "good"). The catalog itself is an external collaborator; this type
/// is only the key other components index by.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemId(SmolStr);

impl ItemId {
    pub fn new(id: impl Into<SmolStr>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl<T: Into<SmolStr>> From<T> for ItemId {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

/// Key into an agent's `landHoldings` map. `"UNALLOCATED"` and `"ALLOCATING"`
/// are reserved tags (spec data model §3).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AllocationTag(SmolStr);

impl AllocationTag {
    pub const UNALLOCATED: &'static str = "UNALLOCATED";
    pub const ALLOCATING: &'static str = "ALLOCATING";

    pub fn new(tag: impl Into<SmolStr>) -> Self {
        Self(tag.into())
    }

    pub fn unallocated() -> Self {
        Self::new(Self::UNALLOCATED)
    }

    pub fn allocating() -> Self {
        Self::new(Self::ALLOCATING)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_reserved(&self) -> bool {
        matches!(self.0.as_str(), Self::UNALLOCATED | Self::ALLOCATING)
    }
}

impl fmt::Display for AllocationTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_tags_are_detected() {
        assert!(AllocationTag::unallocated().is_reserved());
        assert!(AllocationTag::allocating().is_reserved());
        assert!(!AllocationTag::new("farmland-east").is_reserved());
    }

    #[test]
    fn correlation_ids_are_unique() {
        let a = CorrelationId::new();
        let b = CorrelationId::new();
        assert_ne!(a, b);
    }
}
