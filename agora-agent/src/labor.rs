//! Labor contracts: `LaborContract`, keyed by a contract hash and indexed
//! secondarily by end step so both parties can garbage-collect expired
//! contracts symmetrically (spec §4.3 "Labor lifecycle", last bullet).

use agora_core::cents::Cents;
use agora_core::ids::EndpointId;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::collections::{hash_map::DefaultHasher, BTreeMap, HashMap};
use std::hash::{Hash, Hasher};

/// A contract derived from a [`crate::market::LaborListing`] (`agora-markets`)
/// accepted in step `s`: `endStep = s + contractLength - 1` (spec data model
/// §3).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LaborContract {
    pub employer_id: EndpointId,
    pub worker_id: EndpointId,
    pub ticks_per_step: u32,
    pub wage_per_tick: Cents,
    pub worker_skill_level: DecimalBits,
    pub start_step: u64,
    pub end_step: u64,
    pub contract_name: SmolStr,
}

/// `rust_decimal::Decimal` doesn't implement `Hash`; this newtype stores its
/// canonical string form for hashing purposes while round-tripping exactly
/// through `Decimal` for arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecimalBits(pub Decimal);

impl Hash for DecimalBits {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.normalize().to_string().hash(state);
    }
}

impl From<Decimal> for DecimalBits {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

/// A stable, process-local identifier for one [`LaborContract`] value,
/// derived by hashing its fields. Not a security primitive — collisions are
/// treated as "this is the same contract," which duplicate-delivery
/// detection (`agora-stats`) relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContractHash(u64);

impl std::fmt::Display for ContractHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl ContractHash {
    /// The hash's raw wire form, as carried by `LABOR_CONTRACT_CANCEL`'s
    /// payload (a plain number, not this opaque newtype).
    pub fn as_u64(self) -> u64 {
        self.0
    }

    pub fn from_u64(value: u64) -> Self {
        Self(value)
    }
}

impl LaborContract {
    pub fn hash(&self) -> ContractHash {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        ContractHash(hasher.finish())
    }
}

/// One agent's set of active labor contracts, keyed by [`ContractHash`] and
/// secondarily indexed by end step for O(expiring) garbage collection.
#[derive(Debug, Default)]
pub struct LaborContracts {
    by_hash: Mutex<HashMap<ContractHash, LaborContract>>,
    by_end_step: Mutex<BTreeMap<u64, Vec<ContractHash>>>,
}

impl LaborContracts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a contract. Returns `false` without mutating state if a contract
    /// with the same hash is already present (duplicate-delivery guard).
    pub fn insert(&self, contract: LaborContract) -> bool {
        let hash = contract.hash();
        let mut by_hash = self.by_hash.lock();
        if by_hash.contains_key(&hash) {
            return false;
        }
        self.by_end_step
            .lock()
            .entry(contract.end_step)
            .or_default()
            .push(hash);
        by_hash.insert(hash, contract);
        true
    }

    pub fn remove(&self, hash: ContractHash) -> Option<LaborContract> {
        let removed = self.by_hash.lock().remove(&hash)?;
        if let Some(bucket) = self.by_end_step.lock().get_mut(&removed.end_step) {
            bucket.retain(|h| *h != hash);
        }
        Some(removed)
    }

    pub fn get(&self, hash: ContractHash) -> Option<LaborContract> {
        self.by_hash.lock().get(&hash).cloned()
    }

    pub fn active(&self) -> Vec<LaborContract> {
        self.by_hash.lock().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.by_hash.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Garbage-collect every contract whose `end_step < current_step`
    /// (spec: "at `endStep + 1`, contracts are garbage-collected"). Returns
    /// the removed contracts so a caller can notify accounting/the peer.
    pub fn gc(&self, current_step: u64) -> Vec<LaborContract> {
        let expired_steps: Vec<u64> = {
            let by_end_step = self.by_end_step.lock();
            by_end_step.range(..current_step).map(|(step, _)| *step).collect()
        };
        let mut removed = Vec::new();
        for step in expired_steps {
            let hashes = self.by_end_step.lock().remove(&step).unwrap_or_default();
            let mut by_hash = self.by_hash.lock();
            for hash in hashes {
                if let Some(contract) = by_hash.remove(&hash) {
                    removed.push(contract);
                }
            }
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_contract(end_step: u64) -> LaborContract {
        LaborContract {
            employer_id: EndpointId::new("employer-1"),
            worker_id: EndpointId::new("worker-1"),
            ticks_per_step: 4,
            wage_per_tick: Cents::new(50),
            worker_skill_level: dec!(2.5).into(),
            start_step: 0,
            end_step,
            contract_name: "harvest-hand".into(),
        }
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let contracts = LaborContracts::new();
        assert!(contracts.insert(sample_contract(10)));
        assert!(!contracts.insert(sample_contract(10)));
        assert_eq!(contracts.len(), 1);
    }

    #[test]
    fn gc_removes_only_expired_contracts() {
        let contracts = LaborContracts::new();
        contracts.insert(sample_contract(5));
        contracts.insert(sample_contract(20));
        let removed = contracts.gc(10);
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].end_step, 5);
        assert_eq!(contracts.len(), 1);
    }

    #[test]
    fn contract_visible_through_end_step_inclusive() {
        let contracts = LaborContracts::new();
        contracts.insert(sample_contract(5));
        assert_eq!(contracts.gc(5).len(), 0, "end_step itself is still active");
        assert_eq!(contracts.gc(6).len(), 1, "expires the step after end_step");
    }
}
