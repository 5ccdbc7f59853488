//! A generic billboard: one marketplace implementation shared by item,
//! labor and land listings (spec §4.4). Using one generic implementation
//! for all three listing kinds makes the original's labor-marketplace
//! transcription bug (referencing item-marketplace fields) structurally
//! unrepresentable — there is only one code path, parameterized by
//! [`crate::listing::Listing`].
//!
//! Concurrency model (spec §4.4): a per-primary-key lock serializes
//! structural changes (creating a new primary-key bucket); updates to an
//! existing bucket's seller-keyed entries need no outer lock because the
//! outer dictionary's size does not change.

use agora_core::ids::EndpointId;
use parking_lot::RwLock;
use rand::seq::SliceRandom;
use std::collections::HashMap;
use tracing::trace;

use crate::listing::Listing;

type Bucket<L> = RwLock<HashMap<EndpointId, L>>;

#[derive(Debug)]
pub struct Billboard<L: Listing> {
    buckets: RwLock<HashMap<L::PrimaryKey, Bucket<L>>>,
}

impl<L: Listing> Default for Billboard<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: Listing> Billboard<L> {
    pub fn new() -> Self {
        Self {
            buckets: RwLock::new(HashMap::new()),
        }
    }

    /// Upsert `listing` keyed by `(primaryKey, sellerId)`. No ACK, best
    /// effort (spec §4.4).
    pub fn update(&self, listing: L) {
        let key = listing.primary_key();
        let seller = listing.seller_id().clone();

        // Fast path: bucket already exists, no structural change needed.
        {
            let buckets = self.buckets.read();
            if let Some(bucket) = buckets.get(&key) {
                bucket.write().insert(seller.clone(), listing);
                trace!(%seller, "listing updated in existing bucket");
                return;
            }
        }

        // Slow path: creating a new primary-key bucket is structural,
        // serialize it under the outer write lock.
        let mut buckets = self.buckets.write();
        buckets
            .entry(key)
            .or_insert_with(|| RwLock::new(HashMap::new()))
            .write()
            .insert(seller.clone(), listing);
        trace!(%seller, "listing created in a new bucket");
    }

    /// Delete by key. Idempotent: removing an absent entry is a no-op
    /// (spec §4.4).
    pub fn remove(&self, key: &L::PrimaryKey, seller_id: &EndpointId) {
        let buckets = self.buckets.read();
        if let Some(bucket) = buckets.get(key) {
            bucket.write().remove(seller_id);
            trace!(%seller_id, "listing removed");
        }
    }

    /// Snapshot-sample up to `sample_size` listings matching `filter`,
    /// drawn uniformly at random without replacement; returns all matches
    /// if fewer exist (spec §4.4). Concurrent updates mid-sample are not
    /// observed — each bucket is read-locked only long enough to clone its
    /// current listings.
    pub fn sample(&self, filter: impl Fn(&L) -> bool, sample_size: usize) -> Vec<L> {
        let matching: Vec<L> = {
            let buckets = self.buckets.read();
            buckets
                .values()
                .flat_map(|bucket| bucket.read().values().cloned().collect::<Vec<_>>())
                .filter(|listing| filter(listing))
                .collect()
        };
        let mut rng = rand::rng();
        let mut chosen: Vec<L> = matching.choose_multiple(&mut rng, sample_size).cloned().collect();
        chosen.truncate(sample_size);
        chosen
    }

    /// Total listings currently on the board, across all sellers and keys.
    pub fn len(&self) -> usize {
        self.buckets.read().values().map(|b| b.read().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
