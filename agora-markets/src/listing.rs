//! Listing entity shapes (spec data model §3). All immutable once
//! constructed; an `UPDATE` replaces the whole value at the same
//! `(primaryKey, sellerId)` key.

use agora_core::cents::Cents;
use agora_core::ids::{AllocationTag, EndpointId, ItemId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// What a [`crate::billboard::Billboard`] needs from a listing type: its
/// composite key's primary component (the key's `sellerId` component is
/// `seller_id()`, shared by every listing kind).
pub trait Listing: Clone + Send + Sync + 'static {
    type PrimaryKey: std::hash::Hash + Eq + Clone + Send + Sync;

    fn primary_key(&self) -> Self::PrimaryKey;
    fn seller_id(&self) -> &EndpointId;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemListing {
    pub seller_id: EndpointId,
    pub item_id: ItemId,
    pub unit_price: Cents,
    pub max_quantity: Decimal,
}

impl Listing for ItemListing {
    type PrimaryKey = ItemId;

    fn primary_key(&self) -> ItemId {
        self.item_id.clone()
    }

    fn seller_id(&self) -> &EndpointId {
        &self.seller_id
    }
}

/// The labor marketplace's primary key is the listing's `name`, the same
/// way an item listing's primary key is its `itemId` — a distinct,
/// listing-kind-appropriate field, never borrowed from another listing
/// kind's shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaborListing {
    pub employer_id: EndpointId,
    pub ticks_per_step: u32,
    pub wage_per_tick: Cents,
    pub min_skill_level: Decimal,
    pub contract_length: u32,
    pub name: SmolStr,
}

impl Listing for LaborListing {
    type PrimaryKey = SmolStr;

    fn primary_key(&self) -> SmolStr {
        self.name.clone()
    }

    fn seller_id(&self) -> &EndpointId {
        &self.employer_id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandListing {
    pub seller_id: EndpointId,
    pub allocation: AllocationTag,
    pub hectares: Decimal,
    pub price_per_hectare: Cents,
}

impl Listing for LandListing {
    type PrimaryKey = AllocationTag;

    fn primary_key(&self) -> AllocationTag {
        self.allocation.clone()
    }

    fn seller_id(&self) -> &EndpointId {
        &self.seller_id
    }
}
