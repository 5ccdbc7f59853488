//! The item catalog is an external collaborator (spec §6: out of scope).
//! This trait is the contract a catalog loader must satisfy for the agent
//! runtime to look up utility parameters and production recipes.

use crate::utility::UtilityParams;
use agora_core::ids::ItemId;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Quantities of each input item required to produce one unit of an output
/// item.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductionInputs {
    pub requires: HashMap<ItemId, Decimal>,
}

pub trait ItemCatalog: Send + Sync {
    fn utility_params(&self, item: &ItemId) -> Option<UtilityParams>;
    fn production_inputs(&self, item: &ItemId) -> Option<ProductionInputs>;
}

/// A catalog backed by an in-memory map, sufficient for tests and for a
/// configuration-file-driven loader to populate directly.
#[derive(Debug, Default)]
pub struct StaticCatalog {
    utility: HashMap<ItemId, UtilityParams>,
    production: HashMap<ItemId, ProductionInputs>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_utility(mut self, item: ItemId, params: UtilityParams) -> Self {
        self.utility.insert(item, params);
        self
    }

    pub fn with_production(mut self, item: ItemId, inputs: ProductionInputs) -> Self {
        self.production.insert(item, inputs);
        self
    }
}

impl ItemCatalog for StaticCatalog {
    fn utility_params(&self, item: &ItemId) -> Option<UtilityParams> {
        self.utility.get(item).copied()
    }

    fn production_inputs(&self, item: &ItemId) -> Option<ProductionInputs> {
        self.production.get(item).cloned()
    }
}
