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

//! # Marketplaces
//!
//! Three billboards — item, labor, land — each keyed by
//! `(primaryKey, sellerId)` (spec §4.4), sharing one generic
//! [`billboard::Billboard`] implementation.

pub mod billboard;
pub mod listing;

pub use billboard::Billboard;
pub use listing::{ItemListing, LaborListing, LandListing, Listing};

use rust_decimal::Decimal;

pub type ItemMarket = Billboard<ItemListing>;
pub type LaborMarket = Billboard<LaborListing>;
pub type LandMarket = Billboard<LandListing>;

/// Labor sampling's skill-range filter (spec §9 open question, resolved):
/// a worker with `worker_skill` samples only listings whose
/// `minSkillLevel` they meet.
pub fn meets_skill_requirement(listing: &LaborListing, worker_skill: Decimal) -> bool {
    worker_skill >= listing.min_skill_level
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_core::ids::EndpointId;
    use rust_decimal_macros::dec;
    use smol_str::SmolStr;

    #[test]
    fn skill_filter_excludes_listings_above_worker_skill() {
        let listing = LaborListing {
            employer_id: EndpointId::new("farm-co"),
            ticks_per_step: 8,
            wage_per_tick: agora_core::cents::Cents::new(25),
            min_skill_level: dec!(3.0),
            contract_length: 10,
            name: SmolStr::new("harvester"),
        };
        assert!(!meets_skill_requirement(&listing, dec!(2.0)));
        assert!(meets_skill_requirement(&listing, dec!(3.0)));
    }
}
