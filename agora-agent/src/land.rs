//! Land holdings: `allocation tag -> hectares`. `"UNALLOCATED"` and
//! `"ALLOCATING"` are reserved tags (spec data model §3).

use agora_core::error::Error;
use agora_core::ids::AllocationTag;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct LandHoldings {
    hectares: Mutex<HashMap<AllocationTag, Decimal>>,
}

impl LandHoldings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hectares(&self, tag: &AllocationTag) -> Decimal {
        self.hectares.lock().get(tag).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn debit(&self, tag: &AllocationTag, amount: Decimal) -> Result<(), Error> {
        let mut hectares = self.hectares.lock();
        let current = hectares.get(tag).copied().unwrap_or(Decimal::ZERO);
        if current < amount {
            return Err(Error::precondition(format!(
                "land allocation {tag} has {current}ha, cannot debit {amount}ha"
            )));
        }
        hectares.insert(tag.clone(), current - amount);
        Ok(())
    }

    pub fn credit(&self, tag: &AllocationTag, amount: Decimal) {
        let mut hectares = self.hectares.lock();
        let current = hectares.get(tag).copied().unwrap_or(Decimal::ZERO);
        hectares.insert(tag.clone(), current + amount);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn reserved_tags_hold_hectares_like_any_other() {
        let holdings = LandHoldings::new();
        let unallocated = AllocationTag::unallocated();
        holdings.credit(&unallocated, dec!(40));
        assert_eq!(holdings.hectares(&unallocated), dec!(40));
    }

    #[test]
    fn debit_more_than_held_fails_without_mutation() {
        let holdings = LandHoldings::new();
        let east = AllocationTag::new("farmland-east");
        holdings.credit(&east, dec!(5));
        assert!(holdings.debit(&east, dec!(10)).is_err());
        assert_eq!(holdings.hectares(&east), dec!(5));
    }
}
