//! Item inventory: `itemId -> quantity`, fixed-point with ~6 fractional
//! digits (spec data model §3), never negative.

use agora_core::error::Error;
use agora_core::ids::ItemId;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Rounding scale applied to every quantity mutation, matching spec's "~6
/// fractional digits".
pub const QUANTITY_SCALE: u32 = 6;

#[derive(Debug, Default)]
pub struct Inventory {
    quantities: Mutex<HashMap<ItemId, Decimal>>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn quantity(&self, item: &ItemId) -> Decimal {
        self.quantities
            .lock()
            .get(item)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Provisional debit ahead of an `ITEM_TRANSFER`. Insufficient quantity
    /// fails fast locally (spec §4.3 step 1); this never underflows the
    /// stored amount.
    pub fn debit(&self, item: &ItemId, amount: Decimal) -> Result<(), Error> {
        let mut quantities = self.quantities.lock();
        let current = quantities.get(item).copied().unwrap_or(Decimal::ZERO);
        if current < amount {
            return Err(Error::precondition(format!(
                "inventory of {item} has {current}, cannot debit {amount}"
            )));
        }
        let updated = (current - amount).round_dp(QUANTITY_SCALE);
        quantities.insert(item.clone(), updated);
        Ok(())
    }

    /// Credit on receipt, or rollback of a prior debit (spec §4.3 step 4).
    pub fn credit(&self, item: &ItemId, amount: Decimal) {
        let mut quantities = self.quantities.lock();
        let current = quantities.get(item).copied().unwrap_or(Decimal::ZERO);
        quantities.insert(item.clone(), (current + amount).round_dp(QUANTITY_SCALE));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn debit_past_zero_is_rejected_without_mutating_state() {
        let inventory = Inventory::new();
        let wheat = ItemId::new("wheat");
        inventory.credit(&wheat, dec!(1.0));
        assert!(inventory.debit(&wheat, dec!(2.0)).is_err());
        assert_eq!(inventory.quantity(&wheat), dec!(1.0));
    }

    #[test]
    fn debit_then_credit_round_trips_exactly() {
        let inventory = Inventory::new();
        let wheat = ItemId::new("wheat");
        inventory.credit(&wheat, dec!(10.123456));
        inventory.debit(&wheat, dec!(3.000001)).unwrap();
        inventory.credit(&wheat, dec!(3.000001));
        assert_eq!(inventory.quantity(&wheat), dec!(10.123456));
    }
}
