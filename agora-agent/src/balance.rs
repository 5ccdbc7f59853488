//! Currency balance: a non-negative [`agora_core::cents::Cents`] amount,
//! debited immediately on send (spec data model invariant 1 — "if a pending
//! outbound transfer is in flight, the sender's view is already
//! decremented").

use agora_core::cents::Cents;
use agora_core::error::Error;
use parking_lot::Mutex;

/// Guards one agent's currency balance. Debit/credit are short, synchronous
/// critical sections — never held across an `.await` — matching the
/// design's "decrements its own account under a mutex" step, which happens
/// before the `*_TRANSFER` packet is even constructed.
#[derive(Debug)]
pub struct Balance {
    cents: Mutex<Cents>,
}

impl Balance {
    pub fn new(initial: Cents) -> Self {
        Self {
            cents: Mutex::new(initial),
        }
    }

    pub fn value(&self) -> Cents {
        *self.cents.lock()
    }

    /// Provisional debit ahead of sending a transfer. Fails fast, locally,
    /// on insufficient balance (spec §4.3 step 1) without emitting a packet.
    pub fn debit(&self, amount: Cents) -> Result<(), Error> {
        let mut cents = self.cents.lock();
        *cents = cents.checked_sub(amount).map_err(|_| {
            Error::precondition(format!("balance {cents} insufficient to debit {amount}"))
        })?;
        Ok(())
    }

    /// Credit on receipt, or rollback of a prior debit whose transfer was
    /// rejected (spec §4.3 step 4).
    pub fn credit(&self, amount: Cents) {
        let mut cents = self.cents.lock();
        *cents = cents.checked_add(amount);
    }
}
