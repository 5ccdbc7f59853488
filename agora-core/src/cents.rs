//! Non-negative integer currency, in cents.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// Currency balance or amount, always non-negative (spec data model §3,
/// invariant 1). Arithmetic that would underflow returns
/// [`Error::ProtocolViolation`] rather than panicking or wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Cents(u64);

impl Cents {
    pub const ZERO: Cents = Cents(0);

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(self) -> u64 {
        self.0
    }

    /// Fallible subtraction: `Err` rather than underflow, matching spec §3's
    /// "subtraction that would underflow is a protocol error."
    pub fn checked_sub(self, rhs: Cents) -> Result<Cents, Error> {
        self.0
            .checked_sub(rhs.0)
            .map(Cents)
            .ok_or(Error::ProtocolViolation {
                detail: format!("balance underflow: {} - {}", self.0, rhs.0),
            })
    }

    pub fn checked_add(self, rhs: Cents) -> Cents {
        Cents(self.0.saturating_add(rhs.0))
    }
}

impl Add for Cents {
    type Output = Cents;
    fn add(self, rhs: Cents) -> Cents {
        self.checked_add(rhs)
    }
}

impl Sub for Cents {
    type Output = Cents;
    fn sub(self, rhs: Cents) -> Cents {
        self.checked_sub(rhs)
            .expect("Cents subtraction overflow — use checked_sub at protocol boundaries")
    }
}

impl fmt::Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl From<u64> for Cents {
    fn from(value: u64) -> Self {
        Self(value)
    }
}
