//! Per-item utility parameters `{B, D}` (spec data model §3), with the
//! closed-form integrated utility pulled from the reference economic-agent
//! model, since the data is named but not the integration constants.
//!
//! `U'(n) = B / (n+1)^D`. Integrating from 0 to `n`:
//! - `D == 1`: `U(n) = B * ln(n+1)`.
//! - `D != 1`: `U(n) = B * (n+1)^(1-D) / (1-D)`.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UtilityParams {
    pub b: Decimal,
    pub d: Decimal,
}

impl UtilityParams {
    pub fn new(b: Decimal, d: Decimal) -> Self {
        Self { b, d }
    }

    /// `U'(n) = B / (n+1)^D`, evaluated in `f64` since it involves a
    /// non-integer power; `Decimal` has no general `powf`.
    pub fn marginal_utility(&self, n: Decimal) -> f64 {
        let b = self.b.to_f64().unwrap_or_default();
        let d = self.d.to_f64().unwrap_or_default();
        let n = n.to_f64().unwrap_or_default();
        b / (n + 1.0).powf(d)
    }

    /// Closed-form total utility integrated from 0 to `n`.
    pub fn integrated_utility(&self, n: Decimal) -> f64 {
        let b = self.b.to_f64().unwrap_or_default();
        let d = self.d.to_f64().unwrap_or_default();
        let n = n.to_f64().unwrap_or_default();
        if (d - 1.0).abs() < f64::EPSILON {
            b * (n + 1.0).ln()
        } else {
            b * (n + 1.0).powf(1.0 - d) / (1.0 - d)
        }
    }
}
