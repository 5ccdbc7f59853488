//! Per-agent accounting: per-step raw totals plus an exponential moving
//! average, one independently enable-flagged channel per series (spec §4.3
//! "Accounting").

use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Default EMA smoothing factor (design value, spec §4.3: "fixed alpha
/// (design value 0.2 unless a counter specifies otherwise)").
pub fn default_alpha() -> Decimal {
    Decimal::new(2, 1)
}

#[derive(Debug, Clone, Copy)]
struct ChannelState {
    enabled: bool,
    step_total: Decimal,
    ema: Option<Decimal>,
    alpha: Decimal,
}

impl ChannelState {
    fn new(alpha: Decimal) -> Self {
        Self {
            enabled: false,
            step_total: Decimal::ZERO,
            ema: None,
            alpha,
        }
    }
}

/// The five accounting series named in the data model: currency inflow,
/// currency outflow, trade revenue, labor income, produced-goods count. Each
/// is independently enabled and tracked under its own lock-free-by-contention
/// entry (the whole map is behind one short-held mutex; readers never await
/// while holding it).
#[derive(Debug)]
pub struct Accounting {
    channels: Mutex<HashMap<&'static str, ChannelState>>,
}

pub const CURRENCY_INFLOW: &str = "currencyInflow";
pub const CURRENCY_OUTFLOW: &str = "currencyOutflow";
pub const TRADE_REVENUE: &str = "tradeRevenue";
pub const LABOR_INCOME: &str = "laborIncome";
pub const PRODUCED_GOODS: &str = "producedGoods";

const ALL_CHANNELS: &[&str] = &[
    CURRENCY_INFLOW,
    CURRENCY_OUTFLOW,
    TRADE_REVENUE,
    LABOR_INCOME,
    PRODUCED_GOODS,
];

impl Default for Accounting {
    fn default() -> Self {
        Self::new()
    }
}

impl Accounting {
    pub fn new() -> Self {
        let mut channels = HashMap::new();
        for name in ALL_CHANNELS {
            channels.insert(*name, ChannelState::new(default_alpha()));
        }
        Self {
            channels: Mutex::new(channels),
        }
    }

    pub fn enable(&self, channel: &str) {
        if let Some(state) = self.channels.lock().get_mut(channel) {
            state.enabled = true;
        }
    }

    pub fn disable(&self, channel: &str) {
        if let Some(state) = self.channels.lock().get_mut(channel) {
            state.enabled = false;
        }
    }

    pub fn is_enabled(&self, channel: &str) -> bool {
        self.channels
            .lock()
            .get(channel)
            .map(|s| s.enabled)
            .unwrap_or(false)
    }

    /// Accumulate `amount` into `channel`'s per-step raw total. A no-op for a
    /// disabled channel: "disabled channels neither accumulate nor are
    /// queryable" (spec §4.3).
    pub fn record(&self, channel: &str, amount: Decimal) {
        if let Some(state) = self.channels.lock().get_mut(channel) {
            if state.enabled {
                state.step_total += amount;
            }
        }
    }

    /// Roll the per-step total into the running EMA and reset it, called at
    /// each tick-grant boundary (spec §4.3: "Per-step raw totals reset at
    /// tick-grant boundaries").
    pub fn roll_step(&self, channel: &str) {
        if let Some(state) = self.channels.lock().get_mut(channel) {
            if !state.enabled {
                return;
            }
            state.ema = Some(match state.ema {
                None => state.step_total,
                Some(previous) => {
                    state.alpha * state.step_total + (Decimal::ONE - state.alpha) * previous
                }
            });
            state.step_total = Decimal::ZERO;
        }
    }

    /// The channel's current EMA, or `None` if disabled or never rolled.
    pub fn ema(&self, channel: &str) -> Option<Decimal> {
        self.channels.lock().get(channel).and_then(|s| {
            if s.enabled {
                s.ema
            } else {
                None
            }
        })
    }

    pub fn step_total(&self, channel: &str) -> Option<Decimal> {
        self.channels.lock().get(channel).and_then(|s| {
            if s.enabled {
                Some(s.step_total)
            } else {
                None
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn disabled_channel_neither_accumulates_nor_is_queryable() {
        let accounting = Accounting::new();
        accounting.record(CURRENCY_INFLOW, dec!(100));
        assert_eq!(accounting.step_total(CURRENCY_INFLOW), None);
        assert_eq!(accounting.ema(CURRENCY_INFLOW), None);
    }

    #[test]
    fn ema_rolls_with_default_alpha() {
        let accounting = Accounting::new();
        accounting.enable(TRADE_REVENUE);
        accounting.record(TRADE_REVENUE, dec!(100));
        accounting.roll_step(TRADE_REVENUE);
        assert_eq!(accounting.ema(TRADE_REVENUE), Some(dec!(100)));

        accounting.record(TRADE_REVENUE, dec!(0));
        accounting.roll_step(TRADE_REVENUE);
        // alpha=0.2: 0.2*0 + 0.8*100 = 80
        assert_eq!(accounting.ema(TRADE_REVENUE), Some(dec!(80.0)));
    }

    #[test]
    fn step_total_resets_after_roll() {
        let accounting = Accounting::new();
        accounting.enable(LABOR_INCOME);
        accounting.record(LABOR_INCOME, dec!(40));
        accounting.roll_step(LABOR_INCOME);
        assert_eq!(accounting.step_total(LABOR_INCOME), Some(Decimal::ZERO));
    }
}
