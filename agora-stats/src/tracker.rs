//! The per-tracker trait, grounded in
//! `analytics::metric`'s per-metric trait shape — there, each metric
//! (`SharpeRatio`, `ProfitFactor`, `WinRate`, ...) exposes a narrow
//! calculation interface; here the same narrowness is reused for
//! consumption/wage/production observation instead of financial metrics.

use agora_core::packet::{Packet, PacketKind};

/// One statistic, fed snooped packets and rolled into a CSV row once per
/// step.
pub trait Tracker: Send {
    /// Used in logs and to name the tracker's CSV file.
    fn name(&self) -> &str;

    /// Packet kinds this tracker needs `SNOOP_START` registered for.
    fn snoop_kinds(&self) -> &[PacketKind];

    /// Column names after `step` in the CSV header.
    fn header(&self) -> &[&str];

    /// Steps before this one are warm-up and never rolled into a row —
    /// a distinct `startStep` per tracker skips warm-up data.
    fn start_step(&self) -> u64 {
        0
    }

    /// Called for every snooped packet matching [`Tracker::snoop_kinds`].
    fn observe(&mut self, packet: &Packet, current_step: u64);

    /// Called once per `TICK_GRANT_BROADCAST`. Returns the row to write for
    /// `step` (the step just completed), or `None` if `step` is still
    /// within the warm-up window.
    fn roll_step(&mut self, step: u64) -> Option<Vec<String>>;

    /// Called on `LOAD_CHECKPOINT`: re-derive whatever transient state this
    /// tracker caches (e.g. duplicate-delivery sets) rather than trusting
    /// state accumulated before the resume point (on `LOAD_CHECKPOINT`,
    /// each tracker re-polls the state it
    /// maintains"). Default: nothing to re-derive.
    fn on_load_checkpoint(&mut self) {}
}
