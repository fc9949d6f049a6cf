use crate::snapshot::{CounterSnapshot, RawDocument};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Two-tier counter state: the last snapshot confirmed by the remote store plus
/// local optimistic values that have not been reflected back yet.
///
/// Every read goes through [`DailyCounterState::current`], which is the
/// confirmed snapshot overlaid with the optimistic values.
#[derive(Debug, Clone, Default)]
pub struct DailyCounterState {
    confirmed: CounterSnapshot,
    optimistic: BTreeMap<NaiveDate, u64>,
    current: CounterSnapshot,
}

impl DailyCounterState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Authoritative replacement. Drops every optimistic value.
    pub fn on_remote_snapshot(&mut self, raw: &RawDocument) {
        self.confirmed = CounterSnapshot::from_raw(raw);
        self.optimistic.clear();
        self.current = self.confirmed.clone();
    }

    pub fn on_sign_out(&mut self) {
        self.confirmed = CounterSnapshot::new();
        self.optimistic.clear();
        self.current = CounterSnapshot::new();
    }

    /// Records a provisional count. Counts never move backwards locally.
    pub fn apply_optimistic(&mut self, date: NaiveDate, count: u64) {
        if count <= self.current.get(date) {
            return;
        }
        self.optimistic.insert(date, count);
        self.current.set(date, count);
    }

    pub fn count_for(&self, date: NaiveDate) -> u64 {
        self.current.get(date)
    }

    pub fn current(&self) -> &CounterSnapshot {
        &self.current
    }

    pub fn confirmed(&self) -> &CounterSnapshot {
        &self.confirmed
    }

    #[cfg(test)]
    pub fn has_optimistic(&self) -> bool {
        !self.optimistic.is_empty()
    }
}
