use crate::models::date_key;
use crate::snapshot::{CounterSnapshot, RawDocument};
use crate::sync::DailyCounterState;
use chrono::NaiveDate;
use serde_json::Value;
use std::collections::VecDeque;

/// A merge-write produced by one increment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingWrite {
    pub key: String,
    pub date: NaiveDate,
    pub count: u64,
    pub epoch: u64,
    pub seq: u64,
}

impl PendingWrite {
    pub fn patch(&self) -> RawDocument {
        let mut patch = RawDocument::new();
        patch.insert(date_key(self.date), Value::from(self.count));
        patch
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct InFlight {
    seq: u64,
    date: NaiveDate,
    count: u64,
    /// Accepted by the store.
    stored: bool,
    /// Already covered by a confirmed snapshot.
    echoed: bool,
}

/// Turns completion signals into strictly increasing counts for a day, even
/// when several increments are issued before the store answers.
#[derive(Debug, Default)]
pub struct IncrementCoordinator {
    next_seq: u64,
    in_flight: VecDeque<InFlight>,
    failed_writes: u64,
}

impl IncrementCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(
        &mut self,
        counters: &mut DailyCounterState,
        key: &str,
        date: NaiveDate,
        epoch: u64,
    ) -> PendingWrite {
        let known = counters.count_for(date);
        let issued = self
            .in_flight
            .iter()
            .filter(|write| write.date == date && !write.echoed)
            .map(|write| write.count)
            .max()
            .unwrap_or(0);
        let count = known.max(issued).saturating_add(1);

        let seq = self.next_seq;
        self.next_seq += 1;
        self.in_flight.push_back(InFlight {
            seq,
            date,
            count,
            stored: false,
            echoed: false,
        });
        counters.apply_optimistic(date, count);

        PendingWrite {
            key: key.to_string(),
            date,
            count,
            epoch,
            seq,
        }
    }

    /// Marks a write as finished. A stored write keeps raising the base until
    /// a snapshot reflects it, unless one already did before the store
    /// answered. A failed one is forgotten, but the optimistic value stays.
    pub fn settle(&mut self, seq: u64, succeeded: bool) -> bool {
        let Some(position) = self
            .in_flight
            .iter()
            .position(|write| write.seq == seq && !write.stored)
        else {
            return false;
        };
        if succeeded && self.in_flight[position].echoed {
            self.in_flight.remove(position);
        } else if succeeded {
            self.in_flight[position].stored = true;
        } else {
            self.in_flight.remove(position);
            self.failed_writes += 1;
        }
        true
    }

    /// Forgets stored writes the confirmed snapshot already covers. Writes
    /// still waiting on the store are marked so their answer retires them.
    pub fn reconcile(&mut self, confirmed: &CounterSnapshot) {
        self.in_flight.retain_mut(|write| {
            if write.count > confirmed.get(write.date) {
                return true;
            }
            write.echoed = true;
            !write.stored
        });
    }

    pub fn reset(&mut self) {
        self.in_flight.clear();
    }

    /// Writes the store has not answered yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight.iter().filter(|write| !write.stored).count()
    }

    /// Stored writes no snapshot has reflected yet.
    pub fn unconfirmed(&self) -> usize {
        self.in_flight.iter().filter(|write| write.stored).count()
    }

    pub fn failed_writes(&self) -> u64 {
        self.failed_writes
    }
}
