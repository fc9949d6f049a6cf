use crate::models::parse_date_key;
use chrono::NaiveDate;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

/// Raw document as delivered by the remote store. May carry fields that are
/// not dates.
pub type RawDocument = Map<String, Value>;

/// Date to count mapping for one user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    days: BTreeMap<NaiveDate, u64>,
}

impl CounterSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps only entries whose key is a `YYYY-MM-DD` date and whose value is a
    /// non-negative integer.
    pub fn from_raw(raw: &RawDocument) -> Self {
        let mut days = BTreeMap::new();
        for (key, value) in raw {
            match (parse_date_key(key), value.as_u64()) {
                (Some(date), Some(count)) => {
                    days.insert(date, count);
                }
                _ => debug!(field = %key, "skipping non-count field in remote document"),
            }
        }
        Self { days }
    }

    pub fn get(&self, date: NaiveDate) -> u64 {
        self.days.get(&date).copied().unwrap_or(0)
    }

    /// Explicit overwrite, used for optimistic values and backfill.
    pub fn set(&mut self, date: NaiveDate, count: u64) {
        self.days.insert(date, count);
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, u64)> + '_ {
        self.days.iter().map(|(date, count)| (*date, *count))
    }

    pub fn max_count(&self) -> u64 {
        self.days.values().copied().max().unwrap_or(0)
    }
}

impl FromIterator<(NaiveDate, u64)> for CounterSnapshot {
    fn from_iter<T: IntoIterator<Item = (NaiveDate, u64)>>(iter: T) -> Self {
        Self {
            days: iter.into_iter().collect(),
        }
    }
}
