use crate::models::{Countdown, CountdownPoint, DerivedStats, GoalProgress};
use crate::snapshot::CounterSnapshot;
use chrono::{Duration, NaiveDate};

pub fn total(snapshot: &CounterSnapshot) -> u64 {
    snapshot
        .iter()
        .fold(0u64, |sum, (_, count)| sum.saturating_add(count))
}

pub fn today_count(snapshot: &CounterSnapshot, today: NaiveDate) -> u64 {
    snapshot.get(today)
}

/// An empty day is never a record.
pub fn is_new_record(snapshot: &CounterSnapshot, today: NaiveDate) -> bool {
    let count = snapshot.get(today);
    count > 0 && count >= snapshot.max_count()
}

/// Consecutive active days ending today, or ending yesterday while today is
/// still at zero. Only visits the days that belong to the streak.
pub fn streak(snapshot: &CounterSnapshot, today: NaiveDate) -> u32 {
    let mut cursor = if snapshot.get(today) > 0 {
        today
    } else {
        today - Duration::days(1)
    };

    let mut length = 0u32;
    while snapshot.get(cursor) > 0 {
        length += 1;
        match cursor.pred_opt() {
            Some(previous) => cursor = previous,
            None => break,
        }
    }
    length
}

pub fn derive_stats(snapshot: &CounterSnapshot, today: NaiveDate) -> DerivedStats {
    DerivedStats {
        total: total(snapshot),
        today_count: today_count(snapshot, today),
        is_new_record: is_new_record(snapshot, today),
        streak: streak(snapshot, today),
    }
}

pub fn goal_progress(total: u64, goal: u64) -> GoalProgress {
    let percentage = if goal == 0 {
        if total > 0 { 100.0 } else { 0.0 }
    } else {
        (total as f64 / goal as f64 * 100.0).min(100.0)
    };

    GoalProgress {
        goal,
        total,
        percentage,
    }
}

pub fn countdowns(targets: &[Countdown], today: NaiveDate) -> Vec<CountdownPoint> {
    targets
        .iter()
        .map(|target| CountdownPoint {
            label: target.label.clone(),
            date: target.date,
            days_remaining: (target.date - today).num_days().max(0),
        })
        .collect()
}
