use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Opaque identity handed over by the authentication collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn date_key(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_date_key(key: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(key, DATE_FORMAT).ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DerivedStats {
    pub total: u64,
    pub today_count: u64,
    pub is_new_record: bool,
    pub streak: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GoalProgress {
    pub goal: u64,
    pub total: u64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Countdown {
    pub label: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountdownPoint {
    pub label: String,
    pub date: NaiveDate,
    pub days_remaining: i64,
}

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub user_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TodayResponse {
    pub date: String,
    pub count: u64,
    pub is_new_record: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub state: String,
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub date: String,
    pub total: u64,
    pub today_count: u64,
    pub is_new_record: bool,
    pub streak: u32,
    pub goal: GoalProgress,
    pub countdowns: Vec<CountdownPoint>,
    pub pending_writes: usize,
    pub unconfirmed_writes: usize,
    pub failed_writes: u64,
    pub last_sync_error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CalendarCellResponse {
    pub date: String,
    pub weekday: u32,
    pub row: usize,
    pub column: usize,
    pub count: u64,
    pub intensity: &'static str,
    pub is_today: bool,
    pub is_future: bool,
    pub is_highlighted: bool,
    pub tooltip: String,
}

#[derive(Debug, Serialize)]
pub struct MonthLabelResponse {
    pub column: usize,
    pub label: String,
}

#[derive(Debug, Serialize)]
pub struct CalendarResponse {
    pub start: String,
    pub end: String,
    pub weeks: Vec<Vec<CalendarCellResponse>>,
    pub month_labels: Vec<MonthLabelResponse>,
}
