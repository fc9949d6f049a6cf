use chrono::{Datelike, Duration, NaiveDate, Weekday};
use std::sync::Arc;
use tokio::sync::Mutex;

pub const DAYS_PER_WEEK: usize = 7;
pub const DEFAULT_WINDOW_DAYS: i64 = 180;
/// Roughly ten years either side of today.
pub const MAX_WINDOW_DAYS: i64 = 3660;

/// Parameters of the display window around "today".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridWindow {
    pub days_before: i64,
    pub days_after: i64,
    pub week_start: Weekday,
}

impl Default for GridWindow {
    fn default() -> Self {
        Self {
            days_before: DEFAULT_WINDOW_DAYS,
            days_after: DEFAULT_WINDOW_DAYS,
            week_start: Weekday::Sun,
        }
    }
}

impl GridWindow {
    pub fn symmetric(days: i64, week_start: Weekday) -> Self {
        Self {
            days_before: days,
            days_after: days,
            week_start,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarCell {
    pub date: NaiveDate,
    /// 0 = Sunday .. 6 = Saturday.
    pub weekday: u32,
    /// Position inside the week-column, 0 is the window's week start.
    pub row: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthLabel {
    pub column: usize,
    pub year: i32,
    pub month: u32,
}

impl MonthLabel {
    pub fn text(&self) -> String {
        format!("{}-{:02}", self.year, self.month)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarGrid {
    pub today: NaiveDate,
    pub window: GridWindow,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub weeks: Vec<[CalendarCell; DAYS_PER_WEEK]>,
    pub month_labels: Vec<MonthLabel>,
}

impl CalendarGrid {
    pub fn cells(&self) -> impl Iterator<Item = &CalendarCell> {
        self.weeks.iter().flat_map(|week| week.iter())
    }
}

pub fn start_of_week(date: NaiveDate, week_start: Weekday) -> NaiveDate {
    date - Duration::days(days_since(date.weekday(), week_start))
}

pub fn end_of_week(date: NaiveDate, week_start: Weekday) -> NaiveDate {
    start_of_week(date, week_start) + Duration::days(DAYS_PER_WEEK as i64 - 1)
}

fn days_since(day: Weekday, week_start: Weekday) -> i64 {
    let day = i64::from(day.num_days_from_monday());
    let start = i64::from(week_start.num_days_from_monday());
    (day - start).rem_euclid(DAYS_PER_WEEK as i64)
}

/// Lays out full weeks from the week containing `today - days_before` up to the
/// week containing `today + days_after`. Independent of any counts. Window
/// sizes are clamped to `0..=MAX_WINDOW_DAYS`.
pub fn build_grid(today: NaiveDate, window: GridWindow) -> CalendarGrid {
    let before = window.days_before.clamp(0, MAX_WINDOW_DAYS);
    let after = window.days_after.clamp(0, MAX_WINDOW_DAYS);
    let start = start_of_week(today - Duration::days(before), window.week_start);
    let end = end_of_week(today + Duration::days(after), window.week_start);
    let week_count = ((end - start).num_days() as usize + 1) / DAYS_PER_WEEK;

    let mut weeks = Vec::with_capacity(week_count);
    let mut month_labels = Vec::new();
    for column in 0..week_count {
        let week_start = start + Duration::weeks(column as i64);
        let week: [CalendarCell; DAYS_PER_WEEK] = std::array::from_fn(|row| {
            let date = week_start + Duration::days(row as i64);
            CalendarCell {
                date,
                weekday: date.weekday().num_days_from_sunday(),
                row,
                column,
            }
        });

        if let Some(first) = week.iter().find(|cell| cell.date.day() == 1) {
            month_labels.push(MonthLabel {
                column,
                year: first.date.year(),
                month: first.date.month(),
            });
        }
        weeks.push(week);
    }

    CalendarGrid {
        today,
        window,
        start,
        end,
        weeks,
        month_labels,
    }
}

/// Heatmap color bucket for a day's count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intensity {
    Empty,
    Level1,
    Level2,
    Level3,
    Level4,
    Level5,
    Over,
}

impl Intensity {
    pub fn for_count(count: u64) -> Self {
        match count {
            0 => Self::Empty,
            1..=19 => Self::Level1,
            20..=39 => Self::Level2,
            40..=59 => Self::Level3,
            60..=79 => Self::Level4,
            80..=99 => Self::Level5,
            _ => Self::Over,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Level1 => "level-1",
            Self::Level2 => "level-2",
            Self::Level3 => "level-3",
            Self::Level4 => "level-4",
            Self::Level5 => "level-5",
            Self::Over => "over",
        }
    }
}

/// Open interval of dates, both ends excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub after: NaiveDate,
    pub before: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date > self.after && date < self.before
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CellFlags {
    pub is_today: bool,
    pub is_future: bool,
    pub is_highlighted: bool,
}

pub fn classify(date: NaiveDate, today: NaiveDate, highlight: Option<&DateRange>) -> CellFlags {
    CellFlags {
        is_today: date == today,
        is_future: date > today,
        is_highlighted: highlight.is_some_and(|range| range.contains(date)),
    }
}

/// Keeps the last built grid and rebuilds it only when the day or the window
/// changes.
#[derive(Clone, Default)]
pub struct GridCache {
    current: Arc<Mutex<Option<Arc<CalendarGrid>>>>,
}

impl GridCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, today: NaiveDate, window: GridWindow) -> Arc<CalendarGrid> {
        let mut current = self.current.lock().await;
        if let Some(grid) = current.as_ref() {
            if grid.today == today && grid.window == window {
                return Arc::clone(grid);
            }
        }

        let grid = Arc::new(build_grid(today, window));
        *current = Some(Arc::clone(&grid));
        grid
    }
}
