use crate::calendar::{DateRange, GridWindow, MAX_WINDOW_DAYS};
use crate::errors::ConfigError;
use crate::models::{Countdown, UserId, parse_date_key};
use chrono::{NaiveDate, Weekday};
use std::{env, path::PathBuf};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_APP_ID: &str = "default-app-id";
pub const DEFAULT_USER_ID: &str = "anonymous";
pub const DEFAULT_GOAL: u64 = 5000;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub data_path: PathBuf,
    pub app_id: String,
    pub user_id: UserId,
    pub goal: u64,
    pub today: Option<NaiveDate>,
    pub highlight: Option<DateRange>,
    pub countdowns: Vec<Countdown>,
    pub window: GridWindow,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            data_path: PathBuf::from("data/state.json"),
            app_id: DEFAULT_APP_ID.to_string(),
            user_id: UserId::new(DEFAULT_USER_ID),
            goal: DEFAULT_GOAL,
            today: None,
            highlight: None,
            countdowns: Vec::new(),
            window: GridWindow::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = lookup("PORT") {
            config.port = parse_number("PORT", &value)?;
        }
        if let Some(path) = lookup("APP_DATA_PATH") {
            config.data_path = PathBuf::from(path);
        }
        if let Some(app_id) = lookup("APP_ID").filter(|value| !value.trim().is_empty()) {
            config.app_id = app_id;
        }
        if let Some(user) = lookup("APP_USER_ID").filter(|value| !value.trim().is_empty()) {
            config.user_id = UserId::new(user.trim());
        }
        if let Some(value) = lookup("APP_GOAL") {
            config.goal = parse_number("APP_GOAL", &value)?;
        }
        if let Some(value) = lookup("APP_TODAY") {
            config.today = Some(parse_date("APP_TODAY", &value)?);
        }
        if let Some(value) = lookup("APP_HIGHLIGHT") {
            config.highlight = Some(parse_range(&value)?);
        }
        if let Some(value) = lookup("APP_COUNTDOWNS") {
            config.countdowns = parse_countdowns(&value)?;
        }
        if let Some(value) = lookup("APP_WINDOW_DAYS") {
            let days: i64 = parse_number("APP_WINDOW_DAYS", &value)?;
            if !(0..=MAX_WINDOW_DAYS).contains(&days) {
                return Err(ConfigError::invalid(
                    "APP_WINDOW_DAYS",
                    value,
                    format!("expected 0..={MAX_WINDOW_DAYS}"),
                ));
            }
            config.window = GridWindow::symmetric(days, config.window.week_start);
        }
        if let Some(value) = lookup("APP_WEEK_START") {
            config.window.week_start = parse_week_start(&value)?;
        }

        Ok(config)
    }
}

fn parse_number<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|err: T::Err| ConfigError::invalid(name, value, err.to_string()))
}

fn parse_date(name: &'static str, value: &str) -> Result<NaiveDate, ConfigError> {
    parse_date_key(value.trim()).ok_or_else(|| ConfigError::invalid(name, value, "expected YYYY-MM-DD"))
}

fn parse_range(value: &str) -> Result<DateRange, ConfigError> {
    let (after, before) = value
        .split_once("..")
        .ok_or_else(|| ConfigError::invalid("APP_HIGHLIGHT", value, "expected START..END"))?;
    let range = DateRange {
        after: parse_date("APP_HIGHLIGHT", after)?,
        before: parse_date("APP_HIGHLIGHT", before)?,
    };
    if range.after >= range.before {
        return Err(ConfigError::invalid("APP_HIGHLIGHT", value, "start must be before end"));
    }
    Ok(range)
}

fn parse_countdowns(value: &str) -> Result<Vec<Countdown>, ConfigError> {
    value
        .split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| -> Result<Countdown, ConfigError> {
            let (label, date) = entry.split_once('=').ok_or_else(|| {
                ConfigError::invalid("APP_COUNTDOWNS", entry, "expected label=YYYY-MM-DD")
            })?;
            Ok(Countdown {
                label: label.trim().to_string(),
                date: parse_date("APP_COUNTDOWNS", date)?,
            })
        })
        .collect()
}

fn parse_week_start(value: &str) -> Result<Weekday, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "sun" | "sunday" => Ok(Weekday::Sun),
        "mon" | "monday" => Ok(Weekday::Mon),
        _ => Err(ConfigError::invalid("APP_WEEK_START", value, "expected sun or mon")),
    }
}
