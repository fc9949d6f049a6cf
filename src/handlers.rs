use crate::analytics::{countdowns, goal_progress};
use crate::calendar::{CalendarGrid, Intensity, classify};
use crate::errors::AppError;
use crate::models::{
    CalendarCellResponse, CalendarResponse, MonthLabelResponse, SessionResponse, SignInRequest,
    StatsResponse, TodayResponse, UserId, date_key,
};
use crate::snapshot::CounterSnapshot;
use crate::state::AppState;
use crate::tracker::{AuthState, Tracker};
use crate::ui::render_index;
use axum::{
    extract::State,
    response::{Html, Redirect},
    Json,
};
use chrono::NaiveDate;
use tracing::debug;

pub async fn index(State(state): State<AppState>) -> Html<String> {
    let today = state.clock.today();
    let grid = state.grid.get(today, state.config.window).await;
    let tracker = state.service.tracker().lock().await;

    let stats = stats_response(&state, &tracker, today);
    let calendar = calendar_response(&state, &grid, tracker.snapshot());
    Html(render_index(&stats, &calendar))
}

pub async fn get_today(State(state): State<AppState>) -> Result<Json<TodayResponse>, AppError> {
    let today = state.clock.today();
    let tracker = state.service.tracker().lock().await;
    let stats = tracker.stats(today);

    Ok(Json(TodayResponse {
        date: date_key(today),
        count: stats.today_count,
        is_new_record: stats.is_new_record,
    }))
}

pub async fn get_stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, AppError> {
    let today = state.clock.today();
    let tracker = state.service.tracker().lock().await;
    Ok(Json(stats_response(&state, &tracker, today)))
}

pub async fn get_calendar(State(state): State<AppState>) -> Result<Json<CalendarResponse>, AppError> {
    let today = state.clock.today();
    let grid = state.grid.get(today, state.config.window).await;
    let tracker = state.service.tracker().lock().await;
    Ok(Json(calendar_response(&state, &grid, tracker.snapshot())))
}

pub async fn increment(State(state): State<AppState>) -> Result<Json<TodayResponse>, AppError> {
    let response = apply_increment(&state).await?;
    Ok(Json(response))
}

pub async fn increment_form(State(state): State<AppState>) -> Result<Redirect, AppError> {
    apply_increment(&state).await?;
    Ok(Redirect::to("/"))
}

pub async fn get_session(State(state): State<AppState>) -> Json<SessionResponse> {
    let tracker = state.service.tracker().lock().await;
    Json(session_response(tracker.auth()))
}

pub async fn sign_in(
    State(state): State<AppState>,
    Json(payload): Json<SignInRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let user_id = payload.user_id.trim();
    if user_id.is_empty() {
        return Err(AppError::bad_request("user_id must not be empty"));
    }

    state.service.sign_in(UserId::new(user_id)).await?;
    let tracker = state.service.tracker().lock().await;
    Ok(Json(session_response(tracker.auth())))
}

pub async fn sign_out(State(state): State<AppState>) -> Json<SessionResponse> {
    state.service.sign_out().await;
    let tracker = state.service.tracker().lock().await;
    Json(session_response(tracker.auth()))
}

async fn apply_increment(state: &AppState) -> Result<TodayResponse, AppError> {
    let today = state.clock.today();
    let count = state.service.increment(today).await.inspect_err(|err| {
        debug!(error = %err, "increment rejected");
    })?;

    let tracker = state.service.tracker().lock().await;
    Ok(TodayResponse {
        date: date_key(today),
        count,
        is_new_record: tracker.stats(today).is_new_record,
    })
}

fn stats_response(state: &AppState, tracker: &Tracker, today: NaiveDate) -> StatsResponse {
    let stats = tracker.stats(today);
    StatsResponse {
        date: date_key(today),
        total: stats.total,
        today_count: stats.today_count,
        is_new_record: stats.is_new_record,
        streak: stats.streak,
        goal: goal_progress(stats.total, state.config.goal),
        countdowns: countdowns(&state.config.countdowns, today),
        pending_writes: tracker.pending_writes(),
        unconfirmed_writes: tracker.unconfirmed_writes(),
        failed_writes: tracker.failed_writes(),
        last_sync_error: tracker.last_sync_error().map(str::to_string),
    }
}

fn calendar_response(
    state: &AppState,
    grid: &CalendarGrid,
    snapshot: &CounterSnapshot,
) -> CalendarResponse {
    let highlight = state.config.highlight.as_ref();
    let weeks = grid
        .weeks
        .iter()
        .map(|week| {
            week.iter()
                .map(|cell| {
                    let date = date_key(cell.date);
                    let count = snapshot.get(cell.date);
                    let flags = classify(cell.date, grid.today, highlight);
                    CalendarCellResponse {
                        tooltip: format!("{date}: {count}"),
                        date,
                        weekday: cell.weekday,
                        row: cell.row,
                        column: cell.column,
                        count,
                        intensity: Intensity::for_count(count).as_str(),
                        is_today: flags.is_today,
                        is_future: flags.is_future,
                        is_highlighted: flags.is_highlighted,
                    }
                })
                .collect()
        })
        .collect();

    CalendarResponse {
        start: date_key(grid.start),
        end: date_key(grid.end),
        weeks,
        month_labels: grid
            .month_labels
            .iter()
            .map(|label| MonthLabelResponse {
                column: label.column,
                label: label.text(),
            })
            .collect(),
    }
}

fn session_response(auth: &AuthState) -> SessionResponse {
    match auth {
        AuthState::Unknown => SessionResponse {
            state: "unknown".into(),
            user_id: None,
        },
        AuthState::SignedOut => SessionResponse {
            state: "signed_out".into(),
            user_id: None,
        },
        AuthState::SignedIn(user) => SessionResponse {
            state: "signed_in".into(),
            user_id: Some(user.to_string()),
        },
    }
}
