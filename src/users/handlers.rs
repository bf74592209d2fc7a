use axum::extract::State;
use chrono::{DateTime, Duration, Local, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::{
    analytics::calculate_streak,
    db::{
        models::{UserProfile, UserStats},
        UserId,
    },
    server::error::{ApiError, ApiResponse, ApiResult},
    AppState,
};

pub async fn profile() -> ApiResult<UserProfile> {
    Ok(ApiResponse::ok(UserProfile::demo(Utc::now())))
}

/// Start of a local calendar day, in UTC.
fn local_midnight(day: NaiveDate) -> DateTime<Utc> {
    let midnight = day.and_time(NaiveTime::MIN);
    Local
        .from_local_datetime(&midnight)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
}

pub async fn stats(State(state): State<AppState>, user: UserId) -> ApiResult<UserStats> {
    let now = Utc::now();
    let today = Local::now().date_naive();
    let start_of_today = local_midnight(today);
    let end_of_today = start_of_today + Duration::days(1);

    let fetch_failed = |err: anyhow::Error| ApiError::internal("Failed to fetch user stats", err);

    let total_medications = state.db.count_medications(user).await.map_err(fetch_failed)?;
    let logs_last_7_days = state
        .db
        .count_logs_between(user, now - Duration::days(7), end_of_today)
        .await
        .map_err(fetch_failed)?;
    let logs_today = state
        .db
        .count_logs_between(user, start_of_today, end_of_today)
        .await
        .map_err(fetch_failed)?;
    let logs = state.db.list_logs(user, None).await.map_err(fetch_failed)?;

    Ok(ApiResponse::ok(UserStats {
        total_medications,
        logs_last_7_days,
        logs_today,
        streak_days: calculate_streak(&logs, today),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn midnight_maps_back_to_the_same_local_day() {
        let day = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let midnight = local_midnight(day);
        assert_eq!(midnight.with_timezone(&Local).date_naive(), day);
    }
}
