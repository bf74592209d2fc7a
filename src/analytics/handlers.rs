use axum::extract::{rejection::QueryRejection, Query, State};
use chrono::Local;
use serde::Deserialize;

use crate::{
    db::UserId,
    server::error::{ApiError, ApiResult, ApiResponse},
    AppState,
};

use super::{build_report, AdherenceReport, ReportOptions};

const MAX_DAYS: u32 = 366;
const MAX_MONTHS: u32 = 120;
const MAX_WINDOW_DAYS: u32 = 366;

fn check_range(name: &str, value: u32, max: u32) -> Result<(), ApiError> {
    if (1..=max).contains(&value) {
        Ok(())
    } else {
        Err(ApiError::validation(format!("{name} must be between 1 and {max}")))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    pub days: Option<u32>,
    pub months: Option<u32>,
    pub window: Option<u32>,
}

impl SummaryQuery {
    fn into_options(self) -> Result<ReportOptions, ApiError> {
        let defaults = ReportOptions::default();
        let options = ReportOptions {
            daily_days: self.days.unwrap_or(defaults.daily_days),
            months: self.months.unwrap_or(defaults.months),
            medication_window_days: self.window.unwrap_or(defaults.medication_window_days),
        };

        check_range("days", options.daily_days, MAX_DAYS)?;
        check_range("months", options.months, MAX_MONTHS)?;
        check_range("window", options.medication_window_days, MAX_WINDOW_DAYS)?;
        Ok(options)
    }
}

pub async fn adherence_summary(
    State(state): State<AppState>,
    user: UserId,
    query: Result<Query<SummaryQuery>, QueryRejection>,
) -> ApiResult<AdherenceReport> {
    let Query(query) = query?;
    let options = query.into_options()?;

    let medications = state
        .db
        .list_medications(user)
        .await
        .map_err(|err| ApiError::internal("Failed to load medications", err))?;
    let logs = state
        .db
        .list_logs(user, None)
        .await
        .map_err(|err| ApiError::internal("Failed to load medication logs", err))?;

    let today = Local::now().date_naive();
    Ok(ApiResponse::ok(build_report(
        &logs,
        &medications,
        today,
        options,
    )))
}
