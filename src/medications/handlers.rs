use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    db::{
        helpers::parse_datetime,
        models::{LogDoseInput, MedicationInput},
        Medication, MedicationLog, UserId,
    },
    server::{
        error::{ApiError, ApiResponse, ApiResult},
        identity::resolve_user,
    },
    AppState,
};

const DEFAULT_LOG_LIMIT: u32 = 50;

const NAME_REQUIRED: &str = "Medication name is required";
const NOT_FOUND: &str = "Medication not found";

#[derive(Debug, Default, Deserialize)]
pub struct LogsQuery {
    pub limit: Option<u32>,
}

fn medication_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, ApiError> {
    path.map(|Path(id)| id)
        .map_err(|_| ApiError::validation("Invalid medication id"))
}

pub async fn list_medications(
    State(state): State<AppState>,
    user: UserId,
) -> ApiResult<Vec<Medication>> {
    let medications = state
        .db
        .list_medications(user)
        .await
        .map_err(|err| ApiError::internal("Failed to fetch medications", err))?;
    Ok(ApiResponse::ok(medications))
}

pub async fn create_medication(
    State(state): State<AppState>,
    user: UserId,
    body: Result<Json<MedicationInput>, JsonRejection>,
) -> ApiResult<Medication> {
    let Json(input) = body?;
    let user = resolve_user(user, input.user_id);
    let draft = input
        .into_draft()
        .ok_or_else(|| ApiError::validation(NAME_REQUIRED))?;

    let medication = state
        .db
        .create_medication(user, draft)
        .await
        .map_err(|err| ApiError::internal("Failed to create medication", err))?;

    log::info!("Created medication {} for user {user}", medication.id);
    Ok(ApiResponse::created(medication))
}

pub async fn update_medication(
    State(state): State<AppState>,
    user: UserId,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<MedicationInput>, JsonRejection>,
) -> ApiResult<Medication> {
    let medication_id = medication_id(path)?;
    let Json(input) = body?;
    let user = resolve_user(user, input.user_id);
    let draft = input
        .into_draft()
        .ok_or_else(|| ApiError::validation(NAME_REQUIRED))?;

    state
        .db
        .update_medication(user, medication_id, draft)
        .await
        .map_err(|err| ApiError::internal("Failed to update medication", err))?
        .map(ApiResponse::ok)
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))
}

pub async fn delete_medication(
    State(state): State<AppState>,
    user: UserId,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<Value>, ApiError> {
    let medication_id = medication_id(path)?;

    let deleted = state
        .db
        .delete_medication(user, medication_id)
        .await
        .map_err(|err| ApiError::internal("Failed to delete medication", err))?;
    if !deleted {
        return Err(ApiError::not_found(NOT_FOUND));
    }

    log::info!("Deleted medication {medication_id} for user {user}");
    Ok(Json(json!({
        "success": true,
        "message": "Medication deleted successfully",
    })))
}

pub async fn log_dose(
    State(state): State<AppState>,
    user: UserId,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<LogDoseInput>, JsonRejection>,
) -> ApiResult<MedicationLog> {
    let medication_id = medication_id(path)?;
    // A bodiless POST logs a dose taken now.
    let input = match body {
        Ok(Json(input)) => input,
        Err(JsonRejection::MissingJsonContentType(_)) => LogDoseInput::default(),
        Err(rejection) => return Err(rejection.into()),
    };
    let user = resolve_user(user, input.user_id);

    let taken_at = match input.taken_at.as_deref().filter(|raw| !raw.trim().is_empty()) {
        Some(raw) => parse_datetime(raw.trim(), "taken_at")
            .map_err(|_| ApiError::validation("Invalid taken_at timestamp"))?,
        None => Utc::now(),
    };

    state
        .db
        .log_dose(user, medication_id, taken_at, input.notes)
        .await
        .map_err(|err| ApiError::internal("Failed to log medication", err))?
        .map(ApiResponse::created)
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))
}

pub async fn list_logs(
    State(state): State<AppState>,
    user: UserId,
    query: Result<Query<LogsQuery>, QueryRejection>,
) -> ApiResult<Vec<MedicationLog>> {
    let Query(query) = query?;
    let limit = query.limit.unwrap_or(DEFAULT_LOG_LIMIT);

    let logs = state
        .db
        .list_logs(user, Some(limit))
        .await
        .map_err(|err| ApiError::internal("Failed to fetch medication logs", err))?;
    Ok(ApiResponse::ok(logs))
}
