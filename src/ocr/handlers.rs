use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::{
    imaging::{read_image_upload, IMAGE_FIELD},
    AppState,
};

use super::gateway::OcrError;

pub async fn process_image(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let upload = match read_image_upload(&mut multipart, IMAGE_FIELD).await {
        Ok(upload) => upload,
        Err(err) if err.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            return OcrError::FileTooLarge.into_response();
        }
        Err(err) => {
            let body = serde_json::json!({ "success": false, "error": err.body_text() });
            return (err.status(), Json(body)).into_response();
        }
    };

    match state.ocr.process(upload).await {
        Ok(response) => Json(response).into_response(),
        Err(err) => err.into_response(),
    }
}
