use axum::{
    body::Body,
    extract::{rejection::QueryRejection, Multipart, Query, State},
    http::{header, StatusCode},
    response::Response,
};
use serde::Deserialize;

use crate::{server::error::ApiError, AppState};

use super::{optimize_for_ocr, read_image_upload, validate_image_file, OptimizeOptions, IMAGE_FIELD};

#[derive(Debug, Default, Deserialize)]
pub struct OptimizeQuery {
    pub max_dimension: Option<u32>,
    pub quality: Option<u8>,
    pub enhance: Option<bool>,
    pub auto_rotate: Option<bool>,
}

impl OptimizeQuery {
    fn into_options(self) -> Result<OptimizeOptions, ApiError> {
        let defaults = OptimizeOptions::default();
        let options = OptimizeOptions {
            max_dimension: self.max_dimension.unwrap_or(defaults.max_dimension),
            quality: self.quality.unwrap_or(defaults.quality),
            enhance: self.enhance.unwrap_or(defaults.enhance),
            auto_rotate: self.auto_rotate.unwrap_or(defaults.auto_rotate),
        };

        if !(1..=100).contains(&options.quality) {
            return Err(ApiError::validation("quality must be between 1 and 100"));
        }
        if options.max_dimension == 0 {
            return Err(ApiError::validation("max_dimension must be at least 1"));
        }
        Ok(options)
    }
}

/// Runs the OCR filter pipeline on one upload and returns the resulting image.
pub async fn optimize_image(
    State(state): State<AppState>,
    query: Result<Query<OptimizeQuery>, QueryRejection>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    let options = query.into_options()?;

    let upload = read_image_upload(&mut multipart, IMAGE_FIELD)
        .await?
        .ok_or_else(|| ApiError::validation("No image file provided"))?;

    let errors = validate_image_file(
        &upload.content_type,
        upload.bytes.len() as u64,
        state.settings.max_upload_mb,
    );
    if !errors.is_empty() {
        return Err(ApiError::validation(errors.join("; ")));
    }

    let optimized = tokio::task::spawn_blocking(move || {
        optimize_for_ocr(&upload.bytes, &upload.content_type, &options)
    })
    .await
    .map_err(|err| ApiError::internal("Image optimization task failed", err.into()))?;

    let (width, height) = optimized
        .dimensions
        .map(|(w, h)| (w.to_string(), h.to_string()))
        .unwrap_or_default();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, optimized.mime_type.as_str())
        .header("x-image-optimized", optimized.optimized.to_string())
        .header("x-image-width", width)
        .header("x-image-height", height)
        .body(Body::from(optimized.bytes))
        .map_err(|err| ApiError::internal("Failed to build image response", err.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_defaults_match_the_pipeline() {
        let options = OptimizeQuery::default().into_options().unwrap();
        assert_eq!(options, OptimizeOptions::default());
    }

    #[test]
    fn out_of_range_quality_is_rejected() {
        let query = OptimizeQuery {
            quality: Some(0),
            ..Default::default()
        };
        assert!(matches!(query.into_options(), Err(ApiError::Validation(_))));
    }
}
