use std::{
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::Utc;
use serde::Serialize;
use tempfile::NamedTempFile;

use super::{
    client::VisionProvider,
    parse::{confidence_score, parse_model_reply, Extraction, ParsedLabel},
    queue::OcrQueue,
};
use crate::{
    db::helpers::format_datetime,
    imaging::{optimize_for_ocr, ImageUpload, OptimizeOptions},
    settings::ServerSettings,
};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("OpenAI API key not configured on server")]
    MissingApiKey,
    #[error("No image file provided")]
    MissingFile,
    #[error("Only image files are allowed!")]
    UnsupportedMediaType,
    #[error("File too large")]
    FileTooLarge,
    #[error("{0}")]
    Upstream(String),
    #[error("No response from OpenAI API")]
    EmptyResponse,
    #[error("Failed to stage upload: {0}")]
    Io(#[from] std::io::Error),
}

impl OcrError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingFile | Self::UnsupportedMediaType => StatusCode::BAD_REQUEST,
            Self::FileTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::MissingApiKey | Self::Upstream(_) | Self::EmptyResponse | Self::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Body of `POST /api/ocr/process-image`, on success and on failure.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub raw_text: String,
    pub confidence: u8,
    pub parsed_data: Option<ParsedLabel>,
    pub timestamp: String,
}

impl OcrResponse {
    fn from_extraction(extraction: Extraction) -> Self {
        Self {
            success: true,
            error: None,
            confidence: confidence_score(&extraction.label.confidence),
            raw_text: extraction.raw_text,
            parsed_data: Some(extraction.label),
            timestamp: format_datetime(&Utc::now()),
        }
    }

    fn from_error(err: &OcrError) -> Self {
        Self {
            success: false,
            error: Some(err.to_string()),
            raw_text: String::new(),
            confidence: 0,
            parsed_data: None,
            timestamp: format_datetime(&Utc::now()),
        }
    }
}

impl IntoResponse for OcrError {
    fn into_response(self) -> Response {
        (self.status(), Json(OcrResponse::from_error(&self))).into_response()
    }
}

/// Stages an upload, optionally filters it and sends it through the OCR queue.
#[derive(Clone)]
pub struct OcrGateway {
    // `None` when no API key is configured.
    queue: Option<OcrQueue>,
    upload_dir: PathBuf,
    max_upload_bytes: usize,
    preprocess: bool,
}

impl OcrGateway {
    pub fn new(provider: Option<Arc<dyn VisionProvider>>, settings: &ServerSettings) -> Self {
        Self {
            queue: provider.map(OcrQueue::new),
            upload_dir: settings.upload_dir.clone(),
            max_upload_bytes: settings.max_upload_bytes(),
            preprocess: settings.preprocess_images,
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    pub async fn process(&self, upload: Option<ImageUpload>) -> Result<OcrResponse, OcrError> {
        if let Some(upload) = &upload {
            if upload.bytes.len() > self.max_upload_bytes {
                return Err(OcrError::FileTooLarge);
            }
            if !upload.is_image() {
                return Err(OcrError::UnsupportedMediaType);
            }
        }

        let queue = self.queue.as_ref().ok_or(OcrError::MissingApiKey)?;
        let upload = upload.ok_or(OcrError::MissingFile)?;

        let (staged, image_data_url) = self.stage(upload).await?;
        log_info!("Processing OCR for file: {}", staged.path().display());

        let result = queue.run(image_data_url).await;
        remove_staged(staged);

        let reply = result.map_err(|err| {
            log_error!("OCR processing error: {err:#}");
            OcrError::Upstream(format!("{err:#}"))
        })?;
        if reply.trim().is_empty() {
            return Err(OcrError::EmptyResponse);
        }

        log_info!("OCR processing completed successfully");
        Ok(OcrResponse::from_extraction(parse_model_reply(&reply)))
    }

    /// Writes the upload to `ocr-*<ext>` in the upload dir, reads it back and
    /// builds the `data:` URL. The returned file is removed on drop.
    async fn stage(&self, upload: ImageUpload) -> Result<(NamedTempFile, String), OcrError> {
        let upload_dir = self.upload_dir.clone();
        let preprocess = self.preprocess;

        tokio::task::spawn_blocking(move || -> Result<(NamedTempFile, String), OcrError> {
            let staged = write_staged(&upload_dir, &upload)?;
            let bytes = std::fs::read(staged.path())?;

            let (bytes, mime_type) = if preprocess {
                let optimized =
                    optimize_for_ocr(&bytes, &upload.content_type, &OptimizeOptions::default());
                (optimized.bytes, optimized.mime_type)
            } else {
                (bytes, upload.content_type)
            };

            let data_url = format!("data:{mime_type};base64,{}", STANDARD.encode(&bytes));
            Ok((staged, data_url))
        })
        .await
        .map_err(|err| OcrError::Io(std::io::Error::other(err)))?
    }
}

fn write_staged(upload_dir: &Path, upload: &ImageUpload) -> std::io::Result<NamedTempFile> {
    std::fs::create_dir_all(upload_dir)?;
    let mut staged = tempfile::Builder::new()
        .prefix("ocr-")
        .suffix(&upload.extension())
        .tempfile_in(upload_dir)?;
    staged.write_all(&upload.bytes)?;
    staged.flush()?;
    Ok(staged)
}

fn remove_staged(staged: NamedTempFile) {
    let path = staged.path().to_path_buf();
    match staged.close() {
        Ok(()) => log_info!("Deleted temporary file: {}", path.display()),
        Err(err) => log_warn!("Failed to delete file {}: {err}", path.display()),
    }
}
