use std::path::Path;

use axum::{
    body::Bytes,
    extract::multipart::{Multipart, MultipartError},
};

/// Multipart field every image route reads.
pub const IMAGE_FIELD: &str = "image";

/// One uploaded file, held in memory.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: Option<String>,
    pub content_type: String,
    pub bytes: Bytes,
}

impl ImageUpload {
    pub fn new(file_name: Option<String>, content_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name,
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }

    /// File extension with the leading dot, from the file name or else the MIME type.
    pub fn extension(&self) -> String {
        let from_name = self
            .file_name
            .as_deref()
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()));
        if let Some(ext) = from_name {
            return format!(".{}", ext.to_ascii_lowercase());
        }

        match self.content_type.as_str() {
            "image/jpeg" | "image/jpg" => ".jpg",
            "image/png" => ".png",
            "image/webp" => ".webp",
            "image/gif" => ".gif",
            _ => "",
        }
        .to_string()
    }
}

/// First field named `field_name`; `None` when the form has no such field.
pub async fn read_image_upload(
    multipart: &mut Multipart,
    field_name: &str,
) -> Result<Option<ImageUpload>, MultipartError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(field_name) {
            continue;
        }

        let file_name = field.file_name().map(str::to_owned);
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_owned();
        let bytes = field.bytes().await?;

        return Ok(Some(ImageUpload::new(file_name, content_type, bytes)));
    }
    Ok(None)
}
