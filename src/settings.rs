use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    env,
    fmt::Display,
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

/// Environment variable pointing at an optional JSON settings file.
pub const CONFIG_PATH_ENV: &str = "MEDLOG_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub database_path: PathBuf,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: String,
    pub ocr_timeout_secs: u64,
    pub upload_dir: PathBuf,
    pub max_upload_mb: u64,
    pub preprocess_images: bool,
    pub rate_limit_max: u32,
    pub rate_limit_window_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3001,
            database_path: PathBuf::from("medications.db"),
            openai_api_key: None,
            openai_model: "gpt-4o".into(),
            openai_base_url: "https://api.openai.com/v1".into(),
            ocr_timeout_secs: 60,
            upload_dir: env::temp_dir(),
            max_upload_mb: 10,
            preprocess_images: true,
            rate_limit_max: 1000,
            rate_limit_window_secs: 15 * 60,
        }
    }
}

impl ServerSettings {
    /// Defaults, then the JSON file named by `MEDLOG_CONFIG`, then process env.
    pub fn load() -> Result<Self> {
        let mut settings = match env::var_os(CONFIG_PATH_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        settings.apply_overrides(|key| env::var(key).ok())?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse settings in {}", path.display()))
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("HOST") {
            self.host = raw;
        }
        if let Some(raw) = lookup("PORT") {
            self.port = parse_value("PORT", &raw)?;
        }
        if let Some(raw) = lookup("DATABASE_PATH") {
            self.database_path = PathBuf::from(raw);
        }
        if let Some(raw) = lookup("OPENAI_API_KEY") {
            let trimmed = raw.trim();
            self.openai_api_key = (!trimmed.is_empty()).then(|| trimmed.to_string());
        }
        if let Some(raw) = lookup("OPENAI_MODEL") {
            self.openai_model = raw;
        }
        if let Some(raw) = lookup("OPENAI_BASE_URL") {
            self.openai_base_url = raw.trim_end_matches('/').to_string();
        }
        if let Some(raw) = lookup("OCR_TIMEOUT_SECS") {
            self.ocr_timeout_secs = parse_value("OCR_TIMEOUT_SECS", &raw)?;
        }
        if let Some(raw) = lookup("UPLOAD_DIR") {
            self.upload_dir = PathBuf::from(raw);
        }
        if let Some(raw) = lookup("MAX_UPLOAD_MB") {
            self.max_upload_mb = parse_value("MAX_UPLOAD_MB", &raw)?;
        }
        if let Some(raw) = lookup("PREPROCESS_IMAGES") {
            self.preprocess_images = parse_flag("PREPROCESS_IMAGES", &raw)?;
        }
        if let Some(raw) = lookup("RATE_LIMIT_MAX") {
            self.rate_limit_max = parse_value("RATE_LIMIT_MAX", &raw)?;
        }
        if let Some(raw) = lookup("RATE_LIMIT_WINDOW_SECS") {
            self.rate_limit_window_secs = parse_value("RATE_LIMIT_WINDOW_SECS", &raw)?;
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn max_upload_bytes(&self) -> usize {
        usize::try_from(self.max_upload_mb.saturating_mul(1024 * 1024)).unwrap_or(usize::MAX)
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|err| anyhow!("invalid value '{raw}' for {key}: {err}"))
}

fn parse_flag(key: &str, raw: &str) -> Result<bool> {
    let value = raw.trim();
    if value == "1" || value.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if value == "0" || value.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(anyhow!("invalid value '{raw}' for {key}: expected true/false"))
    }
}
