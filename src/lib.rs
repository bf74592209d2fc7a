pub mod analytics;
pub mod db;
pub mod imaging;
pub mod medications;
pub mod ocr;
pub mod server;
pub mod settings;
pub mod users;
mod utils;

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use log::{info, warn};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use db::Database;
use ocr::{OcrGateway, OpenAiVisionClient, VisionProvider};
use server::rate_limit::RateLimiter;
use settings::ServerSettings;

/// Shared by every handler; cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub settings: Arc<ServerSettings>,
    pub ocr: OcrGateway,
    pub rate_limiter: RateLimiter,
}

impl AppState {
    /// `provider` is `None` when no vision API key is configured. Spawns the
    /// OCR worker, so call it inside a tokio runtime.
    pub fn new(
        db: Database,
        settings: ServerSettings,
        provider: Option<Arc<dyn VisionProvider>>,
    ) -> Self {
        let ocr = OcrGateway::new(provider, &settings);
        let rate_limiter = RateLimiter::new(
            settings.rate_limit_max,
            Duration::from_secs(settings.rate_limit_window_secs),
        );

        Self {
            db,
            settings: Arc::new(settings),
            ocr,
            rate_limiter,
        }
    }
}

fn vision_provider(settings: &ServerSettings) -> Result<Option<Arc<dyn VisionProvider>>> {
    let Some(api_key) = settings.openai_api_key.as_deref() else {
        warn!("OPENAI_API_KEY is not set; OCR requests will be rejected");
        return Ok(None);
    };

    let client = OpenAiVisionClient::new(
        api_key,
        settings.openai_model.as_str(),
        settings.openai_base_url.as_str(),
        Duration::from_secs(settings.ocr_timeout_secs),
    )?;
    let provider: Arc<dyn VisionProvider> = Arc::new(client);
    Ok(Some(provider))
}

pub async fn run() -> Result<()> {
    // RUST_LOG wins; info otherwise.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("Medication logger starting up...");

    let settings = ServerSettings::load()?;
    let database = Database::new(settings.database_path.clone())?;
    info!("Using database at {}", database.path().display());
    let provider = vision_provider(&settings)?;

    let address = settings.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;

    let state = AppState::new(database, settings, provider);

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for ctrl-c: {err}");
                return;
            }
            info!("Shutting down...");
            shutdown.cancel();
        }
    });

    server::serve(listener, state, shutdown).await
}
