use std::sync::Arc;

use anyhow::{anyhow, Result};
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use super::client::VisionProvider;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

struct OcrJob {
    id: Uuid,
    image_data_url: String,
    reply: oneshot::Sender<Result<String>>,
}

/// FIFO queue in front of the vision provider. One worker task drains it,
/// so at most one upstream call is in flight.
#[derive(Clone)]
pub struct OcrQueue {
    sender: mpsc::UnboundedSender<OcrJob>,
}

impl OcrQueue {
    /// Spawns the worker; must be called inside a tokio runtime.
    pub fn new(provider: Arc<dyn VisionProvider>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        tokio::spawn(run_worker(provider, receiver));
        Self { sender }
    }

    /// Waits for this job's turn, then for the provider's reply.
    pub async fn run(&self, image_data_url: String) -> Result<String> {
        let (reply, response) = oneshot::channel();
        let id = Uuid::new_v4();

        self.sender
            .send(OcrJob {
                id,
                image_data_url,
                reply,
            })
            .map_err(|_| anyhow!("OCR worker has stopped"))?;
        log_debug!("Queued OCR job {id}");

        response
            .await
            .map_err(|_| anyhow!("OCR worker dropped job {id}"))?
    }
}

async fn run_worker(provider: Arc<dyn VisionProvider>, mut receiver: mpsc::UnboundedReceiver<OcrJob>) {
    while let Some(job) = receiver.recv().await {
        log_debug!("Running OCR job {}", job.id);
        let result = provider.extract_label(&job.image_data_url).await;
        if job.reply.send(result).is_err() {
            log_warn!("OCR job {} finished after its caller went away", job.id);
        }
    }
    log_debug!("OCR worker stopped");
}
