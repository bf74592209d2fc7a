use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::prompt::{SYSTEM_PROMPT, USER_PROMPT};

const MAX_TOKENS: u32 = 1000;
const TEMPERATURE: f32 = 0.1;

/// Remote model that reads a medication label from an image.
#[async_trait]
pub trait VisionProvider: Send + Sync {
    /// Returns the model's text reply for a `data:` URL image.
    async fn extract_label(&self, image_data_url: &str) -> Result<String>;
}

/// OpenAI-compatible chat completions endpoint with image input.
pub struct OpenAiVisionClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiVisionClient {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build vision HTTP client")?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn request_body(&self, image_data_url: &str) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                json!({ "role": "system", "content": SYSTEM_PROMPT }),
                json!({
                    "role": "user",
                    "content": [
                        { "type": "text", "text": USER_PROMPT },
                        {
                            "type": "image_url",
                            "image_url": { "url": image_data_url, "detail": "high" }
                        }
                    ]
                }),
            ],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        }
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Value>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[async_trait]
impl VisionProvider for OpenAiVisionClient {
    async fn extract_label(&self, image_data_url: &str) -> Result<String> {
        log::debug!("Sending label image to {} ({})", self.base_url, self.model);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&self.request_body(image_data_url))
            .send()
            .await
            .context("Vision API request failed")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            bail!("Vision API returned {status}: {error_body}");
        }

        let chat: ChatResponse = response
            .json()
            .await
            .context("Failed to parse vision API response")?;

        // An empty reply is reported by the gateway.
        Ok(chat
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }
}
