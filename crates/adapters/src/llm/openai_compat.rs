//! OpenAI-compatible chat completions adapter (GitHub Models by default)

use async_trait::async_trait;
use crypto_scout_domain::{Draft, DraftGenerator, DraftRequest, GenerateError};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{LlmConfig, build_draft_prompt, parse_draft_response};
use crate::handle::XHandleFinder;

/// Default endpoint, served with a GitHub token
pub const DEFAULT_BASE_URL: &str = "https://models.github.ai/inference";

/// Draft generator backed by any OpenAI-compatible endpoint
pub struct OpenAiCompatGenerator {
    client: Client,
    api_key: SecretString,
    base_url: String,
    config: LlmConfig,
    handles: Option<XHandleFinder>,
}

impl OpenAiCompatGenerator {
    pub fn new(
        api_key: SecretString,
        base_url: String,
        config: LlmConfig,
    ) -> Result<Self, GenerateError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GenerateError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            base_url,
            config,
            handles: None,
        })
    }

    /// Look up the project's X handle before drafting
    pub fn with_handle_lookup(mut self, finder: XHandleFinder) -> Self {
        self.handles = Some(finder);
        self
    }

    async fn call_api(&self, prompt: &str) -> Result<String, GenerateError> {
        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: "You write short, factual crypto research posts. Output only valid JSON."
                        .to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            temperature: Some(self.config.temperature),
            max_tokens: Some(self.config.max_output_tokens),
        };

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerateError::Timeout
                } else {
                    GenerateError::Api(e.to_string())
                }
            })?;

        if response.status() == 429 {
            return Err(GenerateError::RateLimited);
        }

        if response.status() == 401 || response.status() == 403 {
            return Err(GenerateError::Config(format!(
                "API rejected credentials ({})",
                response.status()
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerateError::Api(format!(
                "API returned {}: {}",
                status, body
            )));
        }

        let api_response: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| GenerateError::InvalidFormat(e.to_string()))?;

        let text = api_response
            .choices
            .into_iter()
            .filter_map(|c| c.message.content)
            .collect::<Vec<_>>()
            .join("");

        if text.is_empty() {
            return Err(GenerateError::InvalidFormat("Empty response".to_string()));
        }

        Ok(text)
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[async_trait]
impl DraftGenerator for OpenAiCompatGenerator {
    async fn generate(&self, request: &DraftRequest) -> Result<Draft, GenerateError> {
        let handle = match &self.handles {
            Some(finder) => finder.lookup(&request.project.url).await,
            None => None,
        };
        let prompt = build_draft_prompt(request, handle.as_deref());

        let mut last_error = None;
        for attempt in 0..=self.config.retries {
            if attempt > 0 {
                tracing::warn!(attempt = attempt, "Retrying draft generation");
                tokio::time::sleep(Duration::from_millis(500 * 2_u64.pow(attempt))).await;
            }

            match self.call_api(&prompt).await {
                Ok(response_text) => match parse_draft_response(&response_text) {
                    Ok(draft) => return Ok(draft),
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to parse response");
                        last_error = Some(GenerateError::InvalidFormat(e));
                    }
                },
                Err(e @ (GenerateError::RateLimited | GenerateError::Config(_))) => {
                    return Err(e);
                }
                Err(e) => {
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| GenerateError::Api("Unknown error".to_string())))
    }
}
