//! Google Gemini `generateContent` client.

use crate::agents::{LanguageModel, LlmError};
use crate::config::Config;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Language model backed by the Gemini REST API.
pub struct GeminiModel {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f64,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

impl GeminiModel {
    /// Client for `model` authenticated with `api_key`.
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        temperature: f64,
    ) -> Result<Self, LlmError> {
        let client = Client::builder().user_agent("bloodlens/llm").build()?;
        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: model.into(),
            temperature,
        })
    }

    /// Client configured from `GOOGLE_API_KEY`, `GEMINI_MODEL`, and `LLM_TEMPERATURE`.
    pub fn from_config(config: &Config) -> Result<Self, LlmError> {
        let api_key = config.require_google_api_key()?;
        Self::new(api_key, config.gemini_model.clone(), config.llm_temperature)
    }

    /// Point the client at a different API host.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[async_trait]
impl LanguageModel for GeminiModel {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError> {
        let body = json!({
            "systemInstruction": { "parts": [{ "text": system }] },
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": { "temperature": self.temperature },
        });

        tracing::debug!(model = %self.model, prompt_chars = prompt.len(), "Requesting completion");
        let response = self
            .client
            .post(self.endpoint())
            .header(API_KEY_HEADER, self.api_key.as_str())
            .json(&body)
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = LlmError::UnexpectedStatus { status, body };
            tracing::error!(model = %self.model, error = %error, "Gemini request failed");
            return Err(error);
        }

        let payload: GenerateContentResponse = response
            .json()
            .await
            .map_err(reqwest::Error::without_url)?;
        Ok(payload
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<String>()
            })
            .unwrap_or_default())
    }
}
