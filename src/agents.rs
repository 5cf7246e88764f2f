//! Agent crew: role profiles, task templates, and a sequential runner over a language model.
//!
//! Profiles and tasks are plain data. [`Crew`] renders each task for a query, sends it to the
//! model under the task's agent profile, and threads the previous output in as context.

pub mod crew;
pub mod gemini;
pub mod profiles;
pub mod tasks;

pub use crew::{Crew, TaskOutput};
pub use gemini::GeminiModel;
pub use profiles::AgentProfile;
pub use tasks::TaskTemplate;

use crate::config::ConfigError;
use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

/// Errors raised while talking to a language model.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Required configuration was missing or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Provider responded with an unexpected status code.
    #[error("Unexpected model response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the provider.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// Provider answered without any usable text.
    #[error("Model returned no text for agent '{role}' after {attempts} attempt(s)")]
    EmptyResponse {
        /// Role of the agent whose task produced nothing.
        role: String,
        /// Attempts made before giving up.
        attempts: u32,
    },
}

/// Text completion backend used by [`Crew`].
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Complete `prompt` under the `system` instruction. An empty string means no answer.
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError>;
}
