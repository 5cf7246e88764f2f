use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the analyser.
///
/// The value is loaded once by the binary and handed to every constructor that needs it.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the Qdrant instance that stores analysis results.
    pub qdrant_url: String,
    /// Name of the Qdrant collection holding analysis results.
    pub qdrant_collection_name: String,
    /// Optional API key required to access Qdrant.
    pub qdrant_api_key: Option<String>,
    /// Embedding provider used to vectorise analysis text.
    pub embedding_provider: EmbeddingProvider,
    /// Embedding model identifier passed to the provider.
    pub embedding_model: String,
    /// Dimensionality of the produced vectors.
    pub embedding_dimension: usize,
    /// Base URL of the Ollama runtime when `EMBEDDING_PROVIDER=ollama`.
    pub ollama_url: Option<String>,
    /// Port the HTTP server listens on.
    pub server_port: u16,
    /// Directory receiving uploaded reports.
    pub upload_dir: PathBuf,
    /// Maximum accepted request body size for uploads, in bytes.
    pub max_upload_bytes: usize,
    /// `top_k` applied to searches that do not specify one.
    pub search_default_top_k: usize,
    /// Upper bound applied to caller-supplied `top_k` values.
    pub search_max_top_k: usize,
    /// API key for the hosted Gemini model used by the agent crew.
    pub google_api_key: Option<String>,
    /// Gemini model identifier.
    pub gemini_model: String,
    /// Sampling temperature passed to the Gemini model.
    pub llm_temperature: f64,
}

/// Supported embedding backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmbeddingProvider {
    /// Deterministic in-process hashing embeddings.
    Hash,
    /// Local Ollama runtime.
    Ollama,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            qdrant_url: "http://127.0.0.1:6333".into(),
            qdrant_collection_name: "analysis_results".into(),
            qdrant_api_key: None,
            embedding_provider: EmbeddingProvider::Hash,
            embedding_model: "nomic-embed-text".into(),
            embedding_dimension: 384,
            ollama_url: None,
            server_port: 8000,
            upload_dir: PathBuf::from("uploads"),
            max_upload_bytes: 10 * 1024 * 1024,
            search_default_top_k: 3,
            search_max_top_k: 50,
            google_api_key: None,
            gemini_model: "gemini-2.0-flash".into(),
            llm_temperature: 0.7,
        }
    }
}

impl Config {
    /// Load `.env` (when present) and then read configuration from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let config = Self::from_env()?;
        tracing::debug!(
            qdrant_url = %config.qdrant_url,
            collection = %config.qdrant_collection_name,
            server_port = config.server_port,
            embedding_provider = ?config.embedding_provider,
            upload_dir = %config.upload_dir.display(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Read configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup, falling back to defaults for unset keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        let config = Self {
            qdrant_url: get("QDRANT_URL").unwrap_or(defaults.qdrant_url),
            qdrant_collection_name: get("QDRANT_COLLECTION_NAME")
                .unwrap_or(defaults.qdrant_collection_name),
            qdrant_api_key: get("QDRANT_API_KEY"),
            embedding_provider: parse_optional(&get, "EMBEDDING_PROVIDER")?
                .unwrap_or(defaults.embedding_provider),
            embedding_model: get("EMBEDDING_MODEL").unwrap_or(defaults.embedding_model),
            embedding_dimension: parse_optional(&get, "EMBEDDING_DIMENSION")?
                .unwrap_or(defaults.embedding_dimension),
            ollama_url: get("OLLAMA_URL"),
            server_port: parse_optional(&get, "SERVER_PORT")?.unwrap_or(defaults.server_port),
            upload_dir: get("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            max_upload_bytes: parse_optional(&get, "MAX_UPLOAD_BYTES")?
                .unwrap_or(defaults.max_upload_bytes),
            search_default_top_k: parse_optional(&get, "SEARCH_DEFAULT_TOP_K")?
                .unwrap_or(defaults.search_default_top_k),
            search_max_top_k: parse_optional(&get, "SEARCH_MAX_TOP_K")?
                .unwrap_or(defaults.search_max_top_k),
            google_api_key: get("GOOGLE_API_KEY"),
            gemini_model: get("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            llm_temperature: parse_optional(&get, "LLM_TEMPERATURE")?
                .unwrap_or(defaults.llm_temperature),
        };

        config.validate()?;
        Ok(config)
    }

    /// Return the Gemini API key or report it as missing.
    pub fn require_google_api_key(&self) -> Result<&str, ConfigError> {
        self.google_api_key
            .as_deref()
            .ok_or_else(|| ConfigError::MissingVariable("GOOGLE_API_KEY".into()))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.embedding_dimension == 0 {
            return Err(ConfigError::InvalidValue("EMBEDDING_DIMENSION".into()));
        }
        if self.search_default_top_k == 0 {
            return Err(ConfigError::InvalidValue("SEARCH_DEFAULT_TOP_K".into()));
        }
        if self.search_max_top_k < self.search_default_top_k {
            return Err(ConfigError::InvalidValue("SEARCH_MAX_TOP_K".into()));
        }
        if !(0.0..=2.0).contains(&self.llm_temperature) {
            return Err(ConfigError::InvalidValue("LLM_TEMPERATURE".into()));
        }
        Ok(())
    }
}

fn parse_optional<T, F>(get: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    get(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

impl FromStr for EmbeddingProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hash" => Ok(Self::Hash),
            "ollama" => Ok(Self::Ollama),
            _ => Err(()),
        }
    }
}
