//! Configuration loading, validation, and management for DermaChat.
//!
//! Loads configuration from `~/.dermachat/config.toml` (or the file named by
//! `DERMACHAT_CONFIG`). Environment variables fill any of the three service
//! keys the file leaves unset. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.dermachat/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Key for the embedding service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai_api_key: Option<String>,

    /// Key for the vector index service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinecone_api_key: Option<String>,

    /// Key for the generative model service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gemini_api_key: Option<String>,

    /// Per-request timeout for every outbound HTTP call
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub generation: GenerationConfig,

    /// Where the patient context comes from
    #[serde(default)]
    pub context: ContextConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,
}

fn default_request_timeout_secs() -> u64 {
    120
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("openai_api_key", &redact(&self.openai_api_key))
            .field("pinecone_api_key", &redact(&self.pinecone_api_key))
            .field("gemini_api_key", &redact(&self.gemini_api_key))
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("embedding", &self.embedding)
            .field("retrieval", &self.retrieval)
            .field("generation", &self.generation)
            .field("context", &self.context)
            .field("gateway", &self.gateway)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_base_url")]
    pub base_url: String,

    #[serde(default = "default_embedding_model")]
    pub model: String,
}

fn default_embedding_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_embedding_model() -> String {
    "text-embedding-3-large".into()
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: default_embedding_base_url(),
            model: default_embedding_model(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_index_name")]
    pub index_name: String,

    /// Data-plane host of the index. Looked up through the control plane when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_host: Option<String>,

    #[serde(default = "default_control_plane_url")]
    pub control_plane_url: String,

    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Metadata key holding the passage text
    #[serde(default = "default_text_field")]
    pub text_field: String,

    /// Metadata key marking source-document records (excluded from retrieval)
    #[serde(default = "default_source_field")]
    pub source_field: String,
}

fn default_index_name() -> String {
    "embedding-psoriasis-large".into()
}
fn default_control_plane_url() -> String {
    "https://api.pinecone.io".into()
}
fn default_top_k() -> usize {
    5
}
fn default_text_field() -> String {
    "texto".into()
}
fn default_source_field() -> String {
    "fuente".into()
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            index_name: default_index_name(),
            index_host: None,
            control_plane_url: default_control_plane_url(),
            top_k: default_top_k(),
            text_field: default_text_field(),
            source_field: default_source_field(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_generation_base_url")]
    pub base_url: String,

    #[serde(default = "default_generation_model")]
    pub model: String,
}

fn default_generation_base_url() -> String {
    "https://generativelanguage.googleapis.com".into()
}
fn default_generation_model() -> String {
    "gemini-1.5-flash-latest".into()
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: default_generation_base_url(),
            model: default_generation_model(),
        }
    }
}

/// Which context resolution strategy a session uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextSourceKind {
    /// `formulario` / `tratamiento` from the request's query string
    #[default]
    Query,
    /// Fixed values from `[context.fixed]`, for local testing
    Static,
    /// Plain GET of two configured URLs
    Remote,
}

impl std::fmt::Display for ContextSourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ContextSourceKind::Query => "query",
            ContextSourceKind::Static => "static",
            ContextSourceKind::Remote => "remote",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextConfig {
    #[serde(default)]
    pub source: ContextSourceKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formulario_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tratamiento_url: Option<String>,

    #[serde(default)]
    pub fixed: FixedContextConfig,
}

/// Percent-encoded test values used by the `static` strategy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixedContextConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formulario: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tratamiento: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Live sessions kept in memory before the oldest is evicted
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

fn default_port() -> u16 {
    8501
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_max_sessions() -> usize {
    1_000
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            max_sessions: default_max_sessions(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `DERMACHAT_CONFIG` or the default path
    /// (~/.dermachat/config.toml).
    ///
    /// Environment variables fill in keys the file leaves unset:
    /// - `OPENAI_API_KEY`
    /// - `PINECONE_API_KEY`
    /// - `GEMINI_API_KEY`, then `GOOGLE_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&Self::config_path())?;
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// The file `load()` reads: `DERMACHAT_CONFIG` if set, else
    /// `~/.dermachat/config.toml`.
    pub fn config_path() -> PathBuf {
        std::env::var("DERMACHAT_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::config_dir().join("config.toml"))
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Fill unset keys from the environment. `lookup` is `std::env::var` in production.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.openai_api_key.is_none() {
            self.openai_api_key = lookup("OPENAI_API_KEY");
        }
        if self.pinecone_api_key.is_none() {
            self.pinecone_api_key = lookup("PINECONE_API_KEY");
        }
        if self.gemini_api_key.is_none() {
            self.gemini_api_key = lookup("GEMINI_API_KEY").or_else(|| lookup("GOOGLE_API_KEY"));
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".dermachat")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retrieval.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval.top_k must be at least 1".into(),
            ));
        }

        if self.embedding.model.trim().is_empty() || self.generation.model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "embedding.model and generation.model must not be empty".into(),
            ));
        }

        if self.context.source == ContextSourceKind::Remote
            && (self.context.formulario_url.is_none() || self.context.tratamiento_url.is_none())
        {
            return Err(ConfigError::ValidationError(
                "context.source = \"remote\" requires formulario_url and tratamiento_url".into(),
            ));
        }

        Ok(())
    }

    /// Names of the service keys that are still missing.
    pub fn missing_keys(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.openai_api_key.is_none() {
            missing.push("openai_api_key");
        }
        if self.pinecone_api_key.is_none() {
            missing.push("pinecone_api_key");
        }
        if self.gemini_api_key.is_none() {
            missing.push("gemini_api_key");
        }
        missing
    }

    /// Generate a default config TOML string (for the `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            pinecone_api_key: None,
            gemini_api_key: None,
            request_timeout_secs: default_request_timeout_secs(),
            embedding: EmbeddingConfig::default(),
            retrieval: RetrievalConfig::default(),
            generation: GenerationConfig::default(),
            context: ContextConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
