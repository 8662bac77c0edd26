//! Runtime configuration.
//!
//! Loaded from an optional TOML file (`NETRAM_CONFIG`, default `netram.toml`),
//! then overridden by environment variables. A `.env` file is honoured.
//!
//! ```toml
//! [server]
//! port = 3001
//!
//! [llm]
//! provider = "gemini"
//! model = "gemini-2.0-flash"
//! ```

use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};

use crate::error::{NetramError, Result};

/// Complete service configuration.
#[derive(Debug, Default, Deserialize)]
pub struct NetramConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub sms: SmsConfig,

    #[serde(default)]
    pub session: SessionConfig,
}

fn deserialize_secret<'de, D>(deserializer: D) -> std::result::Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.is_empty()).map(SecretString::from))
}

// ── Server ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Raw upload ceiling for `/api/diagnosis` and `/api/analyze-document`.
    #[serde(default = "default_max_upload")]
    pub max_upload_bytes: usize,
}

fn default_bind() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 3001 }
fn default_max_upload() -> usize { 10 * 1024 * 1024 }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            max_upload_bytes: default_max_upload(),
        }
    }
}

// ── LLM ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    #[default]
    Gemini,
    Openai,
    OpenaiCompatible,
    Anthropic,
    Ollama,
}

impl std::str::FromStr for LlmProvider {
    type Err = NetramError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" | "googleai" => Ok(LlmProvider::Gemini),
            "openai"              => Ok(LlmProvider::Openai),
            "openai_compatible"   => Ok(LlmProvider::OpenaiCompatible),
            "anthropic"           => Ok(LlmProvider::Anthropic),
            "ollama"              => Ok(LlmProvider::Ollama),
            other => Err(NetramError::Config(format!("unknown LLM provider '{other}'"))),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: LlmProvider,

    #[serde(default = "default_model")]
    pub model: String,

    /// Required for `openai_compatible` and `ollama`.
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default, deserialize_with = "deserialize_secret")]
    pub api_key: Option<SecretString>,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Entries kept in the in-memory AI call audit ring.
    #[serde(default = "default_audit_capacity")]
    pub audit_capacity: usize,
}

fn default_model() -> String { "gemini-2.0-flash".to_string() }
fn default_max_tokens() -> u32 { 4096 }
fn default_temperature() -> f32 { 0.2 }
fn default_audit_capacity() -> usize { 200 }

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            model: default_model(),
            base_url: None,
            api_key: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            audit_capacity: default_audit_capacity(),
        }
    }
}

// ── Search ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,

    #[serde(default = "default_pubmed_retmax")]
    pub pubmed_retmax: usize,

    #[serde(default, deserialize_with = "deserialize_secret")]
    pub pubmed_api_key: Option<SecretString>,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
}

fn default_cache_ttl() -> u64 { 300 }
fn default_cache_capacity() -> u64 { 10_000 }
fn default_pubmed_retmax() -> usize { 3 }
fn default_user_agent() -> String { "NetramClinic/1.0 (contact@example.com)".to_string() }
fn default_timeout() -> u64 { 15 }

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl(),
            cache_capacity: default_cache_capacity(),
            pubmed_retmax: default_pubmed_retmax(),
            pubmed_api_key: None,
            user_agent: default_user_agent(),
            request_timeout_secs: default_timeout(),
        }
    }
}

// ── Store / SMS / Session ────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreConfig {
    /// JSON snapshot file. In-memory only when unset.
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SmsConfig {
    /// Messages are only logged when unset.
    #[serde(default)]
    pub webhook_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_session_ttl")]
    pub ttl_hours: i64,
}

fn default_session_ttl() -> i64 { 24 * 7 }

impl Default for SessionConfig {
    fn default() -> Self {
        Self { ttl_hours: default_session_ttl() }
    }
}

// ── Loading ──────────────────────────────────────────────────────────────────

impl NetramConfig {
    /// Load `.env`, the TOML file if present, then environment overrides.
    pub fn load() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            tracing::debug!("No .env loaded: {}", e);
        }
        let path = std::env::var("NETRAM_CONFIG").unwrap_or_else(|_| "netram.toml".to_string());
        let mut config = if Path::new(&path).exists() {
            Self::from_toml_file(&path)?
        } else {
            tracing::info!(path = %path, "Config file not found, using defaults");
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| NetramError::Config(format!("{}: {e}", path.as_ref().display())))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| NetramError::Config(e.to_string()))
    }

    /// Apply overrides from a variable lookup (the process environment in production).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(port) = lookup("PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(bind) = lookup("NETRAM_BIND") {
            self.server.bind = bind;
        }
        if let Some(provider) = lookup("LLM_PROVIDER") {
            match provider.parse() {
                Ok(p) => self.llm.provider = p,
                Err(e) => tracing::warn!("Ignoring LLM_PROVIDER: {}", e),
            }
        }
        if let Some(model) = lookup("LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(url) = lookup("LLM_BASE_URL") {
            self.llm.base_url = Some(url);
        }
        let key_var = match self.llm.provider {
            LlmProvider::Gemini => lookup("GEMINI_API_KEY").or_else(|| lookup("GOOGLE_API_KEY")),
            LlmProvider::Openai | LlmProvider::OpenaiCompatible => lookup("OPENAI_API_KEY"),
            LlmProvider::Anthropic => lookup("ANTHROPIC_API_KEY"),
            LlmProvider::Ollama => None,
        };
        if let Some(key) = key_var.filter(|k| !k.is_empty()) {
            self.llm.api_key = Some(SecretString::from(key));
        }
        if let Some(key) = lookup("PUBMED_API_KEY").filter(|k| !k.is_empty()) {
            self.search.pubmed_api_key = Some(SecretString::from(key));
        }
        if let Some(path) = lookup("NETRAM_STORE_PATH") {
            self.store.snapshot_path = Some(PathBuf::from(path));
        }
        if let Some(url) = lookup("SMS_WEBHOOK_URL") {
            self.sms.webhook_url = Some(url);
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.bind, self.server.port)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = NetramConfig::default();
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.llm.provider, LlmProvider::Gemini);
        assert_eq!(config.search.cache_ttl_secs, 300);
        assert_eq!(config.server.max_upload_bytes, 10 * 1024 * 1024);
        assert!(config.llm.api_key.is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = NetramConfig::from_toml_str(r#"
            [server]
            port = 8080

            [llm]
            provider = "anthropic"
            model = "claude-sonnet-4-5"
            api_key = "sk-ant-test"
        "#).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.bind, "127.0.0.1");
        assert_eq!(config.llm.provider, LlmProvider::Anthropic);
        assert_eq!(config.llm.api_key.as_ref().unwrap().expose_secret(), "sk-ant-test");
        assert_eq!(config.search.pubmed_retmax, 3);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("PORT", "9000"),
            ("GOOGLE_API_KEY", "AIza-test"),
            ("SMS_WEBHOOK_URL", "http://sms.local/send"),
        ]);
        let mut config = NetramConfig::default();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.llm.api_key.as_ref().unwrap().expose_secret(), "AIza-test");
        assert_eq!(config.sms.webhook_url.as_deref(), Some("http://sms.local/send"));
    }

    #[test]
    fn test_bad_provider_override_is_ignored() {
        let mut config = NetramConfig::default();
        config.apply_overrides(|k| (k == "LLM_PROVIDER").then(|| "mystery".to_string()));
        assert_eq!(config.llm.provider, LlmProvider::Gemini);
    }

    #[test]
    fn test_config_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("netram.toml");
        std::fs::write(&path, "[store]\nsnapshot_path = \"/tmp/netram.json\"\n").unwrap();
        let config = NetramConfig::from_toml_file(&path).unwrap();
        assert_eq!(config.store.snapshot_path, Some(PathBuf::from("/tmp/netram.json")));
    }
}
