//! Engine configuration.
//!
//! Resolution order (highest priority first):
//! 1. CLI flags (applied by the binary)
//! 2. Environment variables (`KOSORA_*`, `GEMINI_*`)
//! 3. A TOML file, when one is given
//! 4. Compiled defaults

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use kosora_rag::StoreConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::agents::{
    AgentAdapter, AgentRegistry, ContentGroundingAgent, GeminiAgent, GeminiSettings,
    GrammarRulesAgent, StyleRulesAgent,
};
use crate::domain::{Category, EvaluationOptions};

pub const ENV_AGENT_TIMEOUT_MS: &str = "KOSORA_AGENT_TIMEOUT_MS";
pub const ENV_MIN_CONFIDENCE: &str = "KOSORA_MIN_CONFIDENCE";
pub const ENV_RETRIEVAL_K: &str = "KOSORA_RETRIEVAL_K";
pub const ENV_USE_RETRIEVAL: &str = "KOSORA_USE_RETRIEVAL";
pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";
pub const ENV_GEMINI_MODEL: &str = "GEMINI_MODEL";

/// Categories a configured Gemini key adds agents for.
const GEMINI_CATEGORIES: [Category; 3] = [Category::Content, Category::Grammar, Category::Style];

/// Errors produced while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML in {path}: {message}")]
    Parse { path: String, message: String },

    #[error("invalid value for {field}: {message}")]
    Invalid { field: String, message: String },
}

impl ConfigError {
    fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Result type for configuration loading.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Everything needed to assemble a [`CorrectionEngine`](crate::CorrectionEngine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub agent_timeout_ms: u64,
    pub min_confidence: f64,
    pub enabled_categories: Vec<Category>,
    pub use_retrieval: bool,
    pub retrieval_k: usize,
    pub relevance_floor: f64,
    pub cache_capacity: u64,
    pub cache_ttl_secs: u64,
    pub style_sentence_word_limit: usize,
    pub gemini: Option<GeminiSettings>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let options = EvaluationOptions::default();
        let store = StoreConfig::default();
        Self {
            agent_timeout_ms: options.per_agent_timeout_ms,
            min_confidence: options.min_confidence,
            enabled_categories: Category::ALL.to_vec(),
            use_retrieval: options.use_retrieval,
            retrieval_k: 5,
            relevance_floor: store.relevance_floor,
            cache_capacity: store.cache_capacity,
            cache_ttl_secs: store.cache_ttl.as_secs(),
            style_sentence_word_limit: crate::agents::style::DEFAULT_SENTENCE_WORD_LIMIT,
            gemini: None,
        }
    }
}

impl EngineConfig {
    /// Defaults, then `path` if given, then the process environment.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        config.validate()?;
        debug!(
            categories = ?config.enabled_categories,
            gemini = config.gemini.is_some(),
            "configuration loaded"
        );
        Ok(config)
    }

    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&raw).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Parse a TOML string; missing keys keep their defaults.
    pub fn from_toml(toml_str: &str) -> ConfigResult<Self> {
        toml::from_str(toml_str).map_err(|e| ConfigError::Parse {
            path: "<string>".to_string(),
            message: e.to_string(),
        })
    }

    pub fn apply_env_overrides(&mut self) -> ConfigResult<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides read through `lookup`. Blank values are ignored.
    pub fn apply_overrides_from(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> ConfigResult<()> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(ENV_AGENT_TIMEOUT_MS) {
            self.agent_timeout_ms = parse_value(ENV_AGENT_TIMEOUT_MS, &v, "an integer")?;
        }
        if let Some(v) = get(ENV_MIN_CONFIDENCE) {
            self.min_confidence = parse_value(ENV_MIN_CONFIDENCE, &v, "a number")?;
        }
        if let Some(v) = get(ENV_RETRIEVAL_K) {
            self.retrieval_k = parse_value(ENV_RETRIEVAL_K, &v, "an integer")?;
        }
        if let Some(v) = get(ENV_USE_RETRIEVAL) {
            self.use_retrieval = match v.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    return Err(ConfigError::invalid(
                        ENV_USE_RETRIEVAL,
                        format!("not a boolean: {v}"),
                    ))
                }
            };
        }
        if let Some(key) = get(ENV_GEMINI_API_KEY) {
            match self.gemini.as_mut() {
                Some(settings) => settings.api_key = key,
                None => self.gemini = Some(GeminiSettings::new(key)),
            }
        }
        if let Some(model) = get(ENV_GEMINI_MODEL) {
            if let Some(settings) = self.gemini.as_mut() {
                settings.model = model;
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.default_options()
            .validate()
            .map_err(|message| ConfigError::invalid("options", message))?;
        if self.retrieval_k == 0 {
            return Err(ConfigError::invalid("retrieval_k", "must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.relevance_floor) {
            return Err(ConfigError::invalid("relevance_floor", "must be between 0.0 and 1.0"));
        }
        if self.style_sentence_word_limit == 0 {
            return Err(ConfigError::invalid("style_sentence_word_limit", "must be at least 1"));
        }
        if let Some(gemini) = &self.gemini {
            if gemini.api_key.trim().is_empty() {
                return Err(ConfigError::invalid("gemini.api_key", "must not be empty"));
            }
        }
        Ok(())
    }

    pub fn default_options(&self) -> EvaluationOptions {
        EvaluationOptions::default()
            .with_categories(self.enabled_categories.iter().copied())
            .with_retrieval(self.use_retrieval)
            .with_timeout_ms(self.agent_timeout_ms)
            .with_min_confidence(self.min_confidence)
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            relevance_floor: self.relevance_floor,
            cache_capacity: self.cache_capacity,
            cache_ttl: Duration::from_secs(self.cache_ttl_secs),
        }
    }

    /// Rule agents for every category, plus Gemini agents when a key is set.
    pub fn build_registry(&self) -> ConfigResult<AgentRegistry> {
        let mut registry = AgentRegistry::new();
        register(&mut registry, Arc::new(GrammarRulesAgent::new()))?;
        let style = StyleRulesAgent::new()
            .with_sentence_word_limit(self.style_sentence_word_limit);
        register(&mut registry, Arc::new(style))?;
        register(&mut registry, Arc::new(ContentGroundingAgent::new()))?;

        if let Some(settings) = &self.gemini {
            let client = reqwest::Client::new();
            for category in GEMINI_CATEGORIES {
                let agent = GeminiAgent::with_client(client.clone(), category, settings.clone());
                register(&mut registry, Arc::new(agent))?;
            }
            info!(model = %settings.model, "gemini agents enabled");
        }
        Ok(registry)
    }
}

fn parse_value<T: FromStr>(field: &str, value: &str, expected: &str) -> ConfigResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(field, format!("not {expected}: {value}")))
}

fn register(registry: &mut AgentRegistry, agent: Arc<dyn AgentAdapter>) -> ConfigResult<()> {
    registry
        .register(agent)
        .map_err(|e| ConfigError::invalid("agents", e.to_string()))
}
