use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::constants::PLACEHOLDER_IMAGE;
use crate::error::{CmaError, Result};
use crate::pipeline::processing::scoring::ScoringConfig;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub enrichment: EnrichmentConfig,
    pub scoring: ScoringConfig,
    pub presentation: PresentationConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// Per-comparable MLS lookup timeout; a timeout counts as a failed lookup
    pub lookup_timeout_ms: u64,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self { lookup_timeout_ms: 8_000 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PresentationConfig {
    pub placeholder_image: String,
    /// Classify price per square foot as better/worse (cheaper is better)
    pub score_price_per_sqft: bool,
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            placeholder_image: PLACEHOLDER_IMAGE.to_string(),
            score_price_per_sqft: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Read from `CMA_API_KEY`, never from the file
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/api".to_string(),
            timeout_secs: 15,
            api_key: None,
        }
    }
}

impl Config {
    /// Load `config.toml` from the working directory, then apply environment overrides
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load from `path`, falling back to defaults when the file does not exist
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| {
                CmaError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
            })?;
            Self::from_toml_str(&content)?
        } else {
            info!(path = %path.display(), "No config file found, using defaults");
            Self::default()
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(base_url) = std::env::var("CMA_API_BASE_URL") {
            self.api.base_url = base_url;
        }
        if let Ok(key) = std::env::var("CMA_API_KEY") {
            self.api.api_key = Some(key).filter(|k| !k.trim().is_empty());
        }
        if let Ok(timeout) = std::env::var("CMA_LOOKUP_TIMEOUT_MS") {
            self.enrichment.lookup_timeout_ms = timeout
                .parse()
                .map_err(|_| CmaError::Config(format!("CMA_LOOKUP_TIMEOUT_MS is not a number: '{}'", timeout)))?;
        }
        self.validate()
    }

    fn validate(&self) -> Result<()> {
        if self.enrichment.lookup_timeout_ms == 0 {
            return Err(CmaError::Config("enrichment.lookup_timeout_ms must be positive".to_string()));
        }
        let w = &self.scoring.investment_weights;
        if [w.price, w.days_on_market, w.equity, w.appreciation]
            .iter()
            .any(|v| !v.is_finite() || *v < 0.0)
        {
            return Err(CmaError::Config("scoring.investment_weights must be non-negative".to_string()));
        }
        Ok(())
    }
}
