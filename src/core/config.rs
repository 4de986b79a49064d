use super::aggregator::{AggregatorOptions, DEFAULT_REQUEST_TIMEOUT, DEFAULT_TARGET_CURRENCY};
use super::currency::CollisionPolicy;
use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};
use tracing::debug;

pub const DEFAULT_MERCADOLIBRE_URL: &str = "https://api.mercadolibre.com";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MercadoLibreProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub mercadolibre: Option<MercadoLibreProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            mercadolibre: Some(MercadoLibreProviderConfig {
                base_url: DEFAULT_MERCADOLIBRE_URL.to_string(),
            }),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AggregationConfig {
    #[serde(default)]
    pub max_concurrency: Option<usize>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub collision_policy: CollisionPolicy,
}

fn default_request_timeout_secs() -> Option<u64> {
    Some(DEFAULT_REQUEST_TIMEOUT.as_secs())
}

fn default_currency() -> String {
    DEFAULT_TARGET_CURRENCY.to_string()
}

impl Default for AggregationConfig {
    fn default() -> Self {
        AggregationConfig {
            max_concurrency: None,
            request_timeout_secs: default_request_timeout_secs(),
            collision_policy: CollisionPolicy::default(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub aggregation: AggregationConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            providers: ProvidersConfig::default(),
            currency: default_currency(),
            aggregation: AggregationConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads the config from the default location, falling back to built-in
    /// defaults when no file exists there.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!("No config at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("io", "sitefx", "sitefx")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn mercadolibre_url(&self) -> &str {
        self.providers
            .mercadolibre
            .as_ref()
            .map_or(DEFAULT_MERCADOLIBRE_URL, |p| &p.base_url)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.aggregation.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn aggregator_options(&self) -> Result<AggregatorOptions> {
        if self.currency.trim().is_empty() {
            bail!("Target currency must not be empty");
        }
        if self.aggregation.max_concurrency == Some(0) {
            bail!("max_concurrency must be at least 1");
        }
        if self.aggregation.request_timeout_secs == Some(0) {
            bail!("request_timeout_secs must be at least 1, use null to disable the deadline");
        }

        Ok(AggregatorOptions {
            target_currency: self.currency.trim().to_uppercase(),
            max_concurrency: self.aggregation.max_concurrency,
            request_timeout: self.request_timeout(),
            collision_policy: self.aggregation.collision_policy,
        })
    }
}
