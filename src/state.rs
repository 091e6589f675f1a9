use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

use crate::core::cache::{CacheConfig, MAX_TTL};
use crate::core::compare::Comparator;
use crate::core::decode::ImageLimits;
use crate::core::model::{VisionModel, DEFAULT_API_BASE, DEFAULT_MODEL};
use crate::error::{AppError, Result};
use crate::utils::{non_empty, parse_or};

/// Configuration for the application
#[derive(Clone)]
pub struct Config {
    /// Google API key used for the model
    pub api_key: String,
    /// Model name, e.g. `gemini-1.5-pro`
    pub model: String,
    /// Base URL of the model REST API
    pub api_base: String,
    /// Optional limit on a single model call
    pub model_timeout: Option<Duration>,
    /// Address to bind
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Request image limits
    pub limits: ImageLimits,
    /// Result cache configuration
    pub cache: CacheConfig,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("model_timeout", &self.model_timeout)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("limits", &self.limits)
            .field("cache", &self.cache)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            model_timeout: None,
            host: String::from("0.0.0.0"),
            port: 8000,
            limits: ImageLimits::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Fails when `GOOGLE_API_KEY` is missing or a numeric setting does not parse.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key/value source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let api_key = non_empty(&lookup, "GOOGLE_API_KEY").ok_or_else(|| {
            AppError::Config("GOOGLE_API_KEY environment variable is not set".to_string())
        })?;

        let model_timeout = match non_empty(&lookup, "GEMINI_TIMEOUT_SECS") {
            Some(_) => Some(Duration::from_secs(parse_or(&lookup, "GEMINI_TIMEOUT_SECS", 0u64)?)),
            None => None,
        };

        let ttl = Duration::from_secs(parse_or(&lookup, "CACHE_TTL_SECS", defaults.cache.ttl.as_secs())?);
        if ttl > MAX_TTL {
            return Err(AppError::Config(format!(
                "CACHE_TTL_SECS must be at most {} seconds",
                MAX_TTL.as_secs()
            )));
        }

        let max_dimension = parse_or(&lookup, "MAX_IMAGE_DIMENSION", defaults.limits.max_dimension)?;
        if max_dimension == 0 {
            return Err(AppError::Config("MAX_IMAGE_DIMENSION must be positive".to_string()));
        }

        Ok(Self {
            api_key,
            model: non_empty(&lookup, "GEMINI_MODEL").unwrap_or(defaults.model),
            api_base: non_empty(&lookup, "GEMINI_API_BASE").unwrap_or(defaults.api_base),
            model_timeout,
            host: non_empty(&lookup, "HOST").unwrap_or(defaults.host),
            port: parse_or(&lookup, "PORT", defaults.port)?,
            limits: ImageLimits {
                max_bytes: parse_or(&lookup, "MAX_IMAGE_BYTES", defaults.limits.max_bytes)?,
                max_dimension,
            },
            cache: CacheConfig {
                max_entries: parse_or(&lookup, "CACHE_MAX_ENTRIES", defaults.cache.max_entries)?,
                ttl,
            },
        })
    }

    /// Socket address to bind
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| AppError::Config(format!("invalid bind address {}:{}: {}", self.host, self.port, e)))?
            .next()
            .ok_or_else(|| AppError::Config(format!("{} did not resolve to an address", self.host)))
    }

    /// Largest request body accepted: two maximal images in base64 plus JSON framing
    pub fn max_body_bytes(&self) -> usize {
        let encoded_image = self.limits.max_bytes.div_ceil(3).saturating_mul(4);
        // data-URL headers and the JSON envelope
        encoded_image.saturating_mul(2).saturating_add(64 * 1024)
    }
}

/// Application state that can be shared across handlers
#[derive(Clone)]
#[derive(Debug)]
pub struct AppState {
    /// Application configuration
    pub config: Config,
    /// Comparison orchestrator, owning the result cache and model handle
    pub comparator: Comparator,
}

impl AppState {
    /// Create the application state around a model client
    pub fn new(config: Config, model: Arc<dyn VisionModel>) -> Arc<Self> {
        let comparator = Comparator::new(model, config.limits, config.cache);

        Arc::new(Self { config, comparator })
    }
}
