//! Client configuration selected by deployment environment.
//!
//! # Design
//! One preset per `Environment` replaces the per-environment copies of the
//! client bootstrap. `ClientConfig::load` layers, lowest first: the preset,
//! `storefront.yaml` (path from `GYM_CONFIG`), then `GYM_*` variables. The
//! result is validated once; nothing mutates it afterwards.

use std::path::PathBuf;
use std::time::Duration;

use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

pub const DEFAULT_CONFIG_FILE: &str = "storefront.yaml";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] figment::Error),

    #[error("invalid base origin '{0}': expected an absolute http(s) URL")]
    InvalidOrigin(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    #[serde(alias = "prod")]
    Production,
    #[serde(alias = "dev")]
    Development,
}

impl Environment {
    fn preset_origin(self) -> &'static str {
        match self {
            Environment::Production => "https://aigymapp-server.vercel.app",
            Environment::Development => "http://localhost:3000",
        }
    }

    fn preset_credentials(self) -> bool {
        match self {
            Environment::Production => false,
            Environment::Development => true,
        }
    }
}

/// Raw, optional settings as read from the config file and environment.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Settings {
    pub env: Option<Environment>,
    pub base_url: Option<String>,
    pub with_credentials: Option<bool>,
    pub timeout_secs: Option<u64>,
    pub token_file: Option<PathBuf>,
}

/// Fully resolved client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub environment: Environment,
    pub base_url: String,
    pub with_credentials: bool,
    pub timeout: Duration,
    pub token_file: PathBuf,
}

impl ClientConfig {
    /// Build a configuration bound to `origin`. Other fields take the
    /// production defaults.
    pub fn new(origin: &str, with_credentials: bool) -> Result<Self, ConfigError> {
        Ok(Self {
            environment: Environment::Production,
            base_url: normalize_origin(origin)?,
            with_credentials,
            timeout: DEFAULT_TIMEOUT,
            token_file: default_token_file(),
        })
    }

    pub fn for_environment(environment: Environment) -> Self {
        Self {
            environment,
            base_url: environment.preset_origin().to_string(),
            with_credentials: environment.preset_credentials(),
            timeout: DEFAULT_TIMEOUT,
            token_file: default_token_file(),
        }
    }

    /// Load from `storefront.yaml` (or `$GYM_CONFIG`) and `GYM_*` variables.
    pub fn load() -> Result<Self, ConfigError> {
        let path =
            std::env::var("GYM_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        let settings: Settings = Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed("GYM_").ignore(&["config"]))
            .extract()?;
        Self::from_settings(settings)
    }

    pub fn from_settings(settings: Settings) -> Result<Self, ConfigError> {
        let mut config = Self::for_environment(settings.env.unwrap_or_default());
        if let Some(base_url) = settings.base_url {
            config.base_url = base_url;
        }
        if let Some(with_credentials) = settings.with_credentials {
            config.with_credentials = with_credentials;
        }
        if let Some(secs) = settings.timeout_secs {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(token_file) = settings.token_file {
            config.token_file = token_file;
        }
        config.base_url = normalize_origin(&config.base_url)?;
        Ok(config)
    }

    pub fn with_token_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_file = path.into();
        self
    }
}

/// Default location of the persisted local-storage file.
pub fn default_token_file() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("gym-storefront")
        .join("local-storage.json")
}

/// Parse `origin` as an absolute http(s) URL with a host and no query or
/// fragment, so that `origin + path` always lands in the path.
fn normalize_origin(origin: &str) -> Result<String, ConfigError> {
    let invalid = || ConfigError::InvalidOrigin(origin.to_string());
    let url = Url::parse(origin.trim()).map_err(|_| invalid())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid());
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid());
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(invalid());
    }
    Ok(url.as_str().trim_end_matches('/').to_string())
}
