use anyhow::{Context, Result};
use reqwest::Url;
use serde::Deserialize;
use std::path::Path;

/// Environment variable that overrides `backend.base_url`.
pub const BACKEND_URL_ENV: &str = "KDESK_BACKEND_URL";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request timeout. Absent means requests may wait forever.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: None,
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    #[serde(default = "default_index_param")]
    pub index_param: String,
    #[serde(default = "default_redirect_delay_ms")]
    pub redirect_delay_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            index_param: default_index_param(),
            redirect_delay_ms: default_redirect_delay_ms(),
        }
    }
}

fn default_index_param() -> String {
    "vector_index".to_string()
}
fn default_redirect_delay_ms() -> u64 {
    2000
}

impl Config {
    /// Defaults only, used when no config file is present.
    pub fn minimal() -> Self {
        Self {
            backend: BackendConfig::default(),
            session: SessionConfig::default(),
        }
    }

    /// Parsed backend base URL. Validated by [`load_config`].
    pub fn base_url(&self) -> Result<Url> {
        Url::parse(&self.backend.base_url)
            .with_context(|| format!("Invalid backend.base_url: {}", self.backend.base_url))
    }

    /// Applies environment overrides and validates the result.
    pub fn finalize(mut self) -> Result<Self> {
        if let Ok(url) = std::env::var(BACKEND_URL_ENV) {
            if !url.trim().is_empty() {
                self.backend.base_url = url;
            }
        }
        validate(&self)?;
        Ok(self)
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    config.finalize()
}

fn validate(config: &Config) -> Result<()> {
    let url = config.base_url()?;
    match url.scheme() {
        "http" | "https" => {}
        other => anyhow::bail!(
            "backend.base_url must use http or https, got '{}'",
            other
        ),
    }

    if config.backend.timeout_secs == Some(0) {
        anyhow::bail!("backend.timeout_secs must be > 0 when set");
    }

    if config.session.index_param.trim().is_empty() {
        anyhow::bail!("session.index_param must not be empty");
    }

    Ok(())
}
