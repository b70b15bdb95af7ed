//! Configuration management for answerflow.
//!
//! Loads configuration from ${ANSWERFLOW_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default backend used when neither env nor config sets one.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// Environment variable that overrides `backend.base_url`.
pub const BASE_URL_ENV: &str = "ANSWERFLOW_BASE_URL";

/// Returns the default config template with comments.
///
/// Embedded from `default_config.toml` at compile time.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

pub mod paths {
    //! Path resolution for answerflow configuration.
    //!
    //! `ANSWERFLOW_HOME` resolution order:
    //! 1. `ANSWERFLOW_HOME` environment variable (if set)
    //! 2. `<platform config dir>/answerflow`
    //! 3. `./.answerflow` when no config dir can be determined

    use std::path::PathBuf;

    /// Returns the answerflow home directory.
    pub fn answerflow_home() -> PathBuf {
        if let Ok(home) = std::env::var("ANSWERFLOW_HOME")
            && !home.trim().is_empty()
        {
            return PathBuf::from(home);
        }

        dirs::config_dir().map_or_else(
            || PathBuf::from(".answerflow"),
            |dir| dir.join("answerflow"),
        )
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        answerflow_home().join("config.toml")
    }
}

/// Backend endpoint configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: Option<String>,
    pub stream_path: String,
    pub ask_path: String,
    /// Companion source lookup; empty disables it.
    pub sources_path: String,
    pub connect_timeout_secs: u64,
    /// Upper bound on the companion source lookup.
    pub lookup_timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            stream_path: "/api/ask/stream".to_string(),
            ask_path: "/api/ask".to_string(),
            sources_path: String::new(),
            connect_timeout_secs: 10,
            lookup_timeout_ms: 5000,
        }
    }
}

impl BackendConfig {
    /// Resolves the base URL with precedence: env > config > default.
    ///
    /// # Errors
    /// Returns an error if the chosen URL does not parse.
    pub fn resolved_base_url(&self) -> Result<String> {
        resolve_base_url(self.base_url.as_deref(), BASE_URL_ENV, DEFAULT_BASE_URL)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs.max(1))
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms.max(1))
    }

    pub fn sources_enabled(&self) -> bool {
        !self.sources_path.trim().is_empty()
    }
}

/// Reveal pacing and completion bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    pub tick_ms: u64,
    pub reveal_quantum: usize,
    pub drain_timeout_ms: u64,
    pub interrupt_grace_ms: u64,
    pub scroll_threshold: f64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            tick_ms: 30,
            reveal_quantum: 5,
            drain_timeout_ms: 5000,
            interrupt_grace_ms: 100,
            scroll_threshold: 100.0,
        }
    }
}

impl PacingConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }

    pub fn quantum(&self) -> usize {
        self.reveal_quantum.max(1)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }

    pub fn interrupt_grace(&self) -> Duration {
        Duration::from_millis(self.interrupt_grace_ms)
    }

    pub fn scroll_threshold(&self) -> f64 {
        if self.scroll_threshold.is_finite() {
            self.scroll_threshold.max(0.0)
        } else {
            0.0
        }
    }
}

/// Citation heuristics configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CitationsConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_keywords: Vec<String>,
}

/// Disclaimer texts attached to answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresentationConfig {
    pub disclaimer: String,
    pub interrupted_disclaimer: String,
}

impl PresentationConfig {
    pub const DEFAULT_DISCLAIMER: &'static str = "This answer was generated from reference documents and may contain errors. Verify important details against the cited sources.";
    pub const DEFAULT_INTERRUPTED_DISCLAIMER: &'static str = "The connection was interrupted before the answer finished. The response may be incomplete.";
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            disclaimer: Self::DEFAULT_DISCLAIMER.to_string(),
            interrupted_disclaimer: Self::DEFAULT_INTERRUPTED_DISCLAIMER.to_string(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub pacing: PacingConfig,
    pub citations: CitationsConfig,
    pub presentation: PresentationConfig,
}

impl Config {
    /// Loads configuration from the default path.
    /// Returns defaults if the file doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if the file doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Writes the default config template to `path`.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be written.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(path, default_config_template())
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }

    /// Returns this config with environment overrides applied.
    ///
    /// # Errors
    /// Returns an error if the effective base URL is invalid.
    pub fn effective(&self) -> Result<Self> {
        let mut effective = self.clone();
        effective.backend.base_url = Some(self.backend.resolved_base_url()?);
        Ok(effective)
    }

    /// Serializes the config as TOML.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }
}

/// Resolves a base URL with precedence: env > config > default.
fn resolve_base_url(
    config_base_url: Option<&str>,
    env_var: &str,
    default_url: &str,
) -> Result<String> {
    if let Ok(env_url) = std::env::var(env_var) {
        let trimmed = env_url.trim();
        if !trimmed.is_empty() {
            validate_url(trimmed)?;
            return Ok(trimmed.trim_end_matches('/').to_string());
        }
    }

    if let Some(config_url) = config_base_url {
        let trimmed = config_url.trim();
        if !trimmed.is_empty() {
            validate_url(trimmed)?;
            return Ok(trimmed.trim_end_matches('/').to_string());
        }
    }

    Ok(default_url.to_string())
}

fn validate_url(url: &str) -> Result<()> {
    url::Url::parse(url).with_context(|| format!("Invalid backend base URL: {url}"))?;
    Ok(())
}
