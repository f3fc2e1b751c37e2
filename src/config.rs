use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InsightConfig {
    pub storage: StorageConfig,
    pub agent: AgentConfig,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
    pub export_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AgentConfig {
    /// Provider name ("openai", "gemini", "openrouter") or "auto" to pick
    /// the first candidate whose API key env var is set.
    pub provider: String,
    /// Model override. Empty string means the provider's default.
    pub model: String,
    /// Base URL override for OpenAI-compatible endpoints.
    pub base_url: String,
    /// Maximum completion steps per batch before the session is cut off.
    pub max_steps: usize,
    pub temperature: f64,
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            agent: AgentConfig::default(),
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_insight_dir()
            .join("insight.db")
            .to_string_lossy()
            .into_owned();
        let export_dir = default_insight_dir()
            .join("documents")
            .to_string_lossy()
            .into_owned();
        Self {
            db_path,
            export_dir,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            provider: "auto".into(),
            model: String::new(),
            base_url: String::new(),
            max_steps: 20,
            temperature: 0.2,
        }
    }
}

/// Returns `~/.insight/`
pub fn default_insight_dir() -> PathBuf {
    dirs::home_dir()
        .expect("home directory must exist")
        .join(".insight")
}

/// Returns the default config file path: `~/.insight/config.toml`
pub fn default_config_path() -> PathBuf {
    default_insight_dir().join("config.toml")
}

impl InsightConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            InsightConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (INSIGHT_DB, INSIGHT_EXPORT_DIR,
    /// INSIGHT_LOG_LEVEL, INSIGHT_MODEL).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("INSIGHT_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("INSIGHT_EXPORT_DIR") {
            self.storage.export_dir = val;
        }
        if let Ok(val) = std::env::var("INSIGHT_LOG_LEVEL") {
            self.log_level = val;
        }
        if let Ok(val) = std::env::var("INSIGHT_MODEL") {
            self.agent.model = val;
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }

    /// Resolve the Markdown export directory, expanding `~` if needed.
    pub fn resolved_export_dir(&self) -> PathBuf {
        expand_tilde(&self.storage.export_dir)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .expect("home directory must exist")
            .join(rest)
    } else {
        PathBuf::from(path)
    }
}
