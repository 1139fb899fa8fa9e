use atlas_core::mapper::LINEAR;
use atlas_core::{AtlasError, AtlasResult, Fact, FactRegistry};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { path: default_store_path() }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct SessionConfig {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_mapper")]
    pub default_mapper: String,
    #[serde(default = "default_true")]
    pub show_filtered: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { debounce_ms: default_debounce_ms(), default_mapper: default_mapper(), show_filtered: true }
    }
}

impl SessionConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct AtlasConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub session: SessionConfig,
    /// Fact table; empty means the built-in facts
    #[serde(default)]
    pub facts: Vec<Fact>,
}

impl AtlasConfig {
    /// Load from `ATLAS_CONFIG_PATH`, falling back to `atlas.toml`, then to defaults
    pub fn load() -> AtlasResult<Self> {
        let config_path = std::env::var("ATLAS_CONFIG_PATH").unwrap_or_else(|_| "atlas.toml".to_string());
        let path = Path::new(&config_path);
        if !path.is_file() {
            warn!("Configuration file '{}' not found. Using default configuration.", config_path);
            return Ok(Self::default());
        }
        Self::from_path(path)
    }

    pub fn from_path(path: &Path) -> AtlasResult<Self> {
        let config_str = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&config_str)?;
        info!(path = %path.display(), facts = config.facts.len(), "Loaded configuration");
        Ok(config)
    }

    pub fn from_toml_str(config_str: &str) -> AtlasResult<Self> {
        toml::from_str(config_str)
            .map_err(|err| AtlasError::configuration("config", format!("Failed to parse configuration: {err}")))
    }

    /// Apply `ATLAS_*` environment overrides
    pub fn apply_profile(self) -> Self {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    pub fn apply_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(path) = lookup("ATLAS_DB_PATH") {
            self.store.path = PathBuf::from(path);
        }
        if let Some(debounce) = lookup("ATLAS_DEBOUNCE_MS") {
            match debounce.parse::<u64>() {
                Ok(ms) => self.session.debounce_ms = ms,
                Err(_) => warn!(value = %debounce, "Ignoring invalid ATLAS_DEBOUNCE_MS"),
            }
        }
        if let Some(mapper) = lookup("ATLAS_DEFAULT_MAPPER") {
            self.session.default_mapper = mapper;
        }
        self
    }

    /// Registry of the configured facts
    pub fn registry(&self) -> AtlasResult<FactRegistry> {
        if self.facts.is_empty() {
            return Ok(FactRegistry::builtin());
        }
        FactRegistry::new(self.facts.clone())
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("countries.db")
}

fn default_debounce_ms() -> u64 {
    50
}

fn default_mapper() -> String {
    LINEAR.to_string()
}

fn default_true() -> bool {
    true
}
