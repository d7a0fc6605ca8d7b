use crate::browser::debounce::DEFAULT_SEARCH_DEBOUNCE;
use crate::browser::notifier::DEFAULT_UPDATE_INTERVAL;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const APP_NAME: &str = "rust-s3ui";
pub const SETTINGS_FILE: &str = "settings.json";
/// Name of the profile built from the environment. Never written to disk.
pub const TRANSIENT: &str = "<Transient>";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub connections: Vec<S3Config>,
    #[serde(default)]
    pub browser: BrowserSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct S3Config {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default, rename = "accessKey")]
    pub access_key: String,
    #[serde(default, rename = "secretKey")]
    pub secret_key: String,
    #[serde(default)]
    pub bucket: String,
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub region: String,
    #[serde(default, rename = "usessl")]
    pub use_ssl: bool,
}

impl S3Config {
    pub fn is_transient(&self) -> bool {
        self.name == TRANSIENT
    }
}

/// Tuning of the listing pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    /// Objects requested per listing call.
    pub batch_size: usize,
    /// Objects loaded before pausing for "load more". 0 loads everything.
    pub max_objects: usize,
    pub update_interval_ms: u64,
    pub search_debounce_ms: u64,
    pub link_expiry_secs: u64,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            batch_size: 500,
            max_objects: 50_000,
            update_interval_ms: DEFAULT_UPDATE_INTERVAL.as_millis() as u64,
            search_debounce_ms: DEFAULT_SEARCH_DEBOUNCE.as_millis() as u64,
            link_expiry_secs: 3600,
        }
    }
}

impl BrowserSettings {
    /// The object ceiling for a load, `None` when unlimited.
    pub fn ceiling(&self) -> Option<usize> {
        (self.max_objects > 0).then_some(self.max_objects)
    }
}

impl Config {
    /// Location of the settings file in the platform config directory.
    pub fn default_path() -> Result<PathBuf> {
        let dir = dirs::config_dir().context("Could not determine the config directory")?;
        Ok(dir.join(APP_NAME).join(SETTINGS_FILE))
    }

    /// Reads the settings file (if any) and puts a transient profile built
    /// from the environment in front of its connections.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            Self::from_file(path)?
        } else {
            Config::default()
        };

        if let Some(transient) = Self::from_env() {
            config.connections.retain(|c| !c.is_transient());
            config.connections.insert(0, transient);
        }
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config: Config =
            serde_json::from_str(&content).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Profile from `S3_*` variables, present only when both endpoint and
    /// access key are set.
    pub fn from_env() -> Option<S3Config> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    fn from_vars<F>(var: F) -> Option<S3Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| var(name).unwrap_or_default();
        let config = S3Config {
            name: TRANSIENT.to_string(),
            endpoint: get("S3_ENDPOINT"),
            access_key: get("S3_ACCESS_KEY"),
            secret_key: get("S3_SECRET_KEY"),
            bucket: get("S3_BUCKET"),
            prefix: get("S3_PREFIX"),
            region: get("S3_REGION"),
            use_ssl: matches!(
                get("S3_USE_SSL").to_ascii_lowercase().as_str(),
                "1" | "true" | "yes"
            ),
        };
        (!config.endpoint.is_empty() && !config.access_key.is_empty()).then_some(config)
    }

    /// Writes the configuration, leaving out the transient profile.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let mut persisted = self.clone();
        persisted.connections.retain(|c| !c.is_transient());

        let content =
            serde_json::to_string_pretty(&persisted).context("Failed to serialize config")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        fs::write(path, content).context("Failed to write config file")?;

        Ok(())
    }
}
