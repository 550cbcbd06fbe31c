/*!
common/src/lib.rs

Shared configuration, domain types and settings storage for the Mundus editor.

This crate provides:
- Config data structures (deserialized from TOML)
- An async loader for a TOML config file, with default/override merging
- The article / writeup domain types exchanged with the backend
- The persisted-settings interface and its SQLite implementation
*/

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub mod settings;
pub mod types;

pub use settings::{MemorySettingsStore, SettingsStore, SqliteSettingsStore, INSTRUCTIONS_KEY};
pub use types::{Article, ArticlePreview, CountryCode, FilterState, TimeWindow, Writeup};

pub const DEFAULT_BASE_URL: &str = "https://mundus-backend.onrender.com";

/// Backend API section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Base origin of the backend; every endpoint lives under `/api/...`
    pub base_url: String,
    /// Page size requested from the article list endpoint
    pub per_page: u32,
    /// Optional request timeout. Absent means a call waits as long as the backend does.
    pub request_timeout_seconds: Option<u64>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            per_page: 10,
            request_timeout_seconds: None,
        }
    }
}

/// Local storage section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the sqlite file holding persisted settings (e.g. "data/mundus.db")
    pub settings_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            settings_path: "data/mundus.db".to_string(),
        }
    }
}

/// Editor behaviour section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub default_country: CountryCode,
    pub default_time_window: TimeWindow,
    /// When true, failed article list loads raise an alert in addition to being logged.
    pub surface_load_errors: bool,
    /// Column width used when rendering writeup HTML as text
    pub render_width: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            default_country: CountryCode::default(),
            default_time_window: TimeWindow::default(),
            surface_load_errors: false,
            render_width: 80,
        }
    }
}

/// Top-level application configuration (deserialized from config.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub editor: EditorConfig,
}

impl Config {
    /// Load configuration from a TOML file asynchronously.
    ///
    /// Example:
    ///   let cfg = Config::from_file("config.toml").await?;
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = tokio::fs::read_to_string(path.as_ref())
            .await
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let cfg: Config = toml::from_str(&data).context("Failed to parse TOML configuration")?;
        Ok(cfg)
    }

    /// Load configuration with an optional default file and an optional override file.
    /// If both are present, they are merged (override takes precedence).
    pub async fn load_with_defaults(default_path: Option<&Path>, override_path: Option<&Path>) -> Result<Self> {
        let mut config_value = toml::Value::Table(toml::map::Map::new());

        for (label, path) in [("default", default_path), ("override", override_path)] {
            let Some(path) = path else { continue };
            if !path.exists() {
                continue;
            }
            let data = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read {} config: {}", label, path.display()))?;
            let val: toml::Value = toml::from_str(&data)
                .with_context(|| format!("Failed to parse {} configuration", label))?;
            merge_toml(&mut config_value, val);
        }

        let cfg: Config = config_value.try_into().context("Failed to parse merged configuration")?;
        Ok(cfg)
    }
}

fn merge_toml(a: &mut toml::Value, b: toml::Value) {
    match (a, b) {
        (toml::Value::Table(a_map), toml::Value::Table(b_map)) => {
            for (k, v) in b_map {
                if let Some(a_val) = a_map.get_mut(&k) {
                    merge_toml(a_val, v);
                } else {
                    a_map.insert(k, v);
                }
            }
        }
        (a_val, b_val) => *a_val = b_val,
    }
}
