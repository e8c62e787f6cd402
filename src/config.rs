use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::Result;

pub const APP_DIR: &str = "popular-movies";
pub const CONFIG_FILE: &str = "config.json";
pub const SETTINGS_FILE: &str = "settings.json";
pub const FAVORITES_FILE: &str = "favorites.db";
pub const API_KEY_ENV: &str = "TMDB_API_KEY";

#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub tmdb_api_key: Option<String>,
    pub api_base_url: String,
    pub image_base_url: String,
    pub poster_size: String,
    pub backdrop_size: String,
    pub language: String,
    pub backfill_timeout: Duration,
    pub grid_columns: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tmdb_api_key: None,
            api_base_url: "https://api.themoviedb.org/3".to_string(),
            image_base_url: "https://image.tmdb.org/t/p/".to_string(),
            poster_size: "w342".to_string(),
            backdrop_size: "w780".to_string(),
            language: "en-US".to_string(),
            backfill_timeout: Duration::from_secs(10),
            grid_columns: 2,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(alias = "api_key")]
    tmdb_api_key: Option<String>,
    api_base_url: Option<String>,
    image_base_url: Option<String>,
    poster_size: Option<String>,
    backdrop_size: Option<String>,
    language: Option<String>,
    backfill_timeout_secs: Option<u64>,
    grid_columns: Option<u32>,
}

impl AppConfig {
    /// Applies a `config.json` body over the defaults.
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        let parsed: RawConfig = serde_json::from_str(raw)?;
        let mut cfg = AppConfig::default();

        if let Some(key) = parsed.tmdb_api_key.filter(|k| !k.trim().is_empty()) {
            cfg.tmdb_api_key = Some(key.trim().to_string());
        }
        if let Some(url) = parsed.api_base_url {
            cfg.api_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(url) = parsed.image_base_url {
            cfg.image_base_url = if url.ends_with('/') { url } else { format!("{url}/") };
        }
        if let Some(size) = parsed.poster_size {
            cfg.poster_size = size;
        }
        if let Some(size) = parsed.backdrop_size {
            cfg.backdrop_size = size;
        }
        if let Some(lang) = parsed.language {
            cfg.language = lang;
        }
        if let Some(secs) = parsed.backfill_timeout_secs {
            cfg.backfill_timeout = Duration::from_secs(secs.clamp(1, 120));
        }
        if let Some(cols) = parsed.grid_columns {
            cfg.grid_columns = cols.clamp(1, 8);
        }
        Ok(cfg)
    }

    /// Reads `config.json` from `path`, falling back to defaults on any problem.
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(raw) => match AppConfig::from_json(&raw) {
                Ok(cfg) => {
                    info!("Loaded config from {}", path.display());
                    cfg
                }
                Err(err) => {
                    warn!("Failed to parse {} ({}). Using defaults.", path.display(), err);
                    AppConfig::default()
                }
            },
            Err(_) => {
                info!("No {} found; using defaults", path.display());
                AppConfig::default()
            }
        }
    }

    pub fn poster_url(&self, path: &str) -> Option<String> {
        image_url(&self.image_base_url, &self.poster_size, path)
    }

    pub fn backdrop_url(&self, path: &str) -> Option<String> {
        image_url(&self.image_base_url, &self.backdrop_size, path)
    }
}

fn image_url(base: &str, size: &str, path: &str) -> Option<String> {
    if path.is_empty() {
        None
    } else {
        Some(format!("{base}{size}{path}"))
    }
}

/// Loads the user's config and lets `TMDB_API_KEY` override the stored key.
pub fn load_config() -> AppConfig {
    let mut cfg = AppConfig::load_from(&config_dir().join(CONFIG_FILE));
    if let Ok(key) = env::var(API_KEY_ENV) {
        if !key.trim().is_empty() {
            cfg.tmdb_api_key = Some(key.trim().to_string());
        }
    }
    cfg
}

/// Writes `key` into the config file at `path`, keeping every other entry.
pub fn store_api_key(path: &Path, key: &str) -> Result<()> {
    let mut doc = match fs::read_to_string(path) {
        Ok(raw) => serde_json::from_str::<serde_json::Value>(&raw)?,
        Err(_) => serde_json::json!({}),
    };
    if !doc.is_object() {
        doc = serde_json::json!({});
    }
    doc["tmdb_api_key"] = serde_json::Value::String(key.trim().to_string());
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(&doc)?)?;
    info!("Saved TMDB API key to {}", path.display());
    Ok(())
}

pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

pub fn data_dir() -> PathBuf {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}
