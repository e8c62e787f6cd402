use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::sort::{SortMode, SORT_ORDER_KEY};

/// Key-value preferences persisted as a flat JSON object.
pub struct Settings {
    values: BTreeMap<String, String>,
    path: PathBuf,
}

impl Settings {
    /// Opens the settings file. A missing or unreadable file is an empty
    /// store, and entries that aren't strings are skipped.
    pub fn open(path: &Path) -> Self {
        let values = match fs::read_to_string(path) {
            Ok(raw) => parse_values(path, &raw),
            Err(_) => {
                info!("No {} found; using defaults", path.display());
                BTreeMap::new()
            }
        };
        Settings {
            values,
            path: path.to_path_buf(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        self.save()
    }

    pub fn sort_mode(&self) -> SortMode {
        SortMode::parse(self.get(SORT_ORDER_KEY))
    }

    pub fn set_sort_mode(&mut self, mode: SortMode) -> Result<()> {
        debug!("sort order -> {mode}");
        self.set(SORT_ORDER_KEY, mode.as_key())
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&self.values)?)?;
        Ok(())
    }
}

fn parse_values(path: &Path, raw: &str) -> BTreeMap<String, String> {
    let parsed: BTreeMap<String, Value> = match serde_json::from_str(raw) {
        Ok(parsed) => parsed,
        Err(err) => {
            warn!("Failed to parse {} ({}). Using defaults.", path.display(), err);
            return BTreeMap::new();
        }
    };
    parsed
        .into_iter()
        .filter_map(|(key, value)| match value {
            Value::String(text) => Some((key, text)),
            other => {
                warn!("Ignoring setting {key}: expected a string, found {other}");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_defaults_to_popularity() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::open(&dir.path().join("settings.json"));
        assert_eq!(settings.sort_mode(), SortMode::Popularity);
    }

    #[test]
    fn test_sort_mode_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut settings = Settings::open(&path);
        settings.set_sort_mode(SortMode::Favorites).unwrap();

        let reopened = Settings::open(&path);
        assert_eq!(reopened.sort_mode(), SortMode::Favorites);
        assert_eq!(reopened.get(SORT_ORDER_KEY), Some("favorites"));
    }

    #[test]
    fn test_garbage_value_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "sort_order": "alphabetical" }"#).unwrap();
        let settings = Settings::open(&path);
        assert_eq!(settings.sort_mode(), SortMode::Popularity);
    }

    #[test]
    fn test_non_string_value_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "sort_order": 1, "theme": "dark" }"#).unwrap();
        let settings = Settings::open(&path);
        assert_eq!(settings.sort_mode(), SortMode::Popularity);
        assert_eq!(settings.get(SORT_ORDER_KEY), None);
        assert_eq!(settings.get("theme"), Some("dark"));
    }

    #[test]
    fn test_truncated_file_falls_back_and_recovers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "sort_order": "ratin"#).unwrap();

        let mut settings = Settings::open(&path);
        assert_eq!(settings.sort_mode(), SortMode::Popularity);

        settings.set_sort_mode(SortMode::Rating).unwrap();
        assert_eq!(Settings::open(&path).sort_mode(), SortMode::Rating);
    }
}
