// Configuration helpers
//
// This module provides functions for reading/writing the scout
// preferences file and deriving run parameters from it.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::history::DEFAULT_HISTORY_CAP;
use crate::links::{default_reserved_segments, LinkPolicy, DEFAULT_SEARCH_BASE, DEFAULT_TRUSTED_PREFIX};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoutSettings {
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,  // Near-duplicate cutoff (0.0-1.0)
    #[serde(default = "default_quota")]
    pub quota: usize,  // Candidates accepted per run
    #[serde(default = "default_over_generation_factor")]
    pub over_generation_factor: f64,  // Requested / accepted
    #[serde(default = "default_history_cap")]
    pub history_cap: usize,
    #[serde(default = "default_prompt_history_limit")]
    pub prompt_history_limit: usize,  // Entries sent to the generator as a hint
    #[serde(default)]
    pub history_file: Option<PathBuf>,  // None = ~/.scout/history.json
    #[serde(default = "default_search_base_url")]
    pub search_base_url: String,
    #[serde(default = "default_trusted_url_prefix")]
    pub trusted_url_prefix: String,
    #[serde(default = "default_reserved_segments")]
    pub reserved_path_segments: Vec<String>,
}

fn default_similarity_threshold() -> f64 {
    0.75
}

fn default_quota() -> usize {
    6
}

fn default_over_generation_factor() -> f64 {
    1.5
}

fn default_history_cap() -> usize {
    DEFAULT_HISTORY_CAP
}

fn default_prompt_history_limit() -> usize {
    50
}

fn default_search_base_url() -> String {
    DEFAULT_SEARCH_BASE.to_string()
}

fn default_trusted_url_prefix() -> String {
    DEFAULT_TRUSTED_PREFIX.to_string()
}

impl Default for ScoutSettings {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            quota: default_quota(),
            over_generation_factor: default_over_generation_factor(),
            history_cap: default_history_cap(),
            prompt_history_limit: default_prompt_history_limit(),
            history_file: None,
            search_base_url: default_search_base_url(),
            trusted_url_prefix: default_trusted_url_prefix(),
            reserved_path_segments: default_reserved_segments(),
        }
    }
}

impl ScoutSettings {
    pub fn validate(&self) -> Result<(), String> {
        validate_threshold(self.similarity_threshold)?;
        if self.quota == 0 {
            return Err("quota must be at least 1".to_string());
        }
        if self.over_generation_factor.is_nan() || self.over_generation_factor < 1.0 {
            return Err(format!(
                "over_generation_factor must be >= 1.0, got {}",
                self.over_generation_factor
            ));
        }
        if self.history_cap == 0 {
            return Err("history_cap must be at least 1".to_string());
        }
        Ok(())
    }

    /// How many candidates to ask the generator for
    pub fn requested_count(&self) -> usize {
        requested_count(self.quota, self.over_generation_factor)
    }

    pub fn link_policy(&self) -> LinkPolicy {
        LinkPolicy {
            required_prefix: self.trusted_url_prefix.clone(),
            reserved_segments: self.reserved_path_segments.clone(),
            search_base: self.search_base_url.clone(),
        }
    }

    pub fn history_path(&self) -> Result<PathBuf, String> {
        match &self.history_file {
            Some(path) => Ok(path.clone()),
            None => get_history_path(),
        }
    }
}

pub fn validate_threshold(threshold: f64) -> Result<(), String> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(format!(
            "similarity threshold must be within 0.0-1.0, got {}",
            threshold
        ));
    }
    Ok(())
}

/// `ceil(quota * factor)`, never less than the quota itself
pub fn requested_count(quota: usize, factor: f64) -> usize {
    let requested = (quota as f64 * factor).ceil();
    if requested.is_finite() && requested > quota as f64 {
        requested as usize
    } else {
        quota
    }
}

pub fn get_config_dir() -> Result<PathBuf, String> {
    let home = dirs::home_dir().ok_or("Could not find home directory")?;
    Ok(home.join(".scout"))
}

pub fn ensure_config_dir() -> Result<PathBuf, String> {
    let config_dir = get_config_dir()?;
    std::fs::create_dir_all(&config_dir)
        .map_err(|e| format!("Failed to create config directory: {}", e))?;
    Ok(config_dir)
}

pub fn get_preferences_path() -> Result<PathBuf, String> {
    Ok(get_config_dir()?.join("preferences.json"))
}

pub fn get_history_path() -> Result<PathBuf, String> {
    Ok(get_config_dir()?.join("history.json"))
}

// ============================================================================
// Scout Settings
// ============================================================================

pub fn read_settings() -> Result<ScoutSettings, String> {
    read_settings_from(&get_preferences_path()?)
}

pub fn read_settings_from(path: &std::path::Path) -> Result<ScoutSettings, String> {
    if !path.exists() {
        return Ok(ScoutSettings::default());
    }
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read settings: {}", e))?;
    let settings: ScoutSettings = serde_json::from_str(&content)
        .map_err(|e| format!("Failed to parse settings: {}", e))?;
    settings.validate()?;
    Ok(settings)
}

pub fn write_settings(settings: &ScoutSettings) -> Result<(), String> {
    ensure_config_dir()?;
    write_settings_to(&get_preferences_path()?, settings)
}

pub fn write_settings_to(path: &std::path::Path, settings: &ScoutSettings) -> Result<(), String> {
    settings.validate()?;
    let content = serde_json::to_string_pretty(&settings)
        .map_err(|e| format!("Failed to serialize settings: {}", e))?;
    std::fs::write(path, content)
        .map_err(|e| format!("Failed to write settings: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let settings = ScoutSettings::default();
        assert_eq!(settings.similarity_threshold, 0.75);
        assert_eq!(settings.quota, 6);
        assert_eq!(settings.history_cap, 300);
        assert_eq!(settings.prompt_history_limit, 50);
        assert_eq!(settings.requested_count(), 9);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_requested_count() {
        assert_eq!(requested_count(6, 1.5), 9);
        assert_eq!(requested_count(5, 1.5), 8);
        assert_eq!(requested_count(4, 1.0), 4);
        assert_eq!(requested_count(4, f64::NAN), 4);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut settings = ScoutSettings::default();
        settings.similarity_threshold = 1.2;
        assert!(settings.validate().is_err());

        settings.similarity_threshold = f64::NAN;
        assert!(settings.validate().is_err());

        let mut settings = ScoutSettings::default();
        settings.quota = 0;
        assert!(settings.validate().is_err());

        let mut settings = ScoutSettings::default();
        settings.over_generation_factor = 0.5;
        assert!(settings.validate().is_err());

        let mut settings = ScoutSettings::default();
        settings.history_cap = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("preferences.json");
        std::fs::write(&path, r#"{"similarity_threshold": 0.8, "quota": 4}"#).unwrap();

        let settings = read_settings_from(&path).unwrap();
        assert_eq!(settings.similarity_threshold, 0.8);
        assert_eq!(settings.quota, 4);
        assert_eq!(settings.history_cap, 300);
        assert_eq!(settings.search_base_url, DEFAULT_SEARCH_BASE);
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        let settings = read_settings_from(&dir.path().join("nope.json")).unwrap();
        assert_eq!(settings, ScoutSettings::default());
    }

    #[test]
    fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("preferences.json");

        let mut settings = ScoutSettings::default();
        settings.history_file = Some(dir.path().join("history.json"));
        settings.reserved_path_segments.push("/item/".to_string());
        write_settings_to(&path, &settings).unwrap();

        assert_eq!(read_settings_from(&path).unwrap(), settings);
    }

    #[test]
    fn test_link_policy_from_settings() {
        let mut settings = ScoutSettings::default();
        settings.search_base_url = "https://shop.example/?q=".to_string();
        let policy = settings.link_policy();
        assert_eq!(policy.search_base, "https://shop.example/?q=");
        assert_eq!(policy.reserved_segments, vec!["/dp/", "/gp/"]);
    }
}
