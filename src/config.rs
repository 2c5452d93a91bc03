//! Configuration management
//!
//! Loads configuration from config.toml with support for:
//! - Database location and pool settings
//! - Answer submission limits
//! - Staff PIN policy

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

/// Main configuration structure matching config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub missions: MissionsConfig,
    #[serde(default)]
    pub rewards: RewardsConfig,
}

/// Database configuration (DATABASE_URL env var takes precedence over `url`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: usize,
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionsConfig {
    /// Longest accepted answer, counted in characters
    pub max_answer_length: usize,
}

/// Staff PIN policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardsConfig {
    pub staff_pin_min_length: usize,
    pub staff_pin_max_length: usize,
}

fn default_pool_max_size() -> usize {
    20
}

fn default_query_timeout_secs() -> u64 {
    30
}

impl Default for MissionsConfig {
    fn default() -> Self {
        Self {
            max_answer_length: 200,
        }
    }
}

impl Default for RewardsConfig {
    fn default() -> Self {
        Self {
            staff_pin_min_length: 4,
            staff_pin_max_length: 12,
        }
    }
}

impl Config {
    /// Load from specific path
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            Self::parse(&content).context("Failed to parse config file")
        } else {
            Self::parse(DEFAULT_CONFIG).context("Failed to parse default config")
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Database URL (env var takes precedence when non-empty)
    pub fn database_url(&self) -> String {
        match std::env::var("DATABASE_URL") {
            Ok(url) if !url.is_empty() => url,
            _ => self.database.url.clone(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        // The embedded default is known-good; the fallback only guards against edits to it.
        Self::parse(DEFAULT_CONFIG).unwrap_or_else(|_| Self {
            database: DatabaseConfig {
                url: "sqlite://popup-rewards.db".to_string(),
                pool_max_size: default_pool_max_size(),
                query_timeout_secs: default_query_timeout_secs(),
            },
            missions: MissionsConfig::default(),
            rewards: RewardsConfig::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_default_parses() {
        let config = Config::parse(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.missions.max_answer_length, 200);
        assert_eq!(config.rewards.staff_pin_min_length, 4);
        assert_eq!(config.database.pool_max_size, 20);
    }

    #[test]
    fn test_optional_sections_default() {
        let config = Config::parse(
            r#"
            [database]
            url = "sqlite::memory:"
            "#,
        )
        .unwrap();
        assert_eq!(config.database.query_timeout_secs, 30);
        assert_eq!(config.rewards.staff_pin_max_length, 12);
        assert_eq!(config.missions.max_answer_length, 200);
    }

    #[test]
    fn test_missing_file_uses_default() {
        let config = Config::load_from("/nonexistent/popup-rewards.toml").unwrap();
        assert_eq!(config.database.url, "sqlite://popup-rewards.db");
    }
}
