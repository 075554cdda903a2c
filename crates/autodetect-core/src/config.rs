use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::challenge::HUMAN_FRAMEWORK;
use crate::error::{AutodetectError, Result};

/// Root application configuration, loaded from `~/.config/autodetect/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub challenge: ChallengeConfig,
    pub nstbrowser: NstBrowserConfig,
    pub logging: LoggingConfig,
}

/// A browser automation framework and the image that drives it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameworkImage {
    pub name: String,
    pub image: String,
}

impl FrameworkImage {
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChallengeConfig {
    pub framework_images: Vec<FrameworkImage>,
    /// How many times each framework appears in a sequence.
    pub repeated_framework_count: usize,
    /// Human tasks mixed into a sequence.
    pub human_injection_count: usize,
    /// Human tasks that may be flagged as automation before the score drops to zero.
    pub allowed_automation_miss_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NstBrowserConfig {
    pub base_url: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

// ─── Defaults ──────────────────────────────────────────────

impl Default for ChallengeConfig {
    fn default() -> Self {
        Self {
            framework_images: vec![
                FrameworkImage::new("nodriver", "autodetect/nodriver:latest"),
                FrameworkImage::new("playwright", "autodetect/playwright:latest"),
                FrameworkImage::new("selenium", "autodetect/selenium:latest"),
                FrameworkImage::new("puppeteer", "autodetect/puppeteer:latest"),
            ],
            repeated_framework_count: 3,
            human_injection_count: 2,
            allowed_automation_miss_count: 1,
        }
    }
}

impl Default for NstBrowserConfig {
    fn default() -> Self {
        Self {
            base_url: "http://0.0.0.0:8848".to_string(),
            api_key_env: "NSTBROWSER_API_KEY".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ─── Load / Save ───────────────────────────────────────────

impl AppConfig {
    /// Standard config file path: `~/.config/autodetect/config.toml`
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("AUTODETECT_CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("autodetect")
            .join("config.toml")
    }

    /// Load config from disk, falling back to defaults if file doesn't exist.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        Self::load_from(&path)
    }

    /// Load and validate config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to the standard path.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();
        self.save_to(&path)
    }

    /// Save config to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let toml_str = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_str)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.challenge.validate()
    }
}

impl ChallengeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.repeated_framework_count == 0 {
            return Err(AutodetectError::ConfigError(
                "challenge.repeated_framework_count must be at least 1".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for framework in &self.framework_images {
            let name = framework.name.trim();
            if name.is_empty() {
                return Err(AutodetectError::ConfigError(
                    "framework name must not be empty".to_string(),
                ));
            }
            if name == HUMAN_FRAMEWORK {
                return Err(AutodetectError::ConfigError(format!(
                    "framework name '{HUMAN_FRAMEWORK}' is reserved"
                )));
            }
            if !seen.insert(name) {
                return Err(AutodetectError::ConfigError(format!(
                    "duplicate framework name: {name}"
                )));
            }
        }
        Ok(())
    }

    pub fn framework_names(&self) -> impl Iterator<Item = &str> {
        self.framework_images.iter().map(|fw| fw.name.as_str())
    }
}
