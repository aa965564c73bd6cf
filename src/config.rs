//! Application configuration.
//!
//! Loaded from a TOML file (default `~/.config/farewatch/config.toml`),
//! with a handful of `FAREWATCH_*` environment overrides applied on top.
//! A missing file yields the defaults, so `fare` works out of the box.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::scrapers::browser::BrowserSettings;
use crate::scrapers::ScrapeLimits;

/// Retry and rate-limit tuning, as written in the config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScrapeTuning {
    pub max_retries: u32,
    pub base_delay_secs: u64,
    pub rate_limit_requests: u32,
    pub rate_limit_window_secs: u64,
    pub timeout_secs: u64,
    pub page_timeout_secs: u64,
}

impl Default for ScrapeTuning {
    fn default() -> Self {
        let limits = ScrapeLimits::default();
        Self {
            max_retries: limits.max_retries,
            base_delay_secs: limits.base_delay.as_secs(),
            rate_limit_requests: limits.rate_limit_requests,
            rate_limit_window_secs: limits.rate_limit_window.as_secs(),
            timeout_secs: limits.timeout.as_secs(),
            page_timeout_secs: limits.page_timeout.as_secs(),
        }
    }
}

impl ScrapeTuning {
    pub fn to_limits(&self) -> ScrapeLimits {
        ScrapeLimits {
            max_retries: self.max_retries,
            base_delay: Duration::from_secs(self.base_delay_secs),
            rate_limit_requests: self.rate_limit_requests,
            rate_limit_window: Duration::from_secs(self.rate_limit_window_secs),
            timeout: Duration::from_secs(self.timeout_secs),
            page_timeout: Duration::from_secs(self.page_timeout_secs),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// SQLite database path or `sqlite:` URL.
    pub database_url: String,
    /// Redis URL for shared rate limiting. Unset means rate limit state
    /// is process-local.
    pub redis_url: Option<String>,
    /// Proxy URLs rotated across scrapes. Empty means direct connections.
    pub proxies: Vec<String>,
    /// Provider used by scheduled sweeps.
    pub default_provider: String,
    /// Concurrent trips per sweep.
    pub sweep_concurrency: usize,
    pub scraping: ScrapeTuning,
    pub browser: BrowserSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_path().display().to_string(),
            redis_url: None,
            proxies: Vec::new(),
            default_provider: "google_flights".to_string(),
            sweep_concurrency: 4,
            scraping: ScrapeTuning::default(),
            browser: BrowserSettings::default(),
        }
    }
}

fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("farewatch")
        .join("farewatch.db")
}

/// Default config file location.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("farewatch")
        .join("config.toml")
}

impl AppConfig {
    /// Load configuration from `path`, falling back to defaults when the
    /// file does not exist, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(default_config_path);

        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            toml::from_str(&raw)
                .map_err(|e| anyhow::anyhow!("invalid config {}: {e}", path.display()))?
        } else {
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("FAREWATCH_DATABASE_URL") {
            if !url.is_empty() {
                self.database_url = url;
            }
        }
        if let Ok(url) = std::env::var("FAREWATCH_REDIS_URL") {
            if !url.is_empty() {
                self.redis_url = Some(url);
            }
        }
        if let Ok(proxies) = std::env::var("FAREWATCH_PROXIES") {
            let parsed: Vec<String> = proxies
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
            if !parsed.is_empty() {
                self.proxies = parsed;
            }
        }
        if let Ok(provider) = std::env::var("FAREWATCH_PROVIDER") {
            if !provider.is_empty() {
                self.default_provider = provider;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.default_provider, "google_flights");
        assert!(config.proxies.is_empty());
        assert_eq!(config.scraping.max_retries, 3);
        assert_eq!(config.scraping.rate_limit_requests, 10);
        assert_eq!(config.scraping.rate_limit_window_secs, 60);
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: AppConfig = toml::from_str(
            r#"
            database_url = "/tmp/fw.db"
            proxies = ["http://proxy-a:8080"]

            [scraping]
            max_retries = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.database_url, "/tmp/fw.db");
        assert_eq!(config.proxies.len(), 1);
        assert_eq!(config.scraping.max_retries, 5);
        // Unspecified fields keep their defaults
        assert_eq!(config.scraping.rate_limit_requests, 10);
        assert!(config.browser.headless);
    }

    #[test]
    fn test_to_limits_roundtrip() {
        let tuning = ScrapeTuning {
            max_retries: 2,
            base_delay_secs: 3,
            ..Default::default()
        };
        let limits = tuning.to_limits();
        assert_eq!(limits.max_retries, 2);
        assert_eq!(limits.base_delay, Duration::from_secs(3));
    }
}
