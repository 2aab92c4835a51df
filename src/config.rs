use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{JunggoError, Result};
use crate::pipeline::PipelineConfig;

/// Global junggo configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Log filter used when RUST_LOG is not set (e.g. "info", "junggo=debug")
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Known prices at or below this are treated as decoys and dropped
    #[serde(default = "default_min_price")]
    pub min_price: u64,

    /// Drop listings that refuse in-person trades
    #[serde(default = "default_true")]
    pub exclude_delivery_only: bool,

    /// Drop listings without a province plus a district or neighborhood
    #[serde(default)]
    pub exclude_no_region: bool,

    /// iPhone generation collected as the base model
    #[serde(default = "default_generation")]
    pub target_generation: u8,

    /// Neighborhood -> district CSV (default: <data dir>/dong_gu_map.csv)
    #[serde(default)]
    pub region_map: Option<PathBuf>,

    #[serde(default)]
    pub crawl: CrawlConfig,
}

/// Search and pacing settings for `junggo crawl`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlConfig {
    #[serde(default = "default_query")]
    pub query: String,
    /// Marketplace category filter
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Stop once this many listings were collected
    #[serde(default = "default_max_items")]
    pub max_items: usize,
    #[serde(default = "default_delay_min_ms")]
    pub delay_min_ms: u64,
    #[serde(default = "default_delay_max_ms")]
    pub delay_max_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Also fetch each listing's detail page
    #[serde(default = "default_true")]
    pub fetch_details: bool,
    /// Extra attempts for a failed detail page
    #[serde(default = "default_retries")]
    pub retries: u32,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_min_price() -> u64 {
    250_000
}

fn default_true() -> bool {
    true
}

fn default_generation() -> u8 {
    16
}

fn default_query() -> String {
    "아이폰 16".to_string()
}

fn default_max_pages() -> u32 {
    10
}

fn default_page_size() -> u32 {
    100
}

fn default_max_items() -> usize {
    400
}

fn default_delay_min_ms() -> u64 {
    700
}

fn default_delay_max_ms() -> u64 {
    1300
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_retries() -> u32 {
    2
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            min_price: default_min_price(),
            exclude_delivery_only: true,
            exclude_no_region: false,
            target_generation: default_generation(),
            region_map: None,
            crawl: CrawlConfig::default(),
        }
    }
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            query: default_query(),
            category_id: None,
            max_pages: default_max_pages(),
            page_size: default_page_size(),
            max_items: default_max_items(),
            delay_min_ms: default_delay_min_ms(),
            delay_max_ms: default_delay_max_ms(),
            timeout_secs: default_timeout_secs(),
            fetch_details: true,
            retries: default_retries(),
        }
    }
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::parse(&content)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse and validate TOML configuration
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.crawl.delay_min_ms > self.crawl.delay_max_ms {
            return Err(JunggoError::ConfigError(format!(
                "crawl.delay_min_ms ({}) exceeds crawl.delay_max_ms ({})",
                self.crawl.delay_min_ms, self.crawl.delay_max_ms
            )));
        }
        if self.crawl.page_size == 0 {
            return Err(JunggoError::ConfigError("crawl.page_size must be positive".into()));
        }
        Ok(())
    }

    /// Policy settings handed to the normalizer
    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            min_price: self.min_price,
            exclude_delivery_only: self.exclude_delivery_only,
            exclude_no_region: self.exclude_no_region,
            target_generation: self.target_generation,
        }
    }

    /// Get the config file path
    ///
    /// Supports JUNGGO_CONFIG environment variable
    pub fn config_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var("JUNGGO_CONFIG") {
            return Ok(PathBuf::from(path));
        }
        let dirs = project_dirs()?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Get the data directory path
    pub fn data_dir() -> Result<PathBuf> {
        let dirs = project_dirs()?;
        Ok(dirs.data_dir().to_path_buf())
    }

    /// Get the database path
    ///
    /// Supports JUNGGO_DB environment variable for test isolation
    pub fn db_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var("JUNGGO_DB") {
            return Ok(PathBuf::from(path));
        }
        Ok(Self::data_dir()?.join("junggo.db"))
    }

    /// Region lookup table path, configured or default
    pub fn region_map_path(&self) -> Result<PathBuf> {
        match &self.region_map {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::data_dir()?.join("dong_gu_map.csv")),
        }
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("", "", "junggo")
        .ok_or_else(|| JunggoError::ConfigError("Could not determine config directory".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.min_price, 250_000);
        assert!(config.exclude_delivery_only);
        assert!(!config.exclude_no_region);
        assert_eq!(config.crawl.query, "아이폰 16");
        assert_eq!(config.pipeline(), PipelineConfig::default());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = Config::parse(
            r#"
            min_price = 300000
            exclude_no_region = true

            [crawl]
            max_pages = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.min_price, 300_000);
        assert!(config.exclude_no_region);
        assert_eq!(config.crawl.max_pages, 3);
        assert_eq!(config.crawl.page_size, 100);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
    }

    #[test]
    fn test_invalid_delays_rejected() {
        let err = Config::parse("[crawl]\ndelay_min_ms = 2000\ndelay_max_ms = 100\n");
        assert!(matches!(err, Err(JunggoError::ConfigError(_))));
    }
}
