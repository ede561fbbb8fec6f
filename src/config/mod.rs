//! Configuration management for newsticker.
//!
//! Configuration is read from `~/.config/newsticker/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.
//! The file is never rewritten after that.

use std::fs;
use std::io::Write;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::app::{Result, TickerError};
use crate::fetcher::http_fetcher::DEFAULT_USER_AGENT;
use crate::fetcher::reachability::{DEFAULT_PROBE_TARGETS, DEFAULT_PROBE_TIMEOUT, DEFAULT_PROBE_TTL};

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ticker: TickerConfig,
    pub logging: LoggingConfig,
    pub network: NetworkConfig,
}

/// Initial source selection and schedule.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TickerConfig {
    pub source: usize,
    pub category: usize,
    /// e.g. "90s", "5m", "1h"
    pub refresh_interval: String,
}

impl Default for TickerConfig {
    fn default() -> Self {
        Self {
            source: 0,
            category: 0,
            refresh_interval: "5m".to_string(),
        }
    }
}

impl TickerConfig {
    pub fn interval(&self) -> Result<Duration> {
        parse_interval(&self.refresh_interval)
            .map(Duration::from_secs)
            .map_err(TickerError::Config)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub enabled: bool,
    /// Default filter directive; `RUST_LOG` wins when set.
    pub level: String,
    /// Append to this file instead of stderr.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            file: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
    pub probe_targets: Vec<String>,
    pub probe_timeout_ms: u64,
    pub probe_ttl_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            probe_targets: DEFAULT_PROBE_TARGETS.iter().map(|t| t.to_string()).collect(),
            probe_timeout_ms: DEFAULT_PROBE_TIMEOUT.as_millis() as u64,
            probe_ttl_secs: DEFAULT_PROBE_TTL.as_secs(),
        }
    }
}

impl NetworkConfig {
    pub fn probe_addrs(&self) -> Result<Vec<SocketAddr>> {
        self.probe_targets
            .iter()
            .map(|target| {
                target
                    .parse::<SocketAddr>()
                    .map_err(|_| TickerError::Config(format!("Invalid probe target: {}", target)))
            })
            .collect()
    }
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// Missing fields in the config file will use default values.
    pub fn load() -> std::result::Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
            return Ok(Self::default());
        }

        Self::load_from(&config_path)
    }

    /// Load from an explicit path. The file must exist.
    pub fn load_from(path: &Path) -> std::result::Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the default config file path: `~/.config/newsticker/config.toml`
    pub fn default_config_path() -> std::result::Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("newsticker").join("config.toml"))
    }

    fn create_default_config(path: &Path) -> std::result::Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })
    }

    fn default_config_content() -> &'static str {
        r##"# newsticker configuration
#
# Sources: 0 = Hacker News, 1 = Reddit, 2 = BBC News, 3 = Ars Technica
# Run `newsticker sources` to list the categories of each source.

[ticker]
source = 0
category = 0

# Refresh interval: "90s", "5m", "1h", "1d" or plain seconds
refresh_interval = "5m"

[logging]
enabled = true

# Filter directive, overridden by RUST_LOG
level = "info"

# Append log lines to this file instead of stderr
# file = "/tmp/newsticker.log"

[network]
# HTTP request timeout in seconds
timeout_secs = 10

user_agent = "newsticker/0.1.0"

# Addresses probed (TCP connect) before every fetch
probe_targets = ["1.1.1.1:53", "8.8.8.8:53"]
probe_timeout_ms = 2000

# How long a successful probe is trusted
probe_ttl_secs = 60
"##
    }
}

/// Parse interval string like "1h", "30m", "6h", "1d", "45s" or raw seconds.
pub fn parse_interval(s: &str) -> std::result::Result<u64, String> {
    let s = s.trim().to_lowercase();

    let (digits, unit, label) = if let Some(hours) = s.strip_suffix('h') {
        (hours, 3600, "hours")
    } else if let Some(minutes) = s.strip_suffix('m') {
        (minutes, 60, "minutes")
    } else if let Some(days) = s.strip_suffix('d') {
        (days, 86400, "days")
    } else if let Some(secs) = s.strip_suffix('s') {
        (secs, 1, "seconds")
    } else {
        return s
            .parse::<u64>()
            .map_err(|_| format!("Invalid interval: {}. Use format like '90s', '5m', '1h'", s));
    };

    let count = digits
        .parse::<u64>()
        .map_err(|_| format!("Invalid {}: {}", label, digits))?;
    count
        .checked_mul(unit)
        .ok_or_else(|| format!("Interval too large: {}", s))
}

/// Format interval for display
pub fn format_interval(secs: u64) -> String {
    if secs >= 86400 && secs.is_multiple_of(86400) {
        format!("{}d", secs / 86400)
    } else if secs >= 3600 && secs.is_multiple_of(3600) {
        format!("{}h", secs / 3600)
    } else if secs >= 60 && secs.is_multiple_of(60) {
        format!("{}m", secs / 60)
    } else {
        format!("{}s", secs)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
