use anyhow::Error;
use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Parser, Debug)]
#[command(version)]
pub struct Cli {
    #[clap(long, default_value = "teacher-report-ivr.toml")]
    pub conf: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_http_addr")]
    pub http_addr: String,
    pub log_level: Option<String>,
    pub log_file: Option<String>,
    /// IANA zone used to decide what "today" is for callers.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Sessions without a turn for this long are dropped by the sweeper.
    #[serde(default = "default_session_idle_secs")]
    pub session_idle_secs: u64,
    /// Text catalog; built-in texts are used when unset.
    pub texts: Option<String>,
    pub celebrations: Option<CelebrationsConfig>,
    #[serde(default)]
    pub store: StoreConfig,
}

/// Diverts callers who dial `code` to the celebrations listener line.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CelebrationsConfig {
    pub code: String,
    pub target: String,
}

#[derive(Debug, Deserialize, Clone, Serialize)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
pub enum StoreConfig {
    Memory {
        fixtures: Option<String>,
        snapshot: Option<String>,
    },
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::Memory {
            fixtures: None,
            snapshot: None,
        }
    }
}

fn default_http_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_timezone() -> String {
    "Asia/Jerusalem".to_string()
}

fn default_session_idle_secs() -> u64 {
    900
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
            log_level: Some("info".to_string()),
            log_file: None,
            timezone: default_timezone(),
            session_idle_secs: default_session_idle_secs(),
            texts: None,
            celebrations: None,
            store: StoreConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self, Error> {
        let config = toml::from_str(
            &std::fs::read_to_string(path).map_err(|e| anyhow::anyhow!("{}: {}", e, path))?,
        )?;
        Ok(config)
    }

    pub fn tz(&self) -> Result<chrono_tz::Tz, Error> {
        self.timezone
            .parse::<chrono_tz::Tz>()
            .map_err(|e| anyhow::anyhow!("invalid timezone '{}': {}", self.timezone, e))
    }
}
