//! `outreach` configuration file.
//!
//! Every section falls back to its defaults, so an empty file (or no file
//! at all) yields a usable configuration.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use outreach_adapter_http::HttpEndpoint;
use outreach_api::CampaignDefaults;
use outreach_core::types::{DEFAULT_DAILY_CAP, DEFAULT_PACING_INTERVAL, DEFAULT_THROTTLE_INTERVAL};
use outreach_core::{AccountId, PendingPolicy, RatePolicy};
use serde::{Deserialize, Serialize};

/// Name of the directory holding the config file and the store.
pub const PROJECT_NAME: &str = "outreach";

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "OUTREACH_CONFIG";

const DEFAULT_MESSAGE: &str =
    "Hello {name}! We help {category} practices in {locality} fill their schedule. \
     Would you like to hear more?";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutreachConfig {
    /// HTTP control surface
    pub server: ServerConfig,
    /// Message and rate policy applied to every run
    pub campaign: CampaignSection,
    /// Durable store
    pub store: StoreConfig,
    /// Remote contact discovery service
    pub contacts: HttpEndpoint,
    /// Remote messaging gateway
    pub channel: HttpEndpoint,
}

impl Default for OutreachConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            campaign: CampaignSection::default(),
            store: StoreConfig::default(),
            contacts: HttpEndpoint::new("http://127.0.0.1:8081"),
            channel: HttpEndpoint::new("http://127.0.0.1:8082"),
        }
    }
}

/// `[server]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the control surface listens on
    pub bind: String,
    /// Account used when a request names none
    pub default_account: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            default_account: "default".to_string(),
        }
    }
}

/// `[campaign]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CampaignSection {
    /// Message template; `{name}`, `{category}` and `{locality}` are substituted
    pub message: String,
    /// Seconds to wait after each delivered message
    pub throttle_secs: u64,
    /// Seconds to wait after an outcome that sent nothing
    pub pacing_secs: u64,
    /// Messages per account per calendar day
    pub daily_cap: u32,
    /// What a new run does with contacts a previous run left unfinished
    pub on_pending: PendingPolicy,
}

impl Default for CampaignSection {
    fn default() -> Self {
        Self {
            message: DEFAULT_MESSAGE.to_string(),
            throttle_secs: DEFAULT_THROTTLE_INTERVAL.as_secs(),
            pacing_secs: DEFAULT_PACING_INTERVAL.as_secs(),
            daily_cap: DEFAULT_DAILY_CAP,
            on_pending: PendingPolicy::default(),
        }
    }
}

impl CampaignSection {
    /// Rate policy described by this section.
    pub fn policy(&self) -> RatePolicy {
        RatePolicy {
            throttle_interval: Duration::from_secs(self.throttle_secs),
            pacing_interval: Duration::from_secs(self.pacing_secs),
            daily_cap: self.daily_cap,
        }
    }

    /// Server-side defaults handed to the control surface.
    pub fn defaults(&self) -> CampaignDefaults {
        CampaignDefaults {
            message: self.message.clone(),
            policy: self.policy(),
            on_pending: self.on_pending,
        }
    }
}

/// `[store]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path of the `redb` database file
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        let path = dirs::data_dir()
            .map(|d| d.join(PROJECT_NAME).join("outreach.redb"))
            .unwrap_or_else(|| PathBuf::from("outreach.redb"));
        Self { path }
    }
}

impl OutreachConfig {
    /// `<config dir>/outreach/config.toml`, if the platform has a config dir.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(PROJECT_NAME).join("config.toml"))
    }

    /// The explicit path if given, otherwise the default one.
    pub fn resolve_config_path(explicit: Option<&str>) -> Option<PathBuf> {
        match explicit {
            Some(p) => Some(PathBuf::from(p)),
            None => Self::default_config_path(),
        }
    }

    /// Loads the configuration.
    ///
    /// A missing default file yields the defaults; a missing explicit file
    /// is an error.
    pub fn load(explicit: Option<&str>) -> Result<Self> {
        let Some(path) = Self::resolve_config_path(explicit) else {
            tracing::debug!("No config directory on this platform, using defaults");
            return Ok(Self::default());
        };
        if !path.exists() {
            if explicit.is_some() {
                bail!("Config file {} does not exist", path.display());
            }
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config = Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Parses a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Renders the configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Account used when none is named.
    pub fn default_account(&self) -> AccountId {
        AccountId::new(self.server.default_account.clone())
    }
}
