//! Campaign configuration and rate policy.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Error, Result};

/// Default delay between two delivered messages.
pub const DEFAULT_THROTTLE_INTERVAL: Duration = Duration::from_secs(60);

/// Default pacing delay after an outcome that sent nothing.
pub const DEFAULT_PACING_INTERVAL: Duration = Duration::from_secs(1);

/// Default number of messages an account may send per calendar day.
pub const DEFAULT_DAILY_CAP: u32 = 50;

/// Throttle and quota policy applied by the runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatePolicy {
    /// Delay armed after every delivered message.
    #[serde(with = "duration_secs")]
    pub throttle_interval: Duration,

    /// Delay after validation-only or failed outcomes.
    #[serde(with = "duration_secs")]
    pub pacing_interval: Duration,

    /// Maximum messages per account per calendar day.
    pub daily_cap: u32,
}

impl Default for RatePolicy {
    fn default() -> Self {
        Self {
            throttle_interval: DEFAULT_THROTTLE_INTERVAL,
            pacing_interval: DEFAULT_PACING_INTERVAL,
            daily_cap: DEFAULT_DAILY_CAP,
        }
    }
}

/// What `start()` does with contacts a previous run left unfinished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingPolicy {
    /// Process leftover contacts instead of discovering new ones.
    Resume,
    /// Drop leftover contacts and discover a fresh queue.
    #[default]
    Discard,
}

/// Immutable configuration of one campaign run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignConfig {
    /// Business category to prospect (e.g. "dentist").
    pub category: String,

    /// Locality to search in (e.g. "Springfield").
    pub locality: String,

    /// Message template sent to every reachable contact.
    pub message: String,

    /// Throttle and quota policy.
    pub policy: RatePolicy,
}

impl CampaignConfig {
    /// Creates a configuration with the default rate policy.
    pub fn new(
        category: impl Into<String>,
        locality: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            locality: locality.into(),
            message: message.into(),
            policy: RatePolicy::default(),
        }
    }

    /// Replaces the rate policy.
    pub fn with_policy(mut self, policy: RatePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the daily cap.
    pub fn with_daily_cap(mut self, cap: u32) -> Self {
        self.policy.daily_cap = cap;
        self
    }

    /// Sets the throttle interval.
    pub fn with_throttle_interval(mut self, interval: Duration) -> Self {
        self.policy.throttle_interval = interval;
        self
    }

    /// Checks the configuration before a campaign may start.
    pub fn validate(&self) -> Result<()> {
        if self.category.trim().is_empty() {
            return Err(Error::invalid_config_field(
                "category",
                "category must not be empty",
            ));
        }
        if self.locality.trim().is_empty() {
            return Err(Error::invalid_config_field(
                "locality",
                "locality must not be empty",
            ));
        }
        if self.message.trim().is_empty() {
            return Err(Error::invalid_config_field(
                "message",
                "message must not be empty",
            ));
        }
        if self.policy.daily_cap == 0 {
            return Err(Error::invalid_config_field(
                "daily_cap",
                "daily cap must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Serde helpers for durations expressed in whole seconds.
pub mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    /// Serializes a duration as seconds.
    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    /// Deserializes a duration from seconds.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(deserializer)?))
    }
}
