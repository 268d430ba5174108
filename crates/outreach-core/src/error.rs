//! Error types for the outreach campaign runner.

/// Errors that can occur while operating an outreach campaign.
///
/// Only [`Error::InvalidConfig`], [`Error::ChannelNotReady`] and
/// [`Error::Discovery`] ever reach the caller of `start()`. Channel and
/// persistence failures are contained to a single contact by the runner.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Campaign configuration rejected before any side effect.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Field that failed validation, if known
        field: Option<String>,
        /// What went wrong
        message: String,
    },

    /// The messaging channel is not connected.
    #[error("Messaging channel not ready: {message}")]
    ChannelNotReady {
        /// Why the channel is considered unavailable
        message: String,
    },

    /// Contact discovery failed; no contact was processed.
    #[error("Discovery failed: {message}")]
    Discovery {
        /// Human-readable error message
        message: String,
        /// Source error if available
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Validation or delivery over the messaging channel failed.
    #[error("Channel error: {message}")]
    Channel {
        /// Human-readable error message
        message: String,
        /// Source error if available
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Durable storage (leads, run log, send counter) failed.
    #[error("Persistence error: {message}")]
    Persistence {
        /// Human-readable error message
        message: String,
        /// Source error if available
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A campaign is already running for this account.
    #[error("Campaign already running for account {account}")]
    AlreadyRunning {
        /// Account that owns the campaign
        account: String,
    },

    /// The operation needs a running campaign.
    #[error("No campaign running for account {account}")]
    NotRunning {
        /// Account that owns the campaign
        account: String,
    },

    /// Run not found in the outcome log.
    #[error("Run not found: {id}")]
    RunNotFound {
        /// Run ID that was not found
        id: String,
    },

    /// I/O error (config files, sockets, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Application configuration error (config file, environment)
    #[error("Configuration error: {message}")]
    Config {
        /// What configuration is problematic
        message: String,
    },
}

/// Convenience `Result` type alias for outreach operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns whether this error is worth retrying.
    ///
    /// Transient channel, discovery and storage failures are retryable;
    /// caller mistakes and state conflicts are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Discovery { .. } => true,
            Error::Channel { .. } => true,
            Error::Persistence { .. } => true,
            Error::ChannelNotReady { .. } => true,
            Error::Io(_) => true,
            Error::InvalidConfig { .. } => false,
            Error::AlreadyRunning { .. } => false,
            Error::NotRunning { .. } => false,
            Error::RunNotFound { .. } => false,
            Error::Serialization(_) => false,
            Error::Config { .. } => false,
        }
    }

    /// Returns `true` for failures that stay local to one contact.
    ///
    /// The runner records these on the contact and moves on.
    pub fn is_contact_local(&self) -> bool {
        matches!(self, Error::Channel { .. } | Error::Persistence { .. })
    }

    /// Creates a new invalid-configuration error.
    pub fn invalid_config<S: Into<String>>(message: S) -> Self {
        Error::InvalidConfig {
            field: None,
            message: message.into(),
        }
    }

    /// Creates a new invalid-configuration error for a named field.
    pub fn invalid_config_field<F, M>(field: F, message: M) -> Self
    where
        F: Into<String>,
        M: Into<String>,
    {
        Error::InvalidConfig {
            field: Some(field.into()),
            message: message.into(),
        }
    }

    /// Creates a new channel-not-ready error.
    pub fn channel_not_ready<S: Into<String>>(message: S) -> Self {
        Error::ChannelNotReady {
            message: message.into(),
        }
    }

    /// Creates a new discovery error.
    pub fn discovery<S: Into<String>>(message: S) -> Self {
        Error::Discovery {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new discovery error with a source error.
    pub fn discovery_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Discovery {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new channel error.
    pub fn channel<S: Into<String>>(message: S) -> Self {
        Error::Channel {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new channel error with a source error.
    pub fn channel_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Channel {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new persistence error.
    pub fn persistence<S: Into<String>>(message: S) -> Self {
        Error::Persistence {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new persistence error with a source error.
    pub fn persistence_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Persistence {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new configuration error.
    pub fn config<S: Into<String>>(message: S) -> Self {
        Error::Config {
            message: message.into(),
        }
    }
}
