//! Contracts of the external collaborators the runner drives.
//!
//! Each trait is object-safe and `Send + Sync` so the runner can hold them
//! as `Arc<dyn ...>` and swap real adapters for test doubles.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::types::{AccountId, ChannelAddress, Contact, LeadId, OutcomeLogEntry, RunId};

/// Answer of the channel validator for one phone number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reachability {
    /// Whether the number exists on the channel
    pub is_reachable: bool,

    /// Address token to send to, present when reachable
    pub channel_address: Option<ChannelAddress>,
}

impl Reachability {
    /// A reachable number with its channel address.
    pub fn reachable(address: impl Into<ChannelAddress>) -> Self {
        Self {
            is_reachable: true,
            channel_address: Some(address.into()),
        }
    }

    /// An unreachable number.
    pub fn unreachable() -> Self {
        Self {
            is_reachable: false,
            channel_address: None,
        }
    }
}

/// Acknowledgement of a delivered message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendAck {
    /// Channel-specific message identifier
    pub message_id: String,
}

/// Discovers candidate contacts for a category + locality query.
#[async_trait]
pub trait ContactSource: Send + Sync {
    /// Returns the candidate contacts, in queue order.
    async fn discover(&self, category: &str, locality: &str) -> Result<Vec<Contact>>;

    /// Source name for diagnostics.
    fn name(&self) -> &str;
}

/// Checks whether a phone number is reachable on the messaging channel.
#[async_trait]
pub trait ChannelValidator: Send + Sync {
    /// Validates one phone number.
    async fn validate(&self, phone: &str) -> Result<Reachability>;
}

/// Delivers messages over the messaging channel.
#[async_trait]
pub trait ChannelSender: Send + Sync {
    /// Returns `true` if the channel session is connected.
    async fn is_ready(&self) -> bool;

    /// Sends `message` to `address`.
    async fn send(&self, address: &ChannelAddress, message: &str) -> Result<SendAck>;
}

/// Upserts validated contacts as durable lead ("client") records.
#[async_trait]
pub trait LeadPersister: Send + Sync {
    /// Persists the contact and returns its lead id.
    async fn persist_lead(
        &self,
        account: &AccountId,
        contact: &Contact,
        phone: &str,
        address: &ChannelAddress,
    ) -> Result<LeadId>;
}

/// Append-only outcome log.
#[async_trait]
pub trait RunLogger: Send + Sync {
    /// Appends one entry.
    async fn append(&self, entry: &OutcomeLogEntry) -> Result<()>;

    /// Lists entries of one run, or of every run, in append order.
    async fn entries(&self, account: &AccountId, run: Option<&RunId>)
    -> Result<Vec<OutcomeLogEntry>>;
}

/// Daily send counter keyed by account and calendar date.
#[async_trait]
pub trait SendCounter: Send + Sync {
    /// Messages sent by `account` on `date`.
    async fn count(&self, account: &AccountId, date: NaiveDate) -> Result<u32>;

    /// Records one more message and returns the new count.
    async fn increment(&self, account: &AccountId, date: NaiveDate) -> Result<u32>;
}
