//! Append-only outcome log entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{
    AccountId, ChannelAddress, Contact, ContactRecord, ContactStatus, LeadId, RunId,
};

/// One audit fact per processed contact. Written once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeLogEntry {
    /// Run that processed the contact
    pub run_id: RunId,

    /// Account that owns the run
    pub account: AccountId,

    /// Snapshot of the contact
    pub contact: Contact,

    /// Category of the run
    pub category: String,

    /// Locality of the run
    pub locality: String,

    /// Whether the channel reported the number reachable
    pub channel_valid: bool,

    /// Channel address, if validation succeeded
    pub channel_address: Option<ChannelAddress>,

    /// Whether the message was delivered
    pub message_sent: bool,

    /// Whether a lead record was persisted
    pub lead_persisted: bool,

    /// Persisted lead id, if any
    pub lead_id: Option<LeadId>,

    /// Terminal status of the contact
    pub status: ContactStatus,

    /// Error text for `erro` outcomes
    pub error: Option<String>,

    /// When the entry was produced
    pub recorded_at: DateTime<Utc>,
}

/// Run-level context shared by every entry of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    /// Run id
    pub run_id: RunId,
    /// Owning account
    pub account: AccountId,
    /// Category searched
    pub category: String,
    /// Locality searched
    pub locality: String,
}

impl OutcomeLogEntry {
    /// Builds an entry from a contact record that reached a terminal status.
    pub fn from_record(
        ctx: &RunContext,
        record: &ContactRecord,
        lead_id: Option<LeadId>,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        let state = &record.state;
        Self {
            run_id: ctx.run_id,
            account: ctx.account.clone(),
            contact: record.contact.clone(),
            category: ctx.category.clone(),
            locality: ctx.locality.clone(),
            channel_valid: state.channel_address.is_some(),
            channel_address: state.channel_address.clone(),
            message_sent: state.status == ContactStatus::MessageSent,
            lead_persisted: lead_id.is_some(),
            lead_id,
            status: state.status,
            error: state.error.clone(),
            recorded_at,
        }
    }
}
