//! Persisted lead ("client") records.

use chrono::{DateTime, Utc};
use outreach_core::{AccountId, ChannelAddress, Contact, LeadId};
use serde::{Deserialize, Serialize};

/// A validated contact kept as a durable lead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadRecord {
    /// Stable lead id; survives upserts
    pub id: LeadId,

    /// Owning account
    pub account: AccountId,

    /// Contact name
    pub name: String,

    /// Phone number the lead is keyed by
    pub phone: String,

    /// Postal address
    pub address: String,

    /// Channel address the phone validated to
    pub channel_address: ChannelAddress,

    /// First time the lead was persisted
    pub created_at: DateTime<Utc>,

    /// Last time the lead was upserted
    pub updated_at: DateTime<Utc>,
}

impl LeadRecord {
    /// Builds a brand-new lead.
    pub(crate) fn new(
        id: LeadId,
        account: &AccountId,
        contact: &Contact,
        phone: &str,
        channel_address: &ChannelAddress,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            account: account.clone(),
            name: contact.name.clone(),
            phone: phone.to_string(),
            address: contact.address.clone(),
            channel_address: channel_address.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Refreshes the mutable fields, keeping id and creation time.
    pub(crate) fn refresh(
        &mut self,
        contact: &Contact,
        channel_address: &ChannelAddress,
        now: DateTime<Utc>,
    ) {
        self.name = contact.name.clone();
        self.address = contact.address.clone();
        self.channel_address = channel_address.clone();
        self.updated_at = now;
    }
}
