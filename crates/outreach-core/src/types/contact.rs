//! Discovered contacts and their per-run progress.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ChannelAddress, ContactId};

/// A candidate contact returned by the contact source. Never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Source-provided id, unique within a run
    pub id: ContactId,

    /// Display name
    pub name: String,

    /// Phone number; may be empty
    #[serde(default)]
    pub phone: String,

    /// Postal address
    #[serde(default)]
    pub address: String,
}

impl Contact {
    /// Creates a new contact.
    pub fn new(
        id: impl Into<ContactId>,
        name: impl Into<String>,
        phone: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            phone: phone.into(),
            address: address.into(),
        }
    }

    /// Returns `true` if the contact carries a non-blank phone number.
    pub fn has_phone(&self) -> bool {
        !self.phone.trim().is_empty()
    }
}

/// Progress of one contact through the campaign state machine.
///
/// `pending → validating → {whatsapp_valido | whatsapp_invalido}`, then
/// `whatsapp_valido → {mensagem_enviada | erro}`; `pending | validating`
/// may also fall straight to `erro`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContactStatus {
    /// Enqueued, not yet touched.
    #[serde(rename = "pending")]
    Pending,

    /// Validation in flight.
    #[serde(rename = "validating")]
    Validating,

    /// Reachable on the channel; delivery not yet attempted.
    #[serde(rename = "whatsapp_valido")]
    ChannelValid,

    /// Not reachable on the channel.
    #[serde(rename = "whatsapp_invalido")]
    ChannelInvalid,

    /// Message delivered.
    #[serde(rename = "mensagem_enviada")]
    MessageSent,

    /// Missing phone, validation failure or delivery failure.
    #[serde(rename = "erro")]
    Error,
}

impl ContactStatus {
    /// Returns `true` once the contact can never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ContactStatus::ChannelInvalid | ContactStatus::MessageSent | ContactStatus::Error
        )
    }

    /// Returns `true` for states a resumed run re-admits.
    pub fn is_resumable(&self) -> bool {
        matches!(
            self,
            ContactStatus::Pending | ContactStatus::Validating | ContactStatus::ChannelValid
        )
    }

    /// Returns `true` if `next` is a legal forward transition from `self`.
    pub fn can_transition_to(&self, next: ContactStatus) -> bool {
        use ContactStatus::*;
        matches!(
            (self, next),
            (Pending, Validating)
                | (Pending, Error)
                | (Validating, ChannelValid)
                | (Validating, ChannelInvalid)
                | (Validating, Error)
                | (ChannelValid, MessageSent)
                | (ChannelValid, Error)
        )
    }

    /// Wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactStatus::Pending => "pending",
            ContactStatus::Validating => "validating",
            ContactStatus::ChannelValid => "whatsapp_valido",
            ContactStatus::ChannelInvalid => "whatsapp_invalido",
            ContactStatus::MessageSent => "mensagem_enviada",
            ContactStatus::Error => "erro",
        }
    }
}

impl std::fmt::Display for ContactStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutable progress record owned by the runner, one per contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactState {
    /// Current status
    pub status: ContactStatus,

    /// Set once validation succeeds
    pub channel_address: Option<ChannelAddress>,

    /// Error text for `erro` outcomes
    pub error: Option<String>,

    /// When the contact reached a terminal status
    pub processed_at: Option<DateTime<Utc>>,
}

impl Default for ContactState {
    fn default() -> Self {
        Self::new()
    }
}

impl ContactState {
    /// Creates a `pending` state.
    pub fn new() -> Self {
        Self {
            status: ContactStatus::Pending,
            channel_address: None,
            error: None,
            processed_at: None,
        }
    }

    /// Moves to `next`, returning `false` (and changing nothing) when the
    /// transition would go backwards.
    pub fn advance(&mut self, next: ContactStatus) -> bool {
        if !self.status.can_transition_to(next) {
            tracing::warn!(from = %self.status, to = %next, "Rejected contact transition");
            return false;
        }
        self.status = next;
        true
    }

    /// Marks the contact reachable at `address`.
    pub fn mark_valid(&mut self, address: ChannelAddress) -> bool {
        if self.advance(ContactStatus::ChannelValid) {
            self.channel_address = Some(address);
            true
        } else {
            false
        }
    }

    /// Marks the contact as failed with `reason`.
    pub fn mark_error(&mut self, reason: impl Into<String>, at: DateTime<Utc>) -> bool {
        if self.advance(ContactStatus::Error) {
            self.error = Some(reason.into());
            self.processed_at = Some(at);
            true
        } else {
            false
        }
    }

    /// Moves into a terminal non-error status and stamps the time.
    pub fn finish(&mut self, status: ContactStatus, at: DateTime<Utc>) -> bool {
        if self.advance(status) {
            self.processed_at = Some(at);
            true
        } else {
            false
        }
    }

    /// Puts an unfinished contact back to `pending` for a resumed run.
    ///
    /// This is the only backwards move the state machine allows. A contact
    /// left in `whatsapp_valido` had its send cut short, so it is
    /// revalidated from scratch.
    pub fn readmit(&mut self) {
        match self.status {
            ContactStatus::Validating => self.status = ContactStatus::Pending,
            ContactStatus::ChannelValid => {
                self.status = ContactStatus::Pending;
                self.channel_address = None;
            }
            _ => {}
        }
    }
}

/// A contact together with its progress, as reported to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRecord {
    /// The discovered contact
    pub contact: Contact,

    /// Its current progress
    pub state: ContactState,
}

impl ContactRecord {
    /// Enqueues a contact in `pending`.
    pub fn pending(contact: Contact) -> Self {
        Self {
            contact,
            state: ContactState::new(),
        }
    }
}
