//! Core types for outreach campaigns.

mod campaign_state;
mod config;
mod contact;
mod ids;
mod outcome;
mod proptests;
mod template;

pub use campaign_state::{CampaignPhase, CampaignState, HaltReason};
pub use config::{
    CampaignConfig, DEFAULT_DAILY_CAP, DEFAULT_PACING_INTERVAL, DEFAULT_THROTTLE_INTERVAL,
    PendingPolicy, RatePolicy, duration_secs,
};
pub use contact::{Contact, ContactRecord, ContactState, ContactStatus};
pub use ids::{AccountId, ChannelAddress, ContactId, LeadId, RunId};
pub use outcome::{OutcomeLogEntry, RunContext};
pub use template::MessageTemplate;
