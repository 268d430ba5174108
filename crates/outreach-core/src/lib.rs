#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Outreach Core Library
//!
//! Core types, errors and collaborator contracts for the outreach
//! campaign runner.

pub mod clock;
pub mod collaborators;
pub mod error;
pub mod testing;
pub mod types;

// Re-exports for convenience
pub use clock::{Clock, FixedClock, SystemClock};
pub use collaborators::{
    ChannelSender, ChannelValidator, ContactSource, LeadPersister, Reachability, RunLogger,
    SendAck, SendCounter,
};
pub use error::{Error, Result};
pub use types::{
    AccountId, CampaignConfig, CampaignPhase, CampaignState, ChannelAddress, Contact, ContactId,
    ContactRecord, ContactState, ContactStatus, HaltReason, LeadId, MessageTemplate,
    OutcomeLogEntry, PendingPolicy, RatePolicy, RunContext, RunId,
};
