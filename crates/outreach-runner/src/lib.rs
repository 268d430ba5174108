#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Outreach Runner Library
//!
//! The campaign processing loop and its control surface.

pub mod campaign;
pub mod control;
pub mod quota;
pub mod registry;
mod runner;

pub use campaign::{Campaign, CampaignSnapshot, Collaborators};
pub use control::{ControlFlags, ControlHandle, ControlWatcher};
pub use quota::QuotaTracker;
pub use registry::CampaignRegistry;

// Re-export core types
pub use outreach_core::{Error, Result};
