#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Outreach API Library
//!
//! HTTP control surface for outreach campaigns.

pub mod error;
pub mod routes;
pub mod server;
pub mod state;

pub use error::{ApiError, Result};
pub use routes::{StartRequest, StartResponse, router};
pub use server::serve;
pub use state::{ACCOUNT_HEADER, AppState, CampaignDefaults};
