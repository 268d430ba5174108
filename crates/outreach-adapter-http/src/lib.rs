#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Outreach HTTP Adapters
//!
//! JSON-over-HTTP implementations of the contact source and the messaging
//! channel.

mod channel;
mod client;
mod contacts;

pub use channel::HttpChannel;
pub use client::HttpEndpoint;
pub use contacts::HttpContactSource;
