#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Outreach Store Library
//!
//! Durable leads, outcome log and daily send counters backed by `redb`.

mod lead;
mod store;

pub use lead::LeadRecord;
pub use store::RedbStore;
