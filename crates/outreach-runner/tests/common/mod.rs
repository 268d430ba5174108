//! Common test utilities and harness for outreach runner integration tests.

#![allow(dead_code)]

use chrono::NaiveDate;
use outreach_core::testing::{MemoryStore, ScriptedChannel, ScriptedContactSource};
use outreach_core::{AccountId, CampaignConfig, CampaignState, Contact, FixedClock};
use outreach_runner::{Campaign, Collaborators};
use std::sync::Arc;
use std::time::Duration;

/// Throttle interval used by most scenarios.
pub const THROTTLE: Duration = Duration::from_secs(60);

/// Test harness wiring a campaign to scripted collaborators.
///
/// Keeps handles on every double so tests can script outcomes and inspect
/// recorded calls after the run.
pub struct TestHarness {
    /// Scripted contact source
    pub source: Arc<ScriptedContactSource>,
    /// Scripted channel (validator + sender)
    pub channel: Arc<ScriptedChannel>,
    /// In-memory leads, log and counter
    pub store: Arc<MemoryStore>,
    /// Clock pinned to [`today`]
    pub clock: Arc<FixedClock>,
    /// The campaign under test
    pub campaign: Campaign,
}

impl TestHarness {
    /// Creates a harness whose channel reports every phone reachable.
    pub fn new(contacts: Vec<Contact>) -> Self {
        Self::with_channel(contacts, ScriptedChannel::new())
    }

    /// Creates a harness with a pre-scripted channel.
    pub fn with_channel(contacts: Vec<Contact>, channel: ScriptedChannel) -> Self {
        Self::build(ScriptedContactSource::new(contacts), channel)
    }

    /// Creates a harness whose contact source always fails.
    pub fn failing_discovery(message: &str) -> Self {
        Self::build(ScriptedContactSource::failing(message), ScriptedChannel::new())
    }

    /// Creates a harness whose contact source takes `latency` to answer.
    pub fn slow_discovery(contacts: Vec<Contact>, latency: Duration) -> Self {
        Self::build(
            ScriptedContactSource::new(contacts).with_latency(latency),
            ScriptedChannel::new(),
        )
    }

    fn build(source: ScriptedContactSource, channel: ScriptedChannel) -> Self {
        let source = Arc::new(source);
        let channel = Arc::new(channel);
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(FixedClock::new(today()));
        let deps = Collaborators::new(source.clone(), channel.clone(), store.clone())
            .with_clock(clock.clone());
        let campaign = Campaign::new(account(), deps);
        Self {
            source,
            channel,
            store,
            clock,
            campaign,
        }
    }

    /// Waits until a published state satisfies `pred`.
    pub async fn wait_until<F>(&self, mut pred: F) -> CampaignState
    where
        F: FnMut(&CampaignState) -> bool,
    {
        let mut rx = self.campaign.subscribe();
        let snap = rx
            .wait_for(|snap| pred(&snap.state))
            .await
            .expect("campaign dropped");
        snap.state.clone()
    }
}

/// The account every harness campaign belongs to.
pub fn account() -> AccountId {
    AccountId::new("clinic-42")
}

/// The date the harness clock is pinned to.
pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 14).expect("valid date")
}

/// Shorthand for a contact.
pub fn contact(id: &str, name: &str, phone: &str) -> Contact {
    Contact::new(id, name, phone, format!("{id} Main St"))
}

/// A dentist campaign in Springfield with a one-minute throttle.
pub fn config() -> CampaignConfig {
    CampaignConfig::new(
        "dentist",
        "Springfield",
        "Hello {name}, we help {category} practices in {locality}.",
    )
    .with_throttle_interval(THROTTLE)
}

/// Three reachable contacts.
pub fn three_contacts() -> Vec<Contact> {
    vec![
        contact("c1", "Dr. Ana", "5511000000001"),
        contact("c2", "Dr. Bia", "5511000000002"),
        contact("c3", "Dr. Caio", "5511000000003"),
    ]
}
