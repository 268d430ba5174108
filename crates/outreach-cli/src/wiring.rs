//! Builds the collaborators a campaign talks to.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use outreach_adapter_http::{HttpChannel, HttpContactSource};
use outreach_core::Contact;
use outreach_core::testing::{MemoryStore, ScriptedChannel, ScriptedContactSource};
use outreach_runner::Collaborators;
use outreach_store::RedbStore;

use crate::config::OutreachConfig;

/// Remote services and the durable store, or scripted stand-ins with `demo`.
pub fn collaborators(config: &OutreachConfig, demo: bool) -> Result<Collaborators> {
    if demo {
        tracing::info!("Demo mode: using scripted contacts and channel");
        return Ok(demo_collaborators());
    }

    let source = HttpContactSource::new(config.contacts.clone())
        .context("Failed to build contact source client")?;
    let channel =
        HttpChannel::new(config.channel.clone()).context("Failed to build channel client")?;
    let store = RedbStore::open(&config.store.path)
        .with_context(|| format!("Failed to open store at {}", config.store.path.display()))?;

    tracing::info!(
        contacts = %config.contacts.base_url,
        channel = %config.channel.base_url,
        store = %config.store.path.display(),
        "Collaborators ready"
    );
    Ok(Collaborators::new(
        Arc::new(source),
        Arc::new(channel),
        Arc::new(store),
    ))
}

/// Five demo contacts: two reach the channel, one does not, one has no
/// phone and one fails on delivery.
pub fn demo_collaborators() -> Collaborators {
    let contacts = vec![
        Contact::new("demo-1", "Bright Smile Dental", "5511900000001", "12 Main St"),
        Contact::new("demo-2", "Downtown Dental Care", "5511900000002", "48 Oak Ave"),
        Contact::new("demo-3", "Riverside Orthodontics", "5511900000003", "7 River Rd"),
        Contact::new("demo-4", "Maple Family Dentistry", "", "301 Maple Blvd"),
        Contact::new("demo-5", "Sunset Dental Studio", "5511900000005", "99 Sunset Dr"),
    ];
    let channel = ScriptedChannel::new()
        .unreachable("5511900000003")
        .send_error("5511900000005")
        .with_send_latency(Duration::from_millis(250));

    Collaborators::new(
        Arc::new(ScriptedContactSource::new(contacts)),
        Arc::new(channel),
        Arc::new(MemoryStore::new()),
    )
}
