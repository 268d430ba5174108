//! Every contact lands in exactly one accounting bucket.

use outreach_core::testing::ScriptedChannel;
use outreach_core::{Contact, ContactStatus, PendingPolicy};
use proptest::prelude::*;
use std::time::Duration;

use crate::common::{TestHarness, config, contact};

#[derive(Debug, Clone, Copy)]
enum Script {
    Sent,
    Unreachable,
    ValidationError,
    SendError,
    NoPhone,
}

fn script() -> impl Strategy<Value = Script> {
    prop_oneof![
        Just(Script::Sent),
        Just(Script::Unreachable),
        Just(Script::ValidationError),
        Just(Script::SendError),
        Just(Script::NoPhone),
    ]
}

fn build(scripts: &[Script]) -> (Vec<Contact>, ScriptedChannel) {
    let mut channel = ScriptedChannel::new();
    let mut contacts = Vec::new();
    for (i, s) in scripts.iter().enumerate() {
        let phone = format!("55110000{i:05}");
        channel = match s {
            Script::Sent | Script::NoPhone => channel,
            Script::Unreachable => channel.unreachable(&phone),
            Script::ValidationError => channel.validation_error(&phone),
            Script::SendError => channel.send_error(&phone),
        };
        let phone = if matches!(s, Script::NoPhone) {
            String::new()
        } else {
            phone
        };
        contacts.push(contact(&format!("c{i}"), "Dr. X", &phone));
    }
    (contacts, channel)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_counters_balance_at_completion(
        scripts in prop::collection::vec(script(), 0..12),
        cap in 1u32..8,
    ) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .start_paused(true)
            .build()
            .unwrap();

        let (contacts, channel) = build(&scripts);
        let state = rt.block_on(async {
            let h = TestHarness::with_channel(contacts, channel);
            h.campaign
                .start(
                    config()
                        .with_daily_cap(cap)
                        .with_throttle_interval(Duration::from_secs(5)),
                    PendingPolicy::Resume,
                )
                .await
                .unwrap();
            let state = h.campaign.wait().await;
            let pending = h
                .campaign
                .contacts()
                .iter()
                .filter(|r| r.state.status == ContactStatus::Pending)
                .count() as u32;
            (state, pending, h.store.log().len() as u32)
        });
        let (state, pending, logged) = state;

        prop_assert!(state.is_balanced());
        prop_assert!(state.daily_count <= cap);
        prop_assert_eq!(state.processed + pending, state.discovered);
        prop_assert_eq!(logged, state.processed);
        prop_assert!(!state.running);
    }
}
