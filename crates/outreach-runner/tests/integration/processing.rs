//! Per-contact processing, delays and the daily cap.

use outreach_core::testing::{ChannelCall, ScriptedChannel};
use outreach_core::{
    CampaignPhase, ContactId, ContactStatus, HaltReason, PendingPolicy, SendCounter,
};
use std::time::Duration;
use tokio::time::Instant;

use crate::common::{THROTTLE, TestHarness, account, config, contact, three_contacts, today};

fn validate_times(calls: &[ChannelCall]) -> Vec<Instant> {
    calls
        .iter()
        .filter_map(|c| match c {
            ChannelCall::Validate { at, .. } => Some(*at),
            ChannelCall::Send { .. } => None,
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_mixed_outcomes_with_cap_of_two() {
    let contacts = three_contacts();
    let channel = ScriptedChannel::new()
        .reachable("5511000000001")
        .reachable("5511000000002")
        .unreachable("5511000000003")
        .send_error("5511000000002");
    let h = TestHarness::with_channel(contacts, channel);

    h.campaign
        .start(config().with_daily_cap(2), PendingPolicy::Resume)
        .await
        .expect("start should succeed");
    let state = h.campaign.wait().await;

    assert_eq!(state.phase, CampaignPhase::Completed);
    assert_eq!(state.halt_reason, Some(HaltReason::Exhausted));
    assert_eq!(state.processed, 3);
    assert_eq!(state.sent, 1);
    assert_eq!(state.invalid, 1);
    assert_eq!(state.errored, 1);
    assert_eq!(state.validated, 2);
    assert_eq!(state.daily_count, 1);
    assert!(state.is_balanced());
    assert!(!state.running);

    let statuses: Vec<_> = h
        .campaign
        .contacts()
        .iter()
        .map(|r| r.state.status)
        .collect();
    assert_eq!(
        statuses,
        vec![
            ContactStatus::MessageSent,
            ContactStatus::Error,
            ContactStatus::ChannelInvalid
        ]
    );
    let failed = &h.campaign.contacts()[1];
    assert!(
        failed
            .state
            .error
            .as_deref()
            .is_some_and(|e| e.starts_with("send failed"))
    );
    assert_eq!(h.store.count(&account(), today()).await.unwrap(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_missing_phone_never_validated() {
    let h = TestHarness::new(vec![
        contact("c1", "Dr. Ana", ""),
        contact("c2", "Dr. Bia", "5511000000002"),
    ]);
    let started = Instant::now();

    h.campaign
        .start(config(), PendingPolicy::Resume)
        .await
        .unwrap();
    let state = h.campaign.wait().await;

    assert_eq!(h.channel.validated_phones(), vec!["5511000000002"]);
    assert_eq!(state.errored, 1);
    assert_eq!(state.sent, 1);

    let first = &h.campaign.contacts()[0];
    assert_eq!(first.state.status, ContactStatus::Error);
    assert_eq!(first.state.error.as_deref(), Some("missing phone"));

    // The phoneless contact costs no delay at all.
    let times = validate_times(&h.channel.calls());
    assert!(times[0] - started < Duration::from_secs(1));

    let log = h.store.log();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].contact.id, ContactId::new("c1"));
    assert!(!log[0].channel_valid);
}

#[tokio::test(start_paused = true)]
async fn test_throttle_only_after_delivered_messages() {
    let channel = ScriptedChannel::new()
        .unreachable("5511000000001")
        .validation_error("5511000000002");
    let mut contacts = three_contacts();
    contacts.push(contact("c4", "Dr. Duda", "5511000000004"));
    let h = TestHarness::with_channel(contacts, channel);

    h.campaign
        .start(config(), PendingPolicy::Resume)
        .await
        .unwrap();
    h.campaign.wait().await;

    let times = validate_times(&h.channel.calls());
    assert_eq!(times.len(), 4);
    // invalid -> pacing, error -> pacing, sent -> throttle
    assert!(times[1] - times[0] < Duration::from_secs(2));
    assert!(times[2] - times[1] < Duration::from_secs(2));
    assert!(times[3] - times[2] >= THROTTLE);
}

#[tokio::test(start_paused = true)]
async fn test_validation_error_recorded_on_contact() {
    let channel = ScriptedChannel::new().validation_error("5511000000001");
    let h = TestHarness::with_channel(vec![contact("c1", "Dr. Ana", "5511000000001")], channel);

    h.campaign
        .start(config(), PendingPolicy::Resume)
        .await
        .unwrap();
    let state = h.campaign.wait().await;

    assert_eq!(state.phase, CampaignPhase::Completed);
    assert_eq!(state.errored, 1);
    assert_eq!(state.validated, 0);
    let record = &h.campaign.contacts()[0];
    assert!(
        record
            .state
            .error
            .as_deref()
            .is_some_and(|e| e.starts_with("validation failed"))
    );
    assert_eq!(h.store.lead_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_rendered_message_and_lead() {
    let h = TestHarness::new(vec![contact("c1", "  Dr. Ana ", "5511000000001")]);

    h.campaign
        .start(config(), PendingPolicy::Resume)
        .await
        .unwrap();
    h.campaign.wait().await;

    let sent = h.channel.sent_messages();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, ScriptedChannel::address_for("5511000000001"));
    assert_eq!(
        sent[0].1,
        "Hello Dr. Ana, we help dentist practices in Springfield."
    );
    assert_eq!(h.store.lead_count(), 1);

    let log = h.store.log();
    assert!(log[0].message_sent);
    assert!(log[0].lead_persisted);
    assert_eq!(log[0].category, "dentist");
    assert_eq!(log[0].locality, "Springfield");
}

#[tokio::test(start_paused = true)]
async fn test_daily_cap_halts_and_keeps_remainder_pending() {
    let mut contacts = three_contacts();
    contacts.push(contact("c4", "Dr. Duda", "5511000000004"));
    let h = TestHarness::new(contacts);

    h.campaign
        .start(config().with_daily_cap(2), PendingPolicy::Resume)
        .await
        .unwrap();
    let state = h.campaign.wait().await;

    assert_eq!(state.phase, CampaignPhase::Completed);
    assert_eq!(state.halt_reason, Some(HaltReason::DailyCapReached));
    assert_eq!(state.sent, 2);
    assert_eq!(state.daily_count, 2);
    assert_eq!(state.remaining(), 2);
    assert_eq!(h.channel.validated_phones().len(), 2);

    let pending = h
        .campaign
        .contacts()
        .iter()
        .filter(|r| r.state.status == ContactStatus::Pending)
        .count();
    assert_eq!(pending, 2);
}

#[tokio::test(start_paused = true)]
async fn test_cap_spent_by_earlier_run_same_day() {
    let h = TestHarness::new(three_contacts());
    h.store.set_count(&account(), today(), 2);

    h.campaign
        .start(config().with_daily_cap(2), PendingPolicy::Resume)
        .await
        .unwrap();
    let state = h.campaign.wait().await;

    assert_eq!(state.halt_reason, Some(HaltReason::DailyCapReached));
    assert_eq!(state.processed, 0);
    assert!(h.channel.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_countdown_published_during_throttle() {
    let h = TestHarness::new(three_contacts());

    h.campaign
        .start(config(), PendingPolicy::Resume)
        .await
        .unwrap();
    let state = h
        .wait_until(|s| s.seconds_until_next_eligible.is_some_and(|n| n <= 30))
        .await;

    assert_eq!(state.next_eligible_contact_id, Some(ContactId::new("c2")));
    assert!(state.seconds_until_next_eligible.unwrap() > 0);

    let state = h.campaign.wait().await;
    assert!(state.next_eligible_contact_id.is_none());
    assert!(state.seconds_until_next_eligible.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_persistence_failures_do_not_abort() {
    let h = TestHarness::new(three_contacts());
    h.store.fail_leads(true);
    h.store.fail_log(true);
    h.store.fail_counter(true);

    h.campaign
        .start(config(), PendingPolicy::Resume)
        .await
        .unwrap();
    let state = h.campaign.wait().await;

    assert_eq!(state.phase, CampaignPhase::Completed);
    assert_eq!(state.sent, 3);
    assert_eq!(state.daily_count, 3);
    assert_eq!(h.store.lead_count(), 0);
    assert!(h.store.log().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_lead_failure_still_logged() {
    let h = TestHarness::new(vec![contact("c1", "Dr. Ana", "5511000000001")]);
    h.store.fail_leads(true);

    h.campaign
        .start(config(), PendingPolicy::Resume)
        .await
        .unwrap();
    h.campaign.wait().await;

    let log = h.store.log();
    assert_eq!(log.len(), 1);
    assert!(log[0].message_sent);
    assert!(!log[0].lead_persisted);
    assert!(log[0].lead_id.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_log_follows_queue_order() {
    let channel = ScriptedChannel::new().unreachable("5511000000002");
    let h = TestHarness::with_channel(three_contacts(), channel);

    h.campaign
        .start(config(), PendingPolicy::Resume)
        .await
        .unwrap();
    let state = h.campaign.wait().await;

    let ids: Vec<_> = h
        .store
        .log()
        .iter()
        .map(|e| e.contact.id.to_string())
        .collect();
    assert_eq!(ids, vec!["c1", "c2", "c3"]);
    assert!(h.store.log().iter().all(|e| Some(e.run_id) == state.run_id));
}
