//! Pause, resume and stop while a campaign is running.

use outreach_core::testing::ChannelCall;
use outreach_core::{CampaignPhase, ContactStatus, Error, HaltReason, PendingPolicy};
use std::time::Duration;
use tokio::time::Instant;

use crate::common::{THROTTLE, TestHarness, config, three_contacts};

#[tokio::test(start_paused = true)]
async fn test_pause_during_throttle_holds_next_contact() {
    let h = TestHarness::new(three_contacts());

    h.campaign
        .start(config(), PendingPolicy::Resume)
        .await
        .unwrap();
    h.wait_until(|s| s.sent == 1).await;
    h.campaign.pause().unwrap();
    assert_eq!(h.campaign.status().phase, CampaignPhase::Paused);

    // Well past the throttle: still nothing for contact #2.
    tokio::time::sleep(THROTTLE * 3).await;
    assert_eq!(h.channel.validated_phones().len(), 1);
    assert!(h.campaign.status().running);
    assert_eq!(
        h.campaign.contacts()[1].state.status,
        ContactStatus::Pending
    );

    let resumed_at = Instant::now();
    h.campaign.resume().unwrap();
    let state = h.campaign.wait().await;

    assert_eq!(state.phase, CampaignPhase::Completed);
    assert_eq!(state.sent, 3);
    let second_validation = h
        .channel
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            ChannelCall::Validate { at, .. } => Some(at),
            ChannelCall::Send { .. } => None,
        })
        .nth(1)
        .unwrap();
    assert!(second_validation >= resumed_at);
}

#[tokio::test(start_paused = true)]
async fn test_stop_mid_throttle_exits_promptly() {
    let h = TestHarness::new(three_contacts());

    h.campaign
        .start(
            config().with_throttle_interval(Duration::from_secs(600)),
            PendingPolicy::Resume,
        )
        .await
        .unwrap();
    h.wait_until(|s| s.seconds_until_next_eligible.is_some())
        .await;

    let stopped_at = Instant::now();
    h.campaign.stop();
    let state = h.campaign.wait().await;

    assert!(stopped_at.elapsed() < Duration::from_secs(1));
    assert_eq!(state.phase, CampaignPhase::Stopped);
    assert_eq!(state.halt_reason, Some(HaltReason::StopRequested));
    assert!(!state.running);
    assert_eq!(state.processed, 1);
    assert_eq!(state.remaining(), 2);
    assert!(state.next_eligible_contact_id.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_stop_while_paused() {
    let h = TestHarness::new(three_contacts());

    h.campaign
        .start(config(), PendingPolicy::Resume)
        .await
        .unwrap();
    h.campaign.pause().unwrap();
    h.campaign.stop();
    h.campaign.stop();
    let state = h.campaign.wait().await;

    assert_eq!(state.phase, CampaignPhase::Stopped);
    assert!(!state.paused);
    assert!(!state.running);
}

#[tokio::test(start_paused = true)]
async fn test_control_after_completion() {
    let h = TestHarness::new(vec![]);

    h.campaign
        .start(config(), PendingPolicy::Resume)
        .await
        .unwrap();
    h.campaign.wait().await;

    assert!(matches!(h.campaign.pause(), Err(Error::NotRunning { .. })));
    assert!(matches!(h.campaign.resume(), Err(Error::NotRunning { .. })));
    h.campaign.stop();
    assert_eq!(h.campaign.status().phase, CampaignPhase::Completed);
}

#[tokio::test(start_paused = true)]
async fn test_status_never_blocks_during_send() {
    let channel = outreach_core::testing::ScriptedChannel::new()
        .with_send_latency(Duration::from_secs(30));
    let h = TestHarness::with_channel(three_contacts(), channel);

    h.campaign
        .start(config(), PendingPolicy::Resume)
        .await
        .unwrap();
    h.wait_until(|s| s.validated == 1).await;

    // A send is in flight; control calls still answer immediately.
    let state = h.campaign.status();
    assert!(state.running);
    assert_eq!(state.sent, 0);
    h.campaign.pause().unwrap();
    h.campaign.stop();

    let state = h.campaign.wait().await;
    assert_eq!(state.sent, 1);
    assert_eq!(state.phase, CampaignPhase::Stopped);
}

#[tokio::test(start_paused = true)]
async fn test_stop_during_discovery_is_honoured() {
    let h = TestHarness::slow_discovery(three_contacts(), Duration::from_secs(10));

    let (started, ()) = tokio::join!(
        h.campaign.start(config(), PendingPolicy::Discard),
        async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            h.campaign.stop();
        }
    );
    let run_id = started.unwrap();
    let state = h.campaign.wait().await;

    assert_eq!(state.run_id, Some(run_id));
    assert_eq!(state.phase, CampaignPhase::Stopped);
    assert_eq!(state.halt_reason, Some(HaltReason::StopRequested));
    assert_eq!(state.discovered, 3);
    assert_eq!(state.processed, 0);
    assert!(h.channel.calls().is_empty());
    assert_eq!(h.campaign.contacts()[0].state.status, ContactStatus::Pending);
}

#[tokio::test(start_paused = true)]
async fn test_stop_before_start_does_not_carry_over() {
    let h = TestHarness::new(three_contacts());
    h.campaign.stop();

    h.campaign
        .start(config(), PendingPolicy::Discard)
        .await
        .unwrap();
    let state = h.campaign.wait().await;

    assert_eq!(state.phase, CampaignPhase::Completed);
    assert_eq!(state.sent, 3);
}
