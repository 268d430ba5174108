//! `start()` failures that surface to the caller.

use outreach_core::{CampaignConfig, CampaignPhase, Error, PendingPolicy};

use crate::common::{TestHarness, config, three_contacts};

#[tokio::test]
async fn test_empty_category_rejected_before_side_effects() {
    let h = TestHarness::new(three_contacts());
    let err = h
        .campaign
        .start(
            CampaignConfig::new("", "Springfield", "Hi"),
            PendingPolicy::Resume,
        )
        .await
        .unwrap_err();

    match err {
        Error::InvalidConfig { field, .. } => assert_eq!(field.as_deref(), Some("category")),
        other => unreachable!("expected InvalidConfig, got {other:?}"),
    }
    assert_eq!(h.source.calls(), 0);
    assert_eq!(h.campaign.status().phase, CampaignPhase::Idle);
}

#[tokio::test]
async fn test_empty_locality_rejected() {
    let h = TestHarness::new(three_contacts());
    let err = h
        .campaign
        .start(
            CampaignConfig::new("dentist", "  ", "Hi"),
            PendingPolicy::Resume,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidConfig { .. }));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_channel_not_ready() {
    let h = TestHarness::new(three_contacts());
    h.channel.set_ready(false);

    let err = h
        .campaign
        .start(config(), PendingPolicy::Resume)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ChannelNotReady { .. }));
    assert_eq!(h.source.calls(), 0);
    assert!(!h.campaign.status().running);
}

#[tokio::test]
async fn test_discovery_failure_surfaces() {
    let h = TestHarness::failing_discovery("lead service returned 503");

    let err = h
        .campaign
        .start(config(), PendingPolicy::Resume)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Discovery { .. }));
    assert!(err.to_string().contains("503"));
    assert!(h.channel.calls().is_empty());

    let state = h.campaign.status();
    assert!(!state.running);
    assert_eq!(state.phase, CampaignPhase::Idle);
    assert!(h.store.log().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_second_start_while_running() {
    let h = TestHarness::new(three_contacts());
    h.campaign
        .start(config(), PendingPolicy::Resume)
        .await
        .unwrap();

    let err = h
        .campaign
        .start(config(), PendingPolicy::Discard)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AlreadyRunning { .. }));
    let err = h.campaign.resume_pending().await.unwrap_err();
    assert!(matches!(err, Error::AlreadyRunning { .. }));
    assert_eq!(h.source.calls(), 1);

    h.campaign.stop();
    h.campaign.wait().await;
}
