//! Resuming leftover contacts after a stop.

use outreach_core::{CampaignConfig, CampaignPhase, ContactStatus, Error, PendingPolicy};
use std::time::Duration;

use crate::common::{TestHarness, config, contact, three_contacts};

/// Starts a run with a long throttle and stops it after the first send.
async fn stopped_after_first_send(h: &TestHarness) {
    h.campaign
        .start(
            config().with_throttle_interval(Duration::from_secs(600)),
            PendingPolicy::Resume,
        )
        .await
        .unwrap();
    h.wait_until(|s| s.sent == 1).await;
    h.campaign.stop();
    let state = h.campaign.wait().await;
    assert_eq!(state.phase, CampaignPhase::Stopped);
    assert_eq!(state.remaining(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_resume_pending_processes_only_leftovers() {
    let h = TestHarness::new(three_contacts());
    stopped_after_first_send(&h).await;
    let first_run = h.campaign.status().run_id;

    let readmitted = h.campaign.resume_pending().await.unwrap();
    assert_eq!(readmitted, 2);
    let state = h.campaign.wait().await;

    assert_eq!(state.phase, CampaignPhase::Completed);
    assert_eq!(state.run_id, first_run);
    assert_eq!(state.processed, 3);
    assert_eq!(state.sent, 3);
    assert_eq!(
        h.channel.validated_phones(),
        vec!["5511000000001", "5511000000002", "5511000000003"]
    );
    assert_eq!(h.source.calls(), 1);
    assert_eq!(h.store.log().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_resume_pending_twice_is_noop() {
    let h = TestHarness::new(three_contacts());
    stopped_after_first_send(&h).await;

    assert_eq!(h.campaign.resume_pending().await.unwrap(), 2);
    h.campaign.wait().await;
    let calls = h.channel.calls().len();

    assert_eq!(h.campaign.resume_pending().await.unwrap(), 0);
    assert_eq!(h.campaign.resume_pending().await.unwrap(), 0);
    assert_eq!(h.channel.calls().len(), calls);
    assert!(!h.campaign.status().running);
}

#[tokio::test(start_paused = true)]
async fn test_resume_pending_without_prior_run() {
    let h = TestHarness::new(three_contacts());
    assert_eq!(h.campaign.resume_pending().await.unwrap(), 0);
    assert_eq!(h.source.calls(), 0);
    assert_eq!(h.campaign.status().phase, CampaignPhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_start_resumes_leftovers_on_request() {
    let h = TestHarness::new(three_contacts());
    stopped_after_first_send(&h).await;
    let first_run = h.campaign.status().run_id;

    let run_id = h
        .campaign
        .start(config(), PendingPolicy::Resume)
        .await
        .unwrap();
    h.campaign.wait().await;

    assert_eq!(Some(run_id), first_run);
    assert_eq!(h.source.calls(), 1);
    assert_eq!(h.channel.validated_phones().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_start_discards_leftovers_on_request() {
    let h = TestHarness::new(three_contacts());
    stopped_after_first_send(&h).await;
    let first_run = h.campaign.status().run_id;

    h.source
        .set_contacts(vec![contact("n1", "Dr. Nina", "5511000000009")]);
    let run_id = h
        .campaign
        .start(config(), PendingPolicy::Discard)
        .await
        .unwrap();
    let state = h.campaign.wait().await;

    assert_ne!(Some(run_id), first_run);
    assert_eq!(h.source.calls(), 2);
    assert_eq!(state.discovered, 1);
    assert_eq!(state.sent, 1);
    assert_eq!(
        h.channel.validated_phones(),
        vec!["5511000000001", "5511000000009"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_resume_for_another_target_is_rejected() {
    let h = TestHarness::new(three_contacts());
    stopped_after_first_send(&h).await;
    let first_run = h.campaign.status().run_id;

    let plumbers = CampaignConfig::new("plumber", "Springfield", "Hi {name}");
    let err = h
        .campaign
        .start(plumbers, PendingPolicy::Resume)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidConfig { field: Some(ref f), .. } if f == "category"
    ));

    let elsewhere = CampaignConfig::new("dentist", "Shelbyville", "Hi {name}");
    let err = h
        .campaign
        .start(elsewhere, PendingPolicy::Resume)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidConfig { field: Some(ref f), .. } if f == "locality"
    ));

    // Nothing moved: the leftovers are still there for the right target.
    assert_eq!(h.source.calls(), 1);
    assert_eq!(h.campaign.status().run_id, first_run);
    assert_eq!(h.campaign.status().remaining(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_default_policy_discovers_for_new_target() {
    let h = TestHarness::new(three_contacts());
    stopped_after_first_send(&h).await;
    let first_run = h.campaign.status().run_id;

    let plumbers = CampaignConfig::new("plumber", "Shelbyville", "Hi {name}");
    let run_id = h
        .campaign
        .start(plumbers, PendingPolicy::default())
        .await
        .unwrap();
    let state = h.campaign.wait().await;

    assert_ne!(Some(run_id), first_run);
    assert_eq!(h.source.calls(), 2);
    assert_eq!(state.category.as_deref(), Some("plumber"));
    assert_eq!(state.locality.as_deref(), Some("Shelbyville"));
    assert_eq!(state.discovered, 3);
}

#[tokio::test(start_paused = true)]
async fn test_fresh_start_after_completion_discovers_again() {
    let h = TestHarness::new(vec![contact("c1", "Dr. Ana", "5511000000001")]);
    let first = h
        .campaign
        .start(config(), PendingPolicy::Resume)
        .await
        .unwrap();
    h.campaign.wait().await;

    let second = h
        .campaign
        .start(config(), PendingPolicy::Resume)
        .await
        .unwrap();
    h.campaign.wait().await;

    assert_ne!(first, second);
    assert_eq!(h.source.calls(), 2);
    assert_eq!(h.campaign.history(Some(&first)).await.unwrap().len(), 1);
    assert_eq!(h.campaign.history(None).await.unwrap().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_stop_during_send_finishes_contact_first() {
    let channel = outreach_core::testing::ScriptedChannel::new()
        .with_send_latency(Duration::from_secs(30));
    let h = TestHarness::with_channel(three_contacts(), channel);

    h.campaign
        .start(config(), PendingPolicy::Resume)
        .await
        .unwrap();
    h.wait_until(|s| s.validated == 1).await;
    h.campaign.stop();
    h.campaign.wait().await;

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
            ContactStatus::Pending,
            ContactStatus::Pending
        ]
    );
    assert_eq!(h.campaign.resume_pending().await.unwrap(), 2);
    let state = h.campaign.wait().await;
    assert_eq!(state.sent, 3);
}
