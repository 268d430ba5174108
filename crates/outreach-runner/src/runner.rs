//! The per-run processing loop and the per-contact state machine.
//!
//! One loop per campaign run, strictly sequential: the channel's anti-abuse
//! policy is per account, so contacts are validated and messaged one at a
//! time in queue order.

use std::sync::Arc;
use std::time::Duration;

use outreach_core::{
    CampaignPhase, CampaignState, ContactId, ContactRecord, ContactStatus, HaltReason, LeadId,
    MessageTemplate, OutcomeLogEntry, RatePolicy, RunContext,
};
use tokio::sync::watch;
use tokio::time::Instant;

use crate::campaign::{CampaignSnapshot, Collaborators};
use crate::control::ControlWatcher;
use crate::quota::QuotaTracker;

/// Pacing granularity of the throttle countdown.
const COUNTDOWN_TICK: Duration = Duration::from_secs(1);

/// Terminal outcome of one contact, as far as pacing is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ContactOutcome {
    /// Message delivered: arm the throttle delay.
    Sent,
    /// Anything else: minimal pacing only.
    NotSent,
}

/// Everything the loop needs for one run. Owned by the loop task.
pub(crate) struct RunLoop {
    pub(crate) ctx: RunContext,
    pub(crate) template: MessageTemplate,
    pub(crate) policy: RatePolicy,
    pub(crate) deps: Collaborators,
    pub(crate) table: Vec<ContactRecord>,
    pub(crate) state: CampaignState,
    pub(crate) quota: QuotaTracker,
    pub(crate) control: ControlWatcher,
    pub(crate) publish: Arc<watch::Sender<CampaignSnapshot>>,
    /// Contacts failed at admission whose log entries are still owed.
    pub(crate) unlogged: Vec<usize>,
}

impl RunLoop {
    /// Runs until the queue is exhausted, the cap is reached, or a stop is
    /// requested.
    pub(crate) async fn run(mut self) -> HaltReason {
        tracing::info!(
            run_id = %self.ctx.run_id,
            account = %self.ctx.account,
            category = %self.ctx.category,
            locality = %self.ctx.locality,
            queued = self.state.remaining(),
            daily_count = self.quota.count(),
            daily_cap = self.quota.cap(),
            "Starting campaign run"
        );

        for idx in std::mem::take(&mut self.unlogged) {
            self.log_outcome(idx, None).await;
        }

        let reason = self.process_queue().await;
        self.finish(reason);
        reason
    }

    async fn process_queue(&mut self) -> HaltReason {
        // Stopped while the queue was being built.
        if self.control.stop_requested() {
            return HaltReason::StopRequested;
        }
        let mut cursor = 0;
        while let Some(idx) = self.next_pending(cursor) {
            cursor = idx + 1;

            if self.control.stop_requested() {
                return HaltReason::StopRequested;
            }
            if self.control.is_paused() {
                tracing::info!(run_id = %self.ctx.run_id, "Campaign paused");
            }
            if !self.control.wait_while_paused().await {
                return HaltReason::StopRequested;
            }

            self.quota.refresh_day().await;
            self.state.daily_count = self.quota.count();
            if self.quota.exhausted() {
                tracing::info!(
                    run_id = %self.ctx.run_id,
                    daily_count = self.quota.count(),
                    "Daily cap reached"
                );
                return HaltReason::DailyCapReached;
            }

            let outcome = self.process_contact(idx).await;

            let Some(next) = self.next_pending(cursor) else {
                break;
            };
            let proceed = match outcome {
                ContactOutcome::Sent if !self.quota.exhausted() => {
                    let next_id = self.table[next].contact.id.clone();
                    self.throttle(next_id).await
                }
                // Cap just reached: the next iteration halts, no point waiting.
                ContactOutcome::Sent => true,
                ContactOutcome::NotSent => self.control.sleep(self.policy.pacing_interval).await,
            };
            if !proceed {
                return HaltReason::StopRequested;
            }
        }
        HaltReason::Exhausted
    }

    /// Drives one contact from `pending` to a terminal status.
    pub(crate) async fn process_contact(&mut self, idx: usize) -> ContactOutcome {
        let contact = self.table[idx].contact.clone();

        if !contact.has_phone() {
            self.fail(idx, "missing phone");
            self.log_outcome(idx, None).await;
            return ContactOutcome::NotSent;
        }

        if !self.table[idx].state.advance(ContactStatus::Validating) {
            tracing::warn!(
                contact_id = %contact.id,
                status = ?self.table[idx].state.status,
                "Contact is not pending, skipping"
            );
            return ContactOutcome::NotSent;
        }
        self.publish_contact(idx);
        tracing::debug!(run_id = %self.ctx.run_id, contact_id = %contact.id, "Validating contact");

        let reachability = match self.deps.validator.validate(&contact.phone).await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(contact_id = %contact.id, error = %e, "Validation failed");
                self.fail(idx, format!("validation failed: {e}"));
                self.log_outcome(idx, None).await;
                return ContactOutcome::NotSent;
            }
        };

        if !reachability.is_reachable {
            tracing::info!(contact_id = %contact.id, "Number not reachable on channel");
            let now = self.deps.clock.now();
            self.table[idx]
                .state
                .finish(ContactStatus::ChannelInvalid, now);
            self.state.record_outcome(ContactStatus::ChannelInvalid);
            self.publish_contact(idx);
            self.log_outcome(idx, None).await;
            return ContactOutcome::NotSent;
        }

        let Some(address) = reachability.channel_address else {
            tracing::warn!(contact_id = %contact.id, "Reachable number without channel address");
            self.fail(idx, "validation failed: no channel address");
            self.log_outcome(idx, None).await;
            return ContactOutcome::NotSent;
        };

        self.table[idx].state.mark_valid(address.clone());
        self.state.validated += 1;
        self.publish_contact(idx);

        let lead_id = match self
            .deps
            .leads
            .persist_lead(&self.ctx.account, &contact, &contact.phone, &address)
            .await
        {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(contact_id = %contact.id, error = %e, "Could not persist lead");
                None
            }
        };

        let message = self
            .template
            .render(&contact, &self.ctx.category, &self.ctx.locality);

        let outcome = match self.deps.sender.send(&address, &message).await {
            Ok(ack) => {
                self.quota.record_send().await;
                self.state.daily_count = self.quota.count();
                let now = self.deps.clock.now();
                self.table[idx].state.finish(ContactStatus::MessageSent, now);
                self.state.record_outcome(ContactStatus::MessageSent);
                self.publish_contact(idx);
                tracing::info!(
                    run_id = %self.ctx.run_id,
                    contact_id = %contact.id,
                    message_id = %ack.message_id,
                    daily_count = self.quota.count(),
                    "Message sent"
                );
                ContactOutcome::Sent
            }
            Err(e) => {
                tracing::warn!(contact_id = %contact.id, error = %e, "Send failed");
                self.fail(idx, format!("send failed: {e}"));
                ContactOutcome::NotSent
            }
        };

        self.log_outcome(idx, lead_id).await;
        outcome
    }

    /// Waits out the throttle interval, publishing a per-second countdown.
    async fn throttle(&mut self, next: ContactId) -> bool {
        let deadline = Instant::now() + self.policy.throttle_interval;
        self.state.next_eligible_contact_id = Some(next);

        let completed = loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break true;
            }
            self.state.seconds_until_next_eligible = Some(ceil_secs(remaining));
            self.publish_state();
            if !self.control.sleep(remaining.min(COUNTDOWN_TICK)).await {
                break false;
            }
        };

        self.state.next_eligible_contact_id = None;
        self.state.seconds_until_next_eligible = None;
        self.publish_state();
        completed
    }

    fn fail(&mut self, idx: usize, reason: impl Into<String>) {
        let now = self.deps.clock.now();
        if self.table[idx].state.mark_error(reason, now) {
            self.state.record_outcome(ContactStatus::Error);
        }
        self.publish_contact(idx);
    }

    /// Appends the outcome log entry. Failures never leave this function.
    async fn log_outcome(&self, idx: usize, lead_id: Option<LeadId>) {
        let entry = OutcomeLogEntry::from_record(
            &self.ctx,
            &self.table[idx],
            lead_id,
            self.deps.clock.now(),
        );
        if let Err(e) = self.deps.log.append(&entry).await {
            tracing::warn!(
                run_id = %self.ctx.run_id,
                contact_id = %entry.contact.id,
                error = %e,
                "Could not append outcome log entry"
            );
        }
    }

    fn next_pending(&self, from: usize) -> Option<usize> {
        self.table
            .iter()
            .enumerate()
            .skip(from)
            .find(|(_, r)| r.state.status == ContactStatus::Pending)
            .map(|(i, _)| i)
    }

    fn finish(&mut self, reason: HaltReason) {
        self.state.running = false;
        self.state.paused = false;
        self.state.phase = match reason {
            HaltReason::StopRequested => CampaignPhase::Stopped,
            HaltReason::Exhausted | HaltReason::DailyCapReached => CampaignPhase::Completed,
        };
        self.state.halt_reason = Some(reason);
        self.state.finished_at = Some(self.deps.clock.now());
        self.state.next_eligible_contact_id = None;
        self.state.seconds_until_next_eligible = None;
        self.state.daily_count = self.quota.count();

        let day = self.quota.day();
        let count = self.quota.count();
        let state = &self.state;
        self.publish.send_modify(|snap| {
            snap.state = state.clone();
            snap.quota = Some((day, count));
        });

        tracing::info!(
            run_id = %self.ctx.run_id,
            reason = ?reason,
            processed = self.state.processed,
            sent = self.state.sent,
            invalid = self.state.invalid,
            errored = self.state.errored,
            remaining = self.state.remaining(),
            "Campaign run finished"
        );
    }

    fn publish_contact(&self, idx: usize) {
        let record = &self.table[idx];
        let state = &self.state;
        self.publish.send_modify(|snap| {
            if let Some(slot) = snap.contacts.get_mut(idx) {
                *slot = record.clone();
            }
            snap.state = state.clone();
        });
    }

    fn publish_state(&self) {
        let state = &self.state;
        self.publish.send_modify(|snap| snap.state = state.clone());
    }
}

fn ceil_secs(d: Duration) -> u64 {
    d.as_secs() + u64::from(d.subsec_nanos() > 0)
}
