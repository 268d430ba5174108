//! Campaign-level state tracking types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AccountId, ContactId, ContactState, ContactStatus, RunId};

/// Lifecycle phase of a campaign.
///
/// `Paused` is a sub-state of running: the loop is alive but halted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum CampaignPhase {
    /// No run has started yet.
    #[default]
    Idle,

    /// The processing loop is active.
    Running,

    /// The loop is alive but waiting for `resume()`.
    Paused,

    /// The loop ended on its own (queue exhausted or daily cap reached).
    Completed,

    /// The loop ended because `stop()` was requested.
    Stopped,
}

impl CampaignPhase {
    /// Returns `true` if the campaign is in a terminal phase.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CampaignPhase::Completed | CampaignPhase::Stopped)
    }

    /// Returns `true` while the processing loop is alive.
    pub fn is_active(&self) -> bool {
        matches!(self, CampaignPhase::Running | CampaignPhase::Paused)
    }
}

impl std::fmt::Display for CampaignPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CampaignPhase::Idle => write!(f, "idle"),
            CampaignPhase::Running => write!(f, "running"),
            CampaignPhase::Paused => write!(f, "paused"),
            CampaignPhase::Completed => write!(f, "completed"),
            CampaignPhase::Stopped => write!(f, "stopped"),
        }
    }
}

/// Why the processing loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HaltReason {
    /// No `pending` contact left.
    Exhausted,
    /// The account reached its daily cap.
    DailyCapReached,
    /// `stop()` was called.
    StopRequested,
}

impl std::fmt::Display for HaltReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HaltReason::Exhausted => write!(f, "exhausted"),
            HaltReason::DailyCapReached => write!(f, "daily_cap_reached"),
            HaltReason::StopRequested => write!(f, "stop_requested"),
        }
    }
}

/// Snapshot of a campaign, as returned by `status()`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignState {
    /// Account that owns the campaign
    pub account: Option<AccountId>,

    /// Current or most recent run
    pub run_id: Option<RunId>,

    /// Lifecycle phase
    pub phase: CampaignPhase,

    /// Loop alive (also while paused)
    pub running: bool,

    /// Loop halted awaiting `resume()`
    pub paused: bool,

    /// Category of the current run
    pub category: Option<String>,

    /// Locality of the current run
    pub locality: Option<String>,

    /// Contacts in the queue
    pub discovered: u32,

    /// Contacts that reached a terminal status
    pub processed: u32,

    /// Contacts the channel reported reachable
    pub validated: u32,

    /// Contacts the channel reported unreachable
    pub invalid: u32,

    /// Messages delivered
    pub sent: u32,

    /// Contacts that ended in `erro`
    pub errored: u32,

    /// Messages sent by the account today, across runs
    pub daily_count: u32,

    /// Daily cap in effect
    pub daily_cap: u32,

    /// Contact waiting for the throttle delay to elapse
    pub next_eligible_contact_id: Option<ContactId>,

    /// Remaining throttle countdown in seconds
    pub seconds_until_next_eligible: Option<u64>,

    /// When the run started
    pub started_at: Option<DateTime<Utc>>,

    /// When the loop exited
    pub finished_at: Option<DateTime<Utc>>,

    /// Why the loop exited
    pub halt_reason: Option<HaltReason>,
}

impl CampaignState {
    /// Contacts still waiting to be processed.
    pub fn remaining(&self) -> u32 {
        self.discovered.saturating_sub(self.processed)
    }

    /// Accounts a contact that just reached `status`.
    pub fn record_outcome(&mut self, status: ContactStatus) {
        match status {
            ContactStatus::MessageSent => self.sent += 1,
            ContactStatus::ChannelInvalid => self.invalid += 1,
            ContactStatus::Error => self.errored += 1,
            _ => return,
        }
        self.processed += 1;
    }

    /// Recomputes all contact counters from the contact table.
    pub fn recount<'a, I>(&mut self, states: I)
    where
        I: IntoIterator<Item = &'a ContactState>,
    {
        self.discovered = 0;
        self.processed = 0;
        self.validated = 0;
        self.invalid = 0;
        self.sent = 0;
        self.errored = 0;
        for state in states {
            self.discovered += 1;
            if state.channel_address.is_some() {
                self.validated += 1;
            }
            self.record_outcome(state.status);
        }
    }

    /// Returns `true` if every processed contact sits in exactly one bucket.
    pub fn is_balanced(&self) -> bool {
        self.processed == self.sent + self.invalid + self.errored
    }
}
