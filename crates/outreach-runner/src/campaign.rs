//! One campaign per account: the control surface around the processing loop.
//!
//! The loop task is the only writer of the campaign state and contact
//! table. It publishes every change through a `watch` channel, so
//! [`Campaign::status`] is a lock-free read of the latest snapshot and the
//! control operations only flip [`ControlHandle`] flags.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use outreach_core::{
    AccountId, CampaignConfig, CampaignPhase, CampaignState, ChannelSender, ChannelValidator,
    Clock, ContactRecord, ContactSource, Error, HaltReason, LeadPersister, MessageTemplate,
    OutcomeLogEntry, PendingPolicy, Result, RunContext, RunId, RunLogger, SendCounter,
    SystemClock,
};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

use crate::control::ControlHandle;
use crate::quota::QuotaTracker;
use crate::runner::RunLoop;

// ============================================================================
// Collaborators
// ============================================================================

/// The external collaborators a campaign drives.
#[derive(Clone)]
pub struct Collaborators {
    /// Contact discovery
    pub source: Arc<dyn ContactSource>,
    /// Reachability checks
    pub validator: Arc<dyn ChannelValidator>,
    /// Message delivery and readiness
    pub sender: Arc<dyn ChannelSender>,
    /// Lead upserts
    pub leads: Arc<dyn LeadPersister>,
    /// Outcome log
    pub log: Arc<dyn RunLogger>,
    /// Durable daily send counter
    pub counter: Arc<dyn SendCounter>,
    /// Wall clock
    pub clock: Arc<dyn Clock>,
}

impl Collaborators {
    /// Wires a source, a channel that validates and sends, and a store that
    /// persists leads, outcomes and send counts.
    pub fn new<C, S>(source: Arc<dyn ContactSource>, channel: Arc<C>, store: Arc<S>) -> Self
    where
        C: ChannelValidator + ChannelSender + 'static,
        S: LeadPersister + RunLogger + SendCounter + 'static,
    {
        Self {
            source,
            validator: channel.clone(),
            sender: channel,
            leads: store.clone(),
            log: store.clone(),
            counter: store,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

// ============================================================================
// CampaignSnapshot
// ============================================================================

/// Everything the loop publishes after each change.
#[derive(Debug, Clone, Default)]
pub struct CampaignSnapshot {
    /// Campaign-level counters and phase
    pub state: CampaignState,
    /// Contact table of the current or most recent run, in queue order
    pub contacts: Vec<ContactRecord>,
    /// Configuration of the current or most recent run
    pub config: Option<CampaignConfig>,
    /// Last known `(day, count)` of the daily quota
    pub quota: Option<(NaiveDate, u32)>,
}

impl CampaignSnapshot {
    /// Contacts a resumed run would pick up.
    pub fn leftover_count(&self) -> usize {
        self.contacts
            .iter()
            .filter(|r| r.state.status.is_resumable())
            .count()
    }
}

/// A queue ready to be handed to the loop.
struct PreparedRun {
    run_id: RunId,
    config: CampaignConfig,
    table: Vec<ContactRecord>,
    unlogged: Vec<usize>,
    started_at: DateTime<Utc>,
}

/// Flips `running` off if the loop task ends without doing it itself.
struct RunningGuard {
    publish: Arc<watch::Sender<CampaignSnapshot>>,
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.publish.send_if_modified(|snap| {
            if !snap.state.running {
                return false;
            }
            snap.state.running = false;
            snap.state.paused = false;
            snap.state.phase = CampaignPhase::Stopped;
            snap.state.next_eligible_contact_id = None;
            snap.state.seconds_until_next_eligible = None;
            true
        });
    }
}

// ============================================================================
// Campaign
// ============================================================================

/// A prospecting campaign owned by one account.
pub struct Campaign {
    account: AccountId,
    deps: Collaborators,
    control: ControlHandle,
    snapshot: Arc<watch::Sender<CampaignSnapshot>>,
    task: Mutex<Option<JoinHandle<HaltReason>>>,
}

impl Campaign {
    /// Creates an idle campaign for `account`.
    pub fn new(account: AccountId, deps: Collaborators) -> Self {
        let (tx, _rx) = watch::channel(CampaignSnapshot::default());
        Self {
            account,
            deps,
            control: ControlHandle::new(),
            snapshot: Arc::new(tx),
            task: Mutex::new(None),
        }
    }

    /// Owning account.
    pub fn account(&self) -> &AccountId {
        &self.account
    }

    /// Starts a run and returns its id once the queue is built.
    ///
    /// Fails with [`Error::InvalidConfig`], [`Error::ChannelNotReady`],
    /// [`Error::AlreadyRunning`] or [`Error::Discovery`]; in each case no
    /// contact has been touched. If the previous run left contacts
    /// `pending` or `validating`, `on_pending` decides whether this run
    /// resumes them or discards them for a fresh discovery. Resuming
    /// leftovers of a different category or locality is rejected with
    /// [`Error::InvalidConfig`].
    pub async fn start(&self, config: CampaignConfig, on_pending: PendingPolicy) -> Result<RunId> {
        let mut task = self.task.lock().await;
        self.ensure_idle(&task)?;
        // A stop() from here on belongs to this run, even during discovery.
        self.control.reset();
        config.validate()?;
        self.ensure_channel_ready().await?;

        let previous = self.snapshot.borrow().clone();
        let leftovers = previous.leftover_count();

        let prepared = match (leftovers, on_pending) {
            (n, PendingPolicy::Resume) if n > 0 => {
                if let Some(prior) = &previous.config {
                    ensure_same_target(prior, &config)?;
                }
                tracing::info!(account = %self.account, leftovers = n, "Resuming leftover contacts");
                self.readmit(&previous, config)
            }
            (n, _) => {
                if n > 0 {
                    tracing::info!(account = %self.account, leftovers = n, "Discarding leftover contacts");
                }
                self.discover(config).await?
            }
        };

        Ok(self.launch(&mut task, prepared, previous.quota).await)
    }

    /// Re-admits the contacts a previous run left unfinished, without
    /// discovering new ones.
    ///
    /// Returns how many contacts were re-admitted. With nothing left over
    /// this is a no-op returning `0`.
    pub async fn resume_pending(&self) -> Result<usize> {
        let mut task = self.task.lock().await;
        self.ensure_idle(&task)?;
        self.control.reset();

        let previous = self.snapshot.borrow().clone();
        let leftovers = previous.leftover_count();
        let Some(config) = previous.config.clone() else {
            return Ok(0);
        };
        if leftovers == 0 {
            tracing::debug!(account = %self.account, "Nothing to resume");
            return Ok(0);
        }
        self.ensure_channel_ready().await?;

        tracing::info!(account = %self.account, leftovers, "Resuming pending contacts");
        let prepared = self.readmit(&previous, config);
        self.launch(&mut task, prepared, previous.quota).await;
        Ok(leftovers)
    }

    /// Halts the loop before the next contact.
    pub fn pause(&self) -> Result<()> {
        self.ensure_running()?;
        self.control.pause();
        tracing::info!(account = %self.account, "Pause requested");
        Ok(())
    }

    /// Lets a paused loop continue.
    pub fn resume(&self) -> Result<()> {
        self.ensure_running()?;
        self.control.resume();
        tracing::info!(account = %self.account, "Resume requested");
        Ok(())
    }

    /// Requests the loop to exit. Pending contacts are kept for a later
    /// resume. Safe to call at any time, any number of times.
    pub fn stop(&self) {
        if self.snapshot.borrow().state.running {
            tracing::info!(account = %self.account, "Stop requested");
        }
        self.control.stop();
    }

    /// Current campaign state. Never blocks.
    pub fn status(&self) -> CampaignState {
        let mut state = self.snapshot.borrow().state.clone();
        if state.running {
            let flags = self.control.flags();
            state.paused = flags.paused;
            state.phase = if flags.paused {
                CampaignPhase::Paused
            } else {
                CampaignPhase::Running
            };
        }
        state
    }

    /// Contact table of the current or most recent run.
    pub fn contacts(&self) -> Vec<ContactRecord> {
        self.snapshot.borrow().contacts.clone()
    }

    /// Configuration of the current or most recent run.
    pub fn config(&self) -> Option<CampaignConfig> {
        self.snapshot.borrow().config.clone()
    }

    /// Subscribes to every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<CampaignSnapshot> {
        self.snapshot.subscribe()
    }

    /// Waits for the loop to exit and returns the final state.
    pub async fn wait(&self) -> CampaignState {
        let mut rx = self.snapshot.subscribe();
        // The sender lives as long as `self`, so this only ends on the predicate.
        let _ = rx.wait_for(|snap| !snap.state.running).await;
        self.status()
    }

    /// Requests a stop and waits for the loop task to finish.
    pub async fn shutdown(&self) {
        self.stop();
        let handle = self.task.lock().await.take();
        if let Some(handle) = handle
            && let Err(e) = handle.await
        {
            tracing::warn!(account = %self.account, error = %e, "Campaign task ended abnormally");
        }
    }

    /// Outcome log entries of one run, or of every run of this account.
    pub async fn history(&self, run: Option<&RunId>) -> Result<Vec<OutcomeLogEntry>> {
        let entries = self.deps.log.entries(&self.account, run).await?;
        match run {
            Some(id) if entries.is_empty() => Err(Error::RunNotFound { id: id.to_string() }),
            _ => Ok(entries),
        }
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    fn ensure_idle(&self, task: &Option<JoinHandle<HaltReason>>) -> Result<()> {
        let alive = task.as_ref().is_some_and(|h| !h.is_finished());
        if alive && self.snapshot.borrow().state.running {
            return Err(Error::AlreadyRunning {
                account: self.account.to_string(),
            });
        }
        Ok(())
    }

    fn ensure_running(&self) -> Result<()> {
        if self.snapshot.borrow().state.running {
            Ok(())
        } else {
            Err(Error::NotRunning {
                account: self.account.to_string(),
            })
        }
    }

    async fn ensure_channel_ready(&self) -> Result<()> {
        if self.deps.sender.is_ready().await {
            Ok(())
        } else {
            Err(Error::channel_not_ready("messaging session is not connected"))
        }
    }

    async fn discover(&self, config: CampaignConfig) -> Result<PreparedRun> {
        let contacts = self
            .deps
            .source
            .discover(&config.category, &config.locality)
            .await
            .map_err(|e| match e {
                Error::Discovery { .. } => e,
                other => Error::discovery_with_source(
                    format!("contact source '{}' failed", self.deps.source.name()),
                    other,
                ),
            })?;

        let now = self.deps.clock.now();
        let mut seen = HashSet::new();
        let mut table = Vec::with_capacity(contacts.len());
        let mut unlogged = Vec::new();
        for contact in contacts {
            if !seen.insert(contact.id.clone()) {
                tracing::warn!(contact_id = %contact.id, "Dropping duplicate contact");
                continue;
            }
            let mut record = ContactRecord::pending(contact);
            if !record.contact.has_phone() {
                record.state.mark_error("missing phone", now);
                unlogged.push(table.len());
            }
            table.push(record);
        }

        tracing::info!(
            account = %self.account,
            source = self.deps.source.name(),
            discovered = table.len(),
            missing_phone = unlogged.len(),
            "Discovery complete"
        );

        Ok(PreparedRun {
            run_id: RunId::new(),
            config,
            table,
            unlogged,
            started_at: now,
        })
    }

    /// Builds a run over the previous table, keeping its run id and
    /// configuration when known.
    fn readmit(&self, previous: &CampaignSnapshot, fallback: CampaignConfig) -> PreparedRun {
        let mut table = previous.contacts.clone();
        for record in &mut table {
            record.state.readmit();
        }
        PreparedRun {
            run_id: previous.state.run_id.unwrap_or_default(),
            config: previous.config.clone().unwrap_or(fallback),
            table,
            unlogged: Vec::new(),
            started_at: previous
                .state
                .started_at
                .unwrap_or_else(|| self.deps.clock.now()),
        }
    }

    async fn launch(
        &self,
        task: &mut Option<JoinHandle<HaltReason>>,
        run: PreparedRun,
        last_quota: Option<(NaiveDate, u32)>,
    ) -> RunId {
        let policy = run.config.policy;
        let quota = QuotaTracker::load(
            self.account.clone(),
            policy.daily_cap,
            self.deps.counter.clone(),
            self.deps.clock.clone(),
            last_quota,
        )
        .await;

        let mut state = CampaignState {
            account: Some(self.account.clone()),
            run_id: Some(run.run_id),
            phase: CampaignPhase::Running,
            running: true,
            category: Some(run.config.category.clone()),
            locality: Some(run.config.locality.clone()),
            daily_count: quota.count(),
            daily_cap: quota.cap(),
            started_at: Some(run.started_at),
            ..Default::default()
        };
        state.recount(run.table.iter().map(|r| &r.state));

        self.snapshot.send_replace(CampaignSnapshot {
            state: state.clone(),
            contacts: run.table.clone(),
            config: Some(run.config.clone()),
            quota: Some((quota.day(), quota.count())),
        });

        let ctx = RunContext {
            run_id: run.run_id,
            account: self.account.clone(),
            category: run.config.category.clone(),
            locality: run.config.locality.clone(),
        };
        let run_loop = RunLoop {
            ctx,
            template: MessageTemplate::new(run.config.message.clone()),
            policy,
            deps: self.deps.clone(),
            table: run.table,
            state,
            quota,
            control: self.control.watcher(),
            publish: self.snapshot.clone(),
            unlogged: run.unlogged,
        };

        let guard = RunningGuard {
            publish: self.snapshot.clone(),
        };
        *task = Some(tokio::spawn(async move {
            let _guard = guard;
            run_loop.run().await
        }));
        run.run_id
    }
}

/// Leftovers only make sense for the category and locality they were
/// discovered for.
fn ensure_same_target(prior: &CampaignConfig, requested: &CampaignConfig) -> Result<()> {
    if prior.category != requested.category {
        return Err(Error::invalid_config_field(
            "category",
            format!(
                "leftover contacts belong to '{}'; discard them to start '{}'",
                prior.category, requested.category
            ),
        ));
    }
    if prior.locality != requested.locality {
        return Err(Error::invalid_config_field(
            "locality",
            format!(
                "leftover contacts belong to '{}'; discard them to start '{}'",
                prior.locality, requested.locality
            ),
        ));
    }
    Ok(())
}

impl std::fmt::Debug for Campaign {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Campaign")
            .field("account", &self.account)
            .field("control", &self.control)
            .finish_non_exhaustive()
    }
}
