//! In-memory collaborators for tests and demo mode.
//!
//! - [`ScriptedContactSource`]: returns a fixed contact list (or fails)
//! - [`ScriptedChannel`]: per-phone validation/send outcomes, call recording
//! - [`MemoryStore`]: lead persister, run logger and send counter with
//!   failure injection

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

use crate::collaborators::{
    ChannelSender, ChannelValidator, ContactSource, LeadPersister, Reachability, RunLogger,
    SendAck, SendCounter,
};
use crate::types::{AccountId, ChannelAddress, Contact, LeadId, OutcomeLogEntry, RunId};
use crate::{Error, Result};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// ScriptedContactSource
// ============================================================================

/// Contact source that returns a scripted list.
pub struct ScriptedContactSource {
    contacts: Mutex<Vec<Contact>>,
    failure: Mutex<Option<String>>,
    latency: Duration,
    calls: AtomicU64,
}

impl ScriptedContactSource {
    /// Creates a source that always returns `contacts`.
    pub fn new(contacts: Vec<Contact>) -> Self {
        Self {
            contacts: Mutex::new(contacts),
            failure: Mutex::new(None),
            latency: Duration::ZERO,
            calls: AtomicU64::new(0),
        }
    }

    /// Makes every discovery take `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Creates a source whose every call fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        let source = Self::new(Vec::new());
        *lock(&source.failure) = Some(message.into());
        source
    }

    /// Replaces the contacts returned by later calls.
    pub fn set_contacts(&self, contacts: Vec<Contact>) {
        *lock(&self.contacts) = contacts;
    }

    /// Number of `discover` calls so far.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContactSource for ScriptedContactSource {
    async fn discover(&self, category: &str, locality: &str) -> Result<Vec<Contact>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if let Some(message) = lock(&self.failure).clone() {
            return Err(Error::discovery(message));
        }
        tracing::debug!(category, locality, "Scripted discovery");
        Ok(lock(&self.contacts).clone())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

// ============================================================================
// ScriptedChannel
// ============================================================================

/// Scripted validation outcome for one phone number.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Validation {
    Reachable,
    Unreachable,
    Fail,
}

/// A recorded channel call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelCall {
    /// `validate(phone)` was called
    Validate {
        /// Phone validated
        phone: String,
        /// When the call happened
        at: Instant,
    },
    /// `send(address, message)` was called
    Send {
        /// Destination address
        address: ChannelAddress,
        /// Rendered message
        message: String,
        /// When the call happened
        at: Instant,
    },
}

/// Messaging channel double. Unknown phones validate as reachable at
/// `"{phone}@c.us"` and sends succeed unless scripted otherwise.
pub struct ScriptedChannel {
    ready: AtomicBool,
    validations: Mutex<HashMap<String, Validation>>,
    send_failures: Mutex<HashSet<ChannelAddress>>,
    send_latency: Mutex<Duration>,
    calls: Mutex<Vec<ChannelCall>>,
    next_message: AtomicU64,
}

impl Default for ScriptedChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedChannel {
    /// Creates a connected channel with no scripted outcomes.
    pub fn new() -> Self {
        Self {
            ready: AtomicBool::new(true),
            validations: Mutex::new(HashMap::new()),
            send_failures: Mutex::new(HashSet::new()),
            send_latency: Mutex::new(Duration::ZERO),
            calls: Mutex::new(Vec::new()),
            next_message: AtomicU64::new(1),
        }
    }

    /// The address a reachable phone validates to.
    pub fn address_for(phone: &str) -> ChannelAddress {
        ChannelAddress::new(format!("{phone}@c.us"))
    }

    /// Scripts `phone` as reachable.
    pub fn reachable(self, phone: &str) -> Self {
        lock(&self.validations).insert(phone.to_string(), Validation::Reachable);
        self
    }

    /// Scripts `phone` as unreachable.
    pub fn unreachable(self, phone: &str) -> Self {
        lock(&self.validations).insert(phone.to_string(), Validation::Unreachable);
        self
    }

    /// Scripts validation of `phone` to fail.
    pub fn validation_error(self, phone: &str) -> Self {
        lock(&self.validations).insert(phone.to_string(), Validation::Fail);
        self
    }

    /// Scripts delivery to `phone` to fail.
    pub fn send_error(self, phone: &str) -> Self {
        lock(&self.send_failures).insert(Self::address_for(phone));
        self
    }

    /// Makes every send take `latency`.
    pub fn with_send_latency(self, latency: Duration) -> Self {
        *lock(&self.send_latency) = latency;
        self
    }

    /// Connects or disconnects the channel.
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// All recorded calls, in order.
    pub fn calls(&self) -> Vec<ChannelCall> {
        lock(&self.calls).clone()
    }

    /// Phones passed to `validate`, in order.
    pub fn validated_phones(&self) -> Vec<String> {
        lock(&self.calls)
            .iter()
            .filter_map(|call| match call {
                ChannelCall::Validate { phone, .. } => Some(phone.clone()),
                ChannelCall::Send { .. } => None,
            })
            .collect()
    }

    /// `(address, message)` pairs passed to `send`, in order.
    pub fn sent_messages(&self) -> Vec<(ChannelAddress, String)> {
        lock(&self.calls)
            .iter()
            .filter_map(|call| match call {
                ChannelCall::Send {
                    address, message, ..
                } => Some((address.clone(), message.clone())),
                ChannelCall::Validate { .. } => None,
            })
            .collect()
    }
}

#[async_trait]
impl ChannelValidator for ScriptedChannel {
    async fn validate(&self, phone: &str) -> Result<Reachability> {
        lock(&self.calls).push(ChannelCall::Validate {
            phone: phone.to_string(),
            at: Instant::now(),
        });
        let scripted = lock(&self.validations).get(phone).cloned();
        match scripted.unwrap_or(Validation::Reachable) {
            Validation::Reachable => Ok(Reachability::reachable(Self::address_for(phone))),
            Validation::Unreachable => Ok(Reachability::unreachable()),
            Validation::Fail => Err(Error::channel(format!("validation of {phone} failed"))),
        }
    }
}

#[async_trait]
impl ChannelSender for ScriptedChannel {
    async fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn send(&self, address: &ChannelAddress, message: &str) -> Result<SendAck> {
        let latency = *lock(&self.send_latency);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        lock(&self.calls).push(ChannelCall::Send {
            address: address.clone(),
            message: message.to_string(),
            at: Instant::now(),
        });
        if lock(&self.send_failures).contains(address) {
            return Err(Error::channel(format!("delivery to {address} failed")));
        }
        let id = self.next_message.fetch_add(1, Ordering::SeqCst);
        Ok(SendAck {
            message_id: format!("msg-{id}"),
        })
    }
}

// ============================================================================
// MemoryStore
// ============================================================================

/// In-memory lead persister, run logger and send counter.
#[derive(Default)]
pub struct MemoryStore {
    leads: Mutex<HashMap<(AccountId, String), LeadId>>,
    log: Mutex<Vec<OutcomeLogEntry>>,
    counters: Mutex<HashMap<(AccountId, NaiveDate), u32>>,
    fail_leads: AtomicBool,
    fail_log: AtomicBool,
    fail_counter: AtomicBool,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `persist_lead` fail.
    pub fn fail_leads(&self, fail: bool) {
        self.fail_leads.store(fail, Ordering::SeqCst);
    }

    /// Makes `append` fail.
    pub fn fail_log(&self, fail: bool) {
        self.fail_log.store(fail, Ordering::SeqCst);
    }

    /// Makes the send counter fail.
    pub fn fail_counter(&self, fail: bool) {
        self.fail_counter.store(fail, Ordering::SeqCst);
    }

    /// Seeds the daily counter.
    pub fn set_count(&self, account: &AccountId, date: NaiveDate, count: u32) {
        lock(&self.counters).insert((account.clone(), date), count);
    }

    /// All appended log entries.
    pub fn log(&self) -> Vec<OutcomeLogEntry> {
        lock(&self.log).clone()
    }

    /// Number of persisted leads.
    pub fn lead_count(&self) -> usize {
        lock(&self.leads).len()
    }
}

#[async_trait]
impl LeadPersister for MemoryStore {
    async fn persist_lead(
        &self,
        account: &AccountId,
        _contact: &Contact,
        phone: &str,
        _address: &ChannelAddress,
    ) -> Result<LeadId> {
        if self.fail_leads.load(Ordering::SeqCst) {
            return Err(Error::persistence("lead store unavailable"));
        }
        let mut leads = lock(&self.leads);
        let next = leads.len() + 1;
        let id = leads
            .entry((account.clone(), phone.to_string()))
            .or_insert_with(|| LeadId::new(format!("lead-{next}")));
        Ok(id.clone())
    }
}

#[async_trait]
impl RunLogger for MemoryStore {
    async fn append(&self, entry: &OutcomeLogEntry) -> Result<()> {
        if self.fail_log.load(Ordering::SeqCst) {
            return Err(Error::persistence("run log unavailable"));
        }
        let mut log = lock(&self.log);
        let existing = log
            .iter_mut()
            .find(|e| e.run_id == entry.run_id && e.contact.id == entry.contact.id);
        match existing {
            Some(slot) => *slot = entry.clone(),
            None => log.push(entry.clone()),
        }
        Ok(())
    }

    async fn entries(
        &self,
        account: &AccountId,
        run: Option<&RunId>,
    ) -> Result<Vec<OutcomeLogEntry>> {
        Ok(lock(&self.log)
            .iter()
            .filter(|e| &e.account == account)
            .filter(|e| run.is_none_or(|r| &e.run_id == r))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SendCounter for MemoryStore {
    async fn count(&self, account: &AccountId, date: NaiveDate) -> Result<u32> {
        if self.fail_counter.load(Ordering::SeqCst) {
            return Err(Error::persistence("counter unavailable"));
        }
        Ok(lock(&self.counters)
            .get(&(account.clone(), date))
            .copied()
            .unwrap_or(0))
    }

    async fn increment(&self, account: &AccountId, date: NaiveDate) -> Result<u32> {
        if self.fail_counter.load(Ordering::SeqCst) {
            return Err(Error::persistence("counter unavailable"));
        }
        let mut counters = lock(&self.counters);
        let count = counters.entry((account.clone(), date)).or_insert(0);
        *count += 1;
        Ok(*count)
    }
}
