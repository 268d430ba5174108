//! `redb`-backed implementation of the durable collaborators.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use outreach_core::{
    AccountId, ChannelAddress, Contact, Error, LeadId, LeadPersister, OutcomeLogEntry, Result,
    RunId, RunLogger, SendCounter,
};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use uuid::Uuid;

use crate::lead::LeadRecord;

/// Outcome log: (run id, append sequence) -> JSON entry.
const OUTCOMES: TableDefinition<(&str, u64), &str> = TableDefinition::new("outcomes_by_run");

/// One entry per contact and run: (run id, contact id) -> append sequence.
const OUTCOME_KEYS: TableDefinition<(&str, &str), u64> = TableDefinition::new("outcome_keys");

/// Store-wide counters, e.g. the next outcome sequence.
const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences");

const NEXT_OUTCOME: &str = "outcome";

/// Leads: (account, phone) -> JSON lead record.
const LEADS: TableDefinition<(&str, &str), &str> = TableDefinition::new("leads");

/// Daily send counts: (account, ISO date) -> count.
const DAILY_COUNTS: TableDefinition<(&str, &str), u32> = TableDefinition::new("daily_counts");

fn storage<E: Into<redb::Error>>(e: E) -> Error {
    Error::persistence_with_source("redb operation failed", e.into())
}

/// Leads, outcome log and daily counters in a single `redb` file.
///
/// Cheap to clone; clones share the database handle. All disk work runs on
/// the blocking thread pool.
#[derive(Clone)]
pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    /// Opens (or creates) the database at `path` and its tables.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path).map_err(storage)?;

        let txn = db.begin_write().map_err(storage)?;
        txn.open_table(OUTCOMES).map_err(storage)?;
        txn.open_table(OUTCOME_KEYS).map_err(storage)?;
        txn.open_table(SEQUENCES).map_err(storage)?;
        txn.open_table(LEADS).map_err(storage)?;
        txn.open_table(DAILY_COUNTS).map_err(storage)?;
        txn.commit().map_err(storage)?;

        tracing::debug!(path = %path.display(), "Opened outreach store");
        Ok(Self { db: Arc::new(db) })
    }

    /// All leads of `account`, ordered by phone.
    pub async fn leads(&self, account: &AccountId) -> Result<Vec<LeadRecord>> {
        let account = account.clone();
        self.blocking(move |db| {
            let txn = db.begin_read().map_err(storage)?;
            let table = txn.open_table(LEADS).map_err(storage)?;
            let mut leads = Vec::new();
            for item in table.iter().map_err(storage)? {
                let (key, value) = item.map_err(storage)?;
                if key.value().0 == account.as_str() {
                    leads.push(serde_json::from_str(value.value())?);
                }
            }
            Ok(leads)
        })
        .await
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Database) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| Error::persistence_with_source("store task failed", e))?
    }
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl LeadPersister for RedbStore {
    async fn persist_lead(
        &self,
        account: &AccountId,
        contact: &Contact,
        phone: &str,
        address: &ChannelAddress,
    ) -> Result<LeadId> {
        let account = account.clone();
        let contact = contact.clone();
        let phone = phone.to_string();
        let address = address.clone();

        self.blocking(move |db| {
            let now = Utc::now();
            let txn = db.begin_write().map_err(storage)?;
            let id = {
                let mut table = txn.open_table(LEADS).map_err(storage)?;
                let key = (account.as_str(), phone.as_str());
                let existing = table
                    .get(key)
                    .map_err(storage)?
                    .map(|guard| guard.value().to_string());
                let record = match existing {
                    Some(json) => {
                        let mut record: LeadRecord = serde_json::from_str(&json)?;
                        record.refresh(&contact, &address, now);
                        record
                    }
                    None => LeadRecord::new(
                        LeadId::new(Uuid::new_v4().to_string()),
                        &account,
                        &contact,
                        &phone,
                        &address,
                        now,
                    ),
                };
                let json = serde_json::to_string(&record)?;
                table.insert(key, json.as_str()).map_err(storage)?;
                record.id
            };
            txn.commit().map_err(storage)?;
            tracing::debug!(account = %account, lead_id = %id, "Lead persisted");
            Ok(id)
        })
        .await
    }
}

#[async_trait]
impl RunLogger for RedbStore {
    async fn append(&self, entry: &OutcomeLogEntry) -> Result<()> {
        let json = serde_json::to_string(entry)?;
        let run = entry.run_id.to_string();
        let contact = entry.contact.id.to_string();
        self.blocking(move |db| {
            let txn = db.begin_write().map_err(storage)?;
            {
                let mut keys = txn.open_table(OUTCOME_KEYS).map_err(storage)?;
                let existing = keys
                    .get((run.as_str(), contact.as_str()))
                    .map_err(storage)?
                    .map(|guard| guard.value());
                let seq = match existing {
                    Some(seq) => {
                        tracing::warn!(
                            run_id = %run,
                            contact_id = %contact,
                            "Replacing outcome already logged for contact"
                        );
                        seq
                    }
                    None => {
                        let mut sequences = txn.open_table(SEQUENCES).map_err(storage)?;
                        let seq = sequences
                            .get(NEXT_OUTCOME)
                            .map_err(storage)?
                            .map(|guard| guard.value())
                            .unwrap_or(0);
                        sequences.insert(NEXT_OUTCOME, seq + 1).map_err(storage)?;
                        keys.insert((run.as_str(), contact.as_str()), seq)
                            .map_err(storage)?;
                        seq
                    }
                };
                let mut table = txn.open_table(OUTCOMES).map_err(storage)?;
                table
                    .insert((run.as_str(), seq), json.as_str())
                    .map_err(storage)?;
            }
            txn.commit().map_err(storage)?;
            Ok(())
        })
        .await
    }

    async fn entries(
        &self,
        account: &AccountId,
        run: Option<&RunId>,
    ) -> Result<Vec<OutcomeLogEntry>> {
        let account = account.clone();
        let run = run.map(RunId::to_string);
        self.blocking(move |db| {
            let txn = db.begin_read().map_err(storage)?;
            let table = txn.open_table(OUTCOMES).map_err(storage)?;
            let mut entries = Vec::new();
            match run {
                Some(run) => {
                    let range = (run.as_str(), 0u64)..=(run.as_str(), u64::MAX);
                    for item in table.range(range).map_err(storage)? {
                        let (_, value) = item.map_err(storage)?;
                        let entry: OutcomeLogEntry = serde_json::from_str(value.value())?;
                        if entry.account == account {
                            entries.push(entry);
                        }
                    }
                }
                None => {
                    let mut sequenced = Vec::new();
                    for item in table.iter().map_err(storage)? {
                        let (key, value) = item.map_err(storage)?;
                        let entry: OutcomeLogEntry = serde_json::from_str(value.value())?;
                        if entry.account == account {
                            sequenced.push((key.value().1, entry));
                        }
                    }
                    sequenced.sort_by_key(|(seq, _)| *seq);
                    entries.extend(sequenced.into_iter().map(|(_, entry)| entry));
                }
            }
            Ok(entries)
        })
        .await
    }
}

#[async_trait]
impl SendCounter for RedbStore {
    async fn count(&self, account: &AccountId, date: NaiveDate) -> Result<u32> {
        let account = account.clone();
        let day = date.to_string();
        self.blocking(move |db| {
            let txn = db.begin_read().map_err(storage)?;
            let table = txn.open_table(DAILY_COUNTS).map_err(storage)?;
            Ok(table
                .get((account.as_str(), day.as_str()))
                .map_err(storage)?
                .map(|guard| guard.value())
                .unwrap_or(0))
        })
        .await
    }

    async fn increment(&self, account: &AccountId, date: NaiveDate) -> Result<u32> {
        let account = account.clone();
        let day = date.to_string();
        self.blocking(move |db| {
            let txn = db.begin_write().map_err(storage)?;
            let count = {
                let mut table = txn.open_table(DAILY_COUNTS).map_err(storage)?;
                let key = (account.as_str(), day.as_str());
                let count = table
                    .get(key)
                    .map_err(storage)?
                    .map(|guard| guard.value())
                    .unwrap_or(0)
                    + 1;
                table.insert(key, count).map_err(storage)?;
                count
            };
            txn.commit().map_err(storage)?;
            Ok(count)
        })
        .await
    }
}
