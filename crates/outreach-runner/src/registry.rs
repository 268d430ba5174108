//! Per-account campaign registry.

use std::collections::HashMap;
use std::sync::Arc;

use outreach_core::AccountId;
use tokio::sync::RwLock;

use crate::campaign::{Campaign, Collaborators};

/// Lazily creates and caches one [`Campaign`] per account.
///
/// Campaigns of different accounts are fully independent: each has its own
/// loop task, control flags and quota.
pub struct CampaignRegistry {
    deps: Collaborators,
    campaigns: RwLock<HashMap<AccountId, Arc<Campaign>>>,
}

impl CampaignRegistry {
    /// Creates an empty registry whose campaigns share `deps`.
    pub fn new(deps: Collaborators) -> Self {
        Self {
            deps,
            campaigns: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the campaign of `account`, creating it on first use.
    pub async fn campaign(&self, account: &AccountId) -> Arc<Campaign> {
        if let Some(existing) = self.campaigns.read().await.get(account) {
            return existing.clone();
        }
        let mut campaigns = self.campaigns.write().await;
        campaigns
            .entry(account.clone())
            .or_insert_with(|| {
                tracing::debug!(account = %account, "Creating campaign");
                Arc::new(Campaign::new(account.clone(), self.deps.clone()))
            })
            .clone()
    }

    /// Accounts with a campaign, sorted.
    pub async fn accounts(&self) -> Vec<AccountId> {
        let mut accounts: Vec<_> = self.campaigns.read().await.keys().cloned().collect();
        accounts.sort();
        accounts
    }

    /// Stops every campaign and waits for their loops to exit.
    pub async fn stop_all(&self) {
        let campaigns: Vec<_> = self.campaigns.read().await.values().cloned().collect();
        for campaign in campaigns {
            campaign.shutdown().await;
        }
    }
}
