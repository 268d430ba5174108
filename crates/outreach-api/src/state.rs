//! Shared handler state.

use std::sync::Arc;

use axum::http::HeaderMap;
use outreach_core::{AccountId, PendingPolicy, RatePolicy};
use outreach_runner::{Campaign, CampaignRegistry};

/// Header selecting the account a request acts on.
pub const ACCOUNT_HEADER: &str = "x-account-id";

/// Server-side campaign settings; clients only choose what to prospect.
#[derive(Debug, Clone)]
pub struct CampaignDefaults {
    /// Message template sent to every reachable contact
    pub message: String,
    /// Throttle and quota policy
    pub policy: RatePolicy,
    /// What `start` does with leftovers when the request does not say
    pub on_pending: PendingPolicy,
}

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    registry: Arc<CampaignRegistry>,
    default_account: AccountId,
    defaults: Arc<CampaignDefaults>,
}

impl AppState {
    /// Creates the handler state.
    pub fn new(
        registry: Arc<CampaignRegistry>,
        default_account: AccountId,
        defaults: CampaignDefaults,
    ) -> Self {
        Self {
            registry,
            default_account,
            defaults: Arc::new(defaults),
        }
    }

    /// Campaign registry.
    pub fn registry(&self) -> &Arc<CampaignRegistry> {
        &self.registry
    }

    /// Campaign settings.
    pub fn defaults(&self) -> &CampaignDefaults {
        &self.defaults
    }

    /// Account named by the request header, or the default account.
    pub fn account(&self, headers: &HeaderMap) -> AccountId {
        headers
            .get(ACCOUNT_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(AccountId::new)
            .unwrap_or_else(|| self.default_account.clone())
    }

    /// Campaign of the account the request acts on.
    pub async fn campaign(&self, headers: &HeaderMap) -> Arc<Campaign> {
        self.registry.campaign(&self.account(headers)).await
    }
}
