//! Handlers for `serve`, `run` and `history`.

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use outreach_api::AppState;
use outreach_core::{
    AccountId, CampaignConfig, CampaignState, OutcomeLogEntry, PendingPolicy, RunId,
};
use outreach_runner::{Campaign, CampaignRegistry, Collaborators};
use tokio::net::TcpListener;

use crate::config::OutreachConfig;

/// Resolves once Ctrl-C is pressed.
pub async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

// ============================================================================
// serve
// ============================================================================

/// Serves the control surface until `shutdown` resolves.
pub async fn cmd_serve<F>(
    config: &OutreachConfig,
    deps: Collaborators,
    bind: Option<String>,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let registry = Arc::new(CampaignRegistry::new(deps));
    let state = AppState::new(
        registry,
        config.default_account(),
        config.campaign.defaults(),
    );
    let addr = bind.unwrap_or_else(|| config.server.bind.clone());
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    outreach_api::serve(listener, state, shutdown).await?;
    Ok(())
}

// ============================================================================
// run
// ============================================================================

/// Runs one campaign to the end, requesting a stop when `interrupt`
/// resolves. Returns the final state.
pub async fn cmd_run<F>(
    config: &OutreachConfig,
    deps: Collaborators,
    account: AccountId,
    category: &str,
    locality: &str,
    discard_pending: bool,
    interrupt: F,
) -> Result<CampaignState>
where
    F: Future<Output = ()>,
{
    let campaign = Campaign::new(account, deps);
    let campaign_config = CampaignConfig::new(category, locality, config.campaign.message.clone())
        .with_policy(config.campaign.policy());
    let on_pending = if discard_pending {
        PendingPolicy::Discard
    } else {
        config.campaign.on_pending
    };

    let run_id = campaign.start(campaign_config, on_pending).await?;
    let discovered = campaign.status().discovered;
    println!("Run {run_id} started with {discovered} contacts (Ctrl-C stops after the current one)");

    follow(&campaign, interrupt).await;
    Ok(campaign.wait().await)
}

/// Logs progress until the loop exits.
async fn follow<F>(campaign: &Campaign, interrupt: F)
where
    F: Future<Output = ()>,
{
    let mut updates = campaign.subscribe();
    let mut last_processed = None;
    let mut interrupted = false;
    tokio::pin!(interrupt);

    loop {
        let state = updates.borrow_and_update().state.clone();
        if last_processed != Some(state.processed) {
            last_processed = Some(state.processed);
            tracing::info!(
                processed = state.processed,
                discovered = state.discovered,
                sent = state.sent,
                daily_count = state.daily_count,
                daily_cap = state.daily_cap,
                "Progress"
            );
        }
        if !state.running {
            return;
        }

        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    return;
                }
            }
            () = &mut interrupt, if !interrupted => {
                interrupted = true;
                eprintln!("Stopping after the current contact...");
                campaign.stop();
            }
        }
    }
}

/// One-paragraph summary of a finished run.
pub fn summary(state: &CampaignState) -> String {
    let run = state
        .run_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "-".to_string());
    let halt = state
        .halt_reason
        .map(|r| r.to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "Run {run} {phase} ({halt})\n  \
         discovered {discovered}, processed {processed}, remaining {remaining}\n  \
         valid {validated}, invalid {invalid}, sent {sent}, errors {errored}\n  \
         sent today {daily_count}/{daily_cap}",
        phase = state.phase,
        discovered = state.discovered,
        processed = state.processed,
        remaining = state.remaining(),
        validated = state.validated,
        invalid = state.invalid,
        sent = state.sent,
        errored = state.errored,
        daily_count = state.daily_count,
        daily_cap = state.daily_cap,
    )
}

// ============================================================================
// history
// ============================================================================

/// Reads the outcome log of `account`, optionally narrowed to one run.
pub async fn cmd_history(
    deps: Collaborators,
    account: AccountId,
    run: Option<&str>,
) -> Result<Vec<OutcomeLogEntry>> {
    let run_id = run
        .map(|r| r.parse::<RunId>())
        .transpose()
        .context("Invalid run id")?;
    let campaign = Campaign::new(account, deps);
    Ok(campaign.history(run_id.as_ref()).await?)
}

/// Renders log entries, one line each.
pub fn format_history(entries: &[OutcomeLogEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        let line = format!(
            "{at}  {run}  {id:<12} {status:<18} {name}{error}\n",
            at = entry.recorded_at.format("%Y-%m-%d %H:%M:%S"),
            run = entry.run_id,
            id = entry.contact.id.as_str(),
            status = entry.status.as_str(),
            name = entry.contact.name,
            error = entry
                .error
                .as_deref()
                .map(|e| format!(" ({e})"))
                .unwrap_or_default(),
        );
        out.push_str(&line);
    }
    out
}
