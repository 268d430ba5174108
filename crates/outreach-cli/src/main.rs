#![forbid(unsafe_code)]

//! Outreach CLI
//!
//! Runs prospecting campaigns in the foreground, serves the HTTP control
//! surface, and reads the outcome log.

mod cli;
mod commands;
mod config;
mod config_handlers;
mod wiring;

use anyhow::Result;
use clap::Parser;
use outreach_core::AccountId;

use crate::cli::{Cli, Command};
use crate::config::OutreachConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Config { action } => config_handlers::handle_config_command(config_path, action),
        Command::Serve { bind } => {
            let config = OutreachConfig::load(config_path)?;
            let deps = wiring::collaborators(&config, cli.demo)?;
            commands::cmd_serve(&config, deps, bind, commands::ctrl_c()).await
        }
        Command::Run {
            category,
            locality,
            account,
            discard_pending,
        } => {
            let config = OutreachConfig::load(config_path)?;
            let deps = wiring::collaborators(&config, cli.demo)?;
            let account = account.map_or_else(|| config.default_account(), AccountId::new);
            let state = commands::cmd_run(
                &config,
                deps,
                account,
                &category,
                &locality,
                discard_pending,
                commands::ctrl_c(),
            )
            .await?;
            println!("{}", commands::summary(&state));
            Ok(())
        }
        Command::History { run, account, json } => {
            let config = OutreachConfig::load(config_path)?;
            let deps = wiring::collaborators(&config, cli.demo)?;
            let account = account.map_or_else(|| config.default_account(), AccountId::new);
            let entries = commands::cmd_history(deps, account, run.as_deref()).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else if entries.is_empty() {
                println!("No outcomes recorded");
            } else {
                print!("{}", commands::format_history(&entries));
            }
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose {
        "debug"
    } else {
        "info,outreach=debug"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| fallback.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}
