//! Command-line arguments.

use clap::{Parser, Subcommand};

use crate::config::CONFIG_ENV;

/// Outreach campaign runner
#[derive(Parser, Debug)]
#[command(name = "outreach", author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = CONFIG_ENV)]
    pub config: Option<String>,

    /// Use scripted in-memory collaborators instead of the remote services
    #[arg(long, global = true)]
    pub demo: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the HTTP control surface until Ctrl-C
    Serve {
        /// Listen address, overriding `server.bind`
        #[arg(long)]
        bind: Option<String>,
    },

    /// Run one campaign in the foreground
    Run {
        /// Business category to prospect
        #[arg(long)]
        category: String,

        /// Locality to search in
        #[arg(long)]
        locality: String,

        /// Account to run as, overriding `server.default_account`
        #[arg(long)]
        account: Option<String>,

        /// Drop contacts a previous run left unfinished
        #[arg(long)]
        discard_pending: bool,
    },

    /// Print the outcome log
    History {
        /// Only entries of this run
        #[arg(long)]
        run: Option<String>,

        /// Account to read, overriding `server.default_account`
        #[arg(long)]
        account: Option<String>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Configuration file management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write a default configuration file
    Init {
        /// Destination, defaults to the resolved config path
        #[arg(long)]
        file: Option<String>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the resolved configuration
    Show,

    /// Print the resolved config file path
    Path,
}
