//! Handlers for the `config` subcommands.

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};

use crate::cli::ConfigAction;
use crate::config::{OutreachConfig, PROJECT_NAME};

/// Dispatches a config subcommand.
pub fn handle_config_command(config_path: Option<&str>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Init { file, force } => {
            let target = file.as_deref().or(config_path);
            let path = cmd_config_init(target, force)?;
            println!("Config file created at {}", path.display());
            Ok(())
        }
        ConfigAction::Show => {
            print!("{}", cmd_config_show(config_path)?);
            Ok(())
        }
        ConfigAction::Path => cmd_config_path(config_path),
    }
}

/// Writes the default configuration and returns where it went.
pub fn cmd_config_init(file: Option<&str>, force: bool) -> Result<PathBuf> {
    let path = OutreachConfig::resolve_config_path(file)
        .ok_or_else(|| anyhow!("Could not determine config directory"))?;

    if path.exists() && !force {
        bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let toml_str = OutreachConfig::default().to_toml_string()?;
    std::fs::write(&path, toml_str)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// Renders the resolved configuration as TOML.
pub fn cmd_config_show(config_path: Option<&str>) -> Result<String> {
    OutreachConfig::load(config_path)?.to_toml_string()
}

/// Prints the resolved config file path.
pub fn cmd_config_path(config_path: Option<&str>) -> Result<()> {
    let path = OutreachConfig::resolve_config_path(config_path)
        .ok_or_else(|| anyhow!("Could not determine config directory for this platform"))?;
    println!("{}", path.display());
    if !path.exists() {
        eprintln!("(file does not exist, run `{PROJECT_NAME} config init` to create it)");
    }
    Ok(())
}
