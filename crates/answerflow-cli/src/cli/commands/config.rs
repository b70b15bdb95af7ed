//! `answerflow config` subcommands.

use answerflow_core::config::{Config, paths};
use anyhow::{Context, Result};

pub fn path() {
    let path = paths::config_path();
    println!("{}", path.display());
    if !path.exists() {
        eprintln!("No config file yet; built-in defaults apply. Run `answerflow config init`.");
    }
}

pub fn init() -> Result<()> {
    let path = paths::config_path();
    Config::init(&path).with_context(|| format!("init config at {}", path.display()))?;
    println!("Created config at {}", path.display());
    Ok(())
}

/// Prints the settings `ask` would use, environment overrides included.
pub fn show(config: &Config) -> Result<()> {
    let effective = config.effective().context("resolve config")?;
    print!("{}", effective.to_toml()?);
    Ok(())
}
