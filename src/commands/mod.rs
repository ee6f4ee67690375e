pub mod check;
pub mod refresh;
pub mod serve;

pub use check::check;
pub use refresh::refresh;
pub use serve::serve;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use docs_hub::config::{Config, LoggingConfig};

/// Logging settings for subscriber setup, read before the config is validated
///
/// A missing or broken file yields the defaults; the subcommand reports the
/// actual load error once logging is up.
pub fn logging_settings(explicit: Option<&Path>) -> LoggingConfig {
    let path = Config::resolve_path(explicit);
    let mut config = Config::from_file(&path).unwrap_or_default();
    config.apply_env_overrides();
    config.logging
}

/// Resolve and load the config file shared by every subcommand
fn load_config(explicit: Option<PathBuf>) -> Result<Config> {
    let path = Config::resolve_path(explicit.as_deref());
    Config::load(&path).with_context(|| format!("Failed to load config from {}", path.display()))
}
