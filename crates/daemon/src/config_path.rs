//! Locating the daemon's configuration file.

use std::path::{Path, PathBuf};

/// Directory under the platform config dir that holds zotsync's config.
pub const CONFIG_DIR_NAME: &str = "zotsync";
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// `<platform config dir>/zotsync/config.toml`, whether or not it exists.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| config_path_in(&dir))
}

fn config_path_in(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME)
}

/// The config file to load: an explicit path always wins, otherwise the
/// default location if a file is there. `None` means run on defaults.
pub fn resolve_config_path(explicit: Option<PathBuf>) -> Option<PathBuf> {
    explicit.or_else(|| default_config_path().filter(|p| p.is_file()))
}
