pub mod menu;
pub mod resolve;
pub mod serve;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use lunchpoll_core::Config;
use tracing::info;

/// Loads `path`, or resolves `lunchpoll.toml` when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<(PathBuf, Config)> {
    let (path, config) = match path {
        Some(path) => {
            let config = Config::load(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            (path.to_path_buf(), config)
        }
        None => match Config::resolve().context("failed to load config")? {
            Some(found) => found,
            None => bail!(
                "no {} found; pass --config or set LUNCHPOLL_CONFIG_PATH",
                lunchpoll_core::CONFIG_FILE_NAME
            ),
        },
    };
    info!(path = %path.display(), "Loaded config");
    Ok((path, config))
}
