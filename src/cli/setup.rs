use crate::core::config::AppConfig;
use anyhow::{Context, Result, bail};
use std::path::Path;
use tracing::info;

const EXAMPLE_CONFIG: &str = include_str!("../../docs/example_config.yaml");

/// Writes the example config to the platform config directory and tells the
/// user where it went, since logging is off by default.
pub fn setup() -> Result<()> {
    let path = AppConfig::default_config_path()?;
    setup_at_path(&path)?;
    eprintln!("Wrote sitefx configuration to {}", path.display());
    Ok(())
}

/// Writes the example config to `path`. Never overwrites an existing file.
pub fn setup_at_path<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    if path.exists() {
        bail!(
            "sitefx configuration already exists at {}, edit it or pass --config-path",
            path.display()
        );
    }

    let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(dir) = parent {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Could not create config directory {}", dir.display()))?;
    }

    std::fs::write(path, EXAMPLE_CONFIG)
        .with_context(|| format!("Could not write sitefx configuration to {}", path.display()))?;
    info!(path = %path.display(), "Example configuration written");
    Ok(())
}
