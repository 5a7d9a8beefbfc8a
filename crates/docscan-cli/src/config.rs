//! Threshold configuration discovery
//!
//! The first file found wins: `--config PATH`, then `./.docscan.toml`, then
//! `~/.docscan.toml`. With none of them present the built-in defaults apply. Files are not
//! merged; sections a file leaves out take their defaults.

use anyhow::{Context, Result};
use colored::Colorize;
use docscan_layout::LayoutConfig;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = ".docscan.toml";

/// Effective configuration and the file it came from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadedConfig<'a> {
    pub layout: LayoutConfig,
    pub source: Option<&'a Path>,
}

/// Load configuration from file
pub fn load_from_file(path: &Path) -> Result<LayoutConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: LayoutConfig = toml::from_str(&content).map_err(|e| {
        eprintln!(
            "{} Failed to parse config file: {}",
            "Error:".red().bold(),
            path.display()
        );
        eprintln!("{} {}", "Parse error:".yellow().bold(), e);
        eprintln!();
        eprintln!("{} Configuration file syntax:", "Help:".cyan().bold());
        eprintln!("  [alignment]");
        eprintln!("  min_table_rows = 3");
        eprintln!("  [merge]");
        eprintln!("  overlap_threshold = 0.3");
        eprintln!();
        eprintln!("  Run `docscan config` to print every setting with its default");
        anyhow::anyhow!("Failed to parse config file: {e}")
    })?;

    config
        .validate()
        .with_context(|| format!("Rejected config file: {}", path.display()))?;
    Ok(config)
}

/// Candidate files in precedence order, excluding `--config`
pub fn discovered_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(CONFIG_FILE_NAME));
    }
    paths
}

/// Resolve the effective configuration
///
/// An explicit path must load. A discovered file that fails to load is reported and skipped.
pub fn resolve<'a>(explicit: Option<&'a Path>, discovered: &'a [PathBuf]) -> Result<LoadedConfig<'a>> {
    if let Some(path) = explicit {
        return Ok(LoadedConfig {
            layout: load_from_file(path)?,
            source: Some(path),
        });
    }

    for path in discovered.iter().filter(|p| p.exists()) {
        match load_from_file(path) {
            Ok(layout) => {
                log::debug!("Using config file {}", path.display());
                return Ok(LoadedConfig {
                    layout,
                    source: Some(path.as_path()),
                });
            }
            Err(e) => {
                eprintln!(
                    "{} Failed to load config from {}: {:#}",
                    "Warning:".yellow().bold(),
                    path.display(),
                    e
                );
            }
        }
    }

    Ok(LoadedConfig {
        layout: LayoutConfig::default(),
        source: None,
    })
}
