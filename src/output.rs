//! Output helpers for engine results.
//!
//! Supports debug logging, pretty JSON on stdout, and JSON files on disk.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt::Debug;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Logs a result using Rust's debug pretty-print format.
pub fn print_pretty(value: &impl Debug) {
    debug!("{:#?}", value);
}

/// Renders a result as pretty-printed JSON.
pub fn render_json(value: &impl Serialize) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Prints a result as pretty-printed JSON on stdout.
pub fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", render_json(value)?);
    Ok(())
}

/// Writes a result as pretty-printed JSON to `path`, creating parent
/// directories as needed. Existing files are replaced.
pub fn write_json(path: &str, value: &impl Serialize) -> Result<()> {
    if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create '{}'", parent.display()))?;
    }

    fs::write(path, render_json(value)?).with_context(|| format!("failed to write '{path}'"))?;
    info!(path, "JSON written");
    Ok(())
}
