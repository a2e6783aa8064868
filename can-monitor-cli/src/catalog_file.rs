//! Catalog and frame replay file loading
//!
//! The textual DBC format is parsed upstream; this loader reads the
//! pre-parsed catalog as a JSON array of message layouts. Frame replay
//! files are JSON lines, one `RawFrame` per line.

use anyhow::{Context, Result};
use can_monitor_core::{Catalog, MessageLayout, RawFrame, ReplaySource};
use std::fs;
use std::path::Path;

/// Load a pre-parsed catalog from a JSON file
///
/// The catalog source identifier (used for discovery filenames) is the
/// file stem.
pub fn load_catalog(path: &Path) -> Result<Catalog> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read catalog file: {:?}", path))?;
    let layouts: Vec<MessageLayout> = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse catalog file: {:?}", path))?;

    let source = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("catalog")
        .to_string();

    let catalog = Catalog::new(source, layouts)
        .with_context(|| format!("invalid catalog: {:?}", path))?;
    log::info!(
        "loaded {} messages from {:?}",
        catalog.stats().num_messages,
        path
    );
    Ok(catalog)
}

/// Load a frame replay file (JSON lines) into a replay source
pub fn load_frames(path: &Path) -> Result<ReplaySource> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read frame file: {:?}", path))?;

    let mut frames = Vec::new();
    for (lineno, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let frame: RawFrame = serde_json::from_str(line)
            .with_context(|| format!("bad frame at {:?}:{}", path, lineno + 1))?;
        frames.push(frame);
    }

    log::info!("loaded {} frames from {:?}", frames.len(), path);
    Ok(ReplaySource::new(frames))
}
