//! # State Snapshots
//!
//! JSON persistence for the engine's durable state. The node loads a
//! snapshot at startup and writes one back on shutdown; between those two
//! points everything lives in memory.
//!
//! Writes go through a sibling temp file plus rename so a crash mid-write
//! never leaves a truncated snapshot behind.

use std::path::Path;

use anyhow::{Context, Result};
use hongbao_engine::EngineSnapshot;

/// Loads a snapshot from `path`, or `None` if the file does not exist yet.
pub fn load(path: &Path) -> Result<Option<EngineSnapshot>> {
    if !path.exists() {
        return Ok(None);
    }
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read state file {}", path.display()))?;
    let snapshot = serde_json::from_slice(&bytes)
        .with_context(|| format!("failed to parse state file {}", path.display()))?;
    Ok(Some(snapshot))
}

/// Writes `snapshot` to `path` atomically.
pub fn save(path: &Path, snapshot: &EngineSnapshot) -> Result<()> {
    let json = serde_json::to_vec_pretty(snapshot).context("failed to serialize state")?;

    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &json)
        .with_context(|| format!("failed to write temp state file {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("failed to move state file into place at {}", path.display()))?;

    Ok(())
}
