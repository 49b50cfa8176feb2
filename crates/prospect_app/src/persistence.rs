use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use engine_logging::engine_info;
use prospect_core::JobSnapshot;
use prospect_engine::ResultStore;
use serde::{Deserialize, Serialize};

pub const SNAPSHOT_EXTENSION: &str = "ron";

/// What `prospect run` writes when a job ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedResult {
    /// RFC 3339, UTC.
    pub saved_at: String,
    pub snapshot: JobSnapshot,
}

pub fn store(dir: &Path) -> ResultStore {
    ResultStore::new(dir.to_path_buf(), SNAPSHOT_EXTENSION)
}

/// Saves under the server job id, or `job-<key>` when none was assigned.
pub fn save_snapshot(store: &ResultStore, snapshot: &JobSnapshot, job_key: u64) -> Result<PathBuf> {
    let name = snapshot
        .job_id
        .clone()
        .unwrap_or_else(|| format!("job-{job_key}"));
    let saved = SavedResult {
        saved_at: Utc::now().to_rfc3339(),
        snapshot: snapshot.clone(),
    };
    let content = ron::ser::to_string_pretty(&saved, ron::ser::PrettyConfig::new())
        .context("serializing result snapshot")?;
    let path = store
        .save(&name, &content)
        .with_context(|| format!("writing result snapshot to {}", store.dir().display()))?;
    engine_info!(
        "Saved {} records for {} to {:?}",
        snapshot.records.len(),
        name,
        path
    );
    Ok(path)
}

pub fn load_snapshot(path: &Path) -> Result<SavedResult> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    ron::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}
