use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use super::types::Baseline;
use crate::logic::errors::SnapshotError;

/// Save baselines to disk as a flat `metric -> record` document
pub fn save_snapshot(baselines: &BTreeMap<String, Baseline>, path: &Path) -> Result<(), SnapshotError> {
    // Ensure directory exists
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let json = serde_json::to_vec_pretty(baselines)?;
    fs::write(path, json)?;
    Ok(())
}

/// Load baselines from disk.
///
/// A missing file is the normal "no baseline yet" state and yields `Ok(None)`.
pub fn load_snapshot(path: &Path) -> Result<Option<BTreeMap<String, Baseline>>, SnapshotError> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut baselines: BTreeMap<String, Baseline> = serde_json::from_slice(&data)?;
    for (metric, baseline) in baselines.iter_mut() {
        baseline.metric = metric.clone();
    }

    Ok(Some(baselines))
}
