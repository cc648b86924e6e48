//! Script discovery: scanning the configured directory for runnable files.

use scriptman_common::{ScriptDescriptor, ScriptError, ScriptResult};
use std::path::Path;
use tracing::debug;

/// File extension a runnable script must carry.
const SCRIPT_EXTENSION: &str = "py";

/// Scan `dir` for script files and return their descriptors, name-sorted.
///
/// A missing directory is treated as an empty one so a manager can start
/// before any script has been deployed.
pub async fn discover_scripts(dir: &Path) -> ScriptResult<Vec<ScriptDescriptor>> {
    if !dir.exists() {
        debug!("Scripts directory {} does not exist", dir.display());
        return Ok(Vec::new());
    }

    let mut entries = tokio::fs::read_dir(dir).await.map_err(|e| {
        ScriptError::discovery(format!("Failed to read {}: {}", dir.display(), e))
    })?;

    let mut descriptors = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(|e| {
        ScriptError::discovery(format!("Failed to read {}: {}", dir.display(), e))
    })? {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if path.extension().and_then(|e| e.to_str()) != Some(SCRIPT_EXTENSION) {
            continue;
        }
        if let Some(descriptor) = ScriptDescriptor::from_path(&path) {
            descriptors.push(descriptor);
        }
    }

    descriptors.sort_by(|a, b| a.name.cmp(&b.name));
    debug!(
        "Discovered {} script(s) in {}",
        descriptors.len(),
        dir.display()
    );

    Ok(descriptors)
}
