//! Core domain types shared across the scriptman crates.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Static identity of a runnable script: a unique name and the file it
/// points at.
///
/// Descriptors are produced by scanning the configured scripts directory.
/// The name is derived from the file name (stem, without extension) and is
/// the key under which all runtime state for the script is tracked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptDescriptor {
    pub name: String,
    pub path: PathBuf,
}

impl ScriptDescriptor {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// Build a descriptor from a script file path, deriving the name from
    /// the file stem. Returns `None` for paths without a usable stem.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_stem()?.to_str()?.to_string();
        if name.is_empty() {
            return None;
        }
        Some(Self {
            name,
            path: path.to_path_buf(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_from_path() {
        let descriptor = ScriptDescriptor::from_path(Path::new("/srv/scripts/counter.py")).unwrap();
        assert_eq!(descriptor.name, "counter");
        assert_eq!(descriptor.path, PathBuf::from("/srv/scripts/counter.py"));
    }

    #[test]
    fn test_descriptor_from_path_without_stem() {
        assert!(ScriptDescriptor::from_path(Path::new("/")).is_none());
    }
}
