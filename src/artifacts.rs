//! Screenshot persistence under the run's output directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use action_strategies::ArtifactStore;
use gamecheck_core_types::QaError;
use serde::Serialize;
use tracing::debug;

/// One saved screenshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactEntry {
    pub label: String,
    pub path: PathBuf,
    pub bytes: usize,
}

/// Writes `NNN-<label>.png` files into a single directory, numbered in
/// capture order.
pub struct FileArtifactStore {
    dir: PathBuf,
    entries: Mutex<Vec<ArtifactEntry>>,
}

impl FileArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, QaError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|err| {
            QaError::Unknown(format!("creating {}: {err}", dir.display()))
        })?;
        Ok(Self {
            dir,
            entries: Mutex::new(Vec::new()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Saved screenshots in capture order.
    pub fn entries(&self) -> Vec<ArtifactEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }
}

impl ArtifactStore for FileArtifactStore {
    fn save_screenshot(&self, label: &str, bytes: &[u8]) -> Result<PathBuf, QaError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| QaError::Unknown("artifact manifest lock poisoned".to_string()))?;
        let file_name = format!("{:03}-{}.png", entries.len() + 1, file_stem(label));
        let path = self.dir.join(file_name);
        fs::write(&path, bytes)
            .map_err(|err| QaError::Unknown(format!("writing {}: {err}", path.display())))?;
        debug!(path = %path.display(), bytes = bytes.len(), "Saved screenshot");
        entries.push(ArtifactEntry {
            label: label.to_string(),
            path: path.clone(),
            bytes: bytes.len(),
        });
        Ok(path)
    }
}

fn file_stem(label: &str) -> String {
    let stem: String = label
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        "screenshot".to_string()
    } else {
        stem
    }
}
