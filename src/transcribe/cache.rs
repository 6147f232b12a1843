use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("transcript store I/O on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Keyed transcript persistence. This is memoization, not a validated
/// cache: entries never expire, and nothing checks whether the source
/// audio changed after an entry was written. A present key always wins.
pub trait TranscriptStore: Send + Sync {
    fn has(&self, key: &str) -> bool;
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn put(&self, key: &str, text: &str) -> Result<(), StoreError>;
}

/// One file per key under a directory: `<dir>/<key>.txt`. Presence of
/// the file is the existence check.
pub struct FsTranscriptStore {
    dir: PathBuf,
}

impl FsTranscriptStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.txt"))
    }
}

impl TranscriptStore for FsTranscriptStore {
    fn has(&self, key: &str) -> bool {
        self.entry_path(key).exists()
    }

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.entry_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(Some(text))
    }

    fn put(&self, key: &str, text: &str) -> Result<(), StoreError> {
        let path = self.entry_path(key);
        std::fs::write(&path, text).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })
    }
}
