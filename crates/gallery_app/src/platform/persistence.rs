use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use gallery_logging::{gallery_debug, gallery_info};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("store file {path:?} is not valid RON: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("failed to serialize store: {0}")]
    Serialize(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PersistedEntries {
    entries: BTreeMap<String, String>,
}

/// Durable key/value store for relayed frame messages, kept in one RON file.
#[derive(Debug, Clone)]
pub struct RelayStore {
    path: PathBuf,
}

impl RelayStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All stored entries; a missing file is an empty store.
    pub fn load(&self) -> Result<BTreeMap<String, String>, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        let persisted: PersistedEntries =
            ron::from_str(&content).map_err(|err| StoreError::Parse {
                path: self.path.clone(),
                message: err.to_string(),
            })?;
        gallery_debug!(
            "Loaded {} relay entries from {:?}",
            persisted.entries.len(),
            self.path
        );
        Ok(persisted.entries)
    }

    pub fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.load()?.remove(key))
    }

    /// Inserts or overwrites `key`, then rewrites the file atomically.
    pub fn insert(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.load()?;
        entries.insert(key.to_string(), value.to_string());
        self.save(entries)?;
        gallery_info!("Stored relay entry {} in {:?}", key, self.path);
        Ok(())
    }

    fn save(&self, entries: BTreeMap<String, String>) -> Result<(), StoreError> {
        let content =
            ron::ser::to_string_pretty(&PersistedEntries { entries }, ron::ser::PrettyConfig::new())
                .map_err(|err| StoreError::Serialize(err.to_string()))?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let io_err = |source: io::Error| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        fs::create_dir_all(&dir).map_err(io_err)?;
        let mut tmp = NamedTempFile::new_in(&dir).map_err(io_err)?;
        tmp.write_all(content.as_bytes()).map_err(io_err)?;
        tmp.flush().map_err(io_err)?;
        tmp.as_file_mut().sync_all().map_err(io_err)?;
        tmp.persist(&self.path).map_err(|err| io_err(err.error))?;
        Ok(())
    }
}
