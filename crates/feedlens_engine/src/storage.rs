use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use feedlens_logging::lens_info;
use tempfile::NamedTempFile;

use crate::LabelSet;

/// Storage key holding the JSON-encoded label list.
pub const LABELS_KEY: &str = "labels";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("corrupt value for {key}: {message}")]
    Corrupt { key: String, message: String },
}

/// String key-value storage shared by the popup and the worker.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// All keys in one JSON object on disk, rewritten atomically on every `set`.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StorageError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(err) => return Err(err.into()),
        };
        serde_json::from_str(&content).map_err(|err| StorageError::Corrupt {
            key: self.path.display().to_string(),
            message: err.to_string(),
        })
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut values = self.read_all()?;
        values.insert(key.to_string(), value.to_string());
        let content =
            serde_json::to_string_pretty(&values).map_err(|err| StorageError::Corrupt {
                key: key.to_string(),
                message: err.to_string(),
            })?;
        replace_file(&self.path, &content)
    }
}

/// Stages `content` in a sibling temp file, then renames it over `path`.
fn replace_file(path: &Path, content: &str) -> Result<(), StorageError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;
    let mut staged = NamedTempFile::new_in(dir)?;
    staged.write_all(content.as_bytes())?;
    staged.as_file().sync_all()?;
    staged
        .persist(path)
        .map_err(|err| StorageError::Io(err.error))?;
    Ok(())
}

/// Typed access to the `labels` key.
#[derive(Clone)]
pub struct LabelStore {
    store: Arc<dyn KeyValueStore>,
}

impl LabelStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// A missing key means no labels are configured.
    pub fn load(&self) -> Result<LabelSet, StorageError> {
        match self.store.get(LABELS_KEY)? {
            None => Ok(LabelSet::default()),
            Some(raw) => serde_json::from_str(&raw).map_err(|err| StorageError::Corrupt {
                key: LABELS_KEY.to_string(),
                message: err.to_string(),
            }),
        }
    }

    pub fn save(&self, labels: &LabelSet) -> Result<(), StorageError> {
        let raw = serde_json::to_string(labels).map_err(|err| StorageError::Corrupt {
            key: LABELS_KEY.to_string(),
            message: err.to_string(),
        })?;
        self.store.set(LABELS_KEY, &raw)
    }

    /// Returns false when the label is blank or already present.
    pub fn add(&self, label: &str) -> Result<bool, StorageError> {
        let mut labels = self.load()?;
        if !labels.insert(label.to_string()) {
            return Ok(false);
        }
        self.save(&labels)?;
        lens_info!("Label added: {}", label.trim());
        Ok(true)
    }

    pub fn remove(&self, label: &str) -> Result<bool, StorageError> {
        let mut labels = self.load()?;
        if !labels.remove(label) {
            return Ok(false);
        }
        self.save(&labels)?;
        lens_info!("Label removed: {label}");
        Ok(true)
    }
}
