//! Namespaced key/value storage.
//!
//! Two scopes share one API:
//! - **durable**: a JSON document on disk, loaded once at open and rewritten
//!   atomically on every mutation;
//! - **session**: in-memory, gone when the process exits.
//!
//! Every key is stored as `<namespace>:<key>`, so several applications can
//! share one document and [`Scope::clear`] only touches its own keys.
//! Durability is best effort: an unreadable or corrupt document is logged
//! and treated as empty.

mod atomic;

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use courier_types::StorageSettings;

/// File name of the durable document inside the storage directory.
pub const STORAGE_FILE: &str = "storage.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage value for '{key}' cannot be serialized: {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode storage document: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to write storage file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

enum Backend {
    Memory,
    File(PathBuf),
}

struct ScopeInner {
    label: &'static str,
    prefix: String,
    backend: Backend,
    entries: RefCell<BTreeMap<String, Value>>,
}

impl ScopeInner {
    fn full_key(&self, key: &str) -> String {
        format!("{}{key}", self.prefix)
    }

    fn persist(&self) -> Result<(), StoreError> {
        let Backend::File(path) = &self.backend else {
            return Ok(());
        };
        let bytes = serde_json::to_vec_pretty(&*self.entries.borrow()).map_err(StoreError::Encode)?;
        atomic::atomic_write(path, &bytes).map_err(|source| StoreError::Write {
            path: path.clone(),
            source,
        })
    }

    /// Apply `mutate`, write through and roll back the in-memory document if
    /// the write fails.
    fn commit<R>(
        &self,
        mutate: impl FnOnce(&mut BTreeMap<String, Value>) -> R,
    ) -> Result<R, StoreError> {
        let snapshot = match self.backend {
            Backend::File(_) => Some(self.entries.borrow().clone()),
            Backend::Memory => None,
        };
        let result = mutate(&mut self.entries.borrow_mut());
        if let Err(e) = self.persist() {
            if let Some(snapshot) = snapshot {
                *self.entries.borrow_mut() = snapshot;
            }
            tracing::warn!(scope = self.label, "Storage write failed: {e}");
            return Err(e);
        }
        Ok(result)
    }
}

/// One storage scope. Cheap to clone; clones share entries.
#[derive(Clone)]
pub struct Scope {
    inner: Rc<ScopeInner>,
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = match &self.inner.backend {
            Backend::File(path) => Some(path.as_path()),
            Backend::Memory => None,
        };
        f.debug_struct("Scope")
            .field("label", &self.inner.label)
            .field("prefix", &self.inner.prefix)
            .field("path", &path)
            .field("entries", &self.inner.entries.borrow().len())
            .finish()
    }
}

impl Scope {
    fn new(
        label: &'static str,
        namespace: &str,
        backend: Backend,
        entries: BTreeMap<String, Value>,
    ) -> Self {
        Self {
            inner: Rc::new(ScopeInner {
                label,
                prefix: format!("{namespace}:"),
                backend,
                entries: RefCell::new(entries),
            }),
        }
    }

    /// Typed read. Entries that do not decode into `T` are logged and
    /// reported as absent.
    #[must_use]
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get_value(key)?;
        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                tracing::warn!(
                    scope = self.inner.label,
                    key,
                    "Stored value has unexpected shape: {e}"
                );
                None
            }
        }
    }

    #[must_use]
    pub fn get_value(&self, key: &str) -> Option<Value> {
        self.inner.entries.borrow().get(&self.inner.full_key(key)).cloned()
    }

    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let value = serde_json::to_value(value).map_err(|source| StoreError::Serialize {
            key: key.to_string(),
            source,
        })?;
        self.set_value(key, value)
    }

    pub fn set_value(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let full_key = self.inner.full_key(key);
        if self.inner.entries.borrow().get(&full_key) == Some(&value) {
            return Ok(());
        }
        self.inner.commit(|entries| {
            entries.insert(full_key, value);
        })
    }

    /// Returns whether the key existed.
    pub fn remove(&self, key: &str) -> Result<bool, StoreError> {
        let full_key = self.inner.full_key(key);
        if !self.inner.entries.borrow().contains_key(&full_key) {
            return Ok(false);
        }
        self.inner.commit(|entries| entries.remove(&full_key).is_some())
    }

    /// Drop every key in this namespace. Keys of other namespaces sharing
    /// the document are kept. Returns how many were removed.
    pub fn clear(&self) -> Result<usize, StoreError> {
        let prefix = self.inner.prefix.clone();
        let owned = self
            .inner
            .entries
            .borrow()
            .keys()
            .filter(|key| key.starts_with(&prefix))
            .count();
        if owned == 0 {
            return Ok(0);
        }
        self.inner.commit(|entries| {
            entries.retain(|key, _| !key.starts_with(&prefix));
            owned
        })
    }

    /// Keys in this namespace, prefix stripped, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.inner
            .entries
            .borrow()
            .keys()
            .filter_map(|key| key.strip_prefix(&self.inner.prefix))
            .map(str::to_string)
            .collect()
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match &self.inner.backend {
            Backend::File(path) => Some(path),
            Backend::Memory => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PersistentStore {
    durable: Scope,
    session: Scope,
}

impl PersistentStore {
    /// Open storage as configured. With no directory the durable scope is
    /// in-memory as well.
    #[must_use]
    pub fn open(settings: &StorageSettings) -> Self {
        match &settings.dir {
            Some(dir) => Self::open_in(dir, &settings.namespace),
            None => Self::in_memory(&settings.namespace),
        }
    }

    /// Durable scope backed by `<dir>/storage.json`.
    #[must_use]
    pub fn open_in(dir: &Path, namespace: &str) -> Self {
        let path = dir.join(STORAGE_FILE);
        let entries = load_document(&path);
        tracing::info!(path = %path.display(), entries = entries.len(), "Storage opened");
        Self {
            durable: Scope::new("durable", namespace, Backend::File(path), entries),
            session: Scope::new("session", namespace, Backend::Memory, BTreeMap::new()),
        }
    }

    #[must_use]
    pub fn in_memory(namespace: &str) -> Self {
        Self {
            durable: Scope::new("durable", namespace, Backend::Memory, BTreeMap::new()),
            session: Scope::new("session", namespace, Backend::Memory, BTreeMap::new()),
        }
    }

    #[must_use]
    pub fn durable(&self) -> &Scope {
        &self.durable
    }

    #[must_use]
    pub fn session(&self) -> &Scope {
        &self.session
    }
}

fn load_document(path: &Path) -> BTreeMap<String, Value> {
    atomic::recover_bak_file(path);
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return BTreeMap::new(),
        Err(e) => {
            tracing::warn!(path = %path.display(), "Storage file unreadable, starting empty: {e}");
            return BTreeMap::new();
        }
    };
    if raw.trim().is_empty() {
        return BTreeMap::new();
    }
    match serde_json::from_str(&raw) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(path = %path.display(), "Storage file is corrupt, starting empty: {e}");
            BTreeMap::new()
        }
    }
}
