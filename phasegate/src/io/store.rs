//! Namespaced key/value state shared across hook invocations.
//!
//! The persisted layout is one JSON object keyed by namespace, then by key:
//!
//! ```json
//! { "implement_flow": { "is_active": true, "current_phase": "plan" } }
//! ```
//!
//! A store that cannot be read or parsed, or that fails the shape check, is
//! treated as empty ([`ON_CORRUPTION`]). The next write replaces it with a
//! well-formed document.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result, anyhow};
use fs2::FileExt;
use jsonschema::validator_for;
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use crate::core::types::FailurePolicy;

/// Keys and values of one namespace.
pub type Namespace = Map<String, Value>;

type Document = BTreeMap<String, Namespace>;

/// Unreadable persisted state reads as an empty store.
pub const ON_CORRUPTION: FailurePolicy = FailurePolicy::FailEmpty;

const STORE_SCHEMA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/schemas/state_store.schema.json"
));

/// Durable namespaced key/value store.
///
/// `update` runs its closure on the whole namespace inside one exclusive
/// section, so a read-modify-write cannot interleave with another writer.
pub trait StateStore {
    /// Snapshot of one namespace. Never fails: missing or corrupt data is empty.
    fn load_namespace(&self, namespace: &str) -> Namespace;

    fn update<T>(&self, namespace: &str, f: impl FnOnce(&mut Namespace) -> T) -> Result<T>;

    fn get(&self, namespace: &str, key: &str) -> Option<Value> {
        self.load_namespace(namespace).get(key).cloned()
    }

    fn set(&self, namespace: &str, key: &str, value: Value) -> Result<()> {
        self.update(namespace, |ns| {
            ns.insert(key.to_string(), value);
        })
    }
}

/// In-process store backed by a map behind a mutex.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Document>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn load_namespace(&self, namespace: &str) -> Namespace {
        let doc = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        doc.get(namespace).cloned().unwrap_or_default()
    }

    fn update<T>(&self, namespace: &str, f: impl FnOnce(&mut Namespace) -> T) -> Result<T> {
        let mut doc = self
            .inner
            .lock()
            .map_err(|_| anyhow!("state store mutex poisoned"))?;
        Ok(f(doc.entry(namespace.to_string()).or_default()))
    }
}

/// JSON file store guarded by an advisory lock file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    lock_path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let lock_path = path.with_extension("lock");
        Self { path, lock_path }
    }

    fn read_document(&self) -> Document {
        match fs::read_to_string(&self.path) {
            Ok(contents) => parse_document(&contents).unwrap_or_else(|err| {
                warn!(path = %self.path.display(), policy = ?ON_CORRUPTION, err = %err, "state store unreadable, treating as empty");
                Document::new()
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "state store missing");
                Document::new()
            }
            Err(err) => {
                warn!(path = %self.path.display(), policy = ?ON_CORRUPTION, err = %err, "state store read failed, treating as empty");
                Document::new()
            }
        }
    }

    fn write_document(&self, doc: &Document) -> Result<()> {
        let mut buf = serde_json::to_string_pretty(doc).context("serialize state store")?;
        buf.push('\n');
        super::write_atomic(&self.path, &buf, "json.tmp")
    }

    fn lock(&self) -> Result<File> {
        if let Some(parent) = self.lock_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create directory {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&self.lock_path)
            .with_context(|| format!("open lock {}", self.lock_path.display()))?;
        file.lock_exclusive()
            .with_context(|| format!("lock {}", self.lock_path.display()))?;
        Ok(file)
    }
}

impl StateStore for FileStore {
    fn load_namespace(&self, namespace: &str) -> Namespace {
        self.read_document().remove(namespace).unwrap_or_default()
    }

    #[instrument(skip_all, fields(namespace = %namespace))]
    fn update<T>(&self, namespace: &str, f: impl FnOnce(&mut Namespace) -> T) -> Result<T> {
        let lock = self.lock()?;
        let mut doc = self.read_document();
        let out = f(doc.entry(namespace.to_string()).or_default());
        let result = self.write_document(&doc);
        // Unlock errors are harmless; the lock is released when the file closes.
        let _ = FileExt::unlock(&lock);
        result?;
        debug!(path = %self.path.display(), "state store written");
        Ok(out)
    }
}

/// Parse and shape-check a persisted document.
fn parse_document(contents: &str) -> Result<Document> {
    let value: Value = serde_json::from_str(contents).context("parse state store json")?;
    let schema: Value = serde_json::from_str(STORE_SCHEMA).context("parse state store schema")?;
    let validator = validator_for(&schema).map_err(|err| anyhow!("invalid schema: {err}"))?;
    if !validator.is_valid(&value) {
        let messages = validator
            .iter_errors(&value)
            .map(|err| err.to_string())
            .collect::<Vec<_>>();
        return Err(anyhow!(
            "state store schema validation failed: {}",
            messages.join("; ")
        ));
    }
    serde_json::from_value(value).context("deserialize state store")
}
