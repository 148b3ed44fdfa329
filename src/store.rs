//! Document Stores
//!
//! Address → parsed document, fetched at most once. The converter only asks a
//! store for documents when a `$ref` leaves the document it is walking.

use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{json_kind, ConvertError, Result};

/// Source of schema documents by address
pub trait DocumentStore {
    /// Return the document at `address`, loading it on first use
    fn fetch(&mut self, address: &str) -> Result<Arc<Value>>;
}

/// A schema document must be an object or a boolean schema
fn check_document(address: &str, document: &Value) -> Result<()> {
    match document {
        Value::Object(_) | Value::Bool(_) => Ok(()),
        other => Err(ConvertError::InvalidDocument {
            address: address.to_string(),
            reason: format!("expected an object or boolean schema, found {}", json_kind(other)),
        }),
    }
}

// =============================================================================
// Memory Store
// =============================================================================

/// Documents held in memory, for tests and embedding
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    documents: HashMap<String, Arc<Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document under `address`
    pub fn insert(&mut self, address: impl Into<String>, document: Value) -> Result<()> {
        let address = address.into();
        check_document(&address, &document)?;
        self.documents.insert(address, Arc::new(document));
        Ok(())
    }
}

impl DocumentStore for MemoryStore {
    fn fetch(&mut self, address: &str) -> Result<Arc<Value>> {
        self.documents
            .get(address)
            .cloned()
            .ok_or_else(|| ConvertError::DocumentNotFound { address: address.to_string() })
    }
}

// =============================================================================
// File Store
// =============================================================================

/// Documents read from disk, relative to a base directory
#[derive(Debug)]
pub struct FileStore {
    base_dir: PathBuf,
    cache: BTreeMap<String, Arc<Value>>,
}

impl FileStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            cache: BTreeMap::new(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Load every `*.json` file under `dir` into the cache.
    ///
    /// Addresses are paths relative to the base directory with `/`
    /// separators. Returns the number of documents loaded.
    pub fn preload_dir(&mut self, dir: &Path) -> Result<usize> {
        let mut loaded = 0;

        for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            if !path.is_file() || path.extension().map(|e| e != "json").unwrap_or(true) {
                continue;
            }

            let relative = path.strip_prefix(&self.base_dir).unwrap_or(path);
            let address = relative
                .components()
                .filter(|c| !matches!(c, Component::CurDir))
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            if !self.cache.contains_key(&address) {
                self.load(&address, path)?;
                loaded += 1;
            }
        }

        Ok(loaded)
    }

    fn load(&mut self, address: &str, path: &Path) -> Result<Arc<Value>> {
        let content = fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConvertError::DocumentNotFound {
                address: address.to_string(),
            },
            _ => ConvertError::Io(e),
        })?;
        let document: Value = serde_json::from_str(&content).map_err(|e| ConvertError::InvalidDocument {
            address: address.to_string(),
            reason: e.to_string(),
        })?;
        check_document(address, &document)?;

        debug!(address, path = %path.display(), "loaded schema document");
        let document = Arc::new(document);
        self.cache.insert(address.to_string(), Arc::clone(&document));
        Ok(document)
    }

    /// Addresses loaded so far
    pub fn addresses(&self) -> impl Iterator<Item = &str> {
        self.cache.keys().map(String::as_str)
    }

    /// SHA-256 over every loaded document, in address order
    pub fn bundle_hash(&self) -> String {
        let mut hasher = Sha256::new();
        for (address, document) in &self.cache {
            hasher.update(address.as_bytes());
            hasher.update(document.to_string().as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }
}

impl DocumentStore for FileStore {
    fn fetch(&mut self, address: &str) -> Result<Arc<Value>> {
        if let Some(document) = self.cache.get(address) {
            return Ok(Arc::clone(document));
        }
        let path = if Path::new(address).is_absolute() {
            PathBuf::from(address)
        } else {
            self.base_dir.join(address)
        };
        self.load(address, &path)
    }
}
