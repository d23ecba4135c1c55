//! Persisted storage behind one narrow contract.
//!
//! The merge engine and the pipeline depend only on [`FeedStorage`]. A
//! missing document is reported as a distinct `NotFound` so callers can
//! decide where an empty starting state is acceptable; any other I/O
//! failure propagates untouched.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::parser;
use crate::types::{AggregatorError, FeedDocument, Result};

#[async_trait]
pub trait FeedStorage: Send + Sync {
    /// Load and parse a persisted feed document.
    async fn read_document(&self, key: &str) -> Result<FeedDocument>;

    /// Replace the persisted feed document with `document`, as one full
    /// overwrite. The document is serialized completely before any byte
    /// reaches the destination.
    async fn write_document(&self, key: &str, document: &FeedDocument) -> Result<()>;

    /// Read a line-per-entry text list. A missing file is an empty list.
    async fn read_string_list(&self, key: &str) -> Result<Vec<String>>;
}

/// Local-filesystem storage rooted at a base directory.
pub struct LocalStorage {
    base_dir: PathBuf,
}

impl LocalStorage {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.base_dir.join(key)
    }
}

#[async_trait]
impl FeedStorage for LocalStorage {
    async fn read_document(&self, key: &str) -> Result<FeedDocument> {
        let path = self.path(key);
        debug!("reading feed document from {}", path.display());
        let xml = tokio::fs::read_to_string(&path).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                AggregatorError::NotFound {
                    key: key.to_string(),
                }
            } else {
                AggregatorError::Io(e)
            }
        })?;
        parser::parse_feed(&xml)
    }

    async fn write_document(&self, key: &str, document: &FeedDocument) -> Result<()> {
        let xml = parser::serialize_feed(document)?;
        let path = self.path(key);
        info!("writing {} KB to {}", xml.len() / 1024, path.display());
        // Stage into a sibling file so a failed write leaves the previous
        // document intact.
        let staging = path.with_extension("tmp");
        tokio::fs::write(&staging, xml.as_bytes()).await?;
        tokio::fs::rename(&staging, &path).await?;
        Ok(())
    }

    async fn read_string_list(&self, key: &str) -> Result<Vec<String>> {
        let path = self.path(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(text
                .lines()
                .map(|line| line.trim_end().to_string())
                .filter(|line| !line.is_empty())
                .collect()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("{} not found, returning an empty list", path.display());
                Ok(Vec::new())
            }
            Err(e) => Err(AggregatorError::Io(e)),
        }
    }
}

/// In-memory storage.
///
/// Documents round-trip through the same serializer and parser as the
/// filesystem adapter, so tests exercise the full persistence path.
#[derive(Default)]
pub struct MemoryStorage {
    documents: RwLock<HashMap<String, String>>,
    lists: RwLock<HashMap<String, Vec<String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_list(&self, key: &str, entries: Vec<String>) {
        self.lists.write().await.insert(key.to_string(), entries);
    }

    pub async fn insert_document(&self, key: &str, document: &FeedDocument) -> Result<()> {
        let xml = parser::serialize_feed(document)?;
        self.documents.write().await.insert(key.to_string(), xml);
        Ok(())
    }

    /// The exact serialized bytes last written under `key`.
    pub async fn raw_document(&self, key: &str) -> Option<String> {
        self.documents.read().await.get(key).cloned()
    }
}

#[async_trait]
impl FeedStorage for MemoryStorage {
    async fn read_document(&self, key: &str) -> Result<FeedDocument> {
        let documents = self.documents.read().await;
        match documents.get(key) {
            Some(xml) => parser::parse_feed(xml),
            None => Err(AggregatorError::NotFound {
                key: key.to_string(),
            }),
        }
    }

    async fn write_document(&self, key: &str, document: &FeedDocument) -> Result<()> {
        let xml = parser::serialize_feed(document)?;
        self.documents.write().await.insert(key.to_string(), xml);
        Ok(())
    }

    async fn read_string_list(&self, key: &str) -> Result<Vec<String>> {
        Ok(self
            .lists
            .read()
            .await
            .get(key)
            .cloned()
            .unwrap_or_default())
    }
}
