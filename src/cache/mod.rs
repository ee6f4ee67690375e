//! In-memory document cache
//!
//! Holds one [`CachedDocument`] per registered service. The set of keys is
//! fixed when the cache is built from the [`ServiceRegistry`]; entries are
//! only ever mutated in place, never added or removed.
//!
//! # Locking
//!
//! The key map itself is immutable, so it needs no lock. Each entry sits
//! behind its own `RwLock`:
//!
//! - readers take the entry's read lock only long enough to copy it out
//!   (documents are reference counted, so copying is cheap)
//! - [`DocumentCache::apply_refresh_result`] takes the write lock for the
//!   three-field update, so readers see either the whole previous state or
//!   the whole new one
//!
//! Network I/O never happens while a lock is held.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::fetcher::Document;
use crate::registry::{ServiceDescriptor, ServiceRegistry};

// ============================================================================
// Errors
// ============================================================================

/// Errors returned by cache lookups
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// The name is not a registered service
    #[error("service {0} not found")]
    NotFound(String),

    /// The service is known but no document was ever fetched successfully
    #[error("swagger doc not available for {0}")]
    NotReady(String),
}

// ============================================================================
// Cached Document
// ============================================================================

/// Current cached state of one backend service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedDocument {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub status: String,
    pub owner: String,
    pub tags: Vec<String>,
    pub base_url: String,
    pub doc_url: String,

    /// Outcome of the most recent health check
    pub healthy: bool,

    /// Time of the most recent refresh attempt, successful or not
    pub last_updated: Option<DateTime<Utc>>,

    /// Last successfully fetched document
    #[serde(rename = "swagger_doc", skip_serializing_if = "Option::is_none", default)]
    pub document: Option<Arc<Document>>,
}

impl CachedDocument {
    /// Create an uninitialized entry for a descriptor
    pub fn from_descriptor(descriptor: &ServiceDescriptor) -> Self {
        let display_name = if descriptor.display_name.is_empty() {
            descriptor.name.clone()
        } else {
            descriptor.display_name.clone()
        };

        Self {
            name: descriptor.name.clone(),
            display_name,
            description: descriptor.description.clone(),
            status: descriptor.status.clone(),
            owner: descriptor.owner.clone(),
            tags: descriptor.tags.clone(),
            base_url: descriptor.base_url.clone(),
            doc_url: descriptor.doc_url(),
            healthy: false,
            last_updated: None,
            document: None,
        }
    }

    pub fn has_document(&self) -> bool {
        self.document.is_some()
    }

    /// Summary view without the document payload
    pub fn summary(&self) -> ServiceSummary {
        ServiceSummary {
            name: self.name.clone(),
            display_name: self.display_name.clone(),
            description: self.description.clone(),
            status: self.status.clone(),
            owner: self.owner.clone(),
            tags: self.tags.clone(),
            base_url: self.base_url.clone(),
            doc_url: self.doc_url.clone(),
            healthy: self.healthy,
            last_updated: self.last_updated,
        }
    }

    fn apply(&mut self, outcome: RefreshOutcome) {
        self.healthy = outcome.healthy;
        self.last_updated = Some(outcome.timestamp);
        if let Some(document) = outcome.document {
            self.document = Some(Arc::new(document));
        }
    }
}

/// Catalog entry: identity and status fields only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSummary {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub status: String,
    pub owner: String,
    pub tags: Vec<String>,
    pub base_url: String,
    pub doc_url: String,
    pub healthy: bool,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Result of one refresh attempt for one service
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub healthy: bool,

    /// `None` keeps the previously cached document
    pub document: Option<Document>,

    pub timestamp: DateTime<Utc>,
}

impl RefreshOutcome {
    /// Outcome of an attempt whose document fetch succeeded
    pub fn fetched(healthy: bool, document: Document) -> Self {
        Self {
            healthy,
            document: Some(document),
            timestamp: Utc::now(),
        }
    }

    /// Outcome of an attempt whose document fetch failed
    pub fn unchanged(healthy: bool) -> Self {
        Self {
            healthy,
            document: None,
            timestamp: Utc::now(),
        }
    }
}

/// Aggregate counts over all entries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub total: usize,
    pub healthy: usize,
    pub with_document: usize,
}

// ============================================================================
// Document Cache
// ============================================================================

/// Per-service document cache shared between readers and the refresh engine
#[derive(Debug)]
pub struct DocumentCache {
    entries: HashMap<String, RwLock<CachedDocument>>,
    order: Vec<String>,
}

impl DocumentCache {
    /// Create one uninitialized entry per registered service
    pub fn new(registry: &ServiceRegistry) -> Self {
        let entries = registry
            .iter()
            .map(|d| (d.name.clone(), RwLock::new(CachedDocument::from_descriptor(d))))
            .collect();

        Self {
            entries,
            order: registry.names(),
        }
    }

    fn entry(&self, name: &str) -> Result<&RwLock<CachedDocument>, CacheError> {
        self.entries
            .get(name)
            .ok_or_else(|| CacheError::NotFound(name.to_string()))
    }

    /// Full record for one service, including the document
    pub async fn get(&self, name: &str) -> Result<CachedDocument, CacheError> {
        Ok(self.entry(name)?.read().await.clone())
    }

    /// Summaries of all services, without document payloads
    pub async fn get_catalog(&self) -> Vec<ServiceSummary> {
        let mut catalog = Vec::with_capacity(self.order.len());
        for name in &self.order {
            if let Some(entry) = self.entries.get(name) {
                catalog.push(entry.read().await.summary());
            }
        }
        catalog
    }

    /// The cached document for one service
    pub async fn get_document(&self, name: &str) -> Result<Arc<Document>, CacheError> {
        self.entry(name)?
            .read()
            .await
            .document
            .clone()
            .ok_or_else(|| CacheError::NotReady(name.to_string()))
    }

    /// Record a refresh attempt for one service
    ///
    /// `healthy` and `last_updated` are always overwritten; the document is
    /// replaced only when the outcome carries one.
    pub async fn apply_refresh_result(
        &self,
        name: &str,
        outcome: RefreshOutcome,
    ) -> Result<(), CacheError> {
        self.entry(name)?.write().await.apply(outcome);
        Ok(())
    }

    pub async fn stats(&self) -> CacheStats {
        let mut stats = CacheStats {
            total: self.entries.len(),
            ..Default::default()
        };
        for entry in self.entries.values() {
            let doc = entry.read().await;
            if doc.healthy {
                stats.healthy += 1;
            }
            if doc.has_document() {
                stats.with_document += 1;
            }
        }
        stats
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
