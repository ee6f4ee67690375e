//! Static service registry
//!
//! The registry is the ordered, immutable list of backend services whose
//! API documents are aggregated. It is built once from configuration and
//! shared read-only by the cache and the refresh coordinator.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

// ============================================================================
// Service Descriptor
// ============================================================================

/// Configuration record for one backend service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    /// Unique service key, used in URLs and as the cache key
    pub name: String,

    /// Human readable title
    #[serde(default)]
    pub display_name: String,

    /// Base URL of the backend, e.g. `http://orders:8080`
    pub base_url: String,

    /// Path of the OpenAPI/Swagger document relative to `base_url`
    #[serde(default = "default_doc_path")]
    pub doc_path: String,

    /// Path of the health endpoint relative to `base_url`
    #[serde(default = "default_health_path", rename = "health_check")]
    pub health_path: String,

    /// Declared lifecycle status (e.g. `stable`, `beta`)
    #[serde(default)]
    pub status: String,

    /// Owning team
    #[serde(default)]
    pub owner: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_doc_path() -> String {
    "/swagger.json".to_string()
}

fn default_health_path() -> String {
    "/health".to_string()
}

impl ServiceDescriptor {
    /// Create a descriptor with default paths and empty display metadata
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            base_url: base_url.into(),
            doc_path: default_doc_path(),
            health_path: default_health_path(),
            status: String::new(),
            owner: String::new(),
            description: String::new(),
            tags: Vec::new(),
        }
    }

    /// Set the document path
    pub fn with_doc_path(mut self, path: impl Into<String>) -> Self {
        self.doc_path = path.into();
        self
    }

    /// Set the health check path
    pub fn with_health_path(mut self, path: impl Into<String>) -> Self {
        self.health_path = path.into();
        self
    }

    /// Full URL of the health endpoint
    pub fn health_url(&self) -> String {
        join_url(&self.base_url, &self.health_path)
    }

    /// Full URL of the API document
    pub fn doc_url(&self) -> String {
        join_url(&self.base_url, &self.doc_path)
    }
}

/// Concatenate a base URL and a path, collapsing a doubled slash
fn join_url(base: &str, path: &str) -> String {
    if base.ends_with('/') && path.starts_with('/') {
        format!("{}{}", base.trim_end_matches('/'), path)
    } else {
        format!("{base}{path}")
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Errors raised while building the registry
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Two descriptors share the same name
    #[error("duplicate service name: {0}")]
    DuplicateService(String),

    /// A descriptor has a blank name
    #[error("service name must not be empty (base_url: {0})")]
    EmptyName(String),
}

/// Ordered set of service descriptors, indexed by name
#[derive(Debug, Clone, Default)]
pub struct ServiceRegistry {
    services: Vec<ServiceDescriptor>,
    index: HashMap<String, usize>,
}

impl ServiceRegistry {
    /// Build a registry, rejecting blank or duplicate names
    pub fn new(services: Vec<ServiceDescriptor>) -> Result<Self, RegistryError> {
        let mut index = HashMap::with_capacity(services.len());

        for (position, service) in services.iter().enumerate() {
            if service.name.trim().is_empty() {
                return Err(RegistryError::EmptyName(service.base_url.clone()));
            }
            if index.insert(service.name.clone(), position).is_some() {
                return Err(RegistryError::DuplicateService(service.name.clone()));
            }
        }

        Ok(Self { services, index })
    }

    /// Look up a descriptor by name
    pub fn get(&self, name: &str) -> Option<&ServiceDescriptor> {
        self.index.get(name).map(|&i| &self.services[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Iterate descriptors in configuration order
    pub fn iter(&self) -> impl Iterator<Item = &ServiceDescriptor> {
        self.services.iter()
    }

    /// Service names in configuration order
    pub fn names(&self) -> Vec<String> {
        self.services.iter().map(|s| s.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
