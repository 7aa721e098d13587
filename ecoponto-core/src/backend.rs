//! Bundle of ports making up a storage backend.

use std::sync::Arc;

use crate::ports::{CategoryCatalog, PointStore};

/// Collection of ports implementing storage for the engines.
#[derive(Clone)]
pub struct StorageBackend {
    /// Category catalog lookups.
    pub catalog: Arc<dyn CategoryCatalog>,
    /// Point and association persistence.
    pub points: Arc<dyn PointStore>,
}

impl StorageBackend {
    /// Build a backend from its two ports.
    #[must_use]
    pub fn new(catalog: Arc<dyn CategoryCatalog>, points: Arc<dyn PointStore>) -> Self {
        Self { catalog, points }
    }
}
