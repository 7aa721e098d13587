//! Traits describing storage capabilities and the shared error type.

use std::error::Error as StdError;

use async_trait::async_trait;

use crate::model::{Category, CategoryId, NewPoint, Point, PointFilter, PointId, PointMatch};

/// Boxed error produced by a storage backend.
pub type StorageError = Box<dyn StdError + Send + Sync + 'static>;

#[derive(thiserror::Error, Debug)]
/// Errors surfaced by the query and registration engines.
pub enum PointError {
    /// Filter or submission carried a malformed state code.
    #[error("Invalid criteria: {0}")]
    InvalidCriteria(String),
    /// A required submission field was empty or a coordinate was not finite.
    #[error("Invalid submission: {0}")]
    InvalidSubmission(String),
    /// Registration listed no categories.
    #[error("No category selected")]
    NoCategorySelected,
    /// Registration referenced a category missing from the catalog.
    #[error("Unknown category: {0}")]
    UnknownCategory(CategoryId),
    /// No point exists with the requested identifier.
    #[error("Point not found: {0}")]
    PointNotFound(PointId),
    /// Persistence layer failed; any open transaction has been rolled back.
    #[error("Storage failure: {0}")]
    StorageFailure(#[source] StorageError),
}

impl PointError {
    /// Wrap a backend error as [`PointError::StorageFailure`].
    pub fn storage<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::StorageFailure(Box::new(err))
    }
}

#[async_trait]
/// Read access to the category catalog.
pub trait CategoryCatalog: Send + Sync {
    /// Check whether a category id resolves in the catalog.
    ///
    /// # Errors
    ///
    /// Returns [`PointError::StorageFailure`] when the lookup fails.
    async fn exists(&self, id: CategoryId) -> Result<bool, PointError>;

    /// List every category in catalog order.
    ///
    /// # Errors
    ///
    /// Returns [`PointError::StorageFailure`] when the lookup fails.
    async fn all(&self) -> Result<Vec<Category>, PointError>;
}

#[async_trait]
/// Persistence of points and their category associations.
pub trait PointStore: Send + Sync {
    /// Run the association-to-point inner join under `filter`.
    ///
    /// One row is yielded per matching association, so a point offering several requested
    /// categories appears several times. Rows for the same point are adjacent.
    ///
    /// # Errors
    ///
    /// Returns [`PointError::StorageFailure`] when the query fails.
    async fn query(&self, filter: &PointFilter) -> Result<Vec<PointMatch>, PointError>;

    /// Insert a point and one association per category as a single transaction.
    ///
    /// Either the point and every association become visible, or nothing does.
    ///
    /// # Errors
    ///
    /// Returns [`PointError::NoCategorySelected`] for an empty `category_ids` and
    /// [`PointError::StorageFailure`] for any persistence fault.
    async fn insert(&self, point: &NewPoint, category_ids: &[CategoryId])
    -> Result<Point, PointError>;

    /// Fetch a point by id.
    ///
    /// # Errors
    ///
    /// Returns [`PointError::StorageFailure`] when the lookup fails.
    async fn get(&self, id: PointId) -> Result<Option<Point>, PointError>;

    /// List the categories associated with a point.
    ///
    /// # Errors
    ///
    /// Returns [`PointError::StorageFailure`] when the lookup fails.
    async fn categories_of(&self, id: PointId) -> Result<Vec<Category>, PointError>;
}
