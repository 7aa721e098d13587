//! High-level service facade combining the catalog and point ports.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::backend::StorageBackend;
use crate::model::{
    AssetBaseUrl, CategoryId, CategoryView, NewPoint, Point, PointCriteria, PointDetail,
    PointFilter, PointId, PointResult, PointSubmission, StateCode,
};
use crate::ports::PointError;

/// Public entry point for searching, showing, and registering collection points.
pub struct PointService {
    backend: StorageBackend,
    assets: AssetBaseUrl,
}

impl PointService {
    /// Create a new service bound to a storage backend and an asset base URL.
    #[must_use]
    pub fn new(backend: StorageBackend, assets: AssetBaseUrl) -> Self {
        Self { backend, assets }
    }

    /// List every catalog category with its icon URL.
    ///
    /// # Errors
    ///
    /// Returns [`PointError::StorageFailure`] if the catalog cannot be read.
    pub async fn categories(&self) -> Result<Vec<CategoryView>, PointError> {
        let categories = self.backend.catalog.all().await?;
        Ok(categories
            .into_iter()
            .map(|category| CategoryView {
                image_url: self.assets.resolve(&category.image_reference),
                id: category.id,
                name: category.name,
            })
            .collect())
    }

    /// Find categorised points matching the criteria, each point exactly once.
    ///
    /// Unknown category ids simply match nothing.
    ///
    /// # Errors
    ///
    /// Returns [`PointError::InvalidCriteria`] for a state that is not two characters, or
    /// [`PointError::StorageFailure`] if the query fails.
    pub async fn find(&self, criteria: PointCriteria) -> Result<Vec<PointResult>, PointError> {
        let filter = PointFilter {
            state: criteria.state.map(StateCode::parse).transpose()?,
            city: criteria.city,
            category_ids: dedup_ids(&criteria.category_ids),
        };

        let rows = self.backend.points.query(&filter).await?;
        let joined = rows.len();

        // The join yields one row per matching association; keep the first per point.
        let mut seen = HashSet::new();
        let results: Vec<PointResult> = rows
            .into_iter()
            .filter(|row| seen.insert(row.point.id))
            .map(|row| self.summarize(&row.point))
            .collect();

        debug!(
            joined,
            distinct = results.len(),
            state = ?filter.state,
            city = ?filter.city,
            categories = ?filter.category_ids,
            "point search finished"
        );
        Ok(results)
    }

    /// Register a point together with its categories.
    ///
    /// # Errors
    ///
    /// Returns [`PointError::NoCategorySelected`] for an empty category list,
    /// [`PointError::InvalidSubmission`] for an empty contact field or a non-finite coordinate,
    /// [`PointError::InvalidCriteria`] for a malformed state, [`PointError::UnknownCategory`]
    /// naming the first id missing from the catalog, or [`PointError::StorageFailure`] if the
    /// insert transaction fails and was rolled back.
    pub async fn create(&self, submission: PointSubmission) -> Result<PointResult, PointError> {
        let category_ids = dedup_ids(&submission.category_ids);
        if category_ids.is_empty() {
            return Err(PointError::NoCategorySelected);
        }

        for (field, value) in [
            ("name", &submission.name),
            ("email", &submission.email),
            ("whatsapp", &submission.whatsapp),
            ("city", &submission.city),
            ("image_reference", &submission.image_reference),
        ] {
            if value.trim().is_empty() {
                return Err(PointError::InvalidSubmission(format!("{field} must not be empty")));
            }
        }
        if !submission.latitude.is_finite() || !submission.longitude.is_finite() {
            return Err(PointError::InvalidSubmission(
                "coordinates must be finite numbers".to_owned(),
            ));
        }
        let state = StateCode::parse(submission.state)?;

        for id in &category_ids {
            if !self.backend.catalog.exists(*id).await? {
                return Err(PointError::UnknownCategory(*id));
            }
        }

        let new_point = NewPoint {
            name: submission.name,
            email: submission.email,
            whatsapp: submission.whatsapp,
            latitude: submission.latitude,
            longitude: submission.longitude,
            city: submission.city,
            state,
            image_reference: submission.image_reference,
        };
        let point = self.backend.points.insert(&new_point, &category_ids).await?;

        info!(
            point = %point.id,
            categories = category_ids.len(),
            city = %point.city,
            state = %point.state,
            "registered collection point"
        );
        Ok(self.summarize(&point))
    }

    /// Load a single point with the names of the categories it accepts.
    ///
    /// # Errors
    ///
    /// Returns [`PointError::PointNotFound`] for an unknown id or
    /// [`PointError::StorageFailure`] if a lookup fails.
    pub async fn show(&self, id: PointId) -> Result<PointDetail, PointError> {
        let point = self
            .backend
            .points
            .get(id)
            .await?
            .ok_or(PointError::PointNotFound(id))?;
        let categories = self.backend.points.categories_of(id).await?;

        Ok(PointDetail {
            summary: self.summarize(&point),
            email: point.email,
            whatsapp: point.whatsapp,
            city: point.city,
            state: point.state,
            categories: categories.into_iter().map(|category| category.name).collect(),
        })
    }

    fn summarize(&self, point: &Point) -> PointResult {
        PointResult {
            id: point.id,
            name: point.name.clone(),
            image_url: self.assets.resolve(&point.image_reference),
            latitude: point.latitude,
            longitude: point.longitude,
        }
    }
}

// Collapse repeated ids while keeping the caller's order.
fn dedup_ids(ids: &[CategoryId]) -> Vec<CategoryId> {
    let mut seen = HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}
