//! Domain data structures for categories, collection points, and search criteria.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ports::PointError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
/// Identifier of a material category in the catalog.
pub struct CategoryId(pub i64);

impl fmt::Display for CategoryId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
/// Identifier assigned to a collection point when it is registered.
pub struct PointId(pub i64);

impl fmt::Display for PointId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
/// Two-character federative unit code such as `SC`.
pub struct StateCode(String);

impl StateCode {
    /// Validate and wrap a state code.
    ///
    /// # Errors
    ///
    /// Returns [`PointError::InvalidCriteria`] unless the code is exactly two characters long.
    pub fn parse<S: Into<String>>(raw: S) -> Result<Self, PointError> {
        let code = raw.into();
        if code.chars().count() == 2 {
            Ok(Self(code))
        } else {
            Err(PointError::InvalidCriteria(format!(
                "state must be exactly two characters, got {code:?}"
            )))
        }
    }

    /// Borrow the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StateCode {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Material type a collection point accepts.
pub struct Category {
    /// Stable catalog identifier.
    pub id: CategoryId,
    /// Display name, e.g. "Lâmpadas".
    pub name: String,
    /// Stored asset name used to derive the icon URL.
    pub image_reference: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// A persisted waste collection point.
pub struct Point {
    /// Identifier assigned at registration.
    pub id: PointId,
    /// Name of the collecting organisation.
    pub name: String,
    /// Contact e-mail.
    pub email: String,
    /// Contact `WhatsApp` number.
    pub whatsapp: String,
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// City the point is located in.
    pub city: String,
    /// State the point is located in.
    pub state: StateCode,
    /// Stored upload name of the point's photo.
    pub image_reference: String,
}

/// Validated point data handed to the store for insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPoint {
    /// Name of the collecting organisation.
    pub name: String,
    /// Contact e-mail.
    pub email: String,
    /// Contact `WhatsApp` number.
    pub whatsapp: String,
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// City the point is located in.
    pub city: String,
    /// State the point is located in.
    pub state: StateCode,
    /// Stored upload name of the point's photo.
    pub image_reference: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
/// Registration request as received from the boundary layer.
pub struct PointSubmission {
    /// Name of the collecting organisation.
    pub name: String,
    /// Contact e-mail.
    pub email: String,
    /// Contact `WhatsApp` number.
    pub whatsapp: String,
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// City the point is located in.
    pub city: String,
    /// Raw state code, validated by the engine.
    pub state: String,
    /// Reference returned by the upload collaborator.
    pub image_reference: String,
    /// Categories the point accepts; must be non-empty.
    pub category_ids: Vec<CategoryId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Optional search criteria. A `None`/empty field places no constraint on that dimension.
pub struct PointCriteria {
    /// Raw state code.
    pub state: Option<String>,
    /// Exact city name.
    pub city: Option<String>,
    /// Category ids, any of which must be offered.
    pub category_ids: Vec<CategoryId>,
}

impl PointCriteria {
    /// Criteria that match every categorised point.
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    /// Restrict results to a state.
    #[must_use]
    pub fn with_state<S: Into<String>>(mut self, state: S) -> Self {
        self.state = Some(state.into());
        self
    }

    /// Restrict results to a city.
    #[must_use]
    pub fn with_city<S: Into<String>>(mut self, city: S) -> Self {
        self.city = Some(city.into());
        self
    }

    /// Restrict results to points offering at least one of the categories.
    #[must_use]
    pub fn with_categories<I: IntoIterator<Item = CategoryId>>(mut self, ids: I) -> Self {
        self.category_ids.extend(ids);
        self
    }
}

/// Criteria after validation, as consumed by [`crate::ports::PointStore::query`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PointFilter {
    /// State equality predicate.
    pub state: Option<StateCode>,
    /// City equality predicate.
    pub city: Option<String>,
    /// Category membership predicate; empty means unconstrained.
    pub category_ids: Vec<CategoryId>,
}

/// One row of the association-to-point join.
#[derive(Debug, Clone, PartialEq)]
pub struct PointMatch {
    /// The joined point.
    pub point: Point,
    /// Category of the association row that produced this match.
    pub category_id: CategoryId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Point summary returned by searches and registration.
pub struct PointResult {
    /// Point identifier.
    pub id: PointId,
    /// Point name.
    pub name: String,
    /// Absolute URL of the point's photo.
    pub image_url: String,
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Category as presented to clients.
pub struct CategoryView {
    /// Category identifier.
    pub id: CategoryId,
    /// Display name.
    pub name: String,
    /// Absolute URL of the category icon.
    pub image_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Full record of a single point together with the names of its categories.
pub struct PointDetail {
    /// Summary fields including the derived image URL.
    pub summary: PointResult,
    /// Contact e-mail.
    pub email: String,
    /// Contact `WhatsApp` number.
    pub whatsapp: String,
    /// City the point is located in.
    pub city: String,
    /// State the point is located in.
    pub state: StateCode,
    /// Names of the categories the point accepts.
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Base URL that stored asset references are appended to.
pub struct AssetBaseUrl(String);

impl AssetBaseUrl {
    /// Wrap a base URL such as `http://localhost:3333/uploads/`.
    #[must_use]
    pub fn new<S: Into<String>>(base: S) -> Self {
        Self(base.into())
    }

    /// Derive the absolute URL of a stored asset by plain concatenation.
    #[must_use]
    pub fn resolve(&self, reference: &str) -> String {
        format!("{}{reference}", self.0)
    }
}
