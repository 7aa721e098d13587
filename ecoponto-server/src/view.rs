//! JSON shapes returned to the mobile client.

use ecoponto_core::{CategoryId, CategoryView, PointDetail, PointResult};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub(crate) struct CategoryBody {
    pub id: CategoryId,
    pub title: String,
    pub image_url: String,
}

impl From<CategoryView> for CategoryBody {
    fn from(view: CategoryView) -> Self {
        Self {
            id: view.id,
            title: view.name,
            image_url: view.image_url,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct PointFields {
    #[serde(flatten)]
    pub summary: PointResult,
    pub email: String,
    pub whatsapp: String,
    pub city: String,
    pub uf: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ItemTitle {
    pub title: String,
}

/// Response of `GET /points/{id}`.
#[derive(Debug, Serialize)]
pub(crate) struct PointDetailBody {
    pub point: PointFields,
    pub items: Vec<ItemTitle>,
}

impl From<PointDetail> for PointDetailBody {
    fn from(detail: PointDetail) -> Self {
        Self {
            point: PointFields {
                summary: detail.summary,
                email: detail.email,
                whatsapp: detail.whatsapp,
                city: detail.city,
                uf: detail.state.to_string(),
            },
            items: detail
                .categories
                .into_iter()
                .map(|title| ItemTitle { title })
                .collect(),
        }
    }
}
