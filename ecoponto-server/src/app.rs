//! Shared handler state.

use std::sync::Arc;

use ecoponto_core::service::PointService;

/// State shared by every request handler.
#[derive(Clone)]
pub(crate) struct AppState {
    pub service: Arc<PointService>,
}

impl AppState {
    pub(crate) fn new(service: Arc<PointService>) -> Self {
        Self { service }
    }
}
