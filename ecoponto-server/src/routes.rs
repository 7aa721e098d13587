//! Route table and request handlers.

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    routing::get,
};
use ecoponto_core::{PointId, PointResult};
use serde_json::{Value, json};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::app::AppState;
use crate::error::ApiResult;
use crate::input::{CreatePointBody, criteria_from_query};
use crate::view::{CategoryBody, PointDetailBody};

pub(crate) fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/items", get(list_categories))
        .route("/points", get(list_points).post(create_point))
        .route("/points/{id}", get(show_point))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "message": "Hello world" }))
}

async fn list_categories(State(state): State<AppState>) -> ApiResult<Json<Vec<CategoryBody>>> {
    let categories = state.service.categories().await?;
    Ok(Json(categories.into_iter().map(CategoryBody::from).collect()))
}

async fn list_points(
    State(state): State<AppState>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> ApiResult<Json<Vec<PointResult>>> {
    let Query(pairs) = query?;
    let criteria = criteria_from_query(pairs)?;
    let points = state.service.find(criteria).await?;
    Ok(Json(points))
}

async fn show_point(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<PointDetailBody>> {
    let Path(id) = path?;
    let detail = state.service.show(PointId(id)).await?;
    Ok(Json(PointDetailBody::from(detail)))
}

async fn create_point(
    State(state): State<AppState>,
    body: Result<Json<CreatePointBody>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<PointResult>)> {
    let Json(body) = body?;
    let submission = body.into_submission()?;
    let created = state.service.create(submission).await?;
    info!(point = %created.id, "point created via api");
    Ok((StatusCode::CREATED, Json(created)))
}
