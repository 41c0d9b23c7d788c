//! Catalog REST handlers; thin pass-throughs to the manager.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use common::pagination::Paginated;
use service::domain::{
    CreateServiceInput, SearchQuery, SearchResultItem, ServiceDetail, ServiceHealth,
    UpdateServiceInput,
};

use crate::auth::{AppState, RequireAdmin, RequireSuperAdmin};
use crate::errors::ApiError;

pub async fn search(
    RequireAdmin(_claims): RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Paginated<SearchResultItem>>, ApiError> {
    let page = state.manager.search(&query).await?;
    Ok(Json(page))
}

pub async fn get_detail(
    RequireAdmin(_claims): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ServiceDetail>, ApiError> {
    let detail = state.manager.get_detail(id).await?;
    Ok(Json(detail))
}

pub async fn check_health(
    RequireAdmin(_claims): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ServiceHealth>, ApiError> {
    let health = state.manager.check_health(id).await?;
    Ok(Json(health))
}

pub async fn create(
    RequireSuperAdmin(_claims): RequireSuperAdmin,
    State(state): State<AppState>,
    Json(input): Json<CreateServiceInput>,
) -> Result<StatusCode, ApiError> {
    state.manager.create(&input).await?;
    Ok(StatusCode::CREATED)
}

pub async fn update(
    RequireSuperAdmin(_claims): RequireSuperAdmin,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateServiceInput>,
) -> Result<StatusCode, ApiError> {
    state.manager.update(id, &input).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete(
    RequireSuperAdmin(_claims): RequireSuperAdmin,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.manager.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
