//! # REST API for Cattle Profiles
//!
//! `PUT` and `PATCH` share one handler: both are sparse updates where only
//! the fields present in the body change.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::info;

use super::{actor, data_response, error_response, message_response, JsonBody};
use crate::domain::CattleFilter;
use crate::error::StoreError;
use crate::AppState;
use shared::{CattlePatch, CreateCattleInput, Sex};

#[derive(Deserialize, Debug, Default)]
pub struct CattleListQuery {
    pub search: Option<String>,
    pub sex: Option<String>,
}

impl CattleListQuery {
    fn into_filter(self) -> Result<CattleFilter, StoreError> {
        let sex = match self.sex.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(value) => Some(Sex::parse_field("sex", value)?),
            None => None,
        };
        Ok(CattleFilter {
            search: self.search.filter(|s| !s.trim().is_empty()),
            sex,
        })
    }
}

/// List cattle, name ascending
pub async fn list_cattle(
    State(state): State<AppState>,
    Query(query): Query<CattleListQuery>,
) -> impl IntoResponse {
    info!("GET /api/v1/cattle - query: {:?}", query);
    let expose = state.config.is_development();

    let filter = match query.into_filter() {
        Ok(filter) => filter,
        Err(e) => return error_response(&e, "Failed to fetch cattle records", expose),
    };
    match state.cattle_service.list_cattle(&filter).await {
        Ok(cattle) => data_response(StatusCode::OK, cattle),
        Err(e) => error_response(&e, "Failed to fetch cattle records", expose),
    }
}

pub async fn get_cattle(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    info!("GET /api/v1/cattle/{}", id);

    match state.cattle_service.get_cattle(&id).await {
        Ok(cattle) => data_response(StatusCode::OK, cattle),
        Err(e) => error_response(&e, "Failed to fetch cattle record", state.config.is_development()),
    }
}

pub async fn create_cattle(
    State(state): State<AppState>,
    headers: HeaderMap,
    JsonBody(request): JsonBody<CreateCattleInput>,
) -> impl IntoResponse {
    info!("POST /api/v1/cattle - request: {:?}", request);

    let actor = actor(&headers);
    match state.cattle_service.create_cattle(request, actor.as_deref()).await {
        Ok(cattle) => data_response(StatusCode::CREATED, cattle),
        Err(e) => error_response(&e, "Failed to add cattle record", state.config.is_development()),
    }
}

/// Apply a partial update
pub async fn update_cattle(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    JsonBody(patch): JsonBody<CattlePatch>,
) -> impl IntoResponse {
    info!("PATCH /api/v1/cattle/{} - request: {:?}", id, patch);

    let actor = actor(&headers);
    match state.cattle_service.update_cattle(&id, patch, actor.as_deref()).await {
        Ok(cattle) => data_response(StatusCode::OK, cattle),
        Err(e) => error_response(&e, "Failed to update cattle record", state.config.is_development()),
    }
}

pub async fn delete_cattle(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> impl IntoResponse {
    info!("DELETE /api/v1/cattle/{}", id);

    let actor = actor(&headers);
    match state.cattle_service.delete_cattle(&id, actor.as_deref()).await {
        Ok(_) => message_response("Cattle record deleted successfully"),
        Err(e) => error_response(&e, "Failed to delete cattle record", state.config.is_development()),
    }
}
