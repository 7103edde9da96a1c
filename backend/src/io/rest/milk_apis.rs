//! # REST API for Milk Records

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::info;

use super::{actor, data_response, error_response, message_response, JsonBody};
use crate::AppState;
use shared::CreateMilkRecordInput;

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct MilkListQuery {
    pub cow_name: Option<String>,
}

/// List records newest first, optionally for one cow
pub async fn list_milk_records(
    State(state): State<AppState>,
    Query(query): Query<MilkListQuery>,
) -> impl IntoResponse {
    info!("GET /api/v1/milk - query: {:?}", query);

    match state.milk_service.list_milk_records(query.cow_name.as_deref()).await {
        Ok(records) => data_response(StatusCode::OK, records),
        Err(e) => error_response(&e, "Failed to fetch milk records", state.config.is_development()),
    }
}

pub async fn milk_summary(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/v1/milk/summary");

    match state.milk_service.summary().await {
        Ok(summary) => data_response(StatusCode::OK, summary),
        Err(e) => error_response(&e, "Failed to summarize milk records", state.config.is_development()),
    }
}

pub async fn create_milk_record(
    State(state): State<AppState>,
    headers: HeaderMap,
    JsonBody(request): JsonBody<CreateMilkRecordInput>,
) -> impl IntoResponse {
    info!("POST /api/v1/milk - request: {:?}", request);

    let actor = actor(&headers);
    match state.milk_service.create_milk_record(request, actor.as_deref()).await {
        Ok(record) => data_response(StatusCode::CREATED, record),
        Err(e) => error_response(&e, "Failed to add milk record", state.config.is_development()),
    }
}

pub async fn delete_milk_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> impl IntoResponse {
    info!("DELETE /api/v1/milk/{}", id);

    let actor = actor(&headers);
    match state.milk_service.delete_milk_record(&id, actor.as_deref()).await {
        Ok(_) => message_response("Milk record deleted successfully"),
        Err(e) => error_response(&e, "Failed to delete milk record", state.config.is_development()),
    }
}
