//! # REST API for the Activity Log
//!
//! Entries are append-only: there is no update or delete endpoint.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::FixedOffset;
use serde::Deserialize;
use tracing::info;

use super::{data_response, error_response, JsonBody};
use crate::error::StoreError;
use crate::AppState;
use shared::{CreateActivityInput, ValidationError};

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct GroupedQuery {
    /// Minutes east of UTC
    pub tz_offset_minutes: Option<i32>,
}

impl GroupedQuery {
    fn offset(&self) -> Result<FixedOffset, StoreError> {
        let minutes = self.tz_offset_minutes.unwrap_or(0);
        minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| ValidationError::InvalidOffset(minutes).into())
    }
}

/// List entries newest first
pub async fn list_activities(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/v1/activities");

    match state.activity_service.list_activities().await {
        Ok(entries) => data_response(StatusCode::OK, entries),
        Err(e) => error_response(&e, "Failed to fetch activity logs", state.config.is_development()),
    }
}

pub async fn list_grouped_activities(
    State(state): State<AppState>,
    Query(query): Query<GroupedQuery>,
) -> impl IntoResponse {
    info!("GET /api/v1/activities/grouped - query: {:?}", query);
    let expose = state.config.is_development();

    let offset = match query.offset() {
        Ok(offset) => offset,
        Err(e) => return error_response(&e, "Failed to fetch activity logs", expose),
    };
    match state.activity_service.list_grouped_by_day(offset).await {
        Ok(days) => data_response(StatusCode::OK, days),
        Err(e) => error_response(&e, "Failed to fetch activity logs", expose),
    }
}

pub async fn create_activity(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<CreateActivityInput>,
) -> impl IntoResponse {
    info!("POST /api/v1/activities - request: {:?}", request);

    match state.activity_service.create_activity(request).await {
        Ok(entry) => data_response(StatusCode::CREATED, entry),
        Err(e) => error_response(&e, "Failed to add activity log", state.config.is_development()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_parsing() {
        let query = GroupedQuery { tz_offset_minutes: Some(330) };
        assert_eq!(query.offset().unwrap().local_minus_utc(), 330 * 60);
        assert_eq!(GroupedQuery::default().offset().unwrap().local_minus_utc(), 0);
        assert!(GroupedQuery { tz_offset_minutes: Some(-24 * 60) }.offset().is_err());
    }
}
