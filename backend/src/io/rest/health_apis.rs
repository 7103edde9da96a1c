//! Unauthenticated service endpoints: liveness and API discovery.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use std::collections::BTreeMap;

use crate::AppState;
use shared::{ApiInfo, DatabaseStatus, HealthStatus, ServiceStatus};

/// Health check. 503 when the database does not answer.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let healthy = state.db.is_healthy().await;
    let body = HealthStatus {
        status: if healthy { ServiceStatus::Ok } else { ServiceStatus::Degraded },
        database: if healthy {
            DatabaseStatus::Connected
        } else {
            DatabaseStatus::Disconnected
        },
        timestamp: Utc::now(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    };
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

pub fn api_info() -> ApiInfo {
    let endpoints = [
        ("cattle", "/api/v1/cattle"),
        ("milk", "/api/v1/milk"),
        ("activities", "/api/v1/activities"),
        ("images", "/api/v1/images"),
        ("health", "/health"),
    ]
    .into_iter()
    .map(|(name, path)| (name.to_string(), path.to_string()))
    .collect::<BTreeMap<_, _>>();

    ApiInfo {
        name: "Cattle Keeper API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        description: "Self-hosted API for Cattle Information Keeper".to_string(),
        endpoints,
    }
}

pub async fn get_api_info() -> impl IntoResponse {
    Json(api_info())
}
