//! # Cattle Keeper Backend
//!
//! Record store for a small dairy herd: cattle profiles, milk yield records
//! and an append-only activity log, served over a JSON REST API.
//!
//! ## Architecture
//!
//! ```text
//! IO Layer (REST handlers, API-key guard)
//!     ↓
//! Domain Layer (services, merge engine, post-commit events)
//!     ↓
//! Storage Layer (SQLite repositories, image files)
//! ```

pub mod config;
pub mod domain;
pub mod error;
pub mod io;
pub mod storage;

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue, Method},
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub use config::Config;
pub use error::{StoreError, StoreResult};

use domain::{
    spawn_image_janitor, ActivityService, CattleService, EventBus, ImageService, MilkService,
};
use io::rest::{
    activity_apis, auth::ApiKeyAuth, cattle_apis, health_apis, image_apis, milk_apis,
};
use storage::{DbConnection, LocalImageStore};

/// Multipart framing allowance on top of the file size limit.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Main application state that holds all services
#[derive(Clone)]
pub struct AppState {
    pub cattle_service: CattleService<DbConnection>,
    pub milk_service: MilkService<DbConnection>,
    pub activity_service: ActivityService<DbConnection>,
    pub image_service: ImageService<LocalImageStore>,
    pub db: DbConnection,
    pub config: Arc<Config>,
    pub started_at: Instant,
}

/// Open the configured database and upload directory and wire the services
pub async fn initialize_backend(config: Config) -> Result<AppState> {
    info!("Setting up database at {}", config.database_path.display());
    let db = DbConnection::open(&config.database_path).await?;
    initialize_with(db, config).await
}

/// Wire the services around an already open database
pub async fn initialize_with(db: DbConnection, config: Config) -> Result<AppState> {
    info!("Setting up image store at {}", config.upload_dir.display());
    let images = LocalImageStore::new(&config.upload_dir);
    images.ensure_dir().await?;

    info!("Setting up domain model");
    let (events, receiver) = EventBus::new();
    spawn_image_janitor(images.clone(), receiver);

    let activity_service = ActivityService::new(&db);
    let cattle_service = CattleService::new(&db, activity_service.clone(), events);
    let milk_service = MilkService::new(&db, activity_service.clone());
    let image_service = ImageService::new(images, config.max_file_size);

    Ok(AppState {
        cattle_service,
        milk_service,
        activity_service,
        image_service,
        db,
        config: Arc::new(config),
        started_at: Instant::now(),
    })
}

fn cors_layer(origin: &str) -> CorsLayer {
    let allow_origin = if origin.trim() == "*" {
        AllowOrigin::from(Any)
    } else {
        let origins: Vec<HeaderValue> = origin
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .filter_map(|o| match o.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!("Ignoring invalid CORS origin {}", o);
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static(io::rest::auth::API_KEY_HEADER),
            HeaderName::from_static(io::rest::USER_HEADER),
        ])
}

/// Create the Axum router with all routes configured
pub fn create_router(app_state: AppState) -> Router {
    let auth = ApiKeyAuth::new(app_state.config.api_key.as_str());
    let upload_limit = app_state.config.max_file_size + MULTIPART_OVERHEAD;

    let public_routes = Router::new()
        .route("/health", get(health_apis::health))
        .route("/api/v1", get(health_apis::get_api_info));

    let api_routes = Router::new()
        .route(
            "/cattle",
            get(cattle_apis::list_cattle).post(cattle_apis::create_cattle),
        )
        .route(
            "/cattle/:id",
            get(cattle_apis::get_cattle)
                .put(cattle_apis::update_cattle)
                .patch(cattle_apis::update_cattle)
                .delete(cattle_apis::delete_cattle),
        )
        .route(
            "/milk",
            get(milk_apis::list_milk_records).post(milk_apis::create_milk_record),
        )
        .route("/milk/summary", get(milk_apis::milk_summary))
        .route("/milk/:id", delete(milk_apis::delete_milk_record))
        .route(
            "/activities",
            get(activity_apis::list_activities).post(activity_apis::create_activity),
        )
        .route("/activities/grouped", get(activity_apis::list_grouped_activities))
        .route(
            "/images/upload",
            post(image_apis::upload_image).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/images/:filename",
            get(image_apis::get_image_info).delete(image_apis::delete_image),
        )
        .route_layer(middleware::from_fn_with_state(
            auth,
            io::rest::auth::require_api_key,
        ));

    let uploads = ServeDir::new(&app_state.config.upload_dir);
    let cors = cors_layer(&app_state.config.cors_origin);

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .nest_service("/uploads", uploads)
        .fallback(io::rest::not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
