pub mod dto;
pub mod errors;
pub mod handlers;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::get,
    Router,
};
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    db::{MemoryStore, PgReadingStore},
    query::QueryBuilder,
    readings::{GasReading, MotionReading, ReadingService},
};
use handlers::{gas, motion, ApiDoc};

/// Shared handler state. Cloning is cheap: services are `Arc` handles.
#[derive(Clone)]
pub struct AppState {
    pub gas: ReadingService<GasReading>,
    pub motion: ReadingService<MotionReading>,
    pub query: QueryBuilder,
}

impl AppState {
    pub fn postgres(pool: PgPool, query: QueryBuilder) -> Self {
        Self {
            gas: ReadingService::new(Arc::new(PgReadingStore::<GasReading>::new(pool.clone()))),
            motion: ReadingService::new(Arc::new(PgReadingStore::<MotionReading>::new(pool))),
            query,
        }
    }

    pub fn in_memory(query: QueryBuilder) -> Self {
        Self {
            gas: ReadingService::new(Arc::new(MemoryStore::<GasReading>::new())),
            motion: ReadingService::new(Arc::new(MemoryStore::<MotionReading>::new())),
            query,
        }
    }
}

pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .route("/api/gas", get(gas::list).post(gas::create))
        .route("/api/gas/latest", get(gas::latest))
        .route("/api/gas/date-range", get(gas::date_range))
        .route("/api/gas/statistics", get(gas::statistics))
        .route(
            "/api/gas/{id}",
            get(gas::get_by_id).put(gas::update).delete(gas::delete),
        )
        .route("/api/motion", get(motion::list).post(motion::create))
        .route("/api/motion/latest", get(motion::latest))
        .route("/api/motion/date-range", get(motion::date_range))
        .route("/api/motion/motion-detected", get(motion::motion_detected))
        .route("/api/motion/alarm-activated", get(motion::alarm_activated))
        .route("/api/motion/statistics", get(motion::statistics))
        .route(
            "/api/motion/{id}",
            get(motion::get_by_id)
                .put(motion::update)
                .delete(motion::delete),
        )
        .with_state(state)
        .split_for_parts();

    router
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route(
            "/api-docs/openapi.json",
            get(move || async move { axum::Json(api) }),
        )
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        // Dashboards call the API from other origins.
        .layer(CorsLayer::permissive())
}
