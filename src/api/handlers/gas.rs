use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};

use super::{
    create_one, delete_one, fetch_one, in_range, latest_one, list_page, summary, update_one,
    DateRangeParams, PageParams,
};
use crate::{
    api::{
        dto::{
            Envelope, GasReadingDto, GasReadingPayload, ListEnvelope, MessageEnvelope,
            PageEnvelope,
        },
        errors::AppError,
        AppState,
    },
    readings::GasReading,
    stats::GasStats,
};

/// Paginated gas readings, newest first unless `sort` says otherwise.
#[utoipa::path(
    get,
    path = "/api/gas",
    params(
        ("page"  = Option<u64>,    Query, description = "1-based page number (default 1)"),
        ("limit" = Option<u64>,    Query, description = "Page size (default 10, capped)"),
        ("sort"  = Option<String>, Query, description = "Field to sort by, `-` prefix for descending (default `-fecha_hora`)"),
    ),
    responses(
        (status = 200, description = "One page of gas readings", body = PageEnvelope<GasReadingDto>),
        (status = 400, description = "Invalid pagination or sort", body = MessageEnvelope),
        (status = 500, description = "Internal server error", body = MessageEnvelope),
    ),
    tag = "gas"
)]
pub async fn list(
    State(state): State<AppState>,
    params: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<PageEnvelope<GasReadingDto>>, AppError> {
    list_page(&state.gas, &state.query, params).await
}

#[utoipa::path(
    get,
    path = "/api/gas/latest",
    responses(
        (status = 200, description = "Most recent gas reading", body = Envelope<GasReadingDto>),
        (status = 404, description = "No readings yet", body = MessageEnvelope),
        (status = 500, description = "Internal server error", body = MessageEnvelope),
    ),
    tag = "gas"
)]
pub async fn latest(
    State(state): State<AppState>,
) -> Result<Json<Envelope<GasReadingDto>>, AppError> {
    latest_one(&state.gas).await
}

/// Every gas reading in `[startDate, endDate]`, newest first, unpaginated.
#[utoipa::path(
    get,
    path = "/api/gas/date-range",
    params(
        ("startDate" = String, Query, description = "Range start, inclusive"),
        ("endDate"   = String, Query, description = "Range end, inclusive"),
    ),
    responses(
        (status = 200, description = "Readings in range", body = ListEnvelope<GasReadingDto>),
        (status = 400, description = "Missing or invalid dates", body = MessageEnvelope),
        (status = 500, description = "Internal server error", body = MessageEnvelope),
    ),
    tag = "gas"
)]
pub async fn date_range(
    State(state): State<AppState>,
    params: Result<Query<DateRangeParams>, QueryRejection>,
) -> Result<Json<ListEnvelope<GasReadingDto>>, AppError> {
    in_range(&state.gas, params).await
}

/// Count, average, min, max and fan activations, optionally within a date range.
#[utoipa::path(
    get,
    path = "/api/gas/statistics",
    params(
        ("startDate" = Option<String>, Query, description = "Range start, inclusive (requires endDate)"),
        ("endDate"   = Option<String>, Query, description = "Range end, inclusive (requires startDate)"),
    ),
    responses(
        (status = 200, description = "Gas statistics", body = Envelope<GasStats>),
        (status = 400, description = "Invalid dates", body = MessageEnvelope),
        (status = 500, description = "Internal server error", body = MessageEnvelope),
    ),
    tag = "gas"
)]
pub async fn statistics(
    State(state): State<AppState>,
    params: Result<Query<DateRangeParams>, QueryRejection>,
) -> Result<Json<Envelope<GasStats>>, AppError> {
    summary(&state.gas, params).await
}

#[utoipa::path(
    get,
    path = "/api/gas/{id}",
    params(("id" = String, Path, description = "Reading id (UUID)")),
    responses(
        (status = 200, description = "Gas reading", body = Envelope<GasReadingDto>),
        (status = 404, description = "Reading not found", body = MessageEnvelope),
        (status = 500, description = "Internal server error", body = MessageEnvelope),
    ),
    tag = "gas"
)]
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<GasReadingDto>>, AppError> {
    fetch_one(&state.gas, &id).await
}

#[utoipa::path(
    post,
    path = "/api/gas",
    request_body = GasReadingPayload,
    responses(
        (status = 201, description = "Reading created", body = Envelope<GasReadingDto>),
        (status = 400, description = "Missing, null or out-of-range fields", body = MessageEnvelope),
        (status = 413, description = "Body over the size limit", body = MessageEnvelope),
        (status = 500, description = "Internal server error", body = MessageEnvelope),
    ),
    tag = "gas"
)]
pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<GasReadingPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<Envelope<GasReadingDto>>), AppError> {
    create_one::<GasReading, _, _>(&state.gas, payload).await
}

/// Partial update: only the fields present in the body change.
#[utoipa::path(
    put,
    path = "/api/gas/{id}",
    params(("id" = String, Path, description = "Reading id (UUID)")),
    request_body = GasReadingPayload,
    responses(
        (status = 200, description = "Reading updated", body = Envelope<GasReadingDto>),
        (status = 400, description = "Null or out-of-range fields", body = MessageEnvelope),
        (status = 404, description = "Reading not found", body = MessageEnvelope),
        (status = 413, description = "Body over the size limit", body = MessageEnvelope),
        (status = 500, description = "Internal server error", body = MessageEnvelope),
    ),
    tag = "gas"
)]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<GasReadingPayload>, JsonRejection>,
) -> Result<Json<Envelope<GasReadingDto>>, AppError> {
    update_one::<GasReading, _, _>(&state.gas, &id, payload).await
}

#[utoipa::path(
    delete,
    path = "/api/gas/{id}",
    params(("id" = String, Path, description = "Reading id (UUID)")),
    responses(
        (status = 200, description = "Reading deleted", body = MessageEnvelope),
        (status = 404, description = "Reading not found", body = MessageEnvelope),
        (status = 500, description = "Internal server error", body = MessageEnvelope),
    ),
    tag = "gas"
)]
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageEnvelope>, AppError> {
    delete_one(&state.gas, &id).await
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
