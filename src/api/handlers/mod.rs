pub mod gas;
pub mod motion;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query,
    },
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::OpenApi;
use uuid::Uuid;

use super::{
    dto::{
        Envelope, GasReadingDto, GasReadingPayload, ListEnvelope, MessageEnvelope,
        MotionReadingDto, MotionReadingPayload, PageEnvelope,
    },
    errors::AppError,
};
use crate::{
    error::Error,
    query::{PageSpec, QueryBuilder},
    readings::{service::not_found as record_not_found, Reading, ReadingService},
    stats::{GasStats, MotionStats},
};

// ---------------------------------------------------------------------------
// Query parameters
// ---------------------------------------------------------------------------

/// Raw pagination parameters; parsed by `QueryBuilder` so that bad values
/// get the usual error envelope.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub sort: Option<String>,
}

impl PageParams {
    fn spec<R: Reading>(&self, query: &QueryBuilder) -> Result<PageSpec, Error> {
        query.build_page::<R>(
            self.page.as_deref(),
            self.limit.as_deref(),
            self.sort.as_deref(),
        )
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRangeParams {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

// ---------------------------------------------------------------------------
// Extraction helpers
// ---------------------------------------------------------------------------

/// A malformed id can never match a record, so it is reported as not found.
fn parse_id<R: Reading>(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError(record_not_found::<R>()))
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload.map(|Json(body)| body).map_err(|e| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError(Error::PayloadTooLarge(
                "El cuerpo de la solicitud excede el tamaño máximo permitido".to_owned(),
            ))
        } else {
            AppError(Error::Validation(format!("Cuerpo JSON inválido: {}", e.body_text())))
        }
    })
}

fn query_params<T>(params: Result<Query<T>, QueryRejection>) -> Result<T, AppError> {
    params.map(|Query(params)| params).map_err(|e| {
        AppError(Error::Validation(format!(
            "Parámetros de consulta inválidos: {}",
            e.body_text()
        )))
    })
}

fn no_records<R: Reading>() -> AppError {
    AppError(Error::NotFound(format!("No hay registros de {} disponibles", R::NOUN)))
}

// ---------------------------------------------------------------------------
// Shared resource handlers
//
// `gas` and `motion` wrap these with their own routes and OpenAPI docs. `D`
// is the wire DTO, `P` the request body.
// ---------------------------------------------------------------------------

async fn list_page<R, D>(
    service: &ReadingService<R>,
    query: &QueryBuilder,
    params: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<PageEnvelope<D>>, AppError>
where
    R: Reading,
    D: From<R>,
{
    let spec = query_params(params)?.spec::<R>(query)?;
    let page = service.list(&spec).await?;
    Ok(Json(PageEnvelope::from_page(page, &spec)))
}

/// Flag listings are always newest first; `sort` is ignored.
async fn flagged_page<R, D>(
    service: &ReadingService<R>,
    query: &QueryBuilder,
    params: Result<Query<PageParams>, QueryRejection>,
    flag: R::Flag,
) -> Result<Json<PageEnvelope<D>>, AppError>
where
    R: Reading,
    D: From<R>,
{
    let spec = PageParams {
        sort: None,
        ..query_params(params)?
    }
    .spec::<R>(query)?;
    let page = service.list_where(flag, &spec).await?;
    Ok(Json(PageEnvelope::from_page(page, &spec)))
}

async fn latest_one<R, D>(service: &ReadingService<R>) -> Result<Json<Envelope<D>>, AppError>
where
    R: Reading,
    D: From<R>,
{
    let reading = service.get_latest().await?.ok_or_else(no_records::<R>)?;
    Ok(Json(Envelope::ok(reading.into())))
}

async fn in_range<R, D>(
    service: &ReadingService<R>,
    params: Result<Query<DateRangeParams>, QueryRejection>,
) -> Result<Json<ListEnvelope<D>>, AppError>
where
    R: Reading,
    D: From<R>,
{
    let params = query_params(params)?;
    let records = service
        .get_by_date_range(params.start_date.as_deref(), params.end_date.as_deref())
        .await?;
    Ok(Json(ListEnvelope::from_records(records)))
}

async fn summary<R>(
    service: &ReadingService<R>,
    params: Result<Query<DateRangeParams>, QueryRejection>,
) -> Result<Json<Envelope<R::Stats>>, AppError>
where
    R: Reading,
    R::Stats: Serialize,
{
    let params = query_params(params)?;
    let stats = service
        .statistics(params.start_date.as_deref(), params.end_date.as_deref())
        .await?;
    Ok(Json(Envelope::ok(stats)))
}

async fn fetch_one<R, D>(
    service: &ReadingService<R>,
    id: &str,
) -> Result<Json<Envelope<D>>, AppError>
where
    R: Reading,
    D: From<R>,
{
    let reading = service.get_by_id(parse_id::<R>(id)?).await?;
    Ok(Json(Envelope::ok(reading.into())))
}

async fn create_one<R, D, P>(
    service: &ReadingService<R>,
    payload: Result<Json<P>, JsonRejection>,
) -> Result<(StatusCode, Json<Envelope<D>>), AppError>
where
    R: Reading,
    D: From<R>,
    R::Fields: TryFrom<P, Error = Error>,
{
    let fields = <R::Fields as TryFrom<P>>::try_from(json_body(payload)?)?;
    let reading = service.create(fields).await?;
    Ok((
        StatusCode::CREATED,
        Json(Envelope::with_message(
            format!("Registro de {} creado exitosamente", R::NOUN),
            reading.into(),
        )),
    ))
}

async fn update_one<R, D, P>(
    service: &ReadingService<R>,
    id: &str,
    payload: Result<Json<P>, JsonRejection>,
) -> Result<Json<Envelope<D>>, AppError>
where
    R: Reading,
    D: From<R>,
    R::Fields: TryFrom<P, Error = Error>,
{
    let id = parse_id::<R>(id)?;
    let fields = <R::Fields as TryFrom<P>>::try_from(json_body(payload)?)?;
    let reading = service.update(id, fields).await?;
    Ok(Json(Envelope::with_message(
        format!("Registro de {} actualizado exitosamente", R::NOUN),
        reading.into(),
    )))
}

async fn delete_one<R: Reading>(
    service: &ReadingService<R>,
    id: &str,
) -> Result<Json<MessageEnvelope>, AppError> {
    service.delete(parse_id::<R>(id)?).await?;
    Ok(Json(MessageEnvelope::success(format!(
        "Registro de {} eliminado exitosamente",
        R::NOUN
    ))))
}

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

/// Describes the API and where each resource lives.
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "API information"),
    ),
    tag = "system"
)]
pub async fn index() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "success": true,
        "message": "API de Sensores - Gas y Movimiento",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "gas": "/api/gas",
            "motion": "/api/motion",
        },
    }))
}

/// Returns `200 OK` with `{"status":"ok"}` when the server is running.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
    ),
    tag = "system"
)]
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

pub async fn not_found() -> (StatusCode, Json<MessageEnvelope>) {
    (
        StatusCode::NOT_FOUND,
        Json(MessageEnvelope::failure("Ruta no encontrada")),
    )
}

// ---------------------------------------------------------------------------
// OpenAPI spec
// ---------------------------------------------------------------------------

#[derive(OpenApi)]
#[openapi(
    paths(
        index,
        health,
        gas::list,
        gas::latest,
        gas::date_range,
        gas::statistics,
        gas::get_by_id,
        gas::create,
        gas::update,
        gas::delete,
        motion::list,
        motion::latest,
        motion::date_range,
        motion::motion_detected,
        motion::alarm_activated,
        motion::statistics,
        motion::get_by_id,
        motion::create,
        motion::update,
        motion::delete,
    ),
    components(schemas(
        GasReadingDto,
        GasReadingPayload,
        GasStats,
        MotionReadingDto,
        MotionReadingPayload,
        MotionStats,
        MessageEnvelope,
    )),
    tags(
        (name = "gas",    description = "Gas sensor readings"),
        (name = "motion", description = "Motion sensor readings"),
        (name = "system", description = "System endpoints"),
    ),
    info(
        title = "Sensor Readings API",
        version = "0.1.0",
        description = "REST API for gas and motion sensor readings"
    )
)]
pub struct ApiDoc;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
