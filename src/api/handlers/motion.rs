use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};

use super::{
    create_one, delete_one, fetch_one, flagged_page, in_range, latest_one, list_page, summary,
    update_one, DateRangeParams, PageParams,
};
use crate::{
    api::{
        dto::{
            Envelope, ListEnvelope, MessageEnvelope, MotionReadingDto, MotionReadingPayload,
            PageEnvelope,
        },
        errors::AppError,
        AppState,
    },
    readings::{MotionFlag, MotionReading},
    stats::MotionStats,
};

#[utoipa::path(
    get,
    path = "/api/motion",
    params(
        ("page"  = Option<u64>,    Query, description = "1-based page number (default 1)"),
        ("limit" = Option<u64>,    Query, description = "Page size (default 10, capped)"),
        ("sort"  = Option<String>, Query, description = "Field to sort by, `-` prefix for descending (default `-fecha_hora`)"),
    ),
    responses(
        (status = 200, description = "One page of motion readings", body = PageEnvelope<MotionReadingDto>),
        (status = 400, description = "Invalid pagination or sort", body = MessageEnvelope),
        (status = 500, description = "Internal server error", body = MessageEnvelope),
    ),
    tag = "motion"
)]
pub async fn list(
    State(state): State<AppState>,
    params: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<PageEnvelope<MotionReadingDto>>, AppError> {
    list_page(&state.motion, &state.query, params).await
}

#[utoipa::path(
    get,
    path = "/api/motion/latest",
    responses(
        (status = 200, description = "Most recent motion reading", body = Envelope<MotionReadingDto>),
        (status = 404, description = "No readings yet", body = MessageEnvelope),
        (status = 500, description = "Internal server error", body = MessageEnvelope),
    ),
    tag = "motion"
)]
pub async fn latest(
    State(state): State<AppState>,
) -> Result<Json<Envelope<MotionReadingDto>>, AppError> {
    latest_one(&state.motion).await
}

#[utoipa::path(
    get,
    path = "/api/motion/date-range",
    params(
        ("startDate" = String, Query, description = "Range start, inclusive"),
        ("endDate"   = String, Query, description = "Range end, inclusive"),
    ),
    responses(
        (status = 200, description = "Readings in range", body = ListEnvelope<MotionReadingDto>),
        (status = 400, description = "Missing or invalid dates", body = MessageEnvelope),
        (status = 500, description = "Internal server error", body = MessageEnvelope),
    ),
    tag = "motion"
)]
pub async fn date_range(
    State(state): State<AppState>,
    params: Result<Query<DateRangeParams>, QueryRejection>,
) -> Result<Json<ListEnvelope<MotionReadingDto>>, AppError> {
    in_range(&state.motion, params).await
}

/// Readings where motion was detected, newest first.
#[utoipa::path(
    get,
    path = "/api/motion/motion-detected",
    params(
        ("page"  = Option<u64>, Query, description = "1-based page number (default 1)"),
        ("limit" = Option<u64>, Query, description = "Page size (default 10, capped)"),
    ),
    responses(
        (status = 200, description = "Readings with motion", body = PageEnvelope<MotionReadingDto>),
        (status = 400, description = "Invalid pagination", body = MessageEnvelope),
        (status = 500, description = "Internal server error", body = MessageEnvelope),
    ),
    tag = "motion"
)]
pub async fn motion_detected(
    State(state): State<AppState>,
    params: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<PageEnvelope<MotionReadingDto>>, AppError> {
    flagged_page(&state.motion, &state.query, params, MotionFlag::MotionDetected).await
}

/// Readings where the alarm went off, newest first.
#[utoipa::path(
    get,
    path = "/api/motion/alarm-activated",
    params(
        ("page"  = Option<u64>, Query, description = "1-based page number (default 1)"),
        ("limit" = Option<u64>, Query, description = "Page size (default 10, capped)"),
    ),
    responses(
        (status = 200, description = "Readings with the alarm raised", body = PageEnvelope<MotionReadingDto>),
        (status = 400, description = "Invalid pagination", body = MessageEnvelope),
        (status = 500, description = "Internal server error", body = MessageEnvelope),
    ),
    tag = "motion"
)]
pub async fn alarm_activated(
    State(state): State<AppState>,
    params: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<PageEnvelope<MotionReadingDto>>, AppError> {
    flagged_page(&state.motion, &state.query, params, MotionFlag::AlarmTriggered).await
}

#[utoipa::path(
    get,
    path = "/api/motion/statistics",
    params(
        ("startDate" = Option<String>, Query, description = "Range start, inclusive (requires endDate)"),
        ("endDate"   = Option<String>, Query, description = "Range end, inclusive (requires startDate)"),
    ),
    responses(
        (status = 200, description = "Motion statistics", body = Envelope<MotionStats>),
        (status = 400, description = "Invalid dates", body = MessageEnvelope),
        (status = 500, description = "Internal server error", body = MessageEnvelope),
    ),
    tag = "motion"
)]
pub async fn statistics(
    State(state): State<AppState>,
    params: Result<Query<DateRangeParams>, QueryRejection>,
) -> Result<Json<Envelope<MotionStats>>, AppError> {
    summary(&state.motion, params).await
}

#[utoipa::path(
    get,
    path = "/api/motion/{id}",
    params(("id" = String, Path, description = "Reading id (UUID)")),
    responses(
        (status = 200, description = "Motion reading", body = Envelope<MotionReadingDto>),
        (status = 404, description = "Reading not found", body = MessageEnvelope),
        (status = 500, description = "Internal server error", body = MessageEnvelope),
    ),
    tag = "motion"
)]
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<MotionReadingDto>>, AppError> {
    fetch_one(&state.motion, &id).await
}

#[utoipa::path(
    post,
    path = "/api/motion",
    request_body = MotionReadingPayload,
    responses(
        (status = 201, description = "Reading created", body = Envelope<MotionReadingDto>),
        (status = 400, description = "Missing, null or invalid fields", body = MessageEnvelope),
        (status = 413, description = "Body over the size limit", body = MessageEnvelope),
        (status = 500, description = "Internal server error", body = MessageEnvelope),
    ),
    tag = "motion"
)]
pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<MotionReadingPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<Envelope<MotionReadingDto>>), AppError> {
    create_one::<MotionReading, _, _>(&state.motion, payload).await
}

#[utoipa::path(
    put,
    path = "/api/motion/{id}",
    params(("id" = String, Path, description = "Reading id (UUID)")),
    request_body = MotionReadingPayload,
    responses(
        (status = 200, description = "Reading updated", body = Envelope<MotionReadingDto>),
        (status = 400, description = "Null or invalid fields", body = MessageEnvelope),
        (status = 404, description = "Reading not found", body = MessageEnvelope),
        (status = 413, description = "Body over the size limit", body = MessageEnvelope),
        (status = 500, description = "Internal server error", body = MessageEnvelope),
    ),
    tag = "motion"
)]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<MotionReadingPayload>, JsonRejection>,
) -> Result<Json<Envelope<MotionReadingDto>>, AppError> {
    update_one::<MotionReading, _, _>(&state.motion, &id, payload).await
}

#[utoipa::path(
    delete,
    path = "/api/motion/{id}",
    params(("id" = String, Path, description = "Reading id (UUID)")),
    responses(
        (status = 200, description = "Reading deleted", body = MessageEnvelope),
        (status = 404, description = "Reading not found", body = MessageEnvelope),
        (status = 500, description = "Internal server error", body = MessageEnvelope),
    ),
    tag = "motion"
)]
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageEnvelope>, AppError> {
    delete_one(&state.motion, &id).await
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::{json, Value};

    use crate::{
        api::{router, AppState},
        query::QueryBuilder,
    };

    fn test_server() -> TestServer {
        let state = AppState::in_memory(QueryBuilder::default());
        TestServer::new(router(state, 1024 * 1024)).unwrap()
    }

    async fn seed(server: &TestServer, readings: &[(&str, i64, i64)]) {
        for (at, motion, alarm) in readings {
            server
                .post("/api/motion")
                .json(&json!({ "fecha_hora": at, "movimiento": motion, "alarma": alarm }))
                .await
                .assert_status(StatusCode::CREATED);
        }
    }

    // -----------------------------------------------------------------------
    // CRUD
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn create_then_fetch() {
        let server = test_server();
        let resp = server
            .post("/api/motion")
            .json(&json!({ "movimiento": 1, "alarma": 0 }))
            .await;
        resp.assert_status(StatusCode::CREATED);
        let body: Value = resp.json();
        assert_eq!(body["message"], "Registro de movimiento creado exitosamente");

        let id = body["data"]["_id"].as_str().unwrap();
        let resp = server.get(&format!("/api/motion/{id}")).await;
        resp.assert_status_ok();
        assert_eq!(resp.json::<Value>()["data"]["movimiento"], 1);
        assert_eq!(resp.json::<Value>()["data"]["alarma"], 0);
    }

    #[tokio::test]
    async fn create_missing_field_is_400() {
        let server = test_server();
        let resp = server.post("/api/motion").json(&json!({ "alarma": 1 })).await;
        resp.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(
            resp.json::<Value>()["message"],
            "movimiento y alarma son campos requeridos"
        );
    }

    #[tokio::test]
    async fn create_non_binary_flag_is_400() {
        let server = test_server();
        let resp = server
            .post("/api/motion")
            .json(&json!({ "movimiento": 2, "alarma": 0 }))
            .await;
        resp.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(resp.json::<Value>()["success"], false);
    }

    #[tokio::test]
    async fn create_with_bad_timestamp_is_400() {
        let server = test_server();
        let resp = server
            .post("/api/motion")
            .json(&json!({ "fecha_hora": "ayer", "movimiento": 0, "alarma": 0 }))
            .await;
        resp.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn update_with_null_flag_is_400() {
        let server = test_server();
        let resp = server
            .post("/api/motion")
            .json(&json!({ "movimiento": 1, "alarma": 0 }))
            .await;
        let id = resp.json::<Value>()["data"]["_id"].as_str().unwrap().to_owned();

        let resp = server
            .put(&format!("/api/motion/{id}"))
            .json(&json!({ "alarma": null }))
            .await;
        resp.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(resp.json::<Value>()["message"], "alarma no puede ser nulo");
    }

    #[tokio::test]
    async fn create_with_null_flag_is_400() {
        let server = test_server();
        let resp = server
            .post("/api/motion")
            .json(&json!({ "movimiento": null, "alarma": 0 }))
            .await;
        resp.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn update_unknown_id_is_404() {
        let server = test_server();
        let resp = server
            .put("/api/motion/00000000-0000-0000-0000-000000000000")
            .json(&json!({ "alarma": 1 }))
            .await;
        resp.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(
            resp.json::<Value>()["message"],
            "Registro de movimiento no encontrado"
        );
    }

    #[tokio::test]
    async fn delete_removes_reading() {
        let server = test_server();
        let resp = server
            .post("/api/motion")
            .json(&json!({ "movimiento": 0, "alarma": 0 }))
            .await;
        let id = resp.json::<Value>()["data"]["_id"].as_str().unwrap().to_owned();

        server
            .delete(&format!("/api/motion/{id}"))
            .await
            .assert_status_ok();
        server
            .get(&format!("/api/motion/{id}"))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    // -----------------------------------------------------------------------
    // Flag listings
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn motion_detected_counts_matching_subset() {
        let server = test_server();
        seed(
            &server,
            &[
                ("2024-01-01T00:00:00Z", 1, 0),
                ("2024-01-02T00:00:00Z", 0, 0),
                ("2024-01-03T00:00:00Z", 1, 1),
            ],
        )
        .await;

        let resp = server.get("/api/motion/motion-detected").await;
        resp.assert_status_ok();
        let body: Value = resp.json();
        assert_eq!(body["totalRecords"], 2);
        assert_eq!(body["totalPages"], 1);
        let data = body["data"].as_array().unwrap();
        assert_eq!(data.len(), 2);
        assert!(data.iter().all(|r| r["movimiento"] == 1));
        assert_eq!(data[0]["fecha_hora"], "2024-01-03T00:00:00Z");
    }

    #[tokio::test]
    async fn alarm_activated_pages_matching_subset() {
        let server = test_server();
        seed(
            &server,
            &[
                ("2024-01-01T00:00:00Z", 1, 1),
                ("2024-01-02T00:00:00Z", 0, 1),
                ("2024-01-03T00:00:00Z", 0, 0),
            ],
        )
        .await;

        let resp = server
            .get("/api/motion/alarm-activated")
            .add_query_param("limit", 1)
            .await;
        resp.assert_status_ok();
        let body: Value = resp.json();
        assert_eq!(body["totalRecords"], 2);
        assert_eq!(body["totalPages"], 2);
        assert_eq!(body["currentPage"], 1);
        assert_eq!(body["data"][0]["fecha_hora"], "2024-01-02T00:00:00Z");
    }

    #[tokio::test]
    async fn flag_listing_rejects_non_numeric_page() {
        let server = test_server();
        let resp = server
            .get("/api/motion/motion-detected")
            .add_query_param("page", "dos")
            .await;
        resp.assert_status(StatusCode::BAD_REQUEST);
    }

    // -----------------------------------------------------------------------
    // Statistics
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn statistics_report_percentages() {
        let server = test_server();
        seed(
            &server,
            &[
                ("2024-01-01T00:00:00Z", 1, 0),
                ("2024-01-02T00:00:00Z", 0, 0),
                ("2024-01-03T00:00:00Z", 1, 1),
            ],
        )
        .await;

        let resp = server.get("/api/motion/statistics").await;
        resp.assert_status_ok();
        assert_eq!(
            resp.json::<Value>()["data"],
            json!({
                "totalRecords": 3,
                "movimientoDetectado": 2,
                "alarmaActivada": 1,
                "porcentajeMovimiento": 66.67,
                "porcentajeAlarma": 33.33,
            })
        );
    }

    #[tokio::test]
    async fn statistics_within_range() {
        let server = test_server();
        seed(
            &server,
            &[
                ("2024-01-01T00:00:00Z", 1, 1),
                ("2024-03-01T00:00:00Z", 0, 0),
            ],
        )
        .await;

        let resp = server
            .get("/api/motion/statistics")
            .add_query_param("startDate", "2024-01-01")
            .add_query_param("endDate", "2024-01-31")
            .await;
        resp.assert_status_ok();
        let data = &resp.json::<Value>()["data"];
        assert_eq!(data["totalRecords"], 1);
        assert_eq!(data["porcentajeAlarma"], 100.0);
    }

    #[tokio::test]
    async fn statistics_with_single_bound_is_400() {
        let server = test_server();
        let resp = server
            .get("/api/motion/statistics")
            .add_query_param("endDate", "2024-01-31")
            .await;
        resp.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn statistics_empty_are_zero() {
        let server = test_server();
        let resp = server.get("/api/motion/statistics").await;
        resp.assert_status_ok();
        let data = &resp.json::<Value>()["data"];
        assert_eq!(data["porcentajeMovimiento"], 0.0);
        assert_eq!(data["porcentajeAlarma"], 0.0);
    }
}
