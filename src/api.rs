// Report API - axum routes over the aggregation engine
//
// Every request opens its own read-only connection on a blocking worker and
// runs the report there. Once the configured deadline passes the request gives
// up and cancels the worker's store, which interrupts SQLite and refuses any
// further fetch. The connection is dropped with the worker's closure.

use crate::config::ReportsConfig;
use crate::dashboard::{build_dashboard, DashboardSnapshot};
use crate::db::{CancelToken, SqliteStore};
use crate::entities::PlatePenaltySummaryRecord;
use crate::error::{ReportError, ReportResult};
use crate::filter::DateRange;
use crate::reports::{
    category_counts, daily_series, plate_counts, plate_lookup, plate_penalty_list, plate_tally,
    user_counts, CategoryCount, DailySeries, DataKind, PlateCount, PlateOption, PlateTally,
    UserCount,
};
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info_span, warn, Instrument};
use uuid::Uuid;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    db_path: Arc<PathBuf>,
    request_timeout: Duration,
    lookup_limit: usize,
}

impl AppState {
    pub fn new(config: &ReportsConfig) -> Self {
        Self {
            db_path: Arc::new(config.database.path.clone()),
            request_timeout: config.server.request_timeout(),
            lookup_limit: config.lookup.limit,
        }
    }
}

/// API Response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn err(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

/// ReportError carried to the HTTP edge
pub struct ApiError(ReportError);

impl From<ReportError> for ApiError {
    fn from(err: ReportError) -> Self {
        ApiError(err)
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError(ReportError::invalid_parameter("query", rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        };

        if !self.0.is_client_error() {
            warn!(error = %self.0, "report failed");
        }

        (status, Json(ApiResponse::<()>::err(self.0.to_string()))).into_response()
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

// ============================================================================
// Query parameters
// ============================================================================

/// `?startDate=` or `?plakaId=` (empty) means the same as leaving the
/// parameter out
fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s
            .parse::<T>()
            .map(Some)
            .map_err(|e| serde::de::Error::custom(format!("invalid value '{}': {}", s, e))),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateQuery {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub end_date: Option<NaiveDate>,
}

impl DateQuery {
    fn range(&self) -> DateRange {
        DateRange::new(self.start_date, self.end_date)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TallyQuery {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub plaka_id: Option<i64>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyQuery {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub data_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LookupQuery {
    #[serde(default)]
    pub term: String,
}

// ============================================================================
// Scoped store access
// ============================================================================

async fn with_store<T, F>(state: &AppState, report: &'static str, run: F) -> ReportResult<T>
where
    T: Send + 'static,
    F: FnOnce(&SqliteStore) -> ReportResult<T> + Send + 'static,
{
    let request_id = Uuid::new_v4();
    let span = info_span!("report", %request_id, report);

    let cancel = CancelToken::new();
    let worker_cancel = cancel.clone();
    let db_path = Arc::clone(&state.db_path);

    let worker_span = span.clone();
    let task = tokio::task::spawn_blocking(move || {
        let _entered = worker_span.enter();
        let store = SqliteStore::open_read_only(&db_path)?.with_cancel(worker_cancel);
        run(&store)
    });

    match tokio::time::timeout(state.request_timeout, task)
        .instrument(span)
        .await
    {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(ReportError::StoreUnavailable(format!(
            "report worker failed: {}",
            join_err
        ))),
        Err(_) => {
            cancel.cancel();
            warn!(%request_id, report, "report deadline passed, fetch cancelled");
            Err(ReportError::Timeout(state.request_timeout))
        }
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/dashboard - All-time snapshot
async fn get_dashboard(State(state): State<AppState>) -> ApiResult<DashboardSnapshot> {
    let snapshot = with_store(&state, "dashboard", |store| build_dashboard(store)).await?;
    Ok(Json(ApiResponse::ok(snapshot)))
}

/// GET /api/reports/users?startDate&endDate
async fn get_user_report(
    State(state): State<AppState>,
    query: Result<Query<DateQuery>, QueryRejection>,
) -> ApiResult<Vec<UserCount>> {
    let range = query?.range();
    let rows = with_store(&state, "users", move |store| user_counts(store, &range)).await?;
    Ok(Json(ApiResponse::ok(rows)))
}

/// GET /api/reports/plates?startDate&endDate
async fn get_plate_report(
    State(state): State<AppState>,
    query: Result<Query<DateQuery>, QueryRejection>,
) -> ApiResult<Vec<PlateCount>> {
    let range = query?.range();
    let rows = with_store(&state, "plates", move |store| plate_counts(store, &range)).await?;
    Ok(Json(ApiResponse::ok(rows)))
}

/// GET /api/reports/categories?startDate&endDate
async fn get_category_report(
    State(state): State<AppState>,
    query: Result<Query<DateQuery>, QueryRejection>,
) -> ApiResult<Vec<CategoryCount>> {
    let range = query?.range();
    let rows = with_store(&state, "categories", move |store| category_counts(store, &range)).await?;
    Ok(Json(ApiResponse::ok(rows)))
}

/// GET /api/reports/plate-tally?plakaId&startDate&endDate
async fn get_plate_tally(
    State(state): State<AppState>,
    query: Result<Query<TallyQuery>, QueryRejection>,
) -> ApiResult<PlateTally> {
    let Query(params) = query?;
    let range = DateRange::new(params.start_date, params.end_date);
    let plate_id = params.plaka_id;

    let tally = with_store(&state, "plate-tally", move |store| plate_tally(store, plate_id, &range)).await?;
    Ok(Json(ApiResponse::ok(tally)))
}

/// GET /api/reports/daily?startDate&endDate&dataType
async fn get_daily_series(
    State(state): State<AppState>,
    query: Result<Query<DailyQuery>, QueryRejection>,
) -> ApiResult<DailySeries> {
    let Query(params) = query?;
    // reject a bad selector before touching the store
    let kind = match params.data_type.as_deref() {
        None => DataKind::default(),
        Some(raw) => raw.parse::<DataKind>()?,
    };
    let range = DateRange::new(params.start_date, params.end_date);

    let series = with_store(&state, "daily", move |store| daily_series(store, kind, &range)).await?;
    Ok(Json(ApiResponse::ok(series)))
}

/// GET /api/plates?term - Plate autocomplete
async fn get_plate_options(
    State(state): State<AppState>,
    query: Result<Query<LookupQuery>, QueryRejection>,
) -> ApiResult<Vec<PlateOption>> {
    let Query(params) = query?;
    let limit = state.lookup_limit;

    let options = with_store(&state, "plate-lookup", move |store| {
        plate_lookup(store, &params.term, limit)
    })
    .await?;
    Ok(Json(ApiResponse::ok(options)))
}

/// GET /api/plate-penalties - Raw plate/penalty rows
async fn get_plate_penalties(
    State(state): State<AppState>,
) -> ApiResult<Vec<PlatePenaltySummaryRecord>> {
    let rows = with_store(&state, "plate-penalties", |store| plate_penalty_list(store)).await?;
    Ok(Json(ApiResponse::ok(rows)))
}

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/dashboard", get(get_dashboard))
        .route("/reports/users", get(get_user_report))
        .route("/reports/plates", get(get_plate_report))
        .route("/reports/categories", get(get_category_report))
        .route("/reports/plate-tally", get(get_plate_tally))
        .route("/reports/daily", get(get_daily_series))
        .route("/plates", get(get_plate_options))
        .route("/plate-penalties", get(get_plate_penalties))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{insert_audits, insert_inspections, insert_plates, insert_users, setup_database};
    use crate::entities::{timestamp, AuditRecord, InspectionRecord, PlateRecord, UserRecord};
    use crate::store::RecordStore;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    fn seeded_state(dir: &tempfile::TempDir) -> AppState {
        let path = dir.path().join("audits.db");
        let store = SqliteStore::open(&path).unwrap();
        let conn = store.connection();
        setup_database(conn).unwrap();

        let ts = |s: &str| timestamp::parse(s).unwrap();
        insert_audits(
            conn,
            &[
                AuditRecord { id: 1, audit_type_id: 401, plate_id: Some(1), created_at: ts("2024-01-01 10:00:00") },
                AuditRecord { id: 2, audit_type_id: 401, plate_id: Some(1), created_at: ts("2024-01-01 11:00:00") },
                AuditRecord { id: 3, audit_type_id: 401, plate_id: Some(1), created_at: ts("2024-01-02 10:00:00") },
                AuditRecord { id: 4, audit_type_id: 402, plate_id: Some(1), created_at: ts("2024-01-01 12:00:00") },
            ],
        )
        .unwrap();
        insert_inspections(
            conn,
            &[
                InspectionRecord { id: 1, plate_id: Some(1), user_id: Some(1), created_at: ts("2024-01-31 23:59:59") },
                InspectionRecord { id: 2, plate_id: Some(1), user_id: Some(1), created_at: ts("2024-02-01 00:00:00") },
            ],
        )
        .unwrap();
        insert_plates(conn, &[PlateRecord { id: 1, plate_number: "34 TR 001".into() }]).unwrap();
        insert_users(conn, &[UserRecord { id: 1, full_name: "Elif Sahin".into() }]).unwrap();
        drop(store);

        let mut config = ReportsConfig::default();
        config.database.path = path;
        AppState::new(&config)
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_daily_series_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(seeded_state(&dir));

        let (status, body) = get_json(app, "/api/reports/daily?dataType=violation").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["labels"], serde_json::json!(["2024-01-01", "2024-01-02"]));
        assert_eq!(body["data"]["values"], serde_json::json!([2, 1]));
    }

    #[tokio::test]
    async fn test_bogus_data_type_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(seeded_state(&dir));

        let (status, body) = get_json(app, "/api/reports/daily?dataType=bogus").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("dataType"));
    }

    #[tokio::test]
    async fn test_user_report_end_date_is_inclusive() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(seeded_state(&dir));

        let (status, body) =
            get_json(app, "/api/reports/users?startDate=2024-01-01&endDate=2024-01-31").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["data"],
            serde_json::json!([{"full_name": "Elif Sahin", "count": 1}])
        );
    }

    #[tokio::test]
    async fn test_empty_date_parameters_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(seeded_state(&dir));

        let (status, body) = get_json(app, "/api/reports/plates?startDate=&endDate=").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["count"], 2);
    }

    #[tokio::test]
    async fn test_malformed_date_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(seeded_state(&dir));

        let (status, _) = get_json(app, "/api/reports/categories?startDate=31-01-2024").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_plate_tally_for_unknown_plate() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(seeded_state(&dir));

        let (status, body) = get_json(app, "/api/reports/plate-tally?plakaId=999").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["data"],
            serde_json::json!({"violationCount": 0, "warningCount": 0, "inspectionCount": 0})
        );
    }

    #[tokio::test]
    async fn test_dashboard_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(seeded_state(&dir));

        let (status, body) = get_json(app, "/api/dashboard").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["violation_count"], 3);
        assert_eq!(body["data"]["warning_count"], 1);
        assert_eq!(body["data"]["inspection_count"], 2);
        assert_eq!(body["data"]["plate_count"], 1);
    }

    #[tokio::test]
    async fn test_plate_lookup_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(seeded_state(&dir));

        let (status, body) = get_json(app, "/api/plates?term=TR").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], serde_json::json!([{"value": 1, "text": "34 TR 001"}]));
    }

    #[tokio::test]
    async fn test_missing_database_is_service_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ReportsConfig::default();
        config.database.path = dir.path().join("missing.db");
        let app = router(AppState::new(&config));

        let (status, body) = get_json(app, "/api/plate-penalties").await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_empty_plate_id_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(seeded_state(&dir));

        let (status, body) =
            get_json(app, "/api/reports/plate-tally?plakaId=&startDate=&endDate=").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["violationCount"], 0);
    }

    #[tokio::test]
    async fn test_non_numeric_plate_id_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(seeded_state(&dir));

        let (status, body) = get_json(app, "/api/reports/plate-tally?plakaId=abc").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_slow_report_times_out_and_cancels_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = seeded_state(&dir);
        state.request_timeout = Duration::from_millis(10);
        let (sender, receiver) = std::sync::mpsc::channel();

        let err = with_store(&state, "slow", move |store| {
            std::thread::sleep(Duration::from_millis(200));
            let _ = sender.send(store.plates().map(|plates| plates.len()));
            Ok(())
        })
        .await
        .unwrap_err();

        assert!(matches!(err, ReportError::Timeout(_)));
        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        // the abandoned worker finishes its sleep, then finds its store cancelled
        let late_fetch = receiver.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(late_fetch, Err(ReportError::Cancelled)));
    }

    #[tokio::test]
    async fn test_fast_report_beats_deadline() {
        let dir = tempfile::tempdir().unwrap();
        let state = seeded_state(&dir);

        let plates = with_store(&state, "plates", |store| store.plates()).await.unwrap();

        assert_eq!(plates.len(), 1);
    }
}
