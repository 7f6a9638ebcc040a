// src/server.rs
//
// HTTP surface. Every request triggers a fresh refresh; nothing is cached
// between requests, and every response says so.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{convert::Infallible, net::SocketAddr, sync::Arc};
use tracing::{error, info, warn};
use warp::{
    http::StatusCode,
    reply::{self, Reply, Response},
    Filter, Rejection,
};

use crate::aggregate::{
    aggregate, filter_options, AggregateRules, AggregateView, FilterOptions, FilterState,
};
use crate::error::{IngestError, UnavailableKind};
use crate::ingest::Record;
use crate::pipeline::Pipeline;

pub const SERVICE_NAME: &str = "salesboard";

pub struct AppState {
    pub pipeline: Pipeline,
    pub rules: AggregateRules,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SalesResponse {
    data: Vec<Record>,
    fetched_at: DateTime<Utc>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SummaryResponse {
    view: AggregateView,
    options: FilterOptions,
    fetched_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<u16>,
}

/// HTTP status reported for an ingest failure.
pub fn status_for(err: &IngestError) -> StatusCode {
    match err {
        IngestError::SourceUnavailable {
            kind: UnavailableKind::Timeout,
            ..
        } => StatusCode::GATEWAY_TIMEOUT,
        IngestError::SourceUnavailable { .. } => StatusCode::BAD_GATEWAY,
        IngestError::MalformedSource(_) => StatusCode::UNPROCESSABLE_ENTITY,
        IngestError::RefreshInProgress => StatusCode::CONFLICT,
    }
}

fn error_reply(err: &IngestError) -> Response {
    let code = status_for(err);
    if err.is_permission_denied() {
        warn!(%err, "sheet is not readable; check its sharing settings");
    } else {
        error!(%err, status = code.as_u16(), "refresh failed");
    }
    let body = ErrorResponse {
        error: err.to_string(),
        kind: err.kind_tag(),
        status: err.upstream_status(),
    };
    reply::with_status(reply::json(&body), code).into_response()
}

async fn health() -> Result<Response, Rejection> {
    Ok(reply::json(&serde_json::json!({
        "status": "healthy",
        "service": SERVICE_NAME
    }))
    .into_response())
}

async fn list_sales(state: Arc<AppState>) -> Result<Response, Rejection> {
    match state.pipeline.refresh().await {
        Ok(data) => {
            info!(records = data.len(), "serving records");
            Ok(reply::json(&SalesResponse {
                data,
                fetched_at: Utc::now(),
            })
            .into_response())
        }
        Err(err) => Ok(error_reply(&err)),
    }
}

async fn sales_summary(
    filters: FilterState,
    state: Arc<AppState>,
) -> Result<Response, Rejection> {
    match state.pipeline.refresh().await {
        Ok(records) => {
            let view = aggregate(&records, &filters, &state.rules);
            info!(
                records = records.len(),
                selected = view.kpis.total,
                filtered = !filters.is_empty(),
                "serving summary"
            );
            Ok(reply::json(&SummaryResponse {
                options: filter_options(&records),
                view,
                fetched_at: Utc::now(),
            })
            .into_response())
        }
        Err(err) => Ok(error_reply(&err)),
    }
}

async fn handle_rejection(rejection: Rejection) -> Result<Response, Infallible> {
    let (code, message) = if rejection.is_not_found() {
        (StatusCode::NOT_FOUND, "not found".to_string())
    } else if let Some(e) = rejection.find::<warp::reject::InvalidQuery>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if rejection.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "method not allowed".to_string())
    } else {
        warn!(?rejection, "unhandled rejection");
        (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
    };
    let body = ErrorResponse {
        error: message,
        kind: "request",
        status: None,
    };
    Ok(reply::with_status(reply::json(&body), code).into_response())
}

fn with_state(
    state: Arc<AppState>,
) -> impl Filter<Extract = (Arc<AppState>,), Error = Infallible> + Clone {
    warp::any().map(move || Arc::clone(&state))
}

pub fn routes(
    state: Arc<AppState>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let health = warp::path!("health").and(warp::get()).and_then(health);

    let sales = warp::path!("api" / "sales")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(list_sales);

    let summary = warp::path!("api" / "sales" / "summary")
        .and(warp::get())
        .and(warp::query::<FilterState>())
        .and(with_state(state))
        .and_then(sales_summary);

    health
        .or(sales)
        .unify()
        .or(summary)
        .unify()
        .recover(handle_rejection)
        .unify()
        .with(reply::with::header("cache-control", "no-store"))
        .with(warp::trace::request())
}

pub async fn serve(state: Arc<AppState>, addr: SocketAddr) {
    info!(%addr, "listening");
    info!("health: http://{}/health", addr);
    warp::serve(routes(state)).run(addr).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::MemorySource;
    use crate::ingest::IngestRules;
    use std::time::Duration;

    const ROWS: &[&[&str]] = &[
        &["No", "캠핑장명", "광역", "시군", "담당", "결과", "사유", "비고"],
        &["", "", "", "", "", "", "", ""],
        &["1", "솔숲캠핑", "강원", "평창", "김", "입점(신규)", "", "관심 있음"],
        &["2", "바다캠핑", "부산", "기장", "이", "거절", "수수료", "수수료 부담으로 거절"],
        &["3", "별빛캠핑", "강원", "홍천", "김", "거절", "타 플랫폼", ""],
    ];

    fn state(source: MemorySource) -> Arc<AppState> {
        Arc::new(AppState {
            pipeline: Pipeline::new(Arc::new(source), "sheet", "0", IngestRules::default()),
            rules: AggregateRules::default(),
        })
    }

    async fn get(
        state: Arc<AppState>,
        path: &str,
    ) -> (StatusCode, warp::http::HeaderMap, serde_json::Value) {
        let resp = warp::test::request()
            .method("GET")
            .path(path)
            .reply(&routes(state))
            .await;
        let body = serde_json::from_slice(resp.body()).unwrap();
        (resp.status(), resp.headers().clone(), body)
    }

    #[tokio::test]
    async fn health_reports_service() {
        crate::init_test_tracing();
        let (status, headers, body) = get(state(MemorySource::from_rows(ROWS)), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(headers["cache-control"], "no-store");
    }

    #[tokio::test]
    async fn sales_returns_records() {
        crate::init_test_tracing();
        let (status, headers, body) =
            get(state(MemorySource::from_rows(ROWS)), "/api/sales").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers["cache-control"], "no-store");
        let data = body["data"].as_array().unwrap();
        assert_eq!(data.len(), 3);
        assert_eq!(data[0]["id"], 1);
        assert_eq!(data[0]["siteName"], "솔숲캠핑");
        assert_eq!(data[1]["reason"], "수수료");
        assert!(body["fetchedAt"].is_string());
    }

    #[tokio::test]
    async fn summary_applies_query_filters() {
        crate::init_test_tracing();
        let (status, _, body) = get(
            state(MemorySource::from_rows(ROWS)),
            "/api/sales/summary?region=%EA%B0%95%EC%9B%90",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["view"]["kpis"]["total"], 2);
        assert_eq!(body["view"]["ranking"][0]["name"], "김");
        assert_eq!(body["view"]["ranking"][0]["conversionRate"], "50.0");
        // options always describe the unfiltered data
        assert_eq!(
            body["options"]["regions"],
            serde_json::json!(["강원", "부산"])
        );
        assert_eq!(
            body["options"]["districts"],
            serde_json::json!(["기장", "평창", "홍천"])
        );
        assert_eq!(body["view"]["insights"]["signals"]["hasNotes"], true);
    }

    #[tokio::test]
    async fn summary_without_query_covers_everything() {
        crate::init_test_tracing();
        let (status, _, body) =
            get(state(MemorySource::from_rows(ROWS)), "/api/sales/summary").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["view"]["kpis"]["total"], 3);
        assert_eq!(body["view"]["topReasons"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn permission_denied_is_a_bad_gateway() {
        crate::init_test_tracing();
        let src = MemorySource::failing(IngestError::unavailable(
            UnavailableKind::PermissionDenied,
            "sign-in page",
        ));
        let (status, headers, body) = get(state(src), "/api/sales").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(headers["cache-control"], "no-store");
        assert_eq!(body["kind"], "permission_denied");
        assert!(body.get("status").is_none());
    }

    #[tokio::test]
    async fn upstream_status_is_reported() {
        crate::init_test_tracing();
        let src = MemorySource::failing(IngestError::unavailable(
            UnavailableKind::Status(500),
            "boom",
        ));
        let (status, _, body) = get(state(src), "/api/sales/summary").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["kind"], "http_status");
        assert_eq!(body["status"], 500);
    }

    #[tokio::test]
    async fn malformed_sheet_is_unprocessable() {
        crate::init_test_tracing();
        let src = MemorySource::from_rows(&[&["just"], &["some"], &["text"]]);
        let (status, _, body) = get(state(src), "/api/sales").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["kind"], "malformed_source");
    }

    #[tokio::test]
    async fn overlapping_refresh_conflicts() {
        crate::init_test_tracing();
        let st = state(MemorySource::from_rows(ROWS).with_delay(Duration::from_millis(300)));
        let (slow, (status, _, body)) = tokio::join!(get(st.clone(), "/api/sales"), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            get(st.clone(), "/api/sales").await
        });
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["kind"], "refresh_in_progress");
        assert_eq!(slow.0, StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_path_is_json_404() {
        crate::init_test_tracing();
        let (status, headers, body) =
            get(state(MemorySource::from_rows(ROWS)), "/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(headers["cache-control"], "no-store");
        assert_eq!(body["kind"], "request");
    }

    #[test]
    fn status_mapping() {
        let t = |kind| status_for(&IngestError::unavailable(kind, ""));
        assert_eq!(t(UnavailableKind::Timeout), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(t(UnavailableKind::Transport), StatusCode::BAD_GATEWAY);
        assert_eq!(t(UnavailableKind::Status(404)), StatusCode::BAD_GATEWAY);
        assert_eq!(
            status_for(&IngestError::RefreshInProgress),
            StatusCode::CONFLICT
        );
    }
}
