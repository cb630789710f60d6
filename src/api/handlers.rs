use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use url::Url;

use crate::engine::ScanResult;
use crate::fetcher;
use crate::hooks::ScanRecord;
use crate::report::ScanReport;

use super::error::ApiError;
use super::requests::{EmailScanRequest, FileScanRequest, UrlScanRequest};
use super::AppState;

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Run a scan off the async workers; file bodies can be large.
async fn run_scan<F>(scan: F) -> Result<ScanResult, ApiError>
where
    F: FnOnce() -> ScanResult + Send + 'static,
{
    tokio::task::spawn_blocking(scan)
        .await
        .map_err(|e| ApiError::Internal(format!("scan task failed: {e}")))
}

fn log_verdict(result: &ScanResult) {
    if result.is_phishing {
        log::info!(
            "Phishing {} detected: {} (score {}, {} signals)",
            result.subject_kind,
            result.subject_identifier,
            result.total_score,
            result.signals.len()
        );
    }
}

pub async fn scan_url(
    State(state): State<AppState>,
    payload: Result<Json<UrlScanRequest>, JsonRejection>,
) -> Result<Json<ScanReport>, ApiError> {
    let Json(request) = payload?;
    let url = request
        .target()
        .ok_or_else(|| ApiError::BadRequest("URL is required".to_string()))?
        .to_string();
    Url::parse(&url).map_err(|_| ApiError::BadRequest("Invalid URL format".to_string()))?;

    let page = fetcher::page_content(state.fetcher.as_deref(), &url).await;

    let engine = state.engine;
    let result = run_scan(move || engine.scan_url(&url, &page)).await?;
    log_verdict(&result);

    let report = ScanReport::from_result(&result);
    state.hooks.dispatch(ScanRecord::new(result));
    Ok(Json(report))
}

pub async fn scan_file(
    State(state): State<AppState>,
    payload: Result<Json<FileScanRequest>, JsonRejection>,
) -> Result<Json<ScanReport>, ApiError> {
    let Json(request) = payload?;
    let content = request
        .content()
        .ok_or_else(|| ApiError::BadRequest("File content is required".to_string()))?
        .to_string();
    let file_name = request.file_name().to_string();

    let engine = state.engine;
    let result = run_scan(move || engine.scan_file(&file_name, &content)).await?;
    log_verdict(&result);

    let report = ScanReport::from_result(&result);
    state.hooks.dispatch(ScanRecord::new(result));
    Ok(Json(report))
}

pub async fn scan_email(
    State(state): State<AppState>,
    payload: Result<Json<EmailScanRequest>, JsonRejection>,
) -> Result<Json<ScanReport>, ApiError> {
    let Json(request) = payload?;
    let submission = request.submission()?;

    let engine = state.engine;
    let scan_input = submission.clone();
    let result = run_scan(move || scan_input.scan(&engine)).await?;
    log_verdict(&result);

    let (record, report) = submission.conclude(result, &state.hooks);
    state.hooks.dispatch(record);
    Ok(Json(report))
}
