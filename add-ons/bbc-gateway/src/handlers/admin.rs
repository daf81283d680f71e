//! Admin dashboard statistics, CSV export and health check.

use crate::handlers::pages::check_images;
use crate::AppState;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bbc_core::{RegistrationStats, StoreError};
use std::path::Path;

fn error_response(e: &StoreError) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": e.to_string() })),
    )
        .into_response()
}

/// GET /admin – registration totals, breakdowns and latest entries.
pub(crate) async fn admin(State(state): State<AppState>) -> Response {
    if let Err(e) = state.store.init() {
        tracing::error!(target: "bbc::admin", error = %e, "Admin stats failed");
        return error_response(&e);
    }
    if state.store.is_empty_file() {
        return Json(serde_json::json!({
            "total": 0,
            "message": "Aucune inscription enregistrée pour le moment",
            "status": "empty",
        }))
        .into_response();
    }

    let records = match state.store.load_all() {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(target: "bbc::admin", error = %e, "Admin stats failed");
            return error_response(&e);
        }
    };
    let csv_path = state.store.path().display().to_string();
    let today = chrono::Local::now().date_naive();
    match RegistrationStats::from_records(&records, today, &csv_path) {
        Some(stats) => {
            tracing::info!(target: "bbc::admin", total = stats.total, "Admin stats served");
            Json(stats).into_response()
        }
        None => Json(serde_json::json!({ "total": 0, "message": "Aucune inscription" })).into_response(),
    }
}

/// GET /export – the raw CSV as a dated attachment.
pub(crate) async fn export(State(state): State<AppState>) -> Response {
    if let Err(e) = state.store.init() {
        tracing::error!(target: "bbc::admin", error = %e, "Export failed");
        return error_response(&e);
    }
    if state.store.is_empty_file() {
        return (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "Aucune donnée à exporter pour le moment" })),
        )
            .into_response();
    }
    let bytes = match state.store.read_raw() {
        Ok(b) => b,
        Err(e) => {
            tracing::error!(target: "bbc::admin", error = %e, "Export failed");
            return error_response(&e);
        }
    };
    let filename = format!(
        "bbc_school_inscriptions_{}.csv",
        chrono::Local::now().format("%Y%m%d_%H%M")
    );
    tracing::info!(target: "bbc::admin", filename = %filename, "CSV export requested");
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        bytes,
    )
        .into_response()
}

/// GET /health – liveness plus data and asset checks.
pub(crate) async fn health(State(state): State<AppState>) -> Response {
    let probe = || -> Result<serde_json::Value, StoreError> {
        state.store.init()?;
        let static_dir = Path::new(&state.config.static_dir);
        let images_ok = check_images(static_dir);
        Ok(serde_json::json!({
            "status": "healthy",
            "timestamp": chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
            "images_ok": images_ok,
            "csv_exists": state.store.exists(),
            "inscriptions_count": state.store.count()?,
            "debug_images": check_images(static_dir),
        }))
    };
    match probe() {
        Ok(body) => Json(body).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "status": "error", "error": e.to_string() })),
        )
            .into_response(),
    }
}
