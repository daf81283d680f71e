//! Landing page, image test page and the static asset check.

use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use std::path::Path;

/// Images the landing page expects under the static directory.
pub(crate) const REQUIRED_IMAGES: [(&str, &str); 3] = [
    ("logo", "logo-BBC-School.jpg"),
    ("background", "imag-back-bbc-school.jpg"),
    ("header_facebook", "header-page-facebook.jpg"),
];

/// Logs each missing image and returns true when all are present.
pub(crate) fn check_images(static_dir: &Path) -> bool {
    let mut found = Vec::new();
    let mut missing = Vec::new();
    for (name, file) in REQUIRED_IMAGES {
        let path = static_dir.join(file);
        match std::fs::metadata(&path) {
            Ok(meta) if meta.is_file() => found.push(format!("{}: {} bytes", name, meta.len())),
            _ => {
                tracing::warn!(target: "bbc::gateway", path = %path.display(), "Missing image");
                missing.push(name);
            }
        }
    }
    if missing.is_empty() {
        tracing::debug!(target: "bbc::gateway", "All images found: {}", found.join(", "));
        true
    } else {
        tracing::error!(
            target: "bbc::gateway",
            "Missing images: {} (file names use dashes, e.g. 'logo-BBC-School.jpg')",
            missing.join(", ")
        );
        false
    }
}

async fn render(templates_dir: &str, file: &str) -> Response {
    let path = Path::new(templates_dir).join(file);
    match tokio::fs::read_to_string(&path).await {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!(target: "bbc::gateway", path = %path.display(), error = %e, "Template unavailable");
            (StatusCode::NOT_FOUND, Html("<h1>Page introuvable</h1>".to_string())).into_response()
        }
    }
}

/// GET / – makes sure the CSV exists, checks images, serves `index.html`.
pub(crate) async fn index(State(state): State<AppState>) -> Response {
    if let Err(e) = state.store.init() {
        tracing::error!(target: "bbc::store", error = %e, "Registrations CSV could not be initialized");
    }
    check_images(Path::new(&state.config.static_dir));
    render(&state.config.templates_dir, "index.html").await
}

/// GET /test-image
pub(crate) async fn test_image(State(state): State<AppState>) -> Response {
    render(&state.config.templates_dir, "test-image.html").await
}
