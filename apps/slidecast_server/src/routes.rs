use axum::body::Bytes;
use axum::extract::State;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde::Serialize;
use slidecast_core::ExportRequest;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::ExportError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ExportResponse {
    /// `data:video/mp4;base64,...`
    pub result: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(liveness))
        .route("/export-video", post(export_video))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// GET /
async fn liveness() -> &'static str {
    "slidecast export service is running"
}

/// POST /export-video
///
/// The body is parsed by hand so malformed JSON gets the same 400 shape as
/// a missing field.
async fn export_video(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ExportResponse>, ExportError> {
    let request = ExportRequest::from_json(&body)
        .inspect_err(|e| tracing::warn!(error = %e, "rejected export request"))?;
    let video = state.exporter.export(request).await?;
    Ok(Json(ExportResponse {
        result: video.data_uri(),
    }))
}
