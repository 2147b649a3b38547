use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use slidecast_core::CoreError;
use slidecast_fetch::FetchError;
use slidecast_render::RenderError;
use thiserror::Error;

/// Any failure of one export, from request parsing to the encoded result.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

impl ExportError {
    /// Whether the caller sent something we cannot process, as opposed to a
    /// failure while processing a valid request.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ExportError::Core(CoreError::InvalidInput(_))
                | ExportError::Fetch(FetchError::InvalidReference { .. })
        )
    }

    /// Pipeline stage the error came from, for logs.
    pub fn stage(&self) -> &'static str {
        match self {
            ExportError::Core(CoreError::InvalidInput(_)) => "validate",
            ExportError::Core(CoreError::WorkspaceCreateFailed { .. }) => "workspace",
            ExportError::Core(_) => "setup",
            ExportError::Fetch(FetchError::InvalidReference { .. }) => "resolve",
            ExportError::Fetch(_) => "fetch",
            ExportError::Render(RenderError::RenderFailed { .. })
            | ExportError::Render(RenderError::NoSegments) => "render",
            ExportError::Render(RenderError::ConcatFailed(_)) => "concat",
            ExportError::Render(RenderError::MuxFailed(_)) => "mux",
            ExportError::Render(RenderError::ReadFailed { .. }) => "encode",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub details: String,
}

impl IntoResponse for ExportError {
    fn into_response(self) -> Response {
        let (status, error) = if self.is_client_error() {
            (StatusCode::BAD_REQUEST, "Invalid input data")
        } else {
            (StatusCode::INTERNAL_SERVER_ERROR, "Export failed")
        };
        let body = ErrorBody {
            error,
            details: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors() {
        let invalid: ExportError = CoreError::InvalidInput("imageList is required".into()).into();
        assert!(invalid.is_client_error());
        assert_eq!(invalid.stage(), "validate");

        let reference: ExportError = FetchError::InvalidReference {
            reference: "a.jpg".into(),
            reason: "no base".into(),
        }
        .into();
        assert!(reference.is_client_error());
        assert_eq!(reference.stage(), "resolve");
    }

    #[test]
    fn pipeline_errors_are_server_errors() {
        let fetch: ExportError = FetchError::FetchFailed {
            url: "https://x/a.jpg".into(),
            status: 404,
        }
        .into();
        assert!(!fetch.is_client_error());
        assert_eq!(fetch.stage(), "fetch");
        assert_eq!(fetch.to_string(), "failed to download https://x/a.jpg: HTTP 404");

        let render: ExportError = RenderError::RenderFailed {
            index: 3,
            diagnostic: "boom".into(),
        }
        .into();
        assert!(!render.is_client_error());
        assert_eq!(render.stage(), "render");

        let concat: ExportError = RenderError::ConcatFailed("x".into()).into();
        assert_eq!(concat.stage(), "concat");
        let mux: ExportError = RenderError::MuxFailed("x".into()).into();
        assert_eq!(mux.stage(), "mux");
    }

    #[test]
    fn response_status() {
        let resp = ExportError::from(CoreError::InvalidInput("x".into())).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = ExportError::from(RenderError::MuxFailed("x".into())).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
