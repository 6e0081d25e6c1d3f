use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

use crate::dashboard::DashboardError;

/// Unified error type for API responses.  Every variant renders as
/// `{"error": "<message>"}`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    Conflict(String),
    BadGateway(String),
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::BadGateway(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &str {
        match self {
            Self::BadRequest(m)
            | Self::Unauthorized(m)
            | Self::Conflict(m)
            | Self::BadGateway(m)
            | Self::Internal(m) => m,
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status(), self.message())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({ "error": self.message() });
        (self.status(), axum::Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        error!(error = %format!("{e:#}"), "internal error");
        Self::Internal("An internal error occurred. Please try again.".to_string())
    }
}

impl From<DashboardError> for ApiError {
    fn from(e: DashboardError) -> Self {
        match e {
            DashboardError::EmptyTicker
            | DashboardError::DateOrder { .. }
            | DashboardError::InvalidParameter { .. } => Self::BadRequest(e.to_string()),
            DashboardError::Fetch(_) => Self::BadGateway(e.to_string()),
            DashboardError::Compute(_) => Self::Internal(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn dashboard_errors_map_to_statuses() {
        let d = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        let date_order: ApiError = DashboardError::DateOrder { start: d, end: d }.into();
        assert_eq!(date_order.status(), StatusCode::BAD_REQUEST);
        assert_eq!(date_order.message(), "Start date must be before end date.");

        let fetch: ApiError = DashboardError::Fetch("timeout".into()).into();
        assert_eq!(fetch.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn anyhow_errors_hide_details() {
        let err: ApiError = anyhow::anyhow!("disk I/O error at /var/db").into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.message().contains("/var/db"));
    }
}
