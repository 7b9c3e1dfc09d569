use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ─── Error categories ────────────────────────────────────────────

/// Closed set of failure classifications used for error-count
/// aggregation. Purely an observability dimension; control flow runs
/// on `RelayError`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Api,
    Config,
    Protocol,
    Validation,
    NotFound,
    RateLimit,
    Network,
    Internal,
}

impl ErrorCategory {
    pub const ALL: [ErrorCategory; 8] = [
        Self::Api,
        Self::Config,
        Self::Protocol,
        Self::Validation,
        Self::NotFound,
        Self::RateLimit,
        Self::Network,
        Self::Internal,
    ];

    /// Stable slot index into the registry's per-category counters.
    pub(crate) fn index(self) -> usize {
        self as usize
    }

    /// Classify an HTTP-like status code. Total: every input maps to
    /// exactly one category.
    pub fn from_status(status: u16) -> Self {
        match status {
            404 => Self::NotFound,
            429 => Self::RateLimit,
            400..=499 => Self::Validation,
            s if s >= 500 => Self::Api,
            _ => Self::Internal,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Api => "api",
            Self::Config => "config",
            Self::Protocol => "protocol",
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::RateLimit => "rate_limit",
            Self::Network => "network",
            Self::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Unified error type ──────────────────────────────────────────

/// Every failure the relay can report, one variant per cause. The
/// variant itself is the category tag, which makes classification a
/// total function instead of a runtime type check.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("upstream api error: {0}")]
    Api(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("chat protocol error: {0}")]
    Protocol(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimit { retry_after_secs: u64 },

    #[error("network error: {0}")]
    Network(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("simulation already running")]
    SimulationRunning,
}

impl RelayError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Api(_) => ErrorCategory::Api,
            Self::Config(_) => ErrorCategory::Config,
            Self::Protocol(_) => ErrorCategory::Protocol,
            Self::Validation(_) | Self::SimulationRunning => ErrorCategory::Validation,
            Self::NotFound(_) => ErrorCategory::NotFound,
            Self::RateLimit { .. } => ErrorCategory::RateLimit,
            Self::Network(_) => ErrorCategory::Network,
            Self::Internal(_) => ErrorCategory::Internal,
        }
    }

    /// Build the matching error for an HTTP-like status code.
    pub fn from_http_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match ErrorCategory::from_status(status) {
            ErrorCategory::NotFound => Self::NotFound(message),
            ErrorCategory::RateLimit => Self::RateLimit { retry_after_secs: 0 },
            ErrorCategory::Validation => Self::Validation(message),
            ErrorCategory::Api => Self::Api(message),
            _ => Self::Internal(message),
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::RateLimit { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::SimulationRunning => StatusCode::CONFLICT,
            Self::Protocol(_) | Self::Network(_) => StatusCode::BAD_GATEWAY,
            Self::Api(_) | Self::Config(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = serde_json::json!({
            "error":    self.to_string(),
            "category": self.category(),
            "status":   status.as_u16(),
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_code_classification_table() {
        assert_eq!(ErrorCategory::from_status(404), ErrorCategory::NotFound);
        assert_eq!(ErrorCategory::from_status(429), ErrorCategory::RateLimit);
        assert_eq!(ErrorCategory::from_status(400), ErrorCategory::Validation);
        assert_eq!(ErrorCategory::from_status(418), ErrorCategory::Validation);
        assert_eq!(ErrorCategory::from_status(499), ErrorCategory::Validation);
        assert_eq!(ErrorCategory::from_status(500), ErrorCategory::Api);
        assert_eq!(ErrorCategory::from_status(503), ErrorCategory::Api);
        assert_eq!(ErrorCategory::from_status(200), ErrorCategory::Internal);
        assert_eq!(ErrorCategory::from_status(302), ErrorCategory::Internal);
        assert_eq!(ErrorCategory::from_status(0), ErrorCategory::Internal);
    }

    #[test]
    fn every_variant_maps_to_its_category() {
        assert_eq!(RelayError::Api("x".into()).category(), ErrorCategory::Api);
        assert_eq!(RelayError::Config("x".into()).category(), ErrorCategory::Config);
        assert_eq!(RelayError::Protocol("x".into()).category(), ErrorCategory::Protocol);
        assert_eq!(
            RelayError::Validation("x".into()).category(),
            ErrorCategory::Validation
        );
        assert_eq!(
            RelayError::NotFound("x".into()).category(),
            ErrorCategory::NotFound
        );
        assert_eq!(
            RelayError::RateLimit { retry_after_secs: 3 }.category(),
            ErrorCategory::RateLimit
        );
        assert_eq!(RelayError::Network("x".into()).category(), ErrorCategory::Network);
        assert_eq!(RelayError::Internal("x".into()).category(), ErrorCategory::Internal);
    }

    #[test]
    fn from_http_status_builds_matching_variant() {
        assert!(matches!(
            RelayError::from_http_status(404, "gone"),
            RelayError::NotFound(_)
        ));
        assert!(matches!(
            RelayError::from_http_status(429, "slow down"),
            RelayError::RateLimit { .. }
        ));
        assert!(matches!(
            RelayError::from_http_status(422, "bad field"),
            RelayError::Validation(_)
        ));
        assert!(matches!(
            RelayError::from_http_status(502, "upstream"),
            RelayError::Api(_)
        ));
        assert!(matches!(
            RelayError::from_http_status(100, "odd"),
            RelayError::Internal(_)
        ));
    }

    #[test]
    fn categories_serialize_as_snake_case() {
        assert_eq!(
            serde_json::to_string(&ErrorCategory::RateLimit).unwrap(),
            "\"rate_limit\""
        );
        assert_eq!(
            serde_json::to_string(&ErrorCategory::NotFound).unwrap(),
            "\"not_found\""
        );
        let parsed: ErrorCategory = serde_json::from_str("\"network\"").unwrap();
        assert_eq!(parsed, ErrorCategory::Network);
    }

    #[test]
    fn all_lists_each_category_once_with_stable_indices() {
        for (i, cat) in ErrorCategory::ALL.iter().enumerate() {
            assert_eq!(cat.index(), i);
        }
    }
}
