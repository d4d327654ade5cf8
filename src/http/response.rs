//! Response construction.
//!
//! # Responsibilities
//! - Serialize fetch outcomes as JSON
//! - Surface provenance in headers so clients can branch without parsing
//! - Uniform JSON error bodies
//!
//! # Design Decisions
//! - A degraded outcome is still `200 OK`; the body says how it was obtained

use axum::{
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::fallback::FetchOutcome;

pub const X_DATA_PROVENANCE: HeaderName = HeaderName::from_static("x-data-provenance");
pub const X_CIRCUIT_BREAKER: HeaderName = HeaderName::from_static("x-circuit-breaker");

/// JSON body of a resolved outcome plus provenance headers.
pub fn outcome_response<T: Serialize>(outcome: FetchOutcome<T>) -> Response {
    let provenance = HeaderValue::from_static(outcome.provenance.as_str());
    let breaker = HeaderValue::from_static(if outcome.circuit_breaker_active {
        "open"
    } else {
        "closed"
    });

    let mut response = Json(outcome).into_response();
    let headers = response.headers_mut();
    headers.insert(X_DATA_PROVENANCE, provenance);
    headers.insert(X_CIRCUIT_BREAKER, breaker);
    response
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

/// `{"error": message}` with `status`.
pub fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(ErrorBody { error: message })).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fallback::Provenance;

    #[test]
    fn test_outcome_headers() {
        let response = outcome_response(FetchOutcome {
            data: vec!["haircut"],
            provenance: Provenance::StaleCache,
            circuit_breaker_active: true,
        });

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[X_DATA_PROVENANCE], "stale_cache");
        assert_eq!(response.headers()[X_CIRCUIT_BREAKER], "open");
    }

    #[test]
    fn test_error_status() {
        let response = error_response(StatusCode::NOT_FOUND, "unknown breaker");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
