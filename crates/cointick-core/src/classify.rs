//! Mapping of upstream outcomes onto [`ApiError`].
//!
//! | Outcome | Kind | Retried |
//! |---------|------|---------|
//! | 401 | `Authentication` | never |
//! | 429 | `RateLimited` | never |
//! | 400 | `InvalidParameter` | never |
//! | 404 | `NotFound` | never |
//! | 5xx | `Connection` | yes |
//! | other non-2xx | `Generic` | yes |
//! | connect failure | `Connection` | yes |
//! | timeout | `Timeout` | yes |

use serde::Deserialize;

use crate::{ApiError, ApiErrorKind, HttpError, HttpErrorKind};

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    status: Option<ErrorStatus>,
}

#[derive(Debug, Deserialize)]
struct ErrorStatus {
    error_message: Option<String>,
}

/// Classify a non-2xx response. `body` is only consulted for the upstream
/// error message.
pub fn classify(status: u16, body: Option<&str>) -> ApiError {
    let message = body
        .and_then(upstream_message)
        .unwrap_or_else(|| default_message(status).to_owned());

    let kind = match status {
        401 => ApiErrorKind::Authentication,
        429 => ApiErrorKind::RateLimited,
        400 => ApiErrorKind::InvalidParameter,
        404 => ApiErrorKind::NotFound,
        500.. => ApiErrorKind::Connection,
        _ => ApiErrorKind::Generic,
    };

    ApiError::new(kind, Some(status), message)
}

/// Classify a failure that produced no response.
pub fn classify_transport(error: &HttpError) -> ApiError {
    match error.kind() {
        HttpErrorKind::Timeout => ApiError::timeout(error.message()),
        HttpErrorKind::Connect | HttpErrorKind::Other => ApiError::connection(error.message()),
    }
}

fn upstream_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()?
        .status?
        .error_message
        .filter(|message| !message.trim().is_empty())
}

fn default_message(status: u16) -> &'static str {
    match status {
        401 => "invalid or missing API key",
        429 => "upstream rate limit exceeded",
        400 => "invalid request parameters",
        404 => "requested resource not found",
        500.. => "upstream server error",
        _ => "unexpected upstream status",
    }
}
