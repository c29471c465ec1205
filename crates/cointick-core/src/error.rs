use std::fmt::{Display, Formatter};

use thiserror::Error;

/// Client-side validation failures, raised before any network activity.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },
    #[error("at least one symbol or id must be provided")]
    EmptySelection,

    #[error("convert currency must be 2-10 ASCII alphanumerics: '{value}'")]
    InvalidCurrency { value: String },

    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("search query cannot be empty")]
    EmptyQuery,

    #[error("timestamp must be YYYY-MM-DD or RFC3339 UTC: '{value}'")]
    InvalidTimestamp { value: String },

    #[error("invalid {field} '{value}', expected one of {expected}")]
    UnknownVariant {
        field: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Closed set of upstream failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    Authentication,
    RateLimited,
    Connection,
    Timeout,
    InvalidResponse,
    InvalidParameter,
    NotFound,
    Generic,
}

/// Typed failure surfaced by every core operation.
///
/// `status` holds the HTTP status when the failure came from an upstream
/// response; transport failures and local failures carry none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    kind: ApiErrorKind,
    status: Option<u16>,
    message: String,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            kind,
            status,
            message: message.into(),
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Authentication, Some(401), message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::RateLimited, Some(429), message)
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Connection, None, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Timeout, None, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::InvalidResponse, None, message)
    }

    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::InvalidParameter, None, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::NotFound, Some(404), message)
    }

    pub fn generic(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Generic, status, message)
    }

    pub const fn kind(&self) -> ApiErrorKind {
        self.kind
    }

    pub const fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Transient failures worth another physical attempt.
    pub const fn retryable(&self) -> bool {
        matches!(
            self.kind,
            ApiErrorKind::Connection | ApiErrorKind::Timeout | ApiErrorKind::Generic
        )
    }

    /// Failures that end a call on the attempt that produced them.
    pub const fn is_terminal(&self) -> bool {
        !self.retryable()
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            ApiErrorKind::Authentication => "api.authentication",
            ApiErrorKind::RateLimited => "api.rate_limited",
            ApiErrorKind::Connection => "api.connection",
            ApiErrorKind::Timeout => "api.timeout",
            ApiErrorKind::InvalidResponse => "api.invalid_response",
            ApiErrorKind::InvalidParameter => "api.invalid_parameter",
            ApiErrorKind::NotFound => "api.not_found",
            ApiErrorKind::Generic => "api.generic",
        }
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} (status {status}, {})", self.message, self.code()),
            None => write!(f, "{} ({})", self.message, self.code()),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<ValidationError> for ApiError {
    fn from(error: ValidationError) -> Self {
        Self::invalid_parameter(error.to_string())
    }
}

/// Configuration loading failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("CoinMarketCap API key not provided (set COINMARKETCAP_API_KEY)")]
    MissingApiKey,

    #[error("environment variable {name} has invalid value '{value}': expected {expected}")]
    InvalidValue {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
}
