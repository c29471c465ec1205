//! # Cointick Core
//!
//! Resilient access layer for the CoinMarketCap market-data API.
//!
//! ## Overview
//!
//! This crate wraps plain HTTP calls with the pieces a long-running proxy
//! needs:
//!
//! - **Token-bucket rate limiting** shared by every outbound request
//! - **Typed error classification** separating terminal from transient failures
//! - **Bounded exponential-backoff retries** driven by an explicit state machine
//! - **TTL + LRU response cache** with deterministic, order-independent keys
//! - **Typed data access** with validated requests and decoded records
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`cache`] | Response cache and statistics |
//! | [`classify`] | HTTP status and transport failure mapping |
//! | [`client`] | Typed market-data operations |
//! | [`config`] | Client, cache and environment settings |
//! | [`domain`] | Decoded records and validated value types |
//! | [`error`] | Error types |
//! | [`executor`] | Retrying request executor |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`params`] | Query parameters and cache keys |
//! | [`rate_limit`] | Rate limiter on a `governor` GCRA quota |
//! | [`request`] | Validated request types |
//! | [`retry`] | Retry budget and backoff schedule |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cointick_core::{MarketDataClient, MarketRequest, QuotesRequest, ResponseCache, Settings};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::from_env()?;
//!     let client = MarketDataClient::new(&settings.client);
//!     let cache: ResponseCache = settings.cache.build();
//!
//!     let request = QuotesRequest::for_symbols(["btc, eth"])?;
//!     let key = request.cache_key();
//!     if cache.get(&key).is_none() {
//!         let quotes = client.quotes(&request).await?;
//!         cache.set(key, serde_json::to_string(&quotes)?);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌──────────────────┐
//! │ Caller           │────▶│ ResponseCache    │
//! └────────┬─────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │ MarketDataClient │
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐     ┌──────────────────┐
//! │ RequestExecutor  │────▶│ RateLimiter      │
//! └────────┬─────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌──────────────────┐     ┌──────────────────┐
//! │ HTTP Client      │────▶│ Classifier       │
//! │ (reqwest)        │     │                  │
//! └──────────────────┘     └──────────────────┘
//! ```
//!
//! Caching is explicit: callers look up and store results around client
//! calls using [`MarketRequest::cache_key`].
//!
//! ## Error Handling
//!
//! ```rust
//! use cointick_core::{ApiError, ApiErrorKind};
//!
//! fn handle_error(error: ApiError) {
//!     match error.kind() {
//!         ApiErrorKind::Authentication => {
//!             // Check COINMARKETCAP_API_KEY
//!         }
//!         ApiErrorKind::RateLimited => {
//!             // Upstream quota spent; not retried
//!         }
//!         _ if error.retryable() => {
//!             // Retries already exhausted
//!         }
//!         _ => {}
//!     }
//! }
//! ```
//!
//! ## Security
//!
//! - The API key is sent as a header and redacted from every `Debug` output
//! - reqwest error messages are stripped of request URLs before surfacing

pub mod cache;
pub mod classify;
pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod executor;
pub mod http_client;
pub mod params;
pub mod rate_limit;
pub mod request;
pub mod retry;

// Caching
pub use cache::{CacheMode, CacheStats, ResponseCache};

// Classification
pub use classify::{classify, classify_transport};

// Data access
pub use client::MarketDataClient;

// Configuration
pub use config::{ApiKey, CacheConfig, ClientConfig, Settings, API_KEY_HEADER, DEFAULT_BASE_URL};

// Domain models
pub use domain::{
    Cryptocurrency, CryptocurrencyInfo, Currency, GlobalMetrics, GlobalQuote, HistoricalQuote,
    MarketOverview, OhlcvPoint, OhlcvQuote, Platform, Quote, SearchResult, Symbol, TimeBound,
    UtcDateTime,
};

// Error types
pub use error::{ApiError, ApiErrorKind, ConfigError, ValidationError};

// Execution
pub use executor::{decide, ApiRequest, ApiResponse, RequestExecutor, RetryDecision, RetryState};

// HTTP client types
pub use http_client::{
    HttpAuth, HttpClient, HttpError, HttpErrorKind, HttpMethod, HttpRequest, HttpResponse,
    ReqwestHttpClient,
};

// Parameters and keys
pub use params::{make_key, ParamValue, QueryParams};

// Rate limiting
pub use rate_limit::RateLimiter;

// Requests
pub use request::{
    AssetSelector, GlobalMetricsRequest, HistoricalQuotesRequest, HistoryInterval, InfoRequest,
    ListingSort, ListingsRequest, MarketOverviewRequest, MarketRequest, OhlcvPeriod, OhlcvRequest,
    QuotesRequest, SearchRequest, SortDirection,
};

// Retry logic
pub use retry::{Backoff, RetryConfig};
