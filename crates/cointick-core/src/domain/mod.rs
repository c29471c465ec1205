//! # Domain Models
//!
//! Decoded market-data records and the validated value types used to build
//! requests.
//!
//! ## Records
//!
//! | Type | Upstream source |
//! |------|-----------------|
//! | [`Cryptocurrency`] | latest quotes and listings |
//! | [`Quote`] | per-currency price block inside a [`Cryptocurrency`] or [`HistoricalQuote`] |
//! | [`CryptocurrencyInfo`] | metadata endpoint |
//! | [`GlobalMetrics`] | global market metrics |
//! | [`HistoricalQuote`] | historical quotes |
//! | [`OhlcvPoint`] | historical OHLCV candles |
//! | [`SearchResult`] | cryptocurrency directory |
//! | [`MarketOverview`] | global metrics plus top listings |
//!
//! Required numeric and string fields fail decoding when absent; optional
//! fields decode to `None` rather than zero.
//!
//! ## Value types
//!
//! [`Symbol`], [`Currency`] and [`TimeBound`] normalize and validate caller
//! input at construction, before anything reaches the network.

mod models;
mod symbol;
mod timestamp;

pub use models::{
    Cryptocurrency, CryptocurrencyInfo, GlobalMetrics, GlobalQuote, HistoricalQuote,
    MarketOverview, OhlcvPoint, OhlcvQuote, Platform, Quote, SearchResult,
};
pub use symbol::{Currency, Symbol};
pub use timestamp::{TimeBound, UtcDateTime};
