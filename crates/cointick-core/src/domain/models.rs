use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::{Currency, UtcDateTime};

/// Price snapshot of one asset in one conversion currency.
///
/// Only `price` is required; everything else stays `None` when upstream
/// does not report it, so "no volume" never reads as "zero volume".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub price: f64,
    pub volume_24h: Option<f64>,
    pub volume_change_24h: Option<f64>,
    pub percent_change_1h: Option<f64>,
    pub percent_change_24h: Option<f64>,
    pub percent_change_7d: Option<f64>,
    pub percent_change_30d: Option<f64>,
    pub market_cap: Option<f64>,
    pub market_cap_dominance: Option<f64>,
    pub fully_diluted_market_cap: Option<f64>,
    pub last_updated: Option<UtcDateTime>,
}

/// Host chain of a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    pub id: u64,
    pub name: String,
    pub symbol: String,
    pub slug: String,
    pub token_address: String,
}

/// Listing or quote entry for a single cryptocurrency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cryptocurrency {
    pub id: u64,
    pub name: String,
    pub symbol: String,
    pub slug: String,
    pub cmc_rank: Option<u32>,
    pub num_market_pairs: Option<u64>,
    pub circulating_supply: Option<f64>,
    pub total_supply: Option<f64>,
    pub max_supply: Option<f64>,
    pub last_updated: Option<UtcDateTime>,
    pub date_added: Option<UtcDateTime>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    pub platform: Option<Platform>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub quote: BTreeMap<String, Quote>,
}

impl Cryptocurrency {
    pub fn quote_in(&self, currency: &Currency) -> Option<&Quote> {
        self.quote.get(currency.as_str())
    }
}

/// Static metadata for a cryptocurrency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CryptocurrencyInfo {
    pub id: u64,
    pub name: String,
    pub symbol: String,
    pub slug: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub logo: Option<String>,
    pub subreddit: Option<String>,
    pub notice: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(rename = "tag-names", alias = "tag_names", default, deserialize_with = "null_as_default")]
    pub tag_names: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub urls: BTreeMap<String, Vec<String>>,
    pub platform: Option<Platform>,
    pub date_added: Option<UtcDateTime>,
    pub twitter_username: Option<String>,
    pub is_hidden: Option<u8>,
}

/// Aggregate market totals in one conversion currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalQuote {
    pub total_market_cap: Option<f64>,
    pub total_volume_24h: Option<f64>,
    pub total_volume_24h_reported: Option<f64>,
    pub altcoin_volume_24h: Option<f64>,
    pub altcoin_market_cap: Option<f64>,
    pub defi_volume_24h: Option<f64>,
    pub defi_market_cap: Option<f64>,
    pub stablecoin_volume_24h: Option<f64>,
    pub stablecoin_market_cap: Option<f64>,
    pub last_updated: Option<UtcDateTime>,
}

/// Global cryptocurrency market metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalMetrics {
    pub active_cryptocurrencies: u64,
    pub total_cryptocurrencies: u64,
    pub active_market_pairs: u64,
    pub active_exchanges: u64,
    pub total_exchanges: u64,
    pub eth_dominance: f64,
    pub btc_dominance: f64,
    pub defi_volume_24h: Option<f64>,
    pub defi_market_cap: Option<f64>,
    pub stablecoin_volume_24h: Option<f64>,
    pub stablecoin_market_cap: Option<f64>,
    pub derivatives_volume_24h: Option<f64>,
    pub quote: BTreeMap<String, GlobalQuote>,
    pub last_updated: UtcDateTime,
}

impl GlobalMetrics {
    pub fn quote_in(&self, currency: &Currency) -> Option<&GlobalQuote> {
        self.quote.get(currency.as_str())
    }
}

/// One point of a historical price series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalQuote {
    pub timestamp: UtcDateTime,
    pub quote: BTreeMap<String, Quote>,
}

/// OHLCV values of one candle in one conversion currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcvQuote {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<f64>,
    pub market_cap: Option<f64>,
    pub timestamp: Option<UtcDateTime>,
}

/// One OHLCV candle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcvPoint {
    pub time_open: UtcDateTime,
    pub time_close: UtcDateTime,
    pub time_high: Option<UtcDateTime>,
    pub time_low: Option<UtcDateTime>,
    pub quote: BTreeMap<String, OhlcvQuote>,
}

/// Directory entry matched by a search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: u64,
    pub name: String,
    pub symbol: String,
    pub slug: String,
    pub rank: Option<u32>,
    pub is_active: bool,
}

/// Global metrics combined with the top of the listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketOverview {
    pub convert: Currency,
    pub total_market_cap: Option<f64>,
    pub total_volume_24h: Option<f64>,
    /// 24h volume as a fraction of total market cap.
    pub volume_to_market_cap: Option<f64>,
    pub btc_dominance: f64,
    pub eth_dominance: f64,
    pub altcoin_dominance: f64,
    pub metrics: GlobalMetrics,
    pub top: Vec<Cryptocurrency>,
}

impl MarketOverview {
    pub fn new(convert: Currency, metrics: GlobalMetrics, top: Vec<Cryptocurrency>) -> Self {
        let totals = metrics.quote_in(&convert);
        let total_market_cap = totals.and_then(|quote| quote.total_market_cap);
        let total_volume_24h = totals.and_then(|quote| quote.total_volume_24h);
        let volume_to_market_cap = match (total_volume_24h, total_market_cap) {
            (Some(volume), Some(cap)) if cap > 0.0 => Some(volume / cap),
            _ => None,
        };

        Self {
            total_market_cap,
            total_volume_24h,
            volume_to_market_cap,
            btc_dominance: metrics.btc_dominance,
            eth_dominance: metrics.eth_dominance,
            altcoin_dominance: 100.0 - metrics.btc_dominance - metrics.eth_dominance,
            convert,
            metrics,
            top,
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
