//! Named tool invocations and the decoding of their JSON arguments.
//!
//! | Tool | Arguments |
//! |------|-----------|
//! | `get_cryptocurrency_price` | `symbols` (text or array) or `ids`, `convert` |
//! | `get_cryptocurrency_info` | `symbols` or `ids` |
//! | `get_top_cryptocurrencies` | `start`, `limit` (default 100), `convert`, `sort`, `sort_dir` |
//! | `get_global_metrics` | `convert` |
//! | `get_historical_data` | `symbol`, `time_start`, `time_end`, `count`, `interval`, `convert` |
//! | `get_ohlcv_data` | `symbol`, `time_period`, `time_start`, `time_end`, `count`, `convert` |
//! | `search_cryptocurrencies` | `query`, `limit` (default 10) |
//! | `get_market_statistics` | `convert`, `top` (default 10) |
//! | `get_cache_stats` | none |

use std::str::FromStr;

use cointick_core::{
    AssetSelector, Currency, GlobalMetricsRequest, HistoricalQuotesRequest, InfoRequest,
    ListingsRequest, MarketOverviewRequest, MarketRequest, OhlcvRequest, QuotesRequest,
    SearchRequest, Symbol, TimeBound, ValidationError,
};
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use serde_json::{Number, Value};

use crate::error::ToolError;

const DEFAULT_SEARCH_LIMIT: i64 = 10;

/// A validated request for one of the served tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCall {
    Price(QuotesRequest),
    Info(InfoRequest),
    Top(ListingsRequest),
    GlobalMetrics(GlobalMetricsRequest),
    Historical(HistoricalQuotesRequest),
    Ohlcv(OhlcvRequest),
    Search(SearchRequest),
    MarketStatistics(MarketOverviewRequest),
    CacheStats,
}

impl ToolCall {
    pub const NAMES: &'static [&'static str] = &[
        "get_cryptocurrency_price",
        "get_cryptocurrency_info",
        "get_top_cryptocurrencies",
        "get_global_metrics",
        "get_historical_data",
        "get_ohlcv_data",
        "search_cryptocurrencies",
        "get_market_statistics",
        "get_cache_stats",
    ];

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Price(_) => "get_cryptocurrency_price",
            Self::Info(_) => "get_cryptocurrency_info",
            Self::Top(_) => "get_top_cryptocurrencies",
            Self::GlobalMetrics(_) => "get_global_metrics",
            Self::Historical(_) => "get_historical_data",
            Self::Ohlcv(_) => "get_ohlcv_data",
            Self::Search(_) => "search_cryptocurrencies",
            Self::MarketStatistics(_) => "get_market_statistics",
            Self::CacheStats => "get_cache_stats",
        }
    }

    /// Cache key of the upstream request; `None` for local-only tools.
    pub fn cache_key(&self) -> Option<String> {
        match self {
            Self::Price(request) => Some(request.cache_key()),
            Self::Info(request) => Some(request.cache_key()),
            Self::Top(request) => Some(request.cache_key()),
            Self::GlobalMetrics(request) => Some(request.cache_key()),
            Self::Historical(request) => Some(request.cache_key()),
            Self::Ohlcv(request) => Some(request.cache_key()),
            Self::Search(request) => Some(request.cache_key()),
            Self::MarketStatistics(request) => Some(request.cache_key()),
            Self::CacheStats => None,
        }
    }

    /// Decode a tool invocation. `null` arguments are treated as `{}`.
    pub fn from_json(tool: &str, arguments: &Value) -> Result<Self, ToolError> {
        let name = Self::NAMES
            .iter()
            .copied()
            .find(|candidate| *candidate == tool)
            .ok_or_else(|| ToolError::UnknownTool(tool.to_owned()))?;

        let call = match name {
            "get_cryptocurrency_price" => {
                let args: PriceArgs = decode(name, arguments)?;
                let selector = selector(args.symbols.as_ref(), args.ids)?;
                Self::Price(QuotesRequest::new(selector).with_convert(currency(args.convert)?))
            }
            "get_cryptocurrency_info" => {
                let args: SelectionArgs = decode(name, arguments)?;
                Self::Info(InfoRequest::new(selector(args.symbols.as_ref(), args.ids)?))
            }
            "get_top_cryptocurrencies" => {
                let args: TopArgs = decode(name, arguments)?;
                let defaults = ListingsRequest::default();
                let request = ListingsRequest::new(
                    args.start.unwrap_or(i64::from(defaults.start())),
                    args.limit.unwrap_or(i64::from(defaults.limit())),
                )?
                .with_convert(currency(args.convert)?)
                .with_sort(variant(args.sort)?, variant(args.sort_dir)?);
                Self::Top(request)
            }
            "get_global_metrics" => {
                let args: ConvertArgs = decode(name, arguments)?;
                Self::GlobalMetrics(GlobalMetricsRequest::new(currency(args.convert)?))
            }
            "get_historical_data" => {
                let args: HistoricalArgs = decode(name, arguments)?;
                let mut request = HistoricalQuotesRequest::new(Symbol::parse(&args.symbol)?)
                    .with_range(time_bound(args.time_start)?, time_bound(args.time_end)?)
                    .with_interval(variant(args.interval)?)
                    .with_convert(currency(args.convert)?);
                if let Some(count) = args.count {
                    request = request.with_count(count)?;
                }
                Self::Historical(request)
            }
            "get_ohlcv_data" => {
                let args: OhlcvArgs = decode(name, arguments)?;
                let mut request = OhlcvRequest::new(Symbol::parse(&args.symbol)?)
                    .with_period(variant(args.time_period)?)
                    .with_range(time_bound(args.time_start)?, time_bound(args.time_end)?)
                    .with_convert(currency(args.convert)?);
                if let Some(count) = args.count {
                    request = request.with_count(count)?;
                }
                Self::Ohlcv(request)
            }
            "search_cryptocurrencies" => {
                let args: SearchArgs = decode(name, arguments)?;
                Self::Search(SearchRequest::new(
                    &args.query,
                    args.limit.unwrap_or(DEFAULT_SEARCH_LIMIT),
                )?)
            }
            "get_market_statistics" => {
                let args: StatisticsArgs = decode(name, arguments)?;
                let request = match args.top {
                    Some(top) => MarketOverviewRequest::new(top)?,
                    None => MarketOverviewRequest::default(),
                };
                Self::MarketStatistics(request.with_convert(currency(args.convert)?))
            }
            _ => Self::CacheStats,
        };

        Ok(call)
    }
}

/// Symbols given as comma-joined text or as an array.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SymbolList {
    Joined(String),
    Items(Vec<String>),
}

impl SymbolList {
    fn items(&self) -> &[String] {
        match self {
            Self::Joined(joined) => std::slice::from_ref(joined),
            Self::Items(items) => items,
        }
    }

    fn is_blank(&self) -> bool {
        self.items().iter().all(|item| item.trim().is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct SelectionArgs {
    symbols: Option<SymbolList>,
    #[serde(default)]
    ids: Vec<u64>,
}

#[derive(Debug, Deserialize)]
struct PriceArgs {
    symbols: Option<SymbolList>,
    #[serde(default)]
    ids: Vec<u64>,
    convert: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ConvertArgs {
    convert: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TopArgs {
    #[serde(default, deserialize_with = "whole_number")]
    start: Option<i64>,
    #[serde(default, deserialize_with = "whole_number")]
    limit: Option<i64>,
    convert: Option<String>,
    sort: Option<String>,
    sort_dir: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HistoricalArgs {
    symbol: String,
    time_start: Option<String>,
    time_end: Option<String>,
    #[serde(default, deserialize_with = "whole_number")]
    count: Option<i64>,
    interval: Option<String>,
    convert: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OhlcvArgs {
    symbol: String,
    time_period: Option<String>,
    time_start: Option<String>,
    time_end: Option<String>,
    #[serde(default, deserialize_with = "whole_number")]
    count: Option<i64>,
    convert: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default, deserialize_with = "whole_number")]
    limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct StatisticsArgs {
    convert: Option<String>,
    #[serde(default, deserialize_with = "whole_number")]
    top: Option<i64>,
}

/// Accept integers and integral floats such as `10.0`; reject `10.5`.
fn whole_number<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(number) = Option::<Number>::deserialize(deserializer)? else {
        return Ok(None);
    };
    if let Some(value) = number.as_i64() {
        return Ok(Some(value));
    }
    match number.as_f64() {
        Some(value) if value.fract() == 0.0 && value.abs() < i64::MAX as f64 => Ok(Some(value as i64)),
        _ => Err(D::Error::custom(format!("expected a whole number, got {number}"))),
    }
}

fn decode<T: DeserializeOwned>(tool: &'static str, arguments: &Value) -> Result<T, ToolError> {
    let arguments = match arguments {
        Value::Null => Value::Object(serde_json::Map::new()),
        other => other.clone(),
    };
    serde_json::from_value(arguments).map_err(|error| ToolError::InvalidArguments {
        tool,
        message: error.to_string(),
    })
}

/// Symbols take precedence over ids when both are given.
pub fn selector(
    symbols: Option<&SymbolList>,
    ids: Vec<u64>,
) -> Result<AssetSelector, ValidationError> {
    match symbols {
        Some(list) if !list.is_blank() => AssetSelector::symbols(list.items()),
        _ if !ids.is_empty() => AssetSelector::ids(ids),
        Some(list) => AssetSelector::symbols(list.items()),
        None => Err(ValidationError::EmptySelection),
    }
}

/// Missing currency means USD.
pub fn currency(raw: Option<String>) -> Result<Currency, ValidationError> {
    raw.as_deref()
        .map(Currency::parse)
        .transpose()
        .map(Option::unwrap_or_default)
}

pub fn time_bound(raw: Option<String>) -> Result<Option<TimeBound>, ValidationError> {
    raw.as_deref()
        .filter(|value| !value.trim().is_empty())
        .map(TimeBound::parse)
        .transpose()
}

fn variant<T>(raw: Option<String>) -> Result<T, ValidationError>
where
    T: FromStr<Err = ValidationError> + Default,
{
    raw.as_deref()
        .map(str::parse)
        .transpose()
        .map(Option::unwrap_or_default)
}
