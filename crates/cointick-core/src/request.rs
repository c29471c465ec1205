//! Validated request types, one per data-access operation.
//!
//! Constructors perform every check, so a request value that exists can be
//! sent upstream without further validation and without spending a
//! rate-limit token on a doomed call.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::params::make_key;
use crate::{Currency, QueryParams, Symbol, TimeBound, ValidationError};

const MAX_LISTING_LIMIT: i64 = 5_000;
const MAX_HISTORY_COUNT: i64 = 10_000;
const MAX_SEARCH_LIMIT: i64 = 100;
const MAX_OVERVIEW_TOP: i64 = 100;
const DEFAULT_HISTORY_COUNT: u32 = 10;

/// Operation name, parameters and cache key of a request.
pub trait MarketRequest {
    const OPERATION: &'static str;

    fn params(&self) -> QueryParams;

    fn cache_key(&self) -> String {
        make_key(Self::OPERATION, &self.params())
    }
}

fn check_range(field: &'static str, value: i64, min: i64, max: i64) -> Result<u32, ValidationError> {
    if (min..=max).contains(&value) {
        u32::try_from(value).map_err(|_| ValidationError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    } else {
        Err(ValidationError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $field:literal, default = $default:ident,
        { $($variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::$default
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(input: &str) -> Result<Self, Self::Err> {
                let normalized = input.trim().to_ascii_lowercase();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|candidate| candidate.as_str() == normalized)
                    .ok_or_else(|| ValidationError::UnknownVariant {
                        field: $field,
                        value: input.to_owned(),
                        expected: concat!($($text, " "),+),
                    })
            }
        }
    };
}

string_enum! {
    /// Listing sort field.
    ListingSort, "sort", default = MarketCap, {
        MarketCap => "market_cap",
        Name => "name",
        Symbol => "symbol",
        DateAdded => "date_added",
        Price => "price",
        CirculatingSupply => "circulating_supply",
        TotalSupply => "total_supply",
        MaxSupply => "max_supply",
        NumMarketPairs => "num_market_pairs",
        Volume24h => "volume_24h",
        PercentChange1h => "percent_change_1h",
        PercentChange24h => "percent_change_24h",
        PercentChange7d => "percent_change_7d",
    }
}

string_enum! {
    SortDirection, "sort_dir", default = Desc, {
        Asc => "asc",
        Desc => "desc",
    }
}

string_enum! {
    /// Sampling interval of historical quotes.
    HistoryInterval, "interval", default = Daily, {
        Hourly => "hourly",
        Daily => "daily",
        Weekly => "weekly",
        Monthly => "monthly",
    }
}

string_enum! {
    /// Candle width of OHLCV history.
    OhlcvPeriod, "time_period", default = Daily, {
        Hourly => "hourly",
        Daily => "daily",
        Weekly => "weekly",
        Monthly => "monthly",
        Yearly => "yearly",
    }
}

/// Assets addressed by ticker or by numeric upstream id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetSelector {
    Symbols(Vec<Symbol>),
    Ids(Vec<u64>),
}

impl AssetSelector {
    /// Accepts separate items or comma-joined text; see [`Symbol::parse_list`].
    pub fn symbols<I, S>(items: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Symbol::parse_list(items).map(Self::Symbols)
    }

    pub fn ids(ids: Vec<u64>) -> Result<Self, ValidationError> {
        if ids.is_empty() {
            return Err(ValidationError::EmptySelection);
        }
        if ids.contains(&0) {
            return Err(ValidationError::OutOfRange {
                field: "id",
                value: 0,
                min: 1,
                max: i64::MAX,
            });
        }
        Ok(Self::Ids(ids))
    }

    fn apply(&self, params: &mut QueryParams) {
        match self {
            Self::Symbols(symbols) => params.insert("symbol", symbols.as_slice()),
            Self::Ids(ids) => params.insert("id", ids.as_slice()),
        }
    }
}

/// Latest quotes for a set of assets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotesRequest {
    pub selector: AssetSelector,
    pub convert: Currency,
}

impl QuotesRequest {
    pub const ENDPOINT: &'static str = "cryptocurrency/quotes/latest";

    pub fn new(selector: AssetSelector) -> Self {
        Self {
            selector,
            convert: Currency::usd(),
        }
    }

    pub fn for_symbols<I, S>(items: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        AssetSelector::symbols(items).map(Self::new)
    }

    pub fn with_convert(mut self, convert: Currency) -> Self {
        self.convert = convert;
        self
    }
}

impl MarketRequest for QuotesRequest {
    const OPERATION: &'static str = "quotes";

    fn params(&self) -> QueryParams {
        let mut params = QueryParams::new().with("convert", &self.convert);
        self.selector.apply(&mut params);
        params
    }
}

/// Page of the market-cap listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingsRequest {
    start: u32,
    limit: u32,
    pub convert: Currency,
    pub sort: ListingSort,
    pub sort_dir: SortDirection,
}

impl ListingsRequest {
    pub const ENDPOINT: &'static str = "cryptocurrency/listings/latest";

    /// `start` is 1-based; `limit` is at most 5000.
    pub fn new(start: i64, limit: i64) -> Result<Self, ValidationError> {
        Ok(Self {
            start: check_range("start", start, 1, i64::from(u32::MAX))?,
            limit: check_range("limit", limit, 1, MAX_LISTING_LIMIT)?,
            convert: Currency::usd(),
            sort: ListingSort::default(),
            sort_dir: SortDirection::default(),
        })
    }

    pub fn with_convert(mut self, convert: Currency) -> Self {
        self.convert = convert;
        self
    }

    pub fn with_sort(mut self, sort: ListingSort, sort_dir: SortDirection) -> Self {
        self.sort = sort;
        self.sort_dir = sort_dir;
        self
    }

    pub const fn start(&self) -> u32 {
        self.start
    }

    pub const fn limit(&self) -> u32 {
        self.limit
    }
}

impl Default for ListingsRequest {
    fn default() -> Self {
        Self {
            start: 1,
            limit: 100,
            convert: Currency::usd(),
            sort: ListingSort::default(),
            sort_dir: SortDirection::default(),
        }
    }
}

impl MarketRequest for ListingsRequest {
    const OPERATION: &'static str = "listings";

    fn params(&self) -> QueryParams {
        QueryParams::new()
            .with("start", self.start)
            .with("limit", self.limit)
            .with("convert", &self.convert)
            .with("sort", self.sort.as_str())
            .with("sort_dir", self.sort_dir.as_str())
    }
}

/// Static metadata for a set of assets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoRequest {
    pub selector: AssetSelector,
}

impl InfoRequest {
    pub const ENDPOINT: &'static str = "cryptocurrency/info";

    pub fn new(selector: AssetSelector) -> Self {
        Self { selector }
    }
}

impl MarketRequest for InfoRequest {
    const OPERATION: &'static str = "info";

    fn params(&self) -> QueryParams {
        let mut params = QueryParams::new();
        self.selector.apply(&mut params);
        params
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalMetricsRequest {
    pub convert: Currency,
}

impl GlobalMetricsRequest {
    pub const ENDPOINT: &'static str = "global-metrics/quotes/latest";

    pub fn new(convert: Currency) -> Self {
        Self { convert }
    }
}

impl MarketRequest for GlobalMetricsRequest {
    const OPERATION: &'static str = "global_metrics";

    fn params(&self) -> QueryParams {
        QueryParams::new().with("convert", &self.convert)
    }
}

/// Historical price series for one asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoricalQuotesRequest {
    pub symbol: Symbol,
    pub time_start: Option<TimeBound>,
    pub time_end: Option<TimeBound>,
    count: u32,
    pub interval: HistoryInterval,
    pub convert: Currency,
}

impl HistoricalQuotesRequest {
    pub const ENDPOINT: &'static str = "cryptocurrency/quotes/historical";

    pub fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            time_start: None,
            time_end: None,
            count: DEFAULT_HISTORY_COUNT,
            interval: HistoryInterval::default(),
            convert: Currency::usd(),
        }
    }

    pub fn with_count(mut self, count: i64) -> Result<Self, ValidationError> {
        self.count = check_range("count", count, 1, MAX_HISTORY_COUNT)?;
        Ok(self)
    }

    pub fn with_range(mut self, time_start: Option<TimeBound>, time_end: Option<TimeBound>) -> Self {
        self.time_start = time_start;
        self.time_end = time_end;
        self
    }

    pub fn with_interval(mut self, interval: HistoryInterval) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_convert(mut self, convert: Currency) -> Self {
        self.convert = convert;
        self
    }

    pub const fn count(&self) -> u32 {
        self.count
    }
}

impl MarketRequest for HistoricalQuotesRequest {
    const OPERATION: &'static str = "historical_quotes";

    fn params(&self) -> QueryParams {
        QueryParams::new()
            .with("symbol", self.symbol.as_str())
            .with("time_start", self.time_start.as_ref())
            .with("time_end", self.time_end.as_ref())
            .with("count", self.count)
            .with("interval", self.interval.as_str())
            .with("convert", &self.convert)
    }
}

/// OHLCV candles for one asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OhlcvRequest {
    pub symbol: Symbol,
    pub time_period: OhlcvPeriod,
    pub time_start: Option<TimeBound>,
    pub time_end: Option<TimeBound>,
    count: u32,
    pub convert: Currency,
}

impl OhlcvRequest {
    pub const ENDPOINT: &'static str = "cryptocurrency/ohlcv/historical";

    pub fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            time_period: OhlcvPeriod::default(),
            time_start: None,
            time_end: None,
            count: DEFAULT_HISTORY_COUNT,
            convert: Currency::usd(),
        }
    }

    pub fn with_count(mut self, count: i64) -> Result<Self, ValidationError> {
        self.count = check_range("count", count, 1, MAX_HISTORY_COUNT)?;
        Ok(self)
    }

    pub fn with_period(mut self, time_period: OhlcvPeriod) -> Self {
        self.time_period = time_period;
        self
    }

    pub fn with_range(mut self, time_start: Option<TimeBound>, time_end: Option<TimeBound>) -> Self {
        self.time_start = time_start;
        self.time_end = time_end;
        self
    }

    pub fn with_convert(mut self, convert: Currency) -> Self {
        self.convert = convert;
        self
    }

    pub const fn count(&self) -> u32 {
        self.count
    }
}

impl MarketRequest for OhlcvRequest {
    const OPERATION: &'static str = "ohlcv";

    fn params(&self) -> QueryParams {
        QueryParams::new()
            .with("symbol", self.symbol.as_str())
            .with("time_period", self.time_period.as_str())
            .with("time_start", self.time_start.as_ref())
            .with("time_end", self.time_end.as_ref())
            .with("count", self.count)
            .with("convert", &self.convert)
    }
}

/// Case-insensitive name or symbol search over the asset directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    query: String,
    limit: u32,
}

impl SearchRequest {
    /// The directory endpoint takes no filter; matching happens locally.
    pub const ENDPOINT: &'static str = "cryptocurrency/map";

    pub fn new(query: &str, limit: i64) -> Result<Self, ValidationError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ValidationError::EmptyQuery);
        }

        Ok(Self {
            query: query.to_owned(),
            limit: check_range("limit", limit, 1, MAX_SEARCH_LIMIT)?,
        })
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub const fn limit(&self) -> u32 {
        self.limit
    }

    /// Whether a directory entry matches, comparing case-insensitively.
    pub fn matches(&self, name: &str, symbol: &str) -> bool {
        let needle = self.query.to_lowercase();
        name.to_lowercase().contains(&needle) || symbol.to_lowercase().contains(&needle)
    }
}

impl MarketRequest for SearchRequest {
    const OPERATION: &'static str = "search";

    fn params(&self) -> QueryParams {
        QueryParams::new()
            .with("query", self.query.to_lowercase())
            .with("limit", self.limit)
    }
}

/// Global metrics combined with the top of the listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketOverviewRequest {
    pub convert: Currency,
    top: u32,
}

impl MarketOverviewRequest {
    pub fn new(top: i64) -> Result<Self, ValidationError> {
        Ok(Self {
            convert: Currency::usd(),
            top: check_range("top", top, 1, MAX_OVERVIEW_TOP)?,
        })
    }

    pub fn with_convert(mut self, convert: Currency) -> Self {
        self.convert = convert;
        self
    }

    pub const fn top(&self) -> u32 {
        self.top
    }

    pub fn global_metrics(&self) -> GlobalMetricsRequest {
        GlobalMetricsRequest::new(self.convert.clone())
    }

    pub fn listings(&self) -> ListingsRequest {
        ListingsRequest {
            limit: self.top,
            ..ListingsRequest::default()
        }
        .with_convert(self.convert.clone())
    }
}

impl Default for MarketOverviewRequest {
    fn default() -> Self {
        Self {
            convert: Currency::usd(),
            top: 10,
        }
    }
}

impl MarketRequest for MarketOverviewRequest {
    const OPERATION: &'static str = "market_overview";

    fn params(&self) -> QueryParams {
        QueryParams::new()
            .with("convert", &self.convert)
            .with("top", self.top)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_params_join_normalized_symbols() {
        let request = QuotesRequest::for_symbols(["btc, eth"]).expect("valid symbols");
        let params = request.params();

        assert_eq!(params.get("symbol"), Some("BTC,ETH"));
        assert_eq!(params.get("convert"), Some("USD"));
        assert_eq!(params.get("id"), None);
    }

    #[test]
    fn equivalent_symbol_forms_share_a_cache_key() {
        let joined = QuotesRequest::for_symbols(["btc, eth"]).expect("valid");
        let array = QuotesRequest::for_symbols(["BTC", "ETH"]).expect("valid");

        assert_eq!(joined.cache_key(), array.cache_key());
        assert!(joined.cache_key().starts_with("quotes:"));
    }

    #[test]
    fn id_selection_uses_id_parameter() {
        let request = InfoRequest::new(AssetSelector::ids(vec![1, 1027]).expect("valid ids"));
        assert_eq!(request.params().get("id"), Some("1,1027"));
    }

    #[test]
    fn empty_or_zero_ids_are_rejected() {
        assert_eq!(
            AssetSelector::ids(Vec::new()).expect_err("must fail"),
            ValidationError::EmptySelection
        );
        assert!(AssetSelector::ids(vec![1, 0]).is_err());
    }

    #[test]
    fn listing_bounds_are_enforced() {
        assert!(ListingsRequest::new(1, 5_000).is_ok());
        assert!(matches!(
            ListingsRequest::new(1, 5_001),
            Err(ValidationError::OutOfRange { field: "limit", .. })
        ));
        assert!(matches!(
            ListingsRequest::new(0, 10),
            Err(ValidationError::OutOfRange { field: "start", .. })
        ));
    }

    #[test]
    fn listing_params_include_sort() {
        let params = ListingsRequest::new(1, 20)
            .expect("valid")
            .with_sort(ListingSort::Volume24h, SortDirection::Asc)
            .params();

        assert_eq!(params.get("sort"), Some("volume_24h"));
        assert_eq!(params.get("sort_dir"), Some("asc"));
        assert_eq!(params.get("limit"), Some("20"));
    }

    #[test]
    fn history_count_is_bounded() {
        let symbol = Symbol::parse("btc").expect("symbol");
        assert!(HistoricalQuotesRequest::new(symbol.clone()).with_count(10_000).is_ok());
        assert!(HistoricalQuotesRequest::new(symbol.clone()).with_count(0).is_err());
        assert!(OhlcvRequest::new(symbol).with_count(10_001).is_err());
    }

    #[test]
    fn omitted_time_bounds_are_absent_from_params() {
        let symbol = Symbol::parse("eth").expect("symbol");
        let bare = OhlcvRequest::new(symbol.clone());
        let ranged = OhlcvRequest::new(symbol).with_range(
            Some(TimeBound::parse("2024-01-01").expect("date")),
            None,
        );

        assert_eq!(bare.params().get("time_start"), None);
        assert_eq!(ranged.params().get("time_start"), Some("2024-01-01"));
        assert_ne!(bare.cache_key(), ranged.cache_key());
    }

    #[test]
    fn enums_parse_case_insensitively() {
        assert_eq!("Weekly".parse::<HistoryInterval>(), Ok(HistoryInterval::Weekly));
        assert_eq!(" DESC ".parse::<SortDirection>(), Ok(SortDirection::Desc));
        assert!(matches!(
            "fortnightly".parse::<OhlcvPeriod>(),
            Err(ValidationError::UnknownVariant { field: "time_period", .. })
        ));
    }

    #[test]
    fn search_validates_query_and_limit() {
        assert_eq!(
            SearchRequest::new("   ", 10).expect_err("must fail"),
            ValidationError::EmptyQuery
        );
        assert!(SearchRequest::new("bit", 101).is_err());

        let request = SearchRequest::new(" Bit ", 5).expect("valid");
        assert!(request.matches("Bitcoin", "BTC"));
        assert!(request.matches("Wrapped", "WBIT"));
        assert!(!request.matches("Ethereum", "ETH"));
    }

    #[test]
    fn search_key_ignores_query_case() {
        let lower = SearchRequest::new("bitcoin", 10).expect("valid");
        let upper = SearchRequest::new("BITCOIN", 10).expect("valid");

        assert_eq!(lower.cache_key(), upper.cache_key());
    }

    #[test]
    fn overview_derives_listing_of_top_entries() {
        let request = MarketOverviewRequest::new(25)
            .expect("valid")
            .with_convert(Currency::parse("eur").expect("currency"));
        let listings = request.listings();

        assert_eq!(listings.limit(), 25);
        assert_eq!(listings.start(), 1);
        assert_eq!(listings.convert.as_str(), "EUR");
        assert!(MarketOverviewRequest::new(0).is_err());
    }
}
