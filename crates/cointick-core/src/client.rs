use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::{
    ApiError, ApiRequest, ClientConfig, Cryptocurrency, CryptocurrencyInfo, GlobalMetrics,
    GlobalMetricsRequest, HistoricalQuote, HistoricalQuotesRequest, HttpClient, InfoRequest,
    ListingsRequest, MarketOverview, MarketOverviewRequest, MarketRequest, OhlcvPoint,
    OhlcvRequest, QueryParams, QuotesRequest, RateLimiter, RequestExecutor, ReqwestHttpClient,
    SearchRequest, SearchResult,
};

/// Quote and info endpoints return one record per key; some API versions
/// wrap each in an array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

#[derive(Debug, Deserialize)]
struct SeriesEnvelope<T> {
    #[serde(default = "Vec::new")]
    quotes: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct DirectoryEntry {
    id: u64,
    name: String,
    symbol: String,
    slug: String,
    rank: Option<u32>,
    is_active: Option<u8>,
}

impl From<DirectoryEntry> for SearchResult {
    fn from(entry: DirectoryEntry) -> Self {
        Self {
            id: entry.id,
            name: entry.name,
            symbol: entry.symbol,
            slug: entry.slug,
            rank: entry.rank,
            is_active: entry.is_active.unwrap_or(1) != 0,
        }
    }
}

/// Typed access to the CoinMarketCap market-data API.
///
/// Each method runs one logical call through the shared [`RequestExecutor`]
/// and decodes the `data` member of the response. Payloads that do not match
/// the expected records fail with an `InvalidResponse` error; upstream errors
/// pass through unchanged.
#[derive(Clone)]
pub struct MarketDataClient {
    executor: RequestExecutor,
}

impl MarketDataClient {
    pub fn new(config: &ClientConfig) -> Self {
        Self::with_http_client(config, Arc::new(ReqwestHttpClient::new()))
    }

    pub fn with_http_client(config: &ClientConfig, http: Arc<dyn HttpClient>) -> Self {
        let limiter = Arc::new(RateLimiter::new(
            config.rate_limit_requests,
            config.rate_limit_period,
        ));
        let executor = RequestExecutor::new(http, limiter, config.base_url.clone(), config.auth())
            .with_timeout(config.timeout)
            .with_retry(config.retry_config());

        tracing::info!(
            base_url = %config.base_url,
            max_retries = config.max_retries,
            "initialized market data client"
        );
        Self { executor }
    }

    pub fn from_executor(executor: RequestExecutor) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    /// Latest quotes keyed by record symbol.
    pub async fn quotes(
        &self,
        request: &QuotesRequest,
    ) -> Result<BTreeMap<String, Cryptocurrency>, ApiError> {
        let data: BTreeMap<String, OneOrMany<Cryptocurrency>> = self
            .fetch(QuotesRequest::ENDPOINT, QuotesRequest::OPERATION, request.params())
            .await?;

        Ok(flatten_by_symbol(data, |record| record.symbol.clone()))
    }

    pub async fn listings(
        &self,
        request: &ListingsRequest,
    ) -> Result<Vec<Cryptocurrency>, ApiError> {
        self.fetch(ListingsRequest::ENDPOINT, ListingsRequest::OPERATION, request.params())
            .await
    }

    /// Metadata keyed by record symbol.
    pub async fn info(
        &self,
        request: &InfoRequest,
    ) -> Result<BTreeMap<String, CryptocurrencyInfo>, ApiError> {
        let data: BTreeMap<String, OneOrMany<CryptocurrencyInfo>> = self
            .fetch(InfoRequest::ENDPOINT, InfoRequest::OPERATION, request.params())
            .await?;

        Ok(flatten_by_symbol(data, |record| record.symbol.clone()))
    }

    pub async fn global_metrics(
        &self,
        request: &GlobalMetricsRequest,
    ) -> Result<GlobalMetrics, ApiError> {
        self.fetch(
            GlobalMetricsRequest::ENDPOINT,
            GlobalMetricsRequest::OPERATION,
            request.params(),
        )
        .await
    }

    pub async fn historical_quotes(
        &self,
        request: &HistoricalQuotesRequest,
    ) -> Result<Vec<HistoricalQuote>, ApiError> {
        let envelope: SeriesEnvelope<HistoricalQuote> = self
            .fetch(
                HistoricalQuotesRequest::ENDPOINT,
                HistoricalQuotesRequest::OPERATION,
                request.params(),
            )
            .await?;
        Ok(envelope.quotes)
    }

    pub async fn ohlcv(&self, request: &OhlcvRequest) -> Result<Vec<OhlcvPoint>, ApiError> {
        let envelope: SeriesEnvelope<OhlcvPoint> = self
            .fetch(OhlcvRequest::ENDPOINT, OhlcvRequest::OPERATION, request.params())
            .await?;
        Ok(envelope.quotes)
    }

    /// First `limit` directory entries whose name or symbol contains the
    /// query, in upstream directory order (not rank order).
    pub async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchResult>, ApiError> {
        let directory: Vec<DirectoryEntry> = self
            .fetch(SearchRequest::ENDPOINT, SearchRequest::OPERATION, QueryParams::new())
            .await?;

        let limit = request.limit() as usize;
        Ok(directory
            .into_iter()
            .filter(|entry| request.matches(&entry.name, &entry.symbol))
            .take(limit)
            .map(SearchResult::from)
            .collect())
    }

    /// Global metrics followed by the top of the listing, as two upstream calls.
    pub async fn market_overview(
        &self,
        request: &MarketOverviewRequest,
    ) -> Result<MarketOverview, ApiError> {
        let metrics = self.global_metrics(&request.global_metrics()).await?;
        let top = self.listings(&request.listings()).await?;

        Ok(MarketOverview::new(request.convert.clone(), metrics, top))
    }

    async fn fetch<T>(
        &self,
        endpoint: &str,
        operation: &str,
        params: QueryParams,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        let response = self.executor.execute(&ApiRequest::get(endpoint, params)).await?;
        decode_data(response.body, operation)
    }
}

fn decode_data<T>(mut body: Value, operation: &str) -> Result<T, ApiError>
where
    T: DeserializeOwned,
{
    let data = match body.get_mut("data") {
        Some(data) => data.take(),
        None => {
            return Err(ApiError::invalid_response(format!(
                "{operation} response has no data member"
            )))
        }
    };

    serde_json::from_value(data).map_err(|error| {
        ApiError::invalid_response(format!("malformed {operation} payload: {error}"))
    })
}

/// Key records by symbol. When several records share a symbol the first one
/// in response order is kept and the rest are dropped with a warning.
fn flatten_by_symbol<T>(
    data: BTreeMap<String, OneOrMany<T>>,
    symbol_of: impl Fn(&T) -> String,
) -> BTreeMap<String, T> {
    let mut flattened = BTreeMap::new();
    let mut dropped: BTreeMap<String, usize> = BTreeMap::new();

    let records = data.into_values().flat_map(|entry| match entry {
        OneOrMany::One(record) => vec![record],
        OneOrMany::Many(records) => records,
    });
    for record in records {
        match flattened.entry(symbol_of(&record)) {
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
            Entry::Occupied(slot) => *dropped.entry(slot.key().clone()).or_default() += 1,
        }
    }

    for (symbol, count) in &dropped {
        tracing::warn!(
            symbol = %symbol,
            dropped = count,
            "several assets share a symbol; kept the first"
        );
    }
    flattened
}
