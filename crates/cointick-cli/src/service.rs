//! Tool dispatch over one shared client and one shared response cache.

use std::sync::Arc;

use cointick_core::{CacheMode, CacheStats, MarketDataClient, ResponseCache};

use crate::error::ToolError;
use crate::tools::ToolCall;

/// Serialized result of a tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exact JSON text; a cached answer replays these bytes.
    pub json: String,
    pub cached: bool,
}

/// Runs tool calls against the market-data client, caching each serialized
/// result under the request's cache key.
///
/// Clones share the client, its rate limiter and the cache.
#[derive(Clone)]
pub struct ToolService {
    client: Arc<MarketDataClient>,
    cache: ResponseCache,
    mode: CacheMode,
}

impl ToolService {
    pub fn new(client: Arc<MarketDataClient>, cache: ResponseCache, mode: CacheMode) -> Self {
        Self {
            client,
            cache,
            mode,
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub async fn call(&self, call: &ToolCall) -> Result<ToolOutput, ToolError> {
        let Some(key) = call.cache_key() else {
            return Ok(ToolOutput {
                json: self.fetch(call).await?,
                cached: false,
            });
        };

        if self.mode.reads() {
            if let Some(json) = self.cache.get(&key) {
                tracing::debug!(tool = call.name(), "served from cache");
                return Ok(ToolOutput { json, cached: true });
            }
        }

        let json = self.fetch(call).await?;
        if self.mode.writes() {
            self.cache.set(key, json.clone());
        }

        Ok(ToolOutput {
            json,
            cached: false,
        })
    }

    async fn fetch(&self, call: &ToolCall) -> Result<String, ToolError> {
        tracing::debug!(tool = call.name(), "dispatching tool call");

        let json = match call {
            ToolCall::Price(request) => serde_json::to_string(&self.client.quotes(request).await?)?,
            ToolCall::Info(request) => serde_json::to_string(&self.client.info(request).await?)?,
            ToolCall::Top(request) => serde_json::to_string(&self.client.listings(request).await?)?,
            ToolCall::GlobalMetrics(request) => {
                serde_json::to_string(&self.client.global_metrics(request).await?)?
            }
            ToolCall::Historical(request) => {
                serde_json::to_string(&self.client.historical_quotes(request).await?)?
            }
            ToolCall::Ohlcv(request) => serde_json::to_string(&self.client.ohlcv(request).await?)?,
            ToolCall::Search(request) => serde_json::to_string(&self.client.search(request).await?)?,
            ToolCall::MarketStatistics(request) => {
                serde_json::to_string(&self.client.market_overview(request).await?)?
            }
            ToolCall::CacheStats => serde_json::to_string(&self.cache.stats())?,
        };

        Ok(json)
    }
}
