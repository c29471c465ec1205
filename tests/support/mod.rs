//! Shared fixtures for the core behavior tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cointick_core::{
    ApiKey, ClientConfig, HttpClient, HttpError, HttpRequest, HttpResponse, MarketDataClient,
};
use serde_json::{json, Value};
use tokio::time::Instant;

pub const TEST_API_KEY: &str = "test-key-0123456789";
pub const TEST_BASE_URL: &str = "https://api.cointick.test/v1";

pub type Outcome = Result<HttpResponse, HttpError>;

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub request: HttpRequest,
    pub at: Instant,
}

/// Transport that replays scripted outcomes in order and records every
/// request. Once the script runs out, the last outcome repeats.
#[derive(Debug, Default)]
pub struct ScriptedHttpClient {
    script: Mutex<VecDeque<Outcome>>,
    last: Mutex<Option<Outcome>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedHttpClient {
    pub fn new(script: impl IntoIterator<Item = Outcome>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into_iter().collect()),
            ..Self::default()
        })
    }

    pub fn always(outcome: Outcome) -> Arc<Self> {
        Self::new([outcome])
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("calls lock is not poisoned").clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("calls lock is not poisoned").len()
    }

    pub fn gaps(&self) -> Vec<Duration> {
        let calls = self.calls();
        calls
            .windows(2)
            .map(|pair| pair[1].at.duration_since(pair[0].at))
            .collect()
    }

    fn next_outcome(&self) -> Outcome {
        let mut last = self.last.lock().expect("last lock is not poisoned");
        if let Some(outcome) = self
            .script
            .lock()
            .expect("script lock is not poisoned")
            .pop_front()
        {
            *last = Some(outcome);
        }

        last.clone()
            .unwrap_or_else(|| Err(HttpError::other("script is empty")))
    }
}

impl HttpClient for ScriptedHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        self.calls
            .lock()
            .expect("calls lock is not poisoned")
            .push(RecordedCall {
                request,
                at: Instant::now(),
            });
        let outcome = self.next_outcome();
        Box::pin(async move { outcome })
    }
}

/// Client config pointing at the test base URL with a generous rate limit.
pub fn test_config() -> ClientConfig {
    ClientConfig::new(ApiKey::new(TEST_API_KEY).expect("test key is valid"))
        .with_base_url(TEST_BASE_URL)
        .with_rate_limit(1_000, Duration::from_secs(1))
}

pub fn client_with(http: Arc<ScriptedHttpClient>) -> MarketDataClient {
    MarketDataClient::with_http_client(&test_config(), http)
}

pub fn ok(body: Value) -> Outcome {
    Ok(HttpResponse::ok_json(body.to_string()))
}

pub fn status(code: u16, message: &str) -> Outcome {
    Ok(HttpResponse::new(
        code,
        json!({ "status": { "error_code": code, "error_message": message } }).to_string(),
    ))
}

pub fn timeout() -> Outcome {
    Err(HttpError::timeout("request timed out"))
}

pub fn connection_refused() -> Outcome {
    Err(HttpError::connect("connection refused"))
}

pub fn quote_json(price: f64) -> Value {
    json!({
        "price": price,
        "volume_24h": 1_000_000.0,
        "percent_change_1h": 0.1,
        "percent_change_24h": -1.5,
        "percent_change_7d": 4.2,
        "market_cap": price * 19_000_000.0,
        "last_updated": "2024-05-01T00:00:00.000Z"
    })
}

pub fn crypto_json(id: u64, name: &str, symbol: &str, price: f64) -> Value {
    json!({
        "id": id,
        "name": name,
        "symbol": symbol,
        "slug": name.to_lowercase(),
        "cmc_rank": id,
        "circulating_supply": 19_000_000.0,
        "total_supply": 21_000_000.0,
        "max_supply": null,
        "tags": ["mineable"],
        "platform": null,
        "last_updated": "2024-05-01T00:00:00.000Z",
        "quote": { "USD": quote_json(price) }
    })
}

pub fn quotes_body() -> Value {
    json!({
        "status": { "error_code": 0, "error_message": null },
        "data": {
            "BTC": crypto_json(1, "Bitcoin", "BTC", 64_000.0),
            "ETH": crypto_json(1027, "Ethereum", "ETH", 3_100.0)
        }
    })
}

pub fn global_metrics_json() -> Value {
    json!({
        "active_cryptocurrencies": 9_000,
        "total_cryptocurrencies": 25_000,
        "active_market_pairs": 70_000,
        "active_exchanges": 700,
        "total_exchanges": 8_000,
        "eth_dominance": 17.0,
        "btc_dominance": 53.0,
        "quote": {
            "USD": {
                "total_market_cap": 2_400_000_000_000.0,
                "total_volume_24h": 120_000_000_000.0,
                "last_updated": "2024-05-01T00:00:00.000Z"
            }
        },
        "last_updated": "2024-05-01T00:00:00.000Z"
    })
}
