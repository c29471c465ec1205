//! Line-delimited JSON tool server.
//!
//! Reads one `{"tool", "arguments", "id"?}` object per stdin line and writes
//! one envelope per stdout line. Calls run concurrently, so answers may
//! arrive out of order; callers correlate them by `id`.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, Semaphore};

use crate::error::{CliError, ToolError};
use crate::output;
use crate::service::ToolService;
use crate::tools::ToolCall;

/// Calls answered concurrently; further input is not read until one finishes.
const MAX_IN_FLIGHT: usize = 16;

#[derive(Debug, Deserialize)]
struct ToolRequest {
    #[serde(default)]
    id: Option<Value>,
    tool: String,
    #[serde(default)]
    arguments: Value,
}

pub async fn run(service: ToolService) -> Result<(), CliError> {
    tracing::info!(max_in_flight = MAX_IN_FLIGHT, "serving tool calls on stdin");

    serve(&service, tokio::io::stdin(), tokio::io::stdout(), MAX_IN_FLIGHT).await?;

    let stats = service.cache_stats();
    tracing::info!(
        hits = stats.hits,
        misses = stats.misses,
        size = stats.size,
        "input closed, shutting down"
    );
    Ok(())
}

/// Answer every line of `input` on `output`, with at most `max_in_flight`
/// calls running at once. Returns `output` once every answer is written.
pub(crate) async fn serve<R, W>(
    service: &ToolService,
    input: R,
    mut output: W,
    max_in_flight: usize,
) -> Result<W, CliError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let max_in_flight = max_in_flight.max(1);
    let permits = Arc::new(Semaphore::new(max_in_flight));
    let (sender, mut receiver) = mpsc::channel::<String>(max_in_flight);
    let writer = tokio::spawn(async move {
        while let Some(line) = receiver.recv().await {
            output.write_all(line.as_bytes()).await?;
            output.write_all(b"\n").await?;
            output.flush().await?;
        }
        Ok::<W, std::io::Error>(output)
    });

    let mut lines = BufReader::new(input).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let permit = Arc::clone(&permits)
            .acquire_owned()
            .await
            .map_err(|error| CliError::Command(format!("call limiter closed: {error}")))?;
        let service = service.clone();
        let sender = sender.clone();
        tokio::spawn(async move {
            let response = handle_line(&service, &line).await;
            drop(permit);
            if sender.send(response).await.is_err() {
                tracing::warn!("output closed before a response was written");
            }
        });
    }

    // The writer drains until every in-flight call has dropped its sender.
    drop(sender);
    let output = writer
        .await
        .map_err(|error| CliError::Command(format!("output task failed: {error}")))??;
    Ok(output)
}

/// Answer one request line with one envelope line.
pub(crate) async fn handle_line(service: &ToolService, line: &str) -> String {
    let request = match serde_json::from_str::<ToolRequest>(line) {
        Ok(request) => request,
        Err(error) => {
            return output::failure(None, &ToolError::InvalidRequest(error.to_string()), false)
        }
    };
    let id = request.id.as_ref();

    let result = match ToolCall::from_json(&request.tool, &request.arguments) {
        Ok(call) => service.call(&call).await,
        Err(error) => Err(error),
    };

    match result.and_then(|answer| output::success(id, &answer, false)) {
        Ok(line) => line,
        Err(error) => {
            tracing::warn!(tool = %request.tool, code = error.code(), "tool call failed");
            output::failure(id, &error, false)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use cointick_core::{CacheMode, HttpClient, HttpError, HttpRequest, HttpResponse};
    use serde_json::json;

    use super::*;
    use crate::service::tests::{quotes_body, service_with, CannedHttpClient};

    /// Transport that holds every request for a while and records the peak
    /// number of requests it was serving at once.
    #[derive(Debug, Default)]
    struct SlowHttpClient {
        active: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
    }

    impl HttpClient for SlowHttpClient {
        fn execute<'a>(
            &'a self,
            _request: HttpRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
                self.peak.fetch_max(active, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                self.active.fetch_sub(1, Ordering::SeqCst);
                Ok(HttpResponse::new(200, quotes_body().to_string()))
            })
        }
    }

    // =========================================================================
    // Stream handling
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn in_flight_calls_are_bounded() {
        // Given: A slow upstream and forty uncached calls on the input
        let http = Arc::new(SlowHttpClient::default());
        let service = service_with(http.clone(), CacheMode::Bypass);
        let input: String = (0..40)
            .map(|n| {
                format!(
                    "{{\"id\":{n},\"tool\":\"get_cryptocurrency_price\",\"arguments\":{{\"symbols\":\"BTC\"}}}}\n"
                )
            })
            .collect();

        // When: They are served with room for four at a time
        let written = serve(&service, input.as_bytes(), Vec::new(), 4)
            .await
            .expect("serve completes");

        // Then: Every call was answered, never more than four at once
        let written = String::from_utf8(written).expect("utf8");
        assert_eq!(written.lines().count(), 40);
        assert_eq!(http.calls.load(Ordering::SeqCst), 40);
        let peak = http.peak.load(Ordering::SeqCst);
        assert!(peak <= 4, "peak={peak}");
        assert!(peak > 1, "peak={peak}");
    }

    #[tokio::test]
    async fn blank_lines_are_skipped() {
        let http = CannedHttpClient::new(200, quotes_body());
        let service = service_with(http, CacheMode::Use);
        let input = "\n  \n{\"id\":1,\"tool\":\"get_cache_stats\"}\n\n";

        let written = serve(&service, input.as_bytes(), Vec::new(), MAX_IN_FLIGHT)
            .await
            .expect("serve completes");

        let written = String::from_utf8(written).expect("utf8");
        assert_eq!(written.lines().count(), 1);
        let envelope: Value = serde_json::from_str(written.trim_end()).expect("json");
        assert_eq!(envelope["id"], 1);
        assert_eq!(envelope["ok"], true);
    }

    // =========================================================================
    // Single lines
    // =========================================================================

    #[tokio::test]
    async fn identical_requests_produce_identical_lines_with_one_upstream_call() {
        let http = CannedHttpClient::new(200, quotes_body());
        let service = service_with(http.clone(), CacheMode::Use);
        let line = r#"{"tool":"get_cryptocurrency_price","arguments":{"symbols":"BTC"}}"#;

        let first = handle_line(&service, line).await;
        let second = handle_line(&service, line).await;

        assert_eq!(first, second);
        assert_eq!(http.call_count(), 1);
        let envelope: Value = serde_json::from_str(&first).expect("json");
        assert_eq!(envelope["ok"], true);
        assert_eq!(envelope["data"]["BTC"]["quote"]["USD"]["price"], 64000.0);
    }

    #[tokio::test]
    async fn request_id_is_echoed_on_success_and_failure() {
        let http = CannedHttpClient::new(200, quotes_body());
        let service = service_with(http, CacheMode::Use);

        let ok = handle_line(&service, r#"{"id":"a1","tool":"get_cache_stats"}"#).await;
        let failed = handle_line(
            &service,
            r#"{"id":2,"tool":"search_cryptocurrencies","arguments":{"query":"  "}}"#,
        )
        .await;

        let ok: Value = serde_json::from_str(&ok).expect("json");
        let failed: Value = serde_json::from_str(&failed).expect("json");
        assert_eq!(ok["id"], "a1");
        assert_eq!(ok["ok"], true);
        assert_eq!(failed["id"], 2);
        assert_eq!(failed["error"]["code"], "validation.invalid_input");
    }

    #[tokio::test]
    async fn malformed_lines_and_unknown_tools_become_error_envelopes() {
        let http = CannedHttpClient::new(200, quotes_body());
        let service = service_with(http.clone(), CacheMode::Use);

        let malformed: Value =
            serde_json::from_str(&handle_line(&service, "not json").await).expect("json");
        let unknown: Value = serde_json::from_str(
            &handle_line(&service, r#"{"tool":"get_weather","arguments":null}"#).await,
        )
        .expect("json");

        assert_eq!(malformed["error"]["code"], "tool.invalid_request");
        assert_eq!(unknown["error"]["code"], "tool.unknown");
        assert_eq!(http.call_count(), 0);
        assert_eq!(unknown, json!({
            "ok": false,
            "error": { "code": "tool.unknown", "message": "unknown tool 'get_weather'" }
        }));
    }

    #[tokio::test]
    async fn upstream_failures_keep_their_api_code() {
        let http = CannedHttpClient::new(
            429,
            json!({ "status": { "error_code": 1008, "error_message": "rate limit" } }),
        );
        let service = service_with(http, CacheMode::Use);

        let line = handle_line(
            &service,
            r#"{"tool":"get_global_metrics","arguments":{"convert":"USD"}}"#,
        )
        .await;
        let envelope: Value = serde_json::from_str(&line).expect("json");

        assert_eq!(envelope["ok"], false);
        assert_eq!(envelope["error"]["code"], "api.rate_limited");
    }
}
