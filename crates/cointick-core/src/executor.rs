//! One logical upstream call: admission, attempt, classification, backoff.
//!
//! ```text
//! Pending -> Attempting -> Succeeded
//!                |
//!                +-> Retrying -> Attempting
//!                |
//!                +-> Exhausted
//! ```
//!
//! Every physical attempt passes the rate limiter, including retries. Terminal
//! failures leave the machine on the attempt that produced them; transient
//! ones are retried until the budget in [`RetryConfig`] is spent.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::classify::{classify, classify_transport};
use crate::{
    ApiError, HttpAuth, HttpClient, HttpMethod, HttpRequest, QueryParams, RateLimiter, RetryConfig,
};

/// Description of the upstream call to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    /// Path relative to the base URL, e.g. `cryptocurrency/quotes/latest`.
    pub endpoint: String,
    pub params: QueryParams,
}

impl ApiRequest {
    pub fn get(endpoint: impl Into<String>, params: QueryParams) -> Self {
        Self {
            method: HttpMethod::Get,
            endpoint: endpoint.into(),
            params,
        }
    }
}

/// Successful upstream response with its decoded JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
    /// Physical attempts made, including the successful one.
    pub attempts: u32,
}

/// Per-call retry bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryState {
    attempt: u32,
    last_error: Option<ApiError>,
}

impl RetryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Physical attempts started so far.
    pub const fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn last_error(&self) -> Option<&ApiError> {
        self.last_error.as_ref()
    }

    pub fn begin_attempt(&mut self) {
        self.attempt = self.attempt.saturating_add(1);
    }

    pub fn record_failure(&mut self, error: ApiError) {
        self.last_error = Some(error);
    }

    fn into_error(self) -> ApiError {
        self.last_error
            .unwrap_or_else(|| ApiError::generic(None, "retries exhausted without a recorded error"))
    }
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry { delay: Duration },
    GiveUp,
}

/// Decide the next step after the attempt recorded in `state` failed.
pub fn decide(config: &RetryConfig, state: &RetryState) -> RetryDecision {
    match state.last_error() {
        Some(error) if error.is_terminal() => RetryDecision::GiveUp,
        _ if state.attempt() > config.max_retries => RetryDecision::GiveUp,
        _ => RetryDecision::Retry {
            delay: config.delay_for_retry(state.attempt().saturating_sub(1)),
        },
    }
}

#[derive(Debug)]
enum CallState {
    Pending,
    Attempting,
    Retrying { delay: Duration },
    Succeeded(ApiResponse),
    Exhausted,
}

/// Runs [`ApiRequest`]s against one upstream with shared admission control.
#[derive(Clone)]
pub struct RequestExecutor {
    http: Arc<dyn HttpClient>,
    limiter: Arc<RateLimiter>,
    base_url: String,
    auth: HttpAuth,
    timeout: Duration,
    retry: RetryConfig,
}

impl RequestExecutor {
    pub fn new(
        http: Arc<dyn HttpClient>,
        limiter: Arc<RateLimiter>,
        base_url: impl Into<String>,
        auth: HttpAuth,
    ) -> Self {
        Self {
            http,
            limiter,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            auth,
            timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let mut retry = RetryState::new();
        let mut state = CallState::Pending;

        loop {
            state = match state {
                CallState::Pending => CallState::Attempting,
                CallState::Attempting => {
                    self.limiter.wait_for_acquire(1).await;
                    retry.begin_attempt();
                    tracing::debug!(
                        method = %request.method,
                        endpoint = %request.endpoint,
                        attempt = retry.attempt(),
                        max_attempts = self.retry.max_attempts(),
                        "sending upstream request"
                    );

                    match self.attempt(request, retry.attempt()).await {
                        Ok(response) => CallState::Succeeded(response),
                        Err(error) => {
                            retry.record_failure(error);
                            self.after_failure(request, &retry)
                        }
                    }
                }
                CallState::Retrying { delay } => {
                    tokio::time::sleep(delay).await;
                    CallState::Attempting
                }
                CallState::Succeeded(response) => {
                    tracing::debug!(
                        endpoint = %request.endpoint,
                        attempts = response.attempts,
                        "upstream request succeeded"
                    );
                    return Ok(response);
                }
                CallState::Exhausted => return Err(retry.into_error()),
            };
        }
    }

    fn after_failure(&self, request: &ApiRequest, retry: &RetryState) -> CallState {
        let Some(error) = retry.last_error() else {
            return CallState::Exhausted;
        };

        match decide(&self.retry, retry) {
            RetryDecision::Retry { delay } => {
                tracing::warn!(
                    endpoint = %request.endpoint,
                    attempt = retry.attempt(),
                    error = %error,
                    "transient upstream failure"
                );
                tracing::info!(
                    endpoint = %request.endpoint,
                    delay_ms = delay.as_millis() as u64,
                    "retrying upstream request"
                );
                CallState::Retrying { delay }
            }
            RetryDecision::GiveUp if error.is_terminal() => {
                tracing::error!(
                    endpoint = %request.endpoint,
                    attempt = retry.attempt(),
                    error = %error,
                    "non-retryable upstream failure"
                );
                CallState::Exhausted
            }
            RetryDecision::GiveUp => {
                tracing::error!(
                    endpoint = %request.endpoint,
                    attempts = retry.attempt(),
                    error = %error,
                    "max retries exceeded"
                );
                CallState::Exhausted
            }
        }
    }

    async fn attempt(&self, request: &ApiRequest, attempt: u32) -> Result<ApiResponse, ApiError> {
        let http_request = HttpRequest::new(
            request.method,
            format!("{}/{}", self.base_url, request.endpoint.trim_start_matches('/')),
        )
        .with_query(&request.params)
        .with_header("Accept", "application/json")
        .with_auth(&self.auth)
        .with_timeout(self.timeout);

        let response = self
            .http
            .execute(http_request)
            .await
            .map_err(|error| classify_transport(&error))?;

        if !response.is_success() {
            return Err(classify(response.status, Some(&response.body)));
        }

        let body = serde_json::from_str::<Value>(&response.body).map_err(|error| {
            ApiError::invalid_response(format!("response body is not valid JSON: {error}"))
        })?;

        Ok(ApiResponse {
            status: response.status,
            body,
            attempts: attempt,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_after(attempts: u32, error: ApiError) -> RetryState {
        let mut state = RetryState::new();
        for _ in 0..attempts {
            state.begin_attempt();
        }
        state.record_failure(error);
        state
    }

    #[test]
    fn terminal_errors_give_up_on_first_attempt() {
        let config = RetryConfig::default();

        for error in [
            ApiError::authentication("bad key"),
            ApiError::rate_limited("slow down"),
            ApiError::invalid_parameter("bad limit"),
            ApiError::not_found("gone"),
            ApiError::invalid_response("garbled"),
        ] {
            assert_eq!(decide(&config, &state_after(1, error)), RetryDecision::GiveUp);
        }
    }

    #[test]
    fn transient_errors_follow_the_backoff_schedule() {
        let config = RetryConfig::default();

        let delays: Vec<RetryDecision> = (1..=4)
            .map(|attempt| decide(&config, &state_after(attempt, ApiError::timeout("slow"))))
            .collect();

        assert_eq!(
            delays,
            vec![
                RetryDecision::Retry { delay: Duration::from_secs(2) },
                RetryDecision::Retry { delay: Duration::from_secs(4) },
                RetryDecision::Retry { delay: Duration::from_secs(8) },
                RetryDecision::GiveUp,
            ]
        );
    }

    #[test]
    fn zero_retry_budget_gives_up_after_one_attempt() {
        let config = RetryConfig::no_retry();
        let state = state_after(1, ApiError::connection("refused"));

        assert_eq!(decide(&config, &state), RetryDecision::GiveUp);
    }

    #[test]
    fn exhausted_state_without_error_yields_generic_failure() {
        let error = RetryState::new().into_error();
        assert!(error.retryable());
        assert_eq!(error.status(), None);
    }
}
