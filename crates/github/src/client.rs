//! GitHub GraphQL client with a shared rate limit

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::queries::{RateLimitData, RateLimitStatus, RATE_LIMIT_QUERY};
use crate::rate_limit::RateLimiter;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Rate limited, retry after {retry_after} seconds")]
    RateLimited { retry_after: u64 },
    #[error("Rate limit exhausted until {reset_at}")]
    QuotaExhausted { reset_at: DateTime<Utc> },
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("GitHub API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("GraphQL error: {0}")]
    GraphQl(String),
    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Response is missing {0}")]
    MissingData(String),
    #[error("Operation cancelled")]
    Cancelled,
    #[error("{operation} failed: {source}")]
    Query {
        operation: String,
        #[source]
        source: Box<ClientError>,
    },
}

impl ClientError {
    /// Attach the logical operation name. Cancellation stays unwrapped.
    pub fn in_operation(self, operation: impl Into<String>) -> Self {
        match self {
            ClientError::Cancelled => ClientError::Cancelled,
            other => ClientError::Query {
                operation: operation.into(),
                source: Box::new(other),
            },
        }
    }

    pub fn is_cancelled(&self) -> bool {
        match self {
            ClientError::Cancelled => true,
            ClientError::Query { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            ClientError::NotFound(_) => true,
            ClientError::Query { source, .. } => source.is_not_found(),
            _ => false,
        }
    }
}

/// Body of a GraphQL POST
#[derive(Debug, Clone, Serialize)]
pub struct GraphqlRequest {
    pub query: String,
    pub variables: Value,
}

/// Sends GraphQL requests and returns the raw response envelope
#[async_trait]
pub trait GraphqlTransport: Send + Sync {
    async fn send(&self, request: &GraphqlRequest) -> Result<Value, ClientError>;
}

/// Transport over HTTPS using reqwest
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            token,
        }
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("github-activity/0.1"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(ref token) = self.token {
            if let Ok(val) = HeaderValue::from_str(&format!("Bearer {}", token)) {
                headers.insert(AUTHORIZATION, val);
            }
        }
        headers
    }
}

#[async_trait]
impl GraphqlTransport for HttpTransport {
    async fn send(&self, request: &GraphqlRequest) -> Result<Value, ClientError> {
        debug!("POST {}", self.endpoint);
        let resp = self
            .client
            .post(&self.endpoint)
            .headers(self.headers())
            .json(request)
            .send()
            .await?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound(self.endpoint.clone()));
        }
        if let Some(err) = rate_limit_error(status, resp.headers()) {
            return Err(err);
        }
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(resp.json().await?)
    }
}

/// Map a 403/429 to a rate limit error when GitHub says why.
///
/// `Retry-After` marks a secondary limit; `x-ratelimit-remaining: 0` marks the
/// hourly quota, which lifts at the epoch second in `x-ratelimit-reset`.
fn rate_limit_error(status: StatusCode, headers: &HeaderMap) -> Option<ClientError> {
    if status != StatusCode::FORBIDDEN && status != StatusCode::TOO_MANY_REQUESTS {
        return None;
    }
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    if let Some(retry_after) = header("retry-after").and_then(|s| s.parse().ok()) {
        return Some(ClientError::RateLimited { retry_after });
    }
    if header("x-ratelimit-remaining") == Some("0") {
        let reset_at = header("x-ratelimit-reset")
            .and_then(|s| s.parse::<i64>().ok())
            .and_then(|secs| DateTime::from_timestamp(secs, 0))?;
        return Some(ClientError::QuotaExhausted { reset_at });
    }
    None
}

#[derive(Debug, Deserialize)]
struct GraphqlEnvelope {
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
    #[serde(rename = "type")]
    kind: Option<String>,
}

fn decode_envelope<T: DeserializeOwned>(body: Value) -> Result<T, ClientError> {
    let envelope: GraphqlEnvelope = serde_json::from_value(body)?;

    if !envelope.errors.is_empty() {
        let message = envelope
            .errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        if envelope
            .errors
            .iter()
            .any(|e| e.kind.as_deref() == Some("NOT_FOUND"))
        {
            return Err(ClientError::NotFound(message));
        }
        return Err(ClientError::GraphQl(message));
    }

    let data = envelope
        .data
        .ok_or_else(|| ClientError::MissingData("data".to_string()))?;
    Ok(serde_json::from_value(data)?)
}

/// GitHub GraphQL client.
///
/// All queries wait on the shared [`RateLimiter`] before touching the network.
/// Failures are returned to the caller wrapped with the operation name; nothing
/// is retried here.
pub struct GitHubClient {
    transport: Arc<dyn GraphqlTransport>,
    limiter: RateLimiter,
}

impl GitHubClient {
    pub fn new(endpoint: impl Into<String>, token: Option<String>, requests_per_hour: u32) -> Self {
        Self::with_transport(
            Arc::new(HttpTransport::new(endpoint, token)),
            RateLimiter::per_hour(requests_per_hour),
        )
    }

    pub fn with_transport(transport: Arc<dyn GraphqlTransport>, limiter: RateLimiter) -> Self {
        Self { transport, limiter }
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Run one GraphQL query and decode its `data` into `T`
    pub async fn execute<T: DeserializeOwned>(
        &self,
        operation: &str,
        query: &str,
        variables: Value,
        cancel: &CancellationToken,
    ) -> Result<T, ClientError> {
        self.limiter.acquire(cancel).await?;

        debug!("GraphQL {} {}", operation, variables);
        let request = GraphqlRequest {
            query: query.to_string(),
            variables,
        };

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ClientError::Cancelled),
            response = self.transport.send(&request) => response,
        };

        let body = response.map_err(|e| {
            match &e {
                ClientError::RateLimited { retry_after } => {
                    warn!("{} rate limited, pausing {}s", operation, retry_after);
                    self.limiter
                        .record_reset(Utc::now() + chrono::Duration::seconds(*retry_after as i64));
                }
                ClientError::QuotaExhausted { reset_at } => {
                    warn!("{} hit the hourly quota, pausing until {}", operation, reset_at);
                    self.limiter.record_reset(*reset_at);
                }
                _ => {}
            }
            e.in_operation(operation)
        })?;

        decode_envelope(body).map_err(|e| e.in_operation(operation))
    }

    /// Fetch the current quota. The reported reset time is recorded on the
    /// limiter and every later query waits for it.
    pub async fn rate_limit_status(
        &self,
        cancel: &CancellationToken,
    ) -> Result<RateLimitStatus, ClientError> {
        let data: RateLimitData = self
            .execute("rate limit status", RATE_LIMIT_QUERY, json!({}), cancel)
            .await?;

        info!(
            "Rate limit: {}/{} remaining, resets at {}",
            data.rate_limit.remaining, data.rate_limit.limit, data.rate_limit.reset_at
        );
        self.limiter.record_reset(data.rate_limit.reset_at);
        Ok(data.rate_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FixedTransport {
        response: Value,
        calls: AtomicUsize,
    }

    impl FixedTransport {
        fn new(response: Value) -> Arc<Self> {
            Arc::new(Self {
                response,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl GraphqlTransport for FixedTransport {
        async fn send(&self, _request: &GraphqlRequest) -> Result<Value, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.response.clone())
        }
    }

    struct RateLimitedTransport;

    #[async_trait]
    impl GraphqlTransport for RateLimitedTransport {
        async fn send(&self, _request: &GraphqlRequest) -> Result<Value, ClientError> {
            Err(ClientError::RateLimited { retry_after: 120 })
        }
    }

    struct ExhaustedTransport {
        reset_at: DateTime<Utc>,
    }

    #[async_trait]
    impl GraphqlTransport for ExhaustedTransport {
        async fn send(&self, _request: &GraphqlRequest) -> Result<Value, ClientError> {
            Err(ClientError::QuotaExhausted {
                reset_at: self.reset_at,
            })
        }
    }

    fn quota_headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        headers
    }

    fn fast_limiter() -> RateLimiter {
        RateLimiter::with_interval(Duration::from_millis(1))
    }

    #[derive(Debug, Deserialize)]
    struct Viewer {
        login: String,
    }

    #[derive(Debug, Deserialize)]
    struct ViewerData {
        viewer: Viewer,
    }

    #[tokio::test]
    async fn test_execute_decodes_data() {
        let transport =
            FixedTransport::new(json!({ "data": { "viewer": { "login": "octocat" } } }));
        let client = GitHubClient::with_transport(transport.clone(), fast_limiter());

        let data: ViewerData = client
            .execute("viewer", "query { viewer { login } }", json!({}), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(data.viewer.login, "octocat");
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancelled_execute_sends_nothing() {
        let transport = FixedTransport::new(json!({ "data": {} }));
        let client = GitHubClient::with_transport(transport.clone(), fast_limiter());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result: Result<Value, _> = client
            .execute("viewer", "query {}", json!({}), &cancel)
            .await;

        assert!(matches!(result, Err(ClientError::Cancelled)));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_graphql_errors_carry_operation_name() {
        let transport = FixedTransport::new(json!({
            "data": null,
            "errors": [{ "message": "Something went wrong" }]
        }));
        let client = GitHubClient::with_transport(transport, fast_limiter());

        let err = client
            .execute::<Value>("pull requests", "query {}", json!({}), &CancellationToken::new())
            .await
            .unwrap_err();

        match &err {
            ClientError::Query { operation, source } => {
                assert_eq!(operation, "pull requests");
                assert!(matches!(**source, ClientError::GraphQl(_)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("pull requests"));
        assert!(!err.is_cancelled());
    }

    #[tokio::test]
    async fn test_not_found_error_type_is_detected() {
        let transport = FixedTransport::new(json!({
            "data": { "user": null },
            "errors": [{ "type": "NOT_FOUND", "message": "Could not resolve to a User" }]
        }));
        let client = GitHubClient::with_transport(transport, fast_limiter());

        let err = client
            .execute::<Value>("user info", "query {}", json!({}), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_rate_limit_status_records_reset() {
        let transport = FixedTransport::new(json!({
            "data": {
                "rateLimit": { "limit": 5000, "remaining": 4999, "resetAt": "2030-01-01T00:00:00Z" }
            }
        }));
        let client = GitHubClient::with_transport(transport, fast_limiter());

        let status = client
            .rate_limit_status(&CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(status.remaining, 4999);
        assert_eq!(client.limiter().reset_at(), Some(status.reset_at));
    }

    #[tokio::test]
    async fn test_rate_limited_response_records_reset() {
        let client = GitHubClient::with_transport(Arc::new(RateLimitedTransport), fast_limiter());

        let err = client
            .execute::<Value>("issues", "query {}", json!({}), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Query { .. }));
        let reset_at = client.limiter().reset_at().expect("reset recorded");
        assert!(reset_at > Utc::now() + chrono::Duration::seconds(100));
    }

    #[tokio::test]
    async fn test_exhausted_quota_records_reported_reset() {
        let reset_at = Utc::now() + chrono::Duration::minutes(42);
        let client =
            GitHubClient::with_transport(Arc::new(ExhaustedTransport { reset_at }), fast_limiter());

        let err = client
            .execute::<Value>("commits", "query {}", json!({}), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("commits"));
        assert_eq!(client.limiter().reset_at(), Some(reset_at));
    }

    #[test]
    fn test_quota_headers_map_to_exhausted() {
        let headers = quota_headers(&[
            ("x-ratelimit-remaining", "0"),
            ("x-ratelimit-reset", "1893456000"),
        ]);

        let err = rate_limit_error(StatusCode::FORBIDDEN, &headers);

        let expected = DateTime::from_timestamp(1_893_456_000, 0).unwrap();
        assert!(matches!(
            err,
            Some(ClientError::QuotaExhausted { reset_at }) if reset_at == expected
        ));
    }

    #[test]
    fn test_retry_after_takes_precedence() {
        let headers = quota_headers(&[
            ("retry-after", "30"),
            ("x-ratelimit-remaining", "0"),
            ("x-ratelimit-reset", "1893456000"),
        ]);

        let err = rate_limit_error(StatusCode::TOO_MANY_REQUESTS, &headers);

        assert!(matches!(err, Some(ClientError::RateLimited { retry_after: 30 })));
    }

    #[test]
    fn test_forbidden_with_quota_left_is_not_rate_limited() {
        let headers = quota_headers(&[
            ("x-ratelimit-remaining", "12"),
            ("x-ratelimit-reset", "1893456000"),
        ]);

        assert!(rate_limit_error(StatusCode::FORBIDDEN, &headers).is_none());
        let retry = quota_headers(&[("retry-after", "5")]);
        assert!(rate_limit_error(StatusCode::OK, &retry).is_none());
    }
}
