use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::transport::{HttpHeader, HttpMethod, HttpRequest, HttpTransport};
use crate::tron_error::TronError;

pub const API_KEY_HEADER: &str = "TRON-PRO-API-KEY";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Default upper bound of the retry back-off.
pub const DEFAULT_MAX_BACKOFF_MS: u64 = 1_000;

/// One TRON HTTP endpoint (full node, solidity node or event server).
///
/// Every request carries the `TRON-PRO-API-KEY` header when a key is set.
#[derive(Clone)]
pub struct HttpProvider {
    host: String,
    timeout: Duration,
    max_backoff: Duration,
    api_key: Option<String>,
    transport: Arc<dyn HttpTransport>,
}

impl std::fmt::Debug for HttpProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpProvider")
            .field("host", &self.host)
            .field("timeout", &self.timeout)
            .field("max_backoff", &self.max_backoff)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl HttpProvider {
    pub fn new(host: impl Into<String>, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            host: host.into().trim_end_matches('/').to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            max_backoff: Duration::from_millis(DEFAULT_MAX_BACKOFF_MS),
            api_key: None,
            transport,
        }
    }

    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.set_timeout(timeout_ms);
        self
    }

    /// Cap the back-off of [`request_with_retry`](Self::request_with_retry).
    pub fn with_max_backoff(mut self, max_backoff_ms: u64) -> Self {
        self.max_backoff = Duration::from_millis(max_backoff_ms);
        self
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        if let Some(key) = api_key {
            self.set_api_key(key);
        }
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn max_backoff(&self) -> Duration {
        self.max_backoff
    }

    pub fn set_timeout(&mut self, timeout_ms: u64) -> &mut Self {
        self.timeout = Duration::from_millis(timeout_ms);
        self
    }

    pub fn set_api_key(&mut self, api_key: impl Into<String>) -> &mut Self {
        let api_key = api_key.into();
        self.api_key = if api_key.is_empty() { None } else { Some(api_key) };
        self
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub(crate) fn transport(&self) -> Arc<dyn HttpTransport> {
        self.transport.clone()
    }

    fn headers(&self, with_body: bool) -> Vec<HttpHeader> {
        let mut headers = vec![HttpHeader {
            name: "Accept".to_string(),
            value: "application/json".to_string(),
        }];

        if with_body {
            headers.push(HttpHeader {
                name: "Content-Type".to_string(),
                value: "application/json".to_string(),
            });
        }

        if let Some(api_key) = &self.api_key {
            headers.push(HttpHeader {
                name: API_KEY_HEADER.to_string(),
                value: api_key.clone(),
            });
        }

        headers
    }

    fn build_url(&self, path: &str, query: Option<&Value>) -> Result<String, TronError> {
        let raw = if path.starts_with('/') {
            format!("{}{}", self.host, path)
        } else {
            format!("{}/{}", self.host, path)
        };
        let mut url = Url::parse(&raw)
            .map_err(|e| TronError::Network(format!("invalid URL {}: {}", raw, e)))?;

        if let Some(Value::Object(params)) = query {
            if !params.is_empty() {
                let mut pairs = url.query_pairs_mut();
                for (key, value) in params {
                    match value {
                        Value::Null => continue,
                        Value::String(s) => pairs.append_pair(key, s),
                        other => pairs.append_pair(key, &other.to_string()),
                    };
                }
            }
        }

        Ok(url.to_string())
    }

    /// Send `payload` to `path`: as query string for GET, as JSON body for POST.
    pub async fn request(
        &self,
        path: &str,
        payload: &Value,
        method: HttpMethod,
    ) -> Result<Value, TronError> {
        let request = match method {
            HttpMethod::GET => HttpRequest {
                url: self.build_url(path, Some(payload))?,
                method,
                headers: self.headers(false),
                body: None,
                timeout: self.timeout,
            },
            HttpMethod::POST => {
                let body = match payload {
                    Value::Null => b"{}".to_vec(),
                    other => serde_json::to_vec(other).map_err(|e| {
                        TronError::Serialization(format!("Failed to serialize body: {}", e))
                    })?,
                };
                HttpRequest {
                    url: self.build_url(path, None)?,
                    method,
                    headers: self.headers(true),
                    body: Some(body),
                    timeout: self.timeout,
                }
            }
        };

        let response = self.transport.send(request).await?;

        if !(200..300).contains(&response.status) {
            return Err(TronError::Http {
                status: response.status,
                body: String::from_utf8_lossy(&response.body).into_owned(),
            });
        }

        if response.body.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(Value::Object(Default::default()));
        }

        serde_json::from_slice(&response.body).map_err(|e| {
            TronError::InvalidResponse(format!("Failed to parse response from {}: {}", path, e))
        })
    }

    /// [`request`](Self::request) with exponential back-off: 200 ms, 400 ms, 800 ms, ...
    /// up to the provider's `max_backoff` (1 s by default).
    pub async fn request_with_retry(
        &self,
        path: &str,
        payload: &Value,
        method: HttpMethod,
        max_retries: u32,
    ) -> Result<Value, TronError> {
        let mut attempts = 0u32;
        let mut last_error = TronError::Network(format!("no attempt made for {}", path));

        while attempts < max_retries.max(1) {
            match self.request(path, payload, method).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    attempts += 1;
                    debug!(path, attempts, error = %e, "request failed, backing off");
                    last_error = e;
                    if attempts < max_retries {
                        self.transport
                            .pause(capped_backoff(attempts, self.max_backoff))
                            .await;
                    }
                }
            }
        }

        Err(last_error)
    }

    /// The node answers `/wallet/getnowblock` with a block id.
    pub async fn is_connected(&self) -> bool {
        match self
            .request("/wallet/getnowblock", &Value::Null, HttpMethod::GET)
            .await
        {
            Ok(block) => block.get("blockID").is_some(),
            Err(e) => {
                debug!(host = %self.host, error = %e, "connectivity check failed");
                false
            }
        }
    }
}

/// `min(2^attempt * 100ms, 1s)`.
pub fn retry_backoff(attempt: u32) -> Duration {
    capped_backoff(attempt, Duration::from_millis(DEFAULT_MAX_BACKOFF_MS))
}

/// `min(2^attempt * 100ms, cap)`.
pub fn capped_backoff(attempt: u32, cap: Duration) -> Duration {
    let millis = 2u64.saturating_pow(attempt).saturating_mul(100);
    Duration::from_millis(millis).min(cap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tron::transport::mock::MockTransport;
    use serde_json::json;

    fn provider(mock: &Arc<MockTransport>) -> HttpProvider {
        HttpProvider::new("https://api.shasta.trongrid.io/", mock.clone())
    }

    #[test]
    fn test_provider_creation() {
        let mock = Arc::new(MockTransport::new());
        let mut provider = provider(&mock);
        assert_eq!(provider.host(), "https://api.shasta.trongrid.io");
        assert_eq!(provider.timeout(), Duration::from_millis(30_000));
        assert!(provider.api_key().is_none());

        provider.set_api_key("test-key").set_timeout(5_000);
        assert_eq!(provider.api_key(), Some("test-key"));
        assert_eq!(provider.timeout(), Duration::from_millis(5_000));

        provider.set_api_key("");
        assert!(provider.api_key().is_none());
        assert!(!format!("{:?}", provider.clone().with_api_key(Some("secret".into()))).contains("secret"));
    }

    #[test]
    fn test_retry_backoff() {
        assert_eq!(retry_backoff(1), Duration::from_millis(200));
        assert_eq!(retry_backoff(2), Duration::from_millis(400));
        assert_eq!(retry_backoff(3), Duration::from_millis(800));
        assert_eq!(retry_backoff(4), Duration::from_millis(1_000));
        assert_eq!(retry_backoff(64), Duration::from_millis(1_000));
        assert_eq!(
            capped_backoff(3, Duration::from_millis(300)),
            Duration::from_millis(300)
        );
        assert_eq!(capped_backoff(1, Duration::from_secs(5)), Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_api_key_injected_on_get_and_post() {
        let mock = Arc::new(MockTransport::new());
        mock.reply("/v1/accounts/T1", json!({"data": []}));
        mock.reply("/wallet/getaccount", json!({"balance": 1}));

        let provider = provider(&mock).with_api_key(Some("my-key".to_string()));
        provider
            .request("/v1/accounts/T1", &json!({"limit": 20, "only_to": "true", "skip": null}), HttpMethod::GET)
            .await
            .unwrap();
        provider
            .request("/wallet/getaccount", &json!({"address": "41ab"}), HttpMethod::POST)
            .await
            .unwrap();

        let requests = mock.requests();
        assert_eq!(requests.len(), 2);
        for request in &requests {
            assert_eq!(request.header(API_KEY_HEADER), Some("my-key"));
        }

        assert_eq!(
            requests[0].url,
            "https://api.shasta.trongrid.io/v1/accounts/T1?limit=20&only_to=true"
        );
        assert!(requests[0].body.is_none());

        let body: Value = serde_json::from_slice(requests[1].body.as_ref().unwrap()).unwrap();
        assert_eq!(body, json!({"address": "41ab"}));
        assert_eq!(requests[1].header("content-type"), Some("application/json"));
    }

    #[tokio::test]
    async fn test_no_api_key_header_without_key() {
        let mock = Arc::new(MockTransport::new());
        mock.reply("/wallet/getnowblock", json!({"blockID": "00ab"}));
        let provider = provider(&mock);
        assert!(provider.is_connected().await);
        assert!(mock.requests()[0].header(API_KEY_HEADER).is_none());
    }

    #[tokio::test]
    async fn test_http_error_and_empty_body() {
        let mock = Arc::new(MockTransport::new());
        mock.reply_raw("/wallet/broken", 503, b"unavailable".to_vec());
        mock.reply_raw("/wallet/empty", 200, Vec::new());
        mock.reply_raw("/wallet/garbage", 200, b"<html>".to_vec());
        let provider = provider(&mock);

        let err = provider
            .request("/wallet/broken", &Value::Null, HttpMethod::POST)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            TronError::Http {
                status: 503,
                body: "unavailable".to_string()
            }
        );

        let empty = provider
            .request("/wallet/empty", &Value::Null, HttpMethod::POST)
            .await
            .unwrap();
        assert_eq!(empty, json!({}));

        assert!(matches!(
            provider.request("/wallet/garbage", &Value::Null, HttpMethod::GET).await,
            Err(TronError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_request_with_retry() {
        let mock = Arc::new(MockTransport::new());
        mock.fail("/wallet/getnowblock", "reset")
            .fail("/wallet/getnowblock", "reset")
            .reply("/wallet/getnowblock", json!({"blockID": "01"}));

        let provider = provider(&mock);
        let block = provider
            .request_with_retry("/wallet/getnowblock", &Value::Null, HttpMethod::GET, 3)
            .await
            .unwrap();
        assert_eq!(block["blockID"], "01");
        assert_eq!(mock.requests().len(), 3);
        assert_eq!(
            mock.pauses(),
            vec![Duration::from_millis(200), Duration::from_millis(400)]
        );
    }

    #[tokio::test]
    async fn test_request_with_retry_returns_last_error() {
        let mock = Arc::new(MockTransport::new());
        mock.fail("/wallet/getnowblock", "down");

        let provider = provider(&mock);
        let err = provider
            .request_with_retry("/wallet/getnowblock", &Value::Null, HttpMethod::GET, 2)
            .await
            .unwrap_err();
        assert_eq!(err, TronError::Network("down".to_string()));
        assert_eq!(mock.requests().len(), 2);
        assert_eq!(mock.pauses().len(), 1);
    }

    #[tokio::test]
    async fn test_request_with_retry_honours_max_backoff() {
        let mock = Arc::new(MockTransport::new());
        mock.fail("/wallet/getnowblock", "down");

        let provider = provider(&mock).with_max_backoff(300);
        assert_eq!(provider.max_backoff(), Duration::from_millis(300));
        let _ = provider
            .request_with_retry("/wallet/getnowblock", &Value::Null, HttpMethod::GET, 4)
            .await;
        assert_eq!(
            mock.pauses(),
            vec![
                Duration::from_millis(200),
                Duration::from_millis(300),
                Duration::from_millis(300)
            ]
        );
    }
}
