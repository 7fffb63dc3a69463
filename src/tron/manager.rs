use serde_json::Value;

use super::provider::HttpProvider;
use super::transport::HttpMethod;
use crate::tron_error::TronError;

/// Routes requests to the node that serves them.
#[derive(Debug, Clone)]
pub struct TronManager {
    full_node: HttpProvider,
    solidity_node: HttpProvider,
    event_server: HttpProvider,
}

impl TronManager {
    pub fn new(
        full_node: HttpProvider,
        solidity_node: HttpProvider,
        event_server: HttpProvider,
    ) -> Self {
        Self {
            full_node,
            solidity_node,
            event_server,
        }
    }

    pub fn full_node(&self) -> &HttpProvider {
        &self.full_node
    }

    pub fn solidity_node(&self) -> &HttpProvider {
        &self.solidity_node
    }

    pub fn event_server(&self) -> &HttpProvider {
        &self.event_server
    }

    /// Provider answering `path`.
    pub fn provider_for(&self, path: &str) -> &HttpProvider {
        let path = path.trim_start_matches('/');
        if path.starts_with("walletsolidity/") {
            &self.solidity_node
        } else if path.starts_with("event/") {
            &self.event_server
        } else {
            &self.full_node
        }
    }

    pub fn set_api_key(&mut self, api_key: &str) {
        self.full_node.set_api_key(api_key);
        self.solidity_node.set_api_key(api_key);
        self.event_server.set_api_key(api_key);
    }

    pub async fn request(
        &self,
        path: &str,
        payload: &Value,
        method: HttpMethod,
    ) -> Result<Value, TronError> {
        self.provider_for(path).request(path, payload, method).await
    }

    pub async fn request_with_retry(
        &self,
        path: &str,
        payload: &Value,
        method: HttpMethod,
        max_retries: u32,
    ) -> Result<Value, TronError> {
        self.provider_for(path)
            .request_with_retry(path, payload, method, max_retries)
            .await
    }

    pub async fn post(&self, path: &str, payload: &Value) -> Result<Value, TronError> {
        self.request(path, payload, HttpMethod::POST).await
    }

    pub async fn get(&self, path: &str, query: &Value) -> Result<Value, TronError> {
        self.request(path, query, HttpMethod::GET).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tron::transport::mock::MockTransport;
    use serde_json::json;
    use std::sync::Arc;

    fn manager(mock: &Arc<MockTransport>) -> TronManager {
        TronManager::new(
            HttpProvider::new("http://full:8090", mock.clone()),
            HttpProvider::new("http://solidity:8091", mock.clone()),
            HttpProvider::new("http://events:8092", mock.clone()),
        )
    }

    #[tokio::test]
    async fn test_routing() {
        let mock = Arc::new(MockTransport::new());
        mock.reply("/wallet/getaccount", json!({}))
            .reply("/walletsolidity/gettransactioninfobyid", json!({}))
            .reply("/event/contract/T1", json!([]));

        let manager = manager(&mock);
        manager.post("/wallet/getaccount", &json!({})).await.unwrap();
        manager
            .post("/walletsolidity/gettransactioninfobyid", &json!({"value": "ab"}))
            .await
            .unwrap();
        manager.get("event/contract/T1", &Value::Null).await.unwrap();

        let urls: Vec<String> = mock.requests().into_iter().map(|r| r.url).collect();
        assert_eq!(urls[0], "http://full:8090/wallet/getaccount");
        assert_eq!(urls[1], "http://solidity:8091/walletsolidity/gettransactioninfobyid");
        assert_eq!(urls[2], "http://events:8092/event/contract/T1");
    }

    #[test]
    fn test_set_api_key_propagates() {
        let mock = Arc::new(MockTransport::new());
        let mut manager = manager(&mock);
        manager.set_api_key("k");
        assert_eq!(manager.full_node().api_key(), Some("k"));
        assert_eq!(manager.solidity_node().api_key(), Some("k"));
        assert_eq!(manager.event_server().api_key(), Some("k"));
    }
}
