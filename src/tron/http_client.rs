use num_bigint::BigUint;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

use super::ecdsa::PrivateKey;
use super::manager::TronManager;
use super::metadata_cache::TokenMetadataCache;
use super::provider::HttpProvider;
use super::trc20::Trc20Contract;
use super::transaction::TronTransaction;
use super::transport::{HttpMethod, HttpTransport, ReqwestTransport};
use super::types::*;
use super::utils::*;
use crate::config::{Network, TronConfig};
use crate::tron_error::{
    TronError, CODE_ACCOUNT_RESOURCES, CODE_TRANSACTION_STATUS, CODE_TRC20_HISTORY,
    CODE_USDT_BALANCE,
};

/// Zero address used as caller of read-only contract calls when no account is configured.
pub const ZERO_HEX_ADDRESS: &str = "410000000000000000000000000000000000000000";

/// USDT uses 6 decimals on every TRON network.
pub const USDT_DECIMALS: u32 = 6;

/// TRC10 token id or TRC20 contract address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenId {
    Trc10(String),
    Trc20(TronAddress),
}

impl TokenId {
    /// Valid addresses are TRC20 contracts, anything else a TRC10 id.
    pub fn parse(token: &str) -> Self {
        if is_address(token) {
            TokenId::Trc20(token.to_string())
        } else {
            TokenId::Trc10(token.to_string())
        }
    }
}

/// TRON HTTP API client
///
/// Wraps the full node, solidity node and event server behind one object and
/// adds API key handling, response normalization across API versions, TRC20
/// helpers, energy estimation and a shared contract metadata cache.
#[derive(Clone)]
pub struct TronHttpClient {
    pub(crate) manager: TronManager,
    pub(crate) network: Network,
    pub(crate) api_version: String,
    pub(crate) api_key: Option<String>,
    pub(crate) address: Option<TronAddress>,
    pub(crate) private_key: Option<PrivateKey>,
    pub(crate) metadata: Arc<TokenMetadataCache>,
    pub(crate) fee_limit: u64,
    pub(crate) max_retries: u32,
}

impl std::fmt::Debug for TronHttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TronHttpClient")
            .field("manager", &self.manager)
            .field("network", &self.network)
            .field("api_version", &self.api_version)
            .field("address", &self.address)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

impl TronHttpClient {
    /// Create a new TronHttpClient for mainnet
    pub fn mainnet(api_key: Option<String>) -> Self {
        let mut config = TronConfig::for_network(Network::Mainnet);
        config.api_key = api_key;
        Self::build(&config, Arc::new(ReqwestTransport::new()))
    }

    /// Create a new TronHttpClient for testnet (Shasta)
    pub fn testnet(api_key: Option<String>) -> Self {
        let mut config = TronConfig::for_network(Network::Shasta);
        config.api_key = api_key;
        Self::build(&config, Arc::new(ReqwestTransport::new()))
    }

    pub fn from_config(config: &TronConfig) -> Result<Self, TronError> {
        Self::with_transport(config, Arc::new(ReqwestTransport::new()))
    }

    pub fn with_transport(
        config: &TronConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, TronError> {
        let mut client = Self::build(config, transport);
        if let Some(key) = &config.private_key {
            client.set_private_key(key)?;
        }
        Ok(client)
    }

    fn build(config: &TronConfig, transport: Arc<dyn HttpTransport>) -> Self {
        let provider = |url: String| {
            HttpProvider::new(url, transport.clone())
                .with_timeout(config.timeout_ms)
                .with_max_backoff(config.retry_delay_ms)
                .with_api_key(config.api_key.clone())
        };

        Self {
            manager: TronManager::new(
                provider(config.full_node_url()),
                provider(config.solidity_node_url()),
                provider(config.event_server_url()),
            ),
            network: config.network,
            api_version: config.api_version.clone(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            address: None,
            private_key: None,
            metadata: Arc::new(TokenMetadataCache::new(config.metadata_cache_capacity)),
            fee_limit: config.fee_limit,
            max_retries: config.max_retries,
        }
    }

    pub fn api_url(&self) -> &str {
        self.manager.full_node().host()
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn manager(&self) -> &TronManager {
        &self.manager
    }

    pub fn metadata_cache(&self) -> &TokenMetadataCache {
        &self.metadata
    }

    pub fn set_api_version(&mut self, version: impl Into<String>) -> &mut Self {
        self.api_version = version.into();
        self
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Set the API key on every node.
    pub fn set_api_key(&mut self, api_key: impl Into<String>) -> &mut Self {
        let api_key = api_key.into();
        self.manager.set_api_key(&api_key);
        self.api_key = if api_key.is_empty() { None } else { Some(api_key) };
        self
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    /// Use `private_key` for signing; its address becomes the default account.
    pub fn set_private_key(&mut self, private_key: &str) -> Result<&mut Self, TronError> {
        let key = PrivateKey::from_hex(private_key)?;
        self.address = Some(key.address()?);
        self.private_key = Some(key);
        Ok(self)
    }

    pub fn set_address(&mut self, address: &str) -> Result<&mut Self, TronError> {
        self.address = Some(to_base58_address(address)?);
        Ok(self)
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    fn is_v1(&self) -> bool {
        self.api_version.starts_with("v1")
    }

    pub(crate) fn resolve_address(&self, address: Option<&str>) -> Result<String, TronError> {
        match address.filter(|a| !a.is_empty()) {
            Some(address) => Ok(address.to_string()),
            None => self.address.clone().ok_or(TronError::MissingAddress),
        }
    }

    /// Hex address used as `owner_address` of read-only calls.
    pub(crate) fn caller_hex(&self) -> String {
        self.address
            .as_deref()
            .and_then(|a| to_hex_address(a).ok())
            .unwrap_or_else(|| ZERO_HEX_ADDRESS.to_string())
    }

    /// Read-only request, retried up to `max_retries` times.
    pub(crate) async fn query(
        &self,
        path: &str,
        payload: &Value,
        method: HttpMethod,
    ) -> Result<Value, TronError> {
        self.manager
            .request_with_retry(path, payload, method, self.max_retries)
            .await
    }

    pub(crate) fn signer(&self, context: &str) -> Result<&PrivateKey, TronError> {
        self.private_key
            .as_ref()
            .ok_or_else(|| TronError::MissingPrivateKey(context.to_string()))
    }

    /// Account document from `/{version}/accounts/{address}`, unmodified.
    pub async fn get_account(&self, address: Option<&str>) -> Result<Value, TronError> {
        let address = self.resolve_address(address)?;
        if !is_address(&address) {
            return Err(TronError::invalid_address(&address));
        }

        let path = format!("/{}/accounts/{}", self.api_version, address);
        self.query(&path, &Value::Null, HttpMethod::GET).await
    }

    /// TRX balance, in sun or (with `from_tron`) in TRX.
    ///
    /// Lookup failures are logged and reported as a zero balance.
    pub async fn get_balance(&self, address: Option<&str>, from_tron: bool) -> f64 {
        match self.fetch_balance(address).await {
            Ok(sun) if from_tron => super::utils::from_tron(sun),
            Ok(sun) => sun as f64,
            Err(e) => {
                warn!(error = %e, "failed to fetch TRX balance, reporting 0");
                0.0
            }
        }
    }

    async fn fetch_balance(&self, address: Option<&str>) -> Result<i64, TronError> {
        let account = if self.is_v1() {
            self.get_account(address).await?
        } else {
            let address = self.resolve_address(address)?;
            self.manager
                .post("/wallet/getaccount", &json!({ "address": to_hex_address(&address)? }))
                .await?
        };

        Ok(int_field(account_data(&account), "balance"))
    }

    /// Bandwidth and energy figures of an account.
    pub async fn get_account_resources(
        &self,
        address: Option<&str>,
    ) -> Result<AccountResources, TronError> {
        self.fetch_account_resources(address).await.map_err(|e| {
            TronError::operation(CODE_ACCOUNT_RESOURCES, "failed to get account resources", e)
        })
    }

    async fn fetch_account_resources(
        &self,
        address: Option<&str>,
    ) -> Result<AccountResources, TronError> {
        let address = self.resolve_address(address)?;

        if !self.is_v1() {
            let response = self
                .manager
                .post(
                    "/wallet/getaccountresource",
                    &json!({ "address": to_hex_address(&address)? }),
                )
                .await?;
            return Ok(serde_json::from_value(response)?);
        }

        let address = to_base58_address(&address)?;
        let account = self.get_account(Some(&address)).await?;
        let data = account_data(&account);

        Ok(AccountResources {
            free_net_limit: int_field(data, "free_net_limit"),
            free_net_used: int_field(data, "free_net_used"),
            net_limit: int_field(data, "net_limit"),
            net_used: int_field(data, "net_used"),
            energy_limit: int_field(data, "energy_limit"),
            energy_used: int_field(data, "energy_used"),
            total_energy_limit: int_field(data, "energy_limit"),
            total_energy_weight: int_field(data, "energy_weight"),
            total_net_limit: int_field(data, "net_limit"),
            total_net_weight: int_field(data, "net_weight"),
            balance: int_field(data, "balance"),
        })
    }

    /// Balance of a TRC10 or TRC20 token as a decimal string.
    ///
    /// TRC20 balances are scaled by the contract's decimals. TRC10 balances are
    /// raw unless `from_tron` is set, in which case they are divided by 10^6.
    pub async fn get_token_balance(
        &self,
        token: &TokenId,
        address: Option<&str>,
        from_tron: bool,
    ) -> Result<String, TronError> {
        let address = self.resolve_address(address)?;
        if !is_address(&address) {
            return Err(TronError::invalid_address(&address));
        }

        match token {
            TokenId::Trc20(contract) => {
                self.contract(contract)?
                    .balance_of_scaled(Some(&address))
                    .await
            }
            TokenId::Trc10(token_id) => {
                let account = self.get_account(Some(&address)).await?;
                let raw = account_data(&account)
                    .get("assetV2")
                    .and_then(Value::as_array)
                    .and_then(|assets| {
                        assets.iter().find(|asset| {
                            asset.get("key").map(value_to_string).as_deref() == Some(token_id.as_str())
                        })
                    })
                    .and_then(|asset| asset.get("value"))
                    .map(value_to_string)
                    .unwrap_or_else(|| "0".to_string());

                if !from_tron {
                    return Ok(raw);
                }
                let raw = parse_token_amount(&raw, 0)?;
                Ok(trim_decimal(&format_token_amount(&raw, TRX_DECIMALS)))
            }
        }
    }

    /// USDT balance of the configured network, trailing zeros trimmed.
    pub async fn get_usdt_balance(&self, address: Option<&str>) -> Result<String, TronError> {
        let fetch = async {
            let address = self.resolve_address(address)?;
            let raw = self
                .contract(self.network.usdt_contract())?
                .balance_of(Some(&address))
                .await?;
            Ok::<_, TronError>(trim_decimal(&format_token_amount(&raw, USDT_DECIMALS)))
        };

        fetch
            .await
            .map_err(|e| TronError::operation(CODE_USDT_BALANCE, "failed to query USDT balance", e))
    }

    /// Send one TRC20 transfer per request; failures are reported per item.
    pub async fn batch_transfer_trc20(
        &self,
        contract_address: &str,
        transfers: &[TransferRequest],
    ) -> Result<Vec<TransferOutcome>, TronError> {
        if transfers.is_empty() {
            return Err(TronError::EmptyTransferList);
        }
        self.contract(contract_address)?
            .batch_transfer(transfers)
            .await
    }

    pub async fn get_transaction_info(&self, tx_id: &str) -> Result<Value, TronError> {
        self.query(
            "/walletsolidity/gettransactioninfobyid",
            &json!({ "value": tx_id }),
            HttpMethod::POST,
        )
        .await
    }

    pub async fn get_transaction_status(
        &self,
        tx_id: &str,
    ) -> Result<TransactionStatus, TronError> {
        let info = self.get_transaction_info(tx_id).await.map_err(|e| {
            TronError::operation(CODE_TRANSACTION_STATUS, "failed to get transaction status", e)
        })?;
        Ok(transaction_status_from_info(info))
    }

    /// TRC20 transfers of an account, normalized across response shapes.
    pub async fn get_trc20_transactions_by_account(
        &self,
        address: &str,
        query: &Trc20TransferQuery,
    ) -> Result<Trc20TransferPage, TronError> {
        if !is_address(address) {
            return Err(TronError::invalid_address(address));
        }
        if let Some(contract) = &query.contract_address {
            if !is_address(contract) {
                return Err(TronError::InvalidContractAddress(contract.clone()));
            }
        }
        if !(1..=100).contains(&query.limit) {
            return Err(TronError::InvalidLimit(query.limit));
        }

        let mut params = serde_json::Map::new();
        params.insert("limit".to_string(), json!(query.limit));
        if let Some(fingerprint) = &query.fingerprint {
            params.insert("fingerprint".to_string(), json!(fingerprint));
        }
        if let Some(min_timestamp) = query.min_timestamp {
            params.insert("min_timestamp".to_string(), json!(min_timestamp));
        }
        if query.only_confirmed {
            params.insert("only_confirmed".to_string(), json!("true"));
        }
        if query.only_to {
            params.insert("only_to".to_string(), json!("true"));
        }
        if query.only_from {
            params.insert("only_from".to_string(), json!("true"));
        }
        if let Some(contract) = &query.contract_address {
            params.insert("contract_address".to_string(), json!(contract));
        }

        let path = format!("/{}/accounts/{}/transactions/trc20", self.api_version, address);
        let response = self
            .query(&path, &Value::Object(params), HttpMethod::GET)
            .await
            .map_err(|e| {
                TronError::operation(CODE_TRC20_HISTORY, "failed to get TRC20 transactions", e)
            })?;

        Ok(normalize_trc20_page(response))
    }

    /// Handle for a TRC20 contract.
    pub fn contract(&self, address: &str) -> Result<Trc20Contract<'_>, TronError> {
        if !is_address(address) {
            return Err(TronError::InvalidContractAddress(address.to_string()));
        }
        Trc20Contract::new(self, address)
    }

    /// Sign with the configured private key.
    pub fn sign_transaction(
        &self,
        transaction: &UnsignedTransaction,
    ) -> Result<SignedTransaction, TronError> {
        let key = self.signer("signing a transaction")?;
        TronTransaction::new(transaction.clone()).sign(key)
    }

    /// Broadcast a signed transaction
    pub async fn send_raw_transaction(
        &self,
        signed_tx: &SignedTransaction,
    ) -> Result<BroadcastResponse, TronError> {
        let body = serde_json::to_value(signed_tx).map_err(|e| {
            TronError::Serialization(format!("Failed to serialize transaction: {}", e))
        })?;

        let response = self
            .manager
            .post("/wallet/broadcasttransaction", &body)
            .await?;
        let mut broadcast: BroadcastResponse = serde_json::from_value(response).map_err(|e| {
            TronError::InvalidResponse(format!("Failed to parse broadcast response: {}", e))
        })?;

        if !broadcast.result {
            return Err(TronError::Broadcast(format!(
                "{} - {}",
                broadcast.code.as_deref().unwrap_or("UNKNOWN"),
                broadcast
                    .message
                    .as_deref()
                    .map(decode_hex_message)
                    .unwrap_or_default()
            )));
        }

        if broadcast.tx_id.is_none() {
            broadcast.tx_id = Some(signed_tx.tx_id.clone());
        }
        debug!(tx_id = ?broadcast.tx_id, "transaction broadcast");
        Ok(broadcast)
    }

    pub(crate) async fn sign_and_broadcast(
        &self,
        transaction: &UnsignedTransaction,
    ) -> Result<BroadcastResponse, TronError> {
        let signed = self.sign_transaction(transaction)?;
        self.send_raw_transaction(&signed).await
    }
}

/// First element of a v1 `data` envelope, or the document itself.
pub(crate) fn account_data(response: &Value) -> &Value {
    match response.get("data").and_then(Value::as_array) {
        Some(data) if !data.is_empty() => &data[0],
        _ => response,
    }
}

/// Integer field that may be encoded as number or string; missing is 0.
pub(crate) fn int_field(value: &Value, key: &str) -> i64 {
    match value.get(key) {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.parse().unwrap_or(0),
        _ => 0,
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub(crate) fn transaction_status_from_info(info: Value) -> TransactionStatus {
    let is_empty = match &info {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    };
    if is_empty {
        return TransactionStatus::Pending;
    }

    if info.get("result").and_then(Value::as_str) == Some("FAILED") {
        let message = info
            .get("resMessage")
            .and_then(Value::as_str)
            .map(decode_hex_message)
            .unwrap_or_else(|| "transaction execution failed".to_string());
        return TransactionStatus::Failed { message, info };
    }

    let block = info.get("blockNumber").and_then(Value::as_u64);
    let energy_used = info
        .get("receipt")
        .and_then(|r| r.get("energy_usage_total"))
        .and_then(Value::as_u64)
        .unwrap_or(0);

    TransactionStatus::Confirmed {
        block,
        energy_used,
        info,
    }
}

pub(crate) fn normalize_trc20_page(response: Value) -> Trc20TransferPage {
    let success = response
        .get("success")
        .and_then(Value::as_bool)
        .unwrap_or(true);
    let meta = response.get("meta").cloned();

    let entries = match &response {
        Value::Array(entries) => entries.clone(),
        other => other
            .get("data")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default(),
    };

    let data = entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<Trc20Transfer>(entry) {
            Ok(transfer) => Some(transfer),
            Err(e) => {
                debug!(error = %e, "skipping malformed TRC20 transfer entry");
                None
            }
        })
        .collect();

    Trc20TransferPage {
        success,
        data,
        meta,
    }
}

/// Numeric comparison of a node supplied amount with an expected raw amount.
pub(crate) fn amount_equals(value: &str, expected: &BigUint) -> bool {
    BigUint::parse_bytes(value.trim().as_bytes(), 10).as_ref() == Some(expected)
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::tron::provider::API_KEY_HEADER;
    use crate::tron::transport::mock::MockTransport;

    #[test]
    fn test_tron_http_client_creation() {
        let mainnet_client = TronHttpClient::mainnet(None);
        assert_eq!(mainnet_client.api_url(), "https://api.trongrid.io");
        assert!(mainnet_client.api_key().is_none());

        let mainnet_with_key = TronHttpClient::mainnet(Some("test-key".to_string()));
        assert_eq!(mainnet_with_key.api_key(), Some("test-key"));
        assert_eq!(mainnet_with_key.manager().solidity_node().api_key(), Some("test-key"));

        let testnet_client = TronHttpClient::testnet(None);
        assert_eq!(testnet_client.api_url(), "https://api.shasta.trongrid.io");
        assert_eq!(testnet_client.network(), Network::Shasta);
    }

    #[test]
    fn test_api_version_and_key_setters() {
        let mut client = TronHttpClient::mainnet(None);
        assert_eq!(client.api_version(), "v1");
        client.set_api_version("v2");
        assert_eq!(client.api_version(), "v2");

        client.set_api_key("new-key");
        assert_eq!(client.api_key(), Some("new-key"));
        assert_eq!(client.manager().full_node().api_key(), Some("new-key"));
        assert_eq!(client.manager().event_server().api_key(), Some("new-key"));
    }

    #[test]
    fn test_private_key_sets_address() {
        let mock = Arc::new(MockTransport::new());
        let client = client_with_key(&mock);
        assert_eq!(client.address(), Some(HOLDER));
        assert_eq!(client.caller_hex(), HOLDER_HEX);

        let anonymous = test_support::client(&mock);
        assert_eq!(anonymous.caller_hex(), ZERO_HEX_ADDRESS);
        assert!(anonymous.sign_transaction(&serde_json::from_value(unsigned_tx_json()).unwrap()).is_err());

        let mut config = TronConfig::default();
        config.private_key = Some("bad".to_string());
        assert!(TronHttpClient::with_transport(&config, mock.clone()).is_err());
    }

    #[tokio::test]
    async fn test_get_balance_v1_envelope() {
        let mock = Arc::new(MockTransport::new());
        mock.reply(
            &format!("/v1/accounts/{}", HOLDER),
            json!({"data": [{"balance": 2_500_000, "address": HOLDER_HEX}], "success": true, "meta": {}}),
        );
        let mut client = client(&mock);
        client.set_api_key("key-1");

        assert_eq!(client.get_balance(Some(HOLDER), false).await, 2_500_000.0);
        assert_eq!(client.get_balance(Some(HOLDER), true).await, 2.5);
        assert_eq!(mock.requests()[0].header(API_KEY_HEADER), Some("key-1"));
    }

    #[tokio::test]
    async fn test_get_balance_flat_and_legacy() {
        let mock = Arc::new(MockTransport::new());
        mock.reply(&format!("/v1/accounts/{}", HOLDER), json!({"balance": 7}));
        mock.reply("/wallet/getaccount", json!({"balance": 9}));
        let mut client = client(&mock);

        assert_eq!(client.get_balance(Some(HOLDER), false).await, 7.0);

        client.set_api_version("legacy");
        assert_eq!(client.get_balance(Some(HOLDER), false).await, 9.0);
        let request = &mock.requests_to("/wallet/getaccount")[0];
        let body: Value = serde_json::from_slice(request.body.as_ref().unwrap()).unwrap();
        assert_eq!(body["address"], HOLDER_HEX);
    }

    #[tokio::test]
    async fn test_get_balance_errors_report_zero() {
        let mock = Arc::new(MockTransport::new());
        mock.fail(&format!("/v1/accounts/{}", HOLDER), "timeout");
        let client = client(&mock);

        assert_eq!(client.get_balance(Some(HOLDER), true).await, 0.0);
        assert_eq!(client.get_balance(Some("invalid"), false).await, 0.0);
        // No default address configured.
        assert_eq!(client.get_balance(None, false).await, 0.0);
    }

    #[tokio::test]
    async fn test_read_only_calls_retry_transient_errors() {
        let mock = Arc::new(MockTransport::new());
        let path = format!("/v1/accounts/{}", HOLDER);
        mock.fail(&path, "connection reset")
            .reply(&path, json!({"balance": 5}));

        let mut config = TronConfig::for_network(Network::Mainnet);
        config.full_node = Some("http://full.test".to_string());
        config.max_retries = 5;
        config.retry_delay_ms = 300;
        let client = TronHttpClient::with_transport(&config, mock.clone()).unwrap();

        let account = client.get_account(Some(HOLDER)).await.unwrap();
        assert_eq!(account["balance"], 5);
        assert_eq!(mock.requests_to(&path).len(), 2);
        assert_eq!(mock.pauses(), vec![std::time::Duration::from_millis(200)]);

        let info = "/walletsolidity/gettransactioninfobyid";
        mock.fail(info, "down").fail(info, "down").reply(info, json!({}));
        assert_eq!(client.get_transaction_status("aa").await.unwrap(), TransactionStatus::Pending);
        assert_eq!(mock.requests_to(info).len(), 3);
        assert_eq!(
            mock.pauses(),
            [200, 200, 300].map(std::time::Duration::from_millis).to_vec()
        );
    }

    #[tokio::test]
    async fn test_read_only_calls_give_up_after_max_retries() {
        let mock = Arc::new(MockTransport::new());
        let path = format!("/v1/accounts/{}", HOLDER);
        mock.fail(&path, "timeout");

        let mut config = TronConfig::for_network(Network::Mainnet);
        config.full_node = Some("http://full.test".to_string());
        config.max_retries = 2;
        let client = TronHttpClient::with_transport(&config, mock.clone()).unwrap();

        assert_eq!(
            client.get_account(Some(HOLDER)).await.unwrap_err(),
            TronError::Network("timeout".to_string())
        );
        assert_eq!(mock.requests_to(&path).len(), 2);
    }

    #[tokio::test]
    async fn test_get_account_rejects_invalid_address() {
        let mock = Arc::new(MockTransport::new());
        let client = client(&mock);
        let err = client.get_account(Some("invalid_address")).await.unwrap_err();
        assert_eq!(err.code(), 1001);
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn test_account_resources_v1() {
        let mock = Arc::new(MockTransport::new());
        mock.reply(
            &format!("/v1/accounts/{}", HOLDER),
            json!({"data": [{
                "balance": 1000,
                "free_net_limit": 600,
                "free_net_used": 12,
                "net_limit": 40,
                "energy_limit": "11183",
                "energy_weight": 16096397,
                "net_weight": 5
            }]}),
        );
        let client = client(&mock);

        // Hex input is converted to base58 for the v1 route.
        let resources = client.get_account_resources(Some(HOLDER_HEX)).await.unwrap();
        assert_eq!(resources.free_net_limit, 600);
        assert_eq!(resources.free_net_used, 12);
        assert_eq!(resources.net_limit, 40);
        assert_eq!(resources.total_net_limit, 40);
        assert_eq!(resources.energy_limit, 11183);
        assert_eq!(resources.total_energy_weight, 16_096_397);
        assert_eq!(resources.total_net_weight, 5);
        assert_eq!(resources.balance, 1000);
    }

    #[tokio::test]
    async fn test_account_resources_legacy_and_error_code() {
        let mock = Arc::new(MockTransport::new());
        mock.reply(
            "/wallet/getaccountresource",
            json!({"freeNetLimit": 600, "EnergyLimit": 500, "TotalEnergyWeight": 99}),
        );
        let mut client = client(&mock);
        client.set_api_version("wallet");

        let resources = client.get_account_resources(Some(HOLDER)).await.unwrap();
        assert_eq!(resources.free_net_limit, 600);
        assert_eq!(resources.energy_limit, 500);
        assert_eq!(resources.total_energy_weight, 99);

        let err = client.get_account_resources(None).await.unwrap_err();
        assert_eq!(err.code(), 1070);
    }

    #[tokio::test]
    async fn test_trc10_token_balance() {
        let mock = Arc::new(MockTransport::new());
        mock.reply(
            &format!("/v1/accounts/{}", HOLDER),
            json!({"data": [{"assetV2": [
                {"key": "1002000", "value": 2_500_000},
                {"key": "1000001", "value": 7}
            ]}]}),
        );
        let client = client(&mock);
        let token = TokenId::parse("1002000");
        assert_eq!(token, TokenId::Trc10("1002000".to_string()));

        assert_eq!(client.get_token_balance(&token, Some(HOLDER), false).await.unwrap(), "2500000");
        assert_eq!(client.get_token_balance(&token, Some(HOLDER), true).await.unwrap(), "2.5");
        assert_eq!(
            client
                .get_token_balance(&TokenId::Trc10("404".into()), Some(HOLDER), false)
                .await
                .unwrap(),
            "0"
        );
    }

    #[tokio::test]
    async fn test_trc20_token_balance_scaled() {
        let mock = Arc::new(MockTransport::new());
        mock.reply("/wallet/triggerconstantcontract", uint_result(6))
            .reply("/wallet/triggerconstantcontract", uint_result(10_070_100));
        let client = client(&mock);

        let token = TokenId::parse(USDT);
        assert_eq!(token, TokenId::Trc20(USDT.to_string()));
        let balance = client.get_token_balance(&token, Some(HOLDER), false).await.unwrap();
        assert_eq!(balance, "10.070100");
    }

    #[tokio::test]
    async fn test_usdt_balance() {
        let mock = Arc::new(MockTransport::new());
        mock.reply("/wallet/triggerconstantcontract", uint_result(10_070_100));
        let client = client(&mock);

        assert_eq!(client.get_usdt_balance(Some(HOLDER)).await.unwrap(), "10.0701");

        let request = &mock.requests_to("/wallet/triggerconstantcontract")[0];
        let body: Value = serde_json::from_slice(request.body.as_ref().unwrap()).unwrap();
        assert_eq!(body["contract_address"], USDT_HEX);
        assert_eq!(body["function_selector"], "balanceOf(address)");

        assert_eq!(client.get_usdt_balance(None).await.unwrap_err().code(), 1060);
    }

    #[tokio::test]
    async fn test_transaction_status() {
        let mock = Arc::new(MockTransport::new());
        let path = "/walletsolidity/gettransactioninfobyid";
        mock.reply(path, json!({}))
            .reply(
                path,
                json!({"id": "aa", "result": "FAILED", "resMessage": hex::encode("REVERT opcode executed")}),
            )
            .reply(
                path,
                json!({"id": "aa", "blockNumber": 5012, "receipt": {"energy_usage_total": 14650}}),
            );
        let client = client(&mock);

        assert_eq!(client.get_transaction_status("aa").await.unwrap(), TransactionStatus::Pending);

        match client.get_transaction_status("aa").await.unwrap() {
            TransactionStatus::Failed { message, .. } => assert_eq!(message, "REVERT opcode executed"),
            other => panic!("unexpected status {:?}", other),
        }

        match client.get_transaction_status("aa").await.unwrap() {
            TransactionStatus::Confirmed { block, energy_used, .. } => {
                assert_eq!(block, Some(5012));
                assert_eq!(energy_used, 14650);
            }
            other => panic!("unexpected status {:?}", other),
        }

        let request = &mock.requests()[0];
        assert!(request.url.starts_with("http://solidity.test"));
    }

    #[tokio::test]
    async fn test_transaction_status_error_code() {
        let mock = Arc::new(MockTransport::new());
        mock.fail("/walletsolidity/gettransactioninfobyid", "down");
        let client = client(&mock);
        assert_eq!(client.get_transaction_status("aa").await.unwrap_err().code(), 1020);
    }

    #[tokio::test]
    async fn test_trc20_history_query_and_validation() {
        let mock = Arc::new(MockTransport::new());
        let path = format!("/v1/accounts/{}/transactions/trc20", HOLDER);
        mock.reply(
            &path,
            json!({
                "data": [
                    {"transaction_id": "t1", "from": RECIPIENT, "to": HOLDER, "value": "5", "block_timestamp": 10, "type": "Transfer"},
                    {"unexpected": true}
                ],
                "success": true,
                "meta": {"fingerprint": "next", "page_size": 1}
            }),
        );
        let client = client(&mock);

        let query = Trc20TransferQuery {
            contract_address: Some(USDT.to_string()),
            limit: 50,
            min_timestamp: Some(1000),
            only_to: true,
            ..Default::default()
        };
        let page = client.get_trc20_transactions_by_account(HOLDER, &query).await.unwrap();
        assert!(page.success);
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].transaction_id, "t1");
        assert_eq!(page.meta.unwrap()["fingerprint"], "next");

        let url = &mock.requests()[0].url;
        assert!(url.contains("limit=50"));
        assert!(url.contains("min_timestamp=1000"));
        assert!(url.contains("only_confirmed=true"));
        assert!(url.contains("only_to=true"));
        assert!(!url.contains("only_from"));
        assert!(url.contains(&format!("contract_address={}", USDT)));

        let bad_limit = Trc20TransferQuery { limit: 101, ..Default::default() };
        assert_eq!(
            client.get_trc20_transactions_by_account(HOLDER, &bad_limit).await.unwrap_err().code(),
            1041
        );
        let bad_contract = Trc20TransferQuery {
            contract_address: Some("nope".into()),
            ..Default::default()
        };
        assert_eq!(
            client.get_trc20_transactions_by_account(HOLDER, &bad_contract).await.unwrap_err().code(),
            1040
        );
        assert_eq!(
            client
                .get_trc20_transactions_by_account("nope", &Trc20TransferQuery::default())
                .await
                .unwrap_err()
                .code(),
            1001
        );
    }

    #[test]
    fn test_normalize_trc20_page_shapes() {
        let bare = normalize_trc20_page(json!([
            {"transaction_id": "t1", "from": "a", "to": "b", "value": "1"}
        ]));
        assert!(bare.success);
        assert_eq!(bare.data.len(), 1);
        assert!(bare.meta.is_none());

        let failed = normalize_trc20_page(json!({"success": false}));
        assert!(!failed.success);
        assert!(failed.data.is_empty());
    }

    #[tokio::test]
    async fn test_send_raw_transaction() {
        let mock = Arc::new(MockTransport::new());
        mock.reply("/wallet/broadcasttransaction", json!({"result": true}))
            .reply(
                "/wallet/broadcasttransaction",
                json!({"code": "SIGERROR", "message": hex::encode("validate signature error")}),
            );
        let client = client_with_key(&mock);

        let unsigned: UnsignedTransaction = serde_json::from_value(unsigned_tx_json()).unwrap();
        let signed = client.sign_transaction(&unsigned).unwrap();

        let response = client.send_raw_transaction(&signed).await.unwrap();
        assert_eq!(response.tx_id.as_deref(), Some(signed.tx_id.as_str()));

        let err = client.send_raw_transaction(&signed).await.unwrap_err();
        assert_eq!(err.code(), 1003);
        assert!(err.to_string().contains("validate signature error"));

        let body: Value =
            serde_json::from_slice(mock.requests()[0].body.as_ref().unwrap()).unwrap();
        assert_eq!(body["raw_data"]["fee_limit"], 30000000);
        assert_eq!(body["signature"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_amount_equals() {
        assert!(amount_equals("1500000", &BigUint::from(1_500_000u64)));
        assert!(amount_equals(" 001500000", &BigUint::from(1_500_000u64)));
        assert!(!amount_equals("1500001", &BigUint::from(1_500_000u64)));
        assert!(!amount_equals("abc", &BigUint::from(1u8)));
    }
}
