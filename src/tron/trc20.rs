use num_bigint::BigUint;
use num_traits::ToPrimitive;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::http_client::TronHttpClient;
use super::transaction::{encode_transfer_parameters, TronTransaction, TRC20_TRANSFER_SELECTOR};
use super::transport::HttpMethod;
use super::types::*;
use super::utils::*;
use crate::tron_error::TronError;

/// A TRC20 token contract reached through a [`TronHttpClient`].
///
/// Name, symbol and decimals are read through the client's shared metadata
/// cache, so repeated lookups only hit the node once per contract.
#[derive(Debug, Clone)]
pub struct Trc20Contract<'a> {
    client: &'a TronHttpClient,
    address: TronAddress,
    hex_address: String,
}

impl<'a> Trc20Contract<'a> {
    pub(crate) fn new(client: &'a TronHttpClient, address: &str) -> Result<Self, TronError> {
        let address = to_base58_address(address)
            .map_err(|_| TronError::InvalidContractAddress(address.to_string()))?;
        let hex_address = to_hex_address(&address)?;
        Ok(Self {
            client,
            address,
            hex_address,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn hex_address(&self) -> &str {
        &self.hex_address
    }

    /// First word of a read-only call's `constant_result`.
    async fn call_constant(&self, selector: &str, parameter: &str) -> Result<String, TronError> {
        let response = self
            .client
            .trigger_constant_contract(
                &self.hex_address,
                selector,
                parameter,
                &self.client.caller_hex(),
            )
            .await?;

        check_call_result(&response, selector)?;

        response
            .get("constant_result")
            .and_then(Value::as_array)
            .and_then(|results| results.first())
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                TronError::ContractCall(format!("{} returned no constant result", selector))
            })
    }

    pub async fn name(&self) -> Result<String, TronError> {
        if let Some(name) = self.client.metadata.name(&self.address) {
            return Ok(name);
        }
        let name = decode_abi_string(&self.call_constant("name()", "").await?)?;
        self.client.metadata.store_name(&self.address, name.clone());
        Ok(name)
    }

    pub async fn symbol(&self) -> Result<String, TronError> {
        if let Some(symbol) = self.client.metadata.symbol(&self.address) {
            return Ok(symbol);
        }
        let symbol = decode_abi_string(&self.call_constant("symbol()", "").await?)?;
        self.client.metadata.store_symbol(&self.address, symbol.clone());
        Ok(symbol)
    }

    pub async fn decimals(&self) -> Result<u8, TronError> {
        if let Some(decimals) = self.client.metadata.decimals(&self.address) {
            return Ok(decimals);
        }
        let raw = decode_uint256(&self.call_constant("decimals()", "").await?)?;
        let decimals = raw
            .to_u8()
            .ok_or_else(|| TronError::ContractCall(format!("decimals() returned {}", raw)))?;
        debug!(contract = %self.address, decimals, "caching token decimals");
        self.client.metadata.store_decimals(&self.address, decimals);
        Ok(decimals)
    }

    /// Total supply in the smallest unit.
    pub async fn total_supply(&self) -> Result<BigUint, TronError> {
        decode_uint256(&self.call_constant("totalSupply()", "").await?)
    }

    /// Balance in the smallest unit. `None` means the client's default address.
    pub async fn balance_of(&self, address: Option<&str>) -> Result<BigUint, TronError> {
        let address = self.client.resolve_address(address)?;
        if !is_address(&address) {
            return Err(TronError::invalid_address(&address));
        }
        let parameter = encode_address_param(&address)?;
        decode_uint256(&self.call_constant("balanceOf(address)", &parameter).await?)
    }

    /// Balance formatted with the token's decimals.
    pub async fn balance_of_scaled(&self, address: Option<&str>) -> Result<String, TronError> {
        let decimals = self.decimals().await?;
        let raw = self.balance_of(address).await?;
        Ok(format_token_amount(&raw, decimals as u32))
    }

    /// Balance of every address; a failing lookup does not abort the others.
    pub async fn batch_balance_of(&self, addresses: &[&str], scaled: bool) -> Vec<BalanceLookup> {
        let mut results = Vec::with_capacity(addresses.len());

        for address in addresses {
            let balance = if scaled {
                self.balance_of_scaled(Some(address)).await
            } else {
                self.balance_of(Some(address))
                    .await
                    .map(|raw| raw.to_str_radix(10))
            };

            results.push(match balance {
                Ok(balance) => BalanceLookup {
                    address: address.to_string(),
                    balance: Some(balance),
                    error: None,
                },
                Err(e) => BalanceLookup {
                    address: address.to_string(),
                    balance: None,
                    error: Some(e.to_string()),
                },
            });
        }

        results
    }

    /// Transfer `amount` (smallest unit) to `to`, signed with the client key.
    pub async fn transfer(
        &self,
        to: &str,
        amount: &BigUint,
    ) -> Result<BroadcastResponse, TronError> {
        let key = self.client.signer("TRC20 transfer")?;
        if !is_address(to) {
            return Err(TronError::invalid_address(to));
        }
        let to = to_base58_address(to)?;

        let payload = json!({
            "owner_address": key.hex_address()?,
            "contract_address": self.hex_address,
            "function_selector": TRC20_TRANSFER_SELECTOR,
            "parameter": encode_transfer_parameters(&to, amount)?,
            "fee_limit": self.client.fee_limit,
            "call_value": 0,
        });

        let response = self
            .client
            .manager
            .post("/wallet/triggersmartcontract", &payload)
            .await?;
        check_call_result(&response, TRC20_TRANSFER_SELECTOR)?;

        let transaction = TronTransaction::from_node_response(&response)?;
        let signed = transaction.sign(key)?;
        debug!(contract = %self.address, to = %to, amount = %amount, tx_id = %signed.tx_id, "broadcasting TRC20 transfer");
        self.client.send_raw_transaction(&signed).await
    }

    /// Transfer a decimal amount, scaled by the token's decimals.
    pub async fn transfer_amount(
        &self,
        to: &str,
        amount: &str,
    ) -> Result<BroadcastResponse, TronError> {
        let decimals = self.decimals().await?;
        let raw = parse_token_amount(amount, decimals as u32)?;
        self.transfer(to, &raw).await
    }

    /// One transfer per receiver; failures are reported per item.
    pub async fn batch_transfer(
        &self,
        receivers: &[TransferRequest],
    ) -> Result<Vec<TransferOutcome>, TronError> {
        if receivers.is_empty() {
            return Err(TronError::EmptyTransferList);
        }

        let decimals = self.decimals().await? as u32;
        let mut outcomes = Vec::with_capacity(receivers.len());

        for receiver in receivers {
            let outcome = match self.batch_item(receiver, decimals).await {
                Ok(response) => TransferOutcome::Sent {
                    to: receiver.to.clone(),
                    amount: receiver.amount.clone(),
                    response,
                },
                Err(e) => {
                    warn!(to = %receiver.to, amount = %receiver.amount, error = %e, "TRC20 transfer failed");
                    TransferOutcome::Failed {
                        request: receiver.clone(),
                        error: e.to_string(),
                    }
                }
            };
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }

    async fn batch_item(
        &self,
        receiver: &TransferRequest,
        decimals: u32,
    ) -> Result<BroadcastResponse, TronError> {
        if receiver.to.trim().is_empty() || receiver.amount.trim().is_empty() {
            return Err(TronError::InvalidAmount(
                "transfer requires both `to` and `amount`".to_string(),
            ));
        }
        let raw = parse_token_amount(&receiver.amount, decimals)?;
        self.transfer(&receiver.to, &raw).await
    }

    pub async fn token_info(&self) -> Result<Trc20TokenInfo, TronError> {
        Ok(Trc20TokenInfo {
            name: self.name().await?,
            symbol: self.symbol().await?,
            decimals: self.decimals().await?,
            address: self.address.clone(),
            total_supply: self.total_supply().await?.to_str_radix(10),
        })
    }
}

impl TronHttpClient {
    /// Raw `/wallet/triggerconstantcontract` call. All addresses are hex.
    pub async fn trigger_constant_contract(
        &self,
        contract_hex: &str,
        selector: &str,
        parameter: &str,
        owner_hex: &str,
    ) -> Result<Value, TronError> {
        let mut payload = json!({
            "owner_address": owner_hex,
            "contract_address": contract_hex,
            "function_selector": selector,
        });
        if !parameter.is_empty() {
            payload["parameter"] = json!(parameter);
        }

        self.query("/wallet/triggerconstantcontract", &payload, HttpMethod::POST)
            .await
    }
}

/// Reject a contract call response whose `result.result` is not `true`.
fn check_call_result(response: &Value, selector: &str) -> Result<(), TronError> {
    let result = response.get("result");
    if result.and_then(|r| r.get("result")).and_then(Value::as_bool) == Some(true) {
        return Ok(());
    }

    let message = result
        .and_then(|r| r.get("message"))
        .and_then(Value::as_str)
        .map(decode_hex_message)
        .or_else(|| response.get("Error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| "unknown error".to_string());

    Err(TronError::ContractCall(format!("{} failed: {}", selector, message)))
}
