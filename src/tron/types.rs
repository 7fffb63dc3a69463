#[cfg(feature = "candid")]
use candid::CandidType;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::Network;

/// Tron address (Base58Check encoded, starts with 'T')
pub type TronAddress = String;

/// Transaction hash on Tron blockchain
pub type TxHash = String;

/// TRC-20 USDT contract address on Tron mainnet
pub const USDT_CONTRACT_ADDRESS: &str = "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t";

/// TRC-20 USDT contract address on Shasta testnet
pub const USDT_CONTRACT_ADDRESS_TESTNET: &str = "TG3XXyExBkPp9nzdajDZsozEu4BkaSJozs";

/// TRC-20 USDT contract address on Nile testnet
pub const USDT_CONTRACT_ADDRESS_NILE: &str = "TXYZopYRdj2D9XRtbG411XZZ3kM5VkAeBf";

/// Token metadata as reported by TronGrid next to a TRC20 transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "candid", derive(CandidType))]
pub struct TokenInfo {
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub decimals: u32,
    #[serde(default)]
    pub name: String,
}

/// One entry of `/v1/accounts/{address}/transactions/trc20`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "candid", derive(CandidType))]
pub struct Trc20Transfer {
    pub transaction_id: TxHash,
    #[serde(default)]
    pub token_info: Option<TokenInfo>,
    #[serde(default)]
    pub block_timestamp: u64,
    pub from: TronAddress,
    pub to: TronAddress,
    #[serde(rename = "type", default)]
    pub transfer_type: String,
    /// Amount in the token's smallest unit.
    pub value: String,
}

/// Normalized page of TRC20 transfers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trc20TransferPage {
    pub success: bool,
    pub data: Vec<Trc20Transfer>,
    pub meta: Option<Value>,
}

/// Filters for [`TronHttpClient::get_trc20_transactions_by_account`](super::TronHttpClient::get_trc20_transactions_by_account).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trc20TransferQuery {
    pub contract_address: Option<TronAddress>,
    /// 1..=100
    pub limit: u32,
    pub fingerprint: Option<String>,
    /// Milliseconds since epoch.
    pub min_timestamp: Option<u64>,
    pub only_confirmed: bool,
    pub only_to: bool,
    pub only_from: bool,
}

impl Default for Trc20TransferQuery {
    fn default() -> Self {
        Self {
            contract_address: None,
            limit: 20,
            fingerprint: None,
            min_timestamp: None,
            only_confirmed: true,
            only_to: false,
            only_from: false,
        }
    }
}

/// Incoming TRC20 transfer matched by `check_trc20_payment`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "candid", derive(CandidType))]
pub struct PaymentMatch {
    pub transaction_id: TxHash,
    pub from: TronAddress,
    pub to: TronAddress,
    /// Decimal amount formatted with the token's decimals.
    pub amount: String,
    pub block_timestamp: u64,
    pub token_info: Option<TokenInfo>,
}

/// Bandwidth / energy figures of an account, identical for v1 and legacy nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "candid", derive(CandidType))]
pub struct AccountResources {
    #[serde(rename = "freeNetLimit", default)]
    pub free_net_limit: i64,
    #[serde(rename = "freeNetUsed", default)]
    pub free_net_used: i64,
    #[serde(rename = "NetLimit", default)]
    pub net_limit: i64,
    #[serde(rename = "NetUsed", default)]
    pub net_used: i64,
    #[serde(rename = "EnergyLimit", default)]
    pub energy_limit: i64,
    #[serde(rename = "EnergyUsed", default)]
    pub energy_used: i64,
    #[serde(rename = "TotalEnergyLimit", default)]
    pub total_energy_limit: i64,
    #[serde(rename = "TotalEnergyWeight", default)]
    pub total_energy_weight: i64,
    #[serde(rename = "TotalNetLimit", default)]
    pub total_net_limit: i64,
    #[serde(rename = "TotalNetWeight", default)]
    pub total_net_weight: i64,
    #[serde(default)]
    pub balance: i64,
}

/// Confirmation state of a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Not yet in a solidified block.
    Pending,
    Failed {
        message: String,
        info: Value,
    },
    Confirmed {
        block: Option<u64>,
        energy_used: u64,
        info: Value,
    },
}

impl TransactionStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, TransactionStatus::Confirmed { .. })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Failed { .. } => "failed",
            TransactionStatus::Confirmed { .. } => "confirmed",
        }
    }
}

/// Transfer instruction for batch TRC20 transfers. `amount` is a decimal string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "candid", derive(CandidType))]
pub struct TransferRequest {
    pub to: TronAddress,
    pub amount: String,
}

impl TransferRequest {
    pub fn new(to: impl Into<String>, amount: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            amount: amount.into(),
        }
    }
}

/// Result of one transfer within a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum TransferOutcome {
    Sent {
        to: TronAddress,
        amount: String,
        response: BroadcastResponse,
    },
    Failed {
        request: TransferRequest,
        error: String,
    },
}

impl TransferOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TransferOutcome::Sent { .. })
    }
}

/// Balance of one address within `batch_balance_of`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "candid", derive(CandidType))]
pub struct BalanceLookup {
    pub address: TronAddress,
    pub balance: Option<String>,
    pub error: Option<String>,
}

/// Cached descriptive data of a TRC20 contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "candid", derive(CandidType))]
pub struct TokenMetadata {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub decimals: Option<u8>,
}

/// Full description of a TRC20 contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "candid", derive(CandidType))]
pub struct Trc20TokenInfo {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub address: TronAddress,
    /// Raw total supply in the smallest unit.
    pub total_supply: String,
}

/// One point of the `/wallet/getenergyprices` history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "candid", derive(CandidType))]
pub struct EnergyPricePoint {
    pub timestamp: u64,
    /// `%Y-%m-%d %H:%M:%S` (UTC), absent for the genesis price.
    pub date: Option<String>,
    /// Sun per unit of energy.
    pub price: u64,
    pub energy_per_trx: u64,
}

/// Current energy price with history. `success == false` means defaults were used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyPriceInfo {
    pub success: bool,
    pub network: Option<Network>,
    pub current_price: u64,
    pub energy_per_trx: u64,
    pub price_history: Vec<EnergyPricePoint>,
    pub message: Option<String>,
    pub error: Option<String>,
    pub raw_data: Option<Value>,
}

/// Where an energy estimate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "candid", derive(CandidType))]
pub enum EstimationMethod {
    EstimateEnergy,
    TriggerConstantContract,
    DefaultFallback,
}

/// Energy estimate for a contract call with the suggested fee_limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyEstimate {
    pub energy_used: u64,
    /// Sun per unit of energy.
    pub energy_price: u64,
    /// Sun.
    pub suggested_fee_limit: u64,
    pub suggested_fee_limit_trx: f64,
    pub estimation_method: EstimationMethod,
    pub result: Option<Value>,
    pub error: Option<String>,
}

/// Energy estimate for a TRC20 `transfer` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trc20TransferEstimate {
    #[serde(flatten)]
    pub estimate: EnergyEstimate,
    pub contract_address: TronAddress,
    pub to_address: TronAddress,
    pub amount: String,
    /// Absent when the estimate fell back to defaults before decimals were known.
    pub token_decimals: Option<u8>,
}

/// Freshly generated key pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "candid", derive(CandidType))]
pub struct WalletKeys {
    pub private_key: String,
    pub address: TronAddress,
    pub hex_address: String,
    pub public_key: String,
}

/// Address derived from a private key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "candid", derive(CandidType))]
pub struct DerivedAddress {
    pub address: TronAddress,
    pub hex_address: String,
    pub public_key: String,
}

/// Response from the node for broadcasting a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "candid", derive(CandidType))]
pub struct BroadcastResponse {
    #[serde(default)]
    pub result: bool,
    #[serde(rename = "txid", default)]
    pub tx_id: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Transaction to be signed and broadcast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnsignedTransaction {
    #[serde(rename = "txID")]
    pub tx_id: String,
    /// Kept verbatim so the broadcast body matches what the node built.
    pub raw_data: Value,
    pub raw_data_hex: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
}

/// Signed transaction ready for broadcast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedTransaction {
    #[serde(rename = "txID")]
    pub tx_id: String,
    pub raw_data: Value,
    pub raw_data_hex: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    pub signature: Vec<String>,
}

/// Outcome of a Stake 2.0 request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "lowercase")]
pub enum StakeOutcome {
    /// Signed with the client key and broadcast.
    Broadcast(BroadcastResponse),
    /// Built by the node but not signed (no private key configured).
    Unsigned(UnsignedTransaction),
    /// The node answered with a final result (no transaction to sign).
    Completed(Value),
}
