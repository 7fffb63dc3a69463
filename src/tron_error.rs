#[cfg(feature = "candid")]
use candid::CandidType;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CODE_NETWORK: u32 = 1000;
pub const CODE_INVALID_ADDRESS: u32 = 1001;
pub const CODE_CONTRACT_CALL: u32 = 1002;
pub const CODE_BROADCAST: u32 = 1003;
pub const CODE_ACCOUNT_NOT_FOUND: u32 = 1004;
pub const CODE_INSUFFICIENT_BALANCE: u32 = 1005;
pub const CODE_SIGNATURE: u32 = 1006;
pub const CODE_NETWORK_CONGESTED: u32 = 1007;

pub const CODE_EMPTY_TRANSFER_LIST: u32 = 1010;
pub const CODE_TRANSACTION_STATUS: u32 = 1020;
pub const CODE_GENERATE_WALLET: u32 = 1030;
pub const CODE_ADDRESS_FROM_KEY: u32 = 1031;
pub const CODE_VALIDATE_KEY: u32 = 1032;
pub const CODE_INVALID_CONTRACT: u32 = 1040;
pub const CODE_INVALID_LIMIT: u32 = 1041;
pub const CODE_TRC20_HISTORY: u32 = 1042;
pub const CODE_USDT_BALANCE: u32 = 1060;
pub const CODE_ACCOUNT_RESOURCES: u32 = 1070;
pub const CODE_ESTIMATE_INVALID_CONTRACT: u32 = 1080;
pub const CODE_ESTIMATE_NO_ENERGY: u32 = 1081;
pub const CODE_ESTIMATE_FAILED: u32 = 1082;
pub const CODE_ESTIMATE_TRC20_CONTRACT: u32 = 1083;
pub const CODE_ESTIMATE_TRC20_RECIPIENT: u32 = 1084;
pub const CODE_UNFREEZE_RESOURCE: u32 = 1090;
pub const CODE_UNFREEZE_NO_RESULT: u32 = 1091;
pub const CODE_UNFREEZE_NODE_ERROR: u32 = 1092;
pub const CODE_UNFREEZE_FAILED: u32 = 1094;
pub const CODE_FREEZE_BAD_RESPONSE: u32 = 1096;
pub const CODE_FREEZE_NODE_ERROR: u32 = 1097;
pub const CODE_FREEZE_FAILED: u32 = 1099;
pub const CODE_DELEGATED_RESOURCE: u32 = 1100;

/// Errors raised by the TRON client and its helpers.
///
/// Every variant maps onto a stable numeric code (see [`TronError::code`]) so
/// callers that persist or forward errors can match on numbers instead of text.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "candid", derive(CandidType))]
pub enum TronError {
    #[error("Network request failed: {0}")]
    Network(String),

    #[error("HTTP error {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Invalid HTTP response: {0}")]
    InvalidResponse(String),

    #[error("Invalid Tron address: {0}")]
    InvalidAddress(String),

    #[error("Invalid contract address: {0}")]
    InvalidContractAddress(String),

    #[error("Contract call failed: {0}")]
    ContractCall(String),

    #[error("Broadcast failed: {0}")]
    Broadcast(String),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Insufficient balance")]
    InsufficientBalance,

    #[error("Signature failed: {0}")]
    Signature(String),

    #[error("Network congested, retry later")]
    NetworkCongested,

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Transfer list must not be empty")]
    EmptyTransferList,

    #[error("limit must be between 1 and 100, got {0}")]
    InvalidLimit(u32),

    #[error("Invalid resource type {0}, expected 0 (bandwidth), 1 (energy) or 2 (TRON power)")]
    InvalidResourceType(i64),

    #[error("No private key configured: {0}")]
    MissingPrivateKey(String),

    #[error("No default address configured")]
    MissingAddress,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    /// A failure wrapped with the code of the operation that raised it.
    #[error("{message}")]
    Operation { code: u32, message: String },
}

pub type TronResult<T> = Result<T, TronError>;

impl TronError {
    /// Wrap `source` with an operation code and a leading context message.
    pub fn operation(code: u32, context: &str, source: impl std::fmt::Display) -> Self {
        TronError::Operation {
            code,
            message: format!("{}: {}", context, source),
        }
    }

    pub fn code(&self) -> u32 {
        match self {
            TronError::Network(_)
            | TronError::Http { .. }
            | TronError::InvalidResponse(_)
            | TronError::Serialization(_) => CODE_NETWORK,
            TronError::InvalidAddress(_) => CODE_INVALID_ADDRESS,
            TronError::InvalidContractAddress(_) => CODE_INVALID_CONTRACT,
            TronError::ContractCall(_) => CODE_CONTRACT_CALL,
            TronError::Broadcast(_) => CODE_BROADCAST,
            TronError::AccountNotFound(_) => CODE_ACCOUNT_NOT_FOUND,
            TronError::InsufficientBalance | TronError::InvalidAmount(_) => {
                CODE_INSUFFICIENT_BALANCE
            }
            TronError::Signature(_) | TronError::MissingPrivateKey(_) => CODE_SIGNATURE,
            TronError::InvalidKey(_) => CODE_ADDRESS_FROM_KEY,
            TronError::NetworkCongested => CODE_NETWORK_CONGESTED,
            TronError::EmptyTransferList => CODE_EMPTY_TRANSFER_LIST,
            TronError::InvalidLimit(_) => CODE_INVALID_LIMIT,
            TronError::InvalidResourceType(_) => CODE_UNFREEZE_RESOURCE,
            TronError::MissingAddress => CODE_INVALID_ADDRESS,
            TronError::Config(_) => 0,
            TronError::Operation { code, .. } => *code,
        }
    }

    /// Friendly message for the generic codes 1000-1007.
    pub fn message_for_code(code: u32) -> Option<&'static str> {
        let message = match code {
            CODE_NETWORK => "network connection failed",
            CODE_INVALID_ADDRESS => "invalid address format",
            CODE_CONTRACT_CALL => "contract call error",
            CODE_BROADCAST => "transaction broadcast failed",
            CODE_ACCOUNT_NOT_FOUND => "account does not exist",
            CODE_INSUFFICIENT_BALANCE => "insufficient balance",
            CODE_SIGNATURE => "signature verification failed",
            CODE_NETWORK_CONGESTED => "network is congested, please retry later",
            _ => return None,
        };
        Some(message)
    }

    pub fn invalid_address(address: &str) -> Self {
        TronError::InvalidAddress(format!(
            "address [{}] is invalid. {}",
            address,
            Self::message_for_code(CODE_INVALID_ADDRESS).unwrap_or_default()
        ))
    }
}

impl From<serde_json::Error> for TronError {
    fn from(e: serde_json::Error) -> Self {
        TronError::Serialization(e.to_string())
    }
}
