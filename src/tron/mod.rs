/// TRON HTTP API integration
///
/// This module provides:
/// - Node providers with API key injection and a routing manager
/// - `TronHttpClient` with normalized account, balance and history queries
/// - TRC20 contract access backed by a shared metadata cache
/// - Energy pricing and fee_limit estimation
/// - Payment matching, Stake 2.0 helpers and local transaction signing

pub mod ecdsa;
pub mod energy;
pub mod http_client;
pub mod manager;
pub mod metadata_cache;
pub mod payment;
pub mod provider;
pub mod staking;
pub mod transaction;
pub mod transport;
pub mod trc20;
pub mod types;
pub mod utils;

// Re-export commonly used items
pub use ecdsa::{address_from_private_key, generate_wallet, validate_private_key, PrivateKey};
pub use http_client::{TokenId, TronHttpClient};
pub use manager::TronManager;
pub use metadata_cache::TokenMetadataCache;
pub use provider::HttpProvider;
pub use staking::ResourceType;
pub use transaction::{encode_transfer_parameters, TronTransaction};
pub use transport::{HttpTransport, ReqwestTransport};
pub use trc20::Trc20Contract;
pub use types::*;
pub use utils::*;
