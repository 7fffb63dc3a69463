use hex;
use num_bigint::BigUint;
use serde_json::Value;
use sha2::{Digest, Sha256};

use super::ecdsa::PrivateKey;
use super::types::*;
use super::utils::*;
use crate::tron_error::TronError;

/// Function selector of the TRC-20 transfer call.
pub const TRC20_TRANSFER_SELECTOR: &str = "transfer(address,uint256)";

/// Represents a Tron transaction that can be signed and broadcast
#[derive(Debug, Clone)]
pub struct TronTransaction {
    pub unsigned_tx: UnsignedTransaction,
}

impl TronTransaction {
    pub fn new(unsigned_tx: UnsignedTransaction) -> Self {
        Self { unsigned_tx }
    }

    /// Parse the unsigned transaction a node returns from a builder endpoint,
    /// either bare or wrapped as `{"transaction": {...}}`.
    pub fn from_node_response(response: &Value) -> Result<Self, TronError> {
        let tx = response.get("transaction").unwrap_or(response);
        let unsigned_tx: UnsignedTransaction = serde_json::from_value(tx.clone()).map_err(|e| {
            TronError::InvalidResponse(format!("Failed to parse unsigned transaction: {}", e))
        })?;
        Ok(Self { unsigned_tx })
    }

    /// Sign the transaction with a private key
    pub fn sign(&self, private_key: &PrivateKey) -> Result<SignedTransaction, TronError> {
        let raw_data = hex::decode(&self.unsigned_tx.raw_data_hex).map_err(|e| {
            TronError::InvalidResponse(format!("Failed to decode raw_data_hex: {}", e))
        })?;

        let hash_to_sign = Sha256::digest(&raw_data);

        // The node derives txID the same way; refuse to sign anything else.
        if !hex::encode(hash_to_sign).eq_ignore_ascii_case(&self.unsigned_tx.tx_id) {
            return Err(TronError::Signature(format!(
                "txID {} does not match raw_data_hex",
                self.unsigned_tx.tx_id
            )));
        }

        let signature = private_key.sign_prehash(&hash_to_sign)?;

        Ok(SignedTransaction {
            tx_id: self.unsigned_tx.tx_id.clone(),
            raw_data: self.unsigned_tx.raw_data.clone(),
            raw_data_hex: self.unsigned_tx.raw_data_hex.clone(),
            visible: self.unsigned_tx.visible,
            signature: vec![hex::encode(signature)],
        })
    }
}

/// ABI encoded parameters of a TRC-20 `transfer(address,uint256)` call.
pub fn encode_transfer_parameters(to: &str, amount: &BigUint) -> Result<String, TronError> {
    validate_tron_address(to)?;
    Ok(format!(
        "{}{}",
        encode_address_param(to)?,
        encode_uint256(amount)?
    ))
}
