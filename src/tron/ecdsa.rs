/// Local secp256k1 keys for Tron address derivation and signing
///
/// This module uses `k256` to:
/// 1. Generate and import private keys
/// 2. Derive the Tron address of a key
/// 3. Produce the 65 byte recoverable signatures the node expects

use k256::ecdsa::SigningKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use rand::rngs::OsRng;

use super::types::{DerivedAddress, WalletKeys};
use super::utils::{base58_to_hex, public_key_to_tron_address};
use crate::tron_error::{TronError, CODE_ADDRESS_FROM_KEY, CODE_GENERATE_WALLET, CODE_VALIDATE_KEY};

/// A secp256k1 private key.
#[derive(Clone)]
pub struct PrivateKey {
    signing_key: SigningKey,
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateKey")
            .field("address", &self.address().unwrap_or_default())
            .finish_non_exhaustive()
    }
}

impl PrivateKey {
    /// Parse a 64 character hex key (an optional `0x` prefix is accepted).
    pub fn from_hex(private_key: &str) -> Result<Self, TronError> {
        let private_key = private_key.trim().trim_start_matches("0x");
        if private_key.len() != 64 || !private_key.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TronError::InvalidKey(
                "private key must be 64 hex characters".to_string(),
            ));
        }

        let bytes = hex::decode(private_key)
            .map_err(|e| TronError::InvalidKey(format!("Invalid private key: {}", e)))?;
        let signing_key = SigningKey::from_slice(&bytes)
            .map_err(|e| TronError::InvalidKey(format!("Invalid private key: {}", e)))?;

        Ok(Self { signing_key })
    }

    pub fn random() -> Self {
        Self {
            signing_key: SigningKey::random(&mut OsRng),
        }
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }

    /// Uncompressed SEC1 public key (65 bytes, `04` prefix).
    pub fn public_key(&self) -> Vec<u8> {
        self.signing_key
            .verifying_key()
            .to_encoded_point(false)
            .as_bytes()
            .to_vec()
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key())
    }

    pub fn address(&self) -> Result<String, TronError> {
        public_key_to_tron_address(&self.public_key())
    }

    pub fn hex_address(&self) -> Result<String, TronError> {
        base58_to_hex(&self.address()?)
    }

    /// Sign a 32 byte digest, returning `r || s || v` with `v` the recovery id.
    pub fn sign_prehash(&self, message_hash: &[u8]) -> Result<[u8; 65], TronError> {
        if message_hash.len() != 32 {
            return Err(TronError::Signature(
                "Message hash must be 32 bytes".to_string(),
            ));
        }

        let (signature, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(message_hash)
            .map_err(|e| TronError::Signature(format!("Failed to sign: {}", e)))?;

        let mut out = [0u8; 65];
        out[..64].copy_from_slice(&signature.to_bytes());
        out[64] = recovery_id.to_byte();
        Ok(out)
    }

    pub fn derived_address(&self) -> Result<DerivedAddress, TronError> {
        let address = self.address()?;
        Ok(DerivedAddress {
            hex_address: base58_to_hex(&address)?,
            address,
            public_key: self.public_key_hex(),
        })
    }
}

/// Generate a fresh key pair.
pub fn generate_wallet() -> Result<WalletKeys, TronError> {
    let key = PrivateKey::random();
    let derived = key
        .derived_address()
        .map_err(|e| TronError::operation(CODE_GENERATE_WALLET, "failed to generate wallet", e))?;

    Ok(WalletKeys {
        private_key: key.to_hex(),
        address: derived.address,
        hex_address: derived.hex_address,
        public_key: derived.public_key,
    })
}

pub fn address_from_private_key(private_key: &str) -> Result<DerivedAddress, TronError> {
    PrivateKey::from_hex(private_key)
        .and_then(|key| key.derived_address())
        .map_err(|e| {
            TronError::operation(
                CODE_ADDRESS_FROM_KEY,
                "failed to derive address from private key",
                e,
            )
        })
}

/// Whether `private_key` controls the base58 `address`.
pub fn validate_private_key(private_key: &str, address: &str) -> Result<bool, TronError> {
    let derived = address_from_private_key(private_key)
        .map_err(|e| TronError::operation(CODE_VALIDATE_KEY, "failed to validate private key", e))?;
    Ok(derived.address == address)
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};

    const KEY_ONE: &str = "0000000000000000000000000000000000000000000000000000000000000001";
    const KEY_ONE_ADDRESS: &str = "TMVQGm1qAQYVdetCeGRRkTWYYrLXuHK2HC";

    #[test]
    fn test_address_from_private_key() {
        let derived = address_from_private_key(KEY_ONE).unwrap();
        assert_eq!(derived.address, KEY_ONE_ADDRESS);
        assert_eq!(derived.hex_address, "417e5f4552091a69125d5dfcb7b8c2659029395bdf");
        assert!(derived.public_key.starts_with("0479be667ef9dcbb"));

        let with_prefix = address_from_private_key(&format!("0x{}", KEY_ONE)).unwrap();
        assert_eq!(with_prefix.address, KEY_ONE_ADDRESS);
    }

    #[test]
    fn test_invalid_private_keys() {
        assert_eq!(address_from_private_key("xyz").unwrap_err().code(), 1031);
        assert!(PrivateKey::from_hex(&"0".repeat(64)).is_err());
        assert!(PrivateKey::from_hex(&"g".repeat(64)).is_err());
        assert_eq!(validate_private_key("short", KEY_ONE_ADDRESS).unwrap_err().code(), 1032);
    }

    #[test]
    fn test_validate_private_key() {
        assert!(validate_private_key(KEY_ONE, KEY_ONE_ADDRESS).unwrap());
        assert!(!validate_private_key(KEY_ONE, "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t").unwrap());
    }

    #[test]
    fn test_generate_wallet() {
        let wallet = generate_wallet().unwrap();
        assert_eq!(wallet.private_key.len(), 64);
        assert!(wallet.address.starts_with('T'));
        assert_eq!(wallet.hex_address.len(), 42);
        assert_eq!(wallet.public_key.len(), 130);
        assert!(validate_private_key(&wallet.private_key, &wallet.address).unwrap());
    }

    #[test]
    fn test_sign_prehash_recovers_signer() {
        let key = PrivateKey::from_hex(KEY_ONE).unwrap();
        let digest = [7u8; 32];
        let signature = key.sign_prehash(&digest).unwrap();

        let sig = Signature::from_slice(&signature[..64]).unwrap();
        let recovery_id = RecoveryId::from_byte(signature[64]).unwrap();
        let recovered = VerifyingKey::recover_from_prehash(&digest, &sig, recovery_id).unwrap();
        assert_eq!(recovered.to_encoded_point(false).as_bytes(), key.public_key().as_slice());

        assert!(key.sign_prehash(&[0u8; 31]).is_err());
    }

    #[test]
    fn test_debug_hides_secret() {
        let key = PrivateKey::from_hex(KEY_ONE).unwrap();
        let debug = format!("{:?}", key);
        assert!(debug.contains(KEY_ONE_ADDRESS));
        assert!(!debug.contains(KEY_ONE));
    }
}
