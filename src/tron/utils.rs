use bs58;
use hex;
use num_bigint::BigUint;
use num_traits::Zero;
use sha2::{Digest, Sha256};
use sha3::Keccak256;

use crate::tron_error::TronError;

/// Mainnet address prefix byte.
pub const ADDRESS_PREFIX: u8 = 0x41;

/// 1 TRX = 1,000,000 sun.
pub const SUN_PER_TRX: u64 = 1_000_000;

/// Decimals of TRX and of USDT on TRON.
pub const TRX_DECIMALS: u32 = 6;

fn checksum(payload: &[u8]) -> [u8; 4] {
    let hash1 = Sha256::digest(payload);
    let hash2 = Sha256::digest(hash1);
    let mut out = [0u8; 4];
    out.copy_from_slice(&hash2[..4]);
    out
}

/// Validate a Tron address (Base58Check format, starts with 'T')
pub fn validate_tron_address(address: &str) -> Result<(), TronError> {
    if !address.starts_with('T') {
        return Err(TronError::InvalidAddress(
            "Tron address must start with 'T'".to_string(),
        ));
    }

    if address.len() != 34 {
        return Err(TronError::InvalidAddress(format!(
            "Invalid Tron address length: {} (expected 34)",
            address.len()
        )));
    }

    let decoded = bs58::decode(address)
        .into_vec()
        .map_err(|_| TronError::InvalidAddress("Invalid Base58 encoding".to_string()))?;

    // 1 byte prefix (0x41) + 20 bytes address + 4 bytes checksum
    if decoded.len() != 25 {
        return Err(TronError::InvalidAddress(format!(
            "Invalid decoded length: {} (expected 25)",
            decoded.len()
        )));
    }

    if decoded[0] != ADDRESS_PREFIX {
        return Err(TronError::InvalidAddress(format!(
            "Invalid address prefix: 0x{:02x} (expected 0x41)",
            decoded[0]
        )));
    }

    if decoded[21..25] != checksum(&decoded[..21]) {
        return Err(TronError::InvalidAddress("Invalid checksum".to_string()));
    }

    Ok(())
}

/// True for a valid base58 address or a 21-byte `41...` hex address.
pub fn is_address(address: &str) -> bool {
    if address.len() == 42 && address.starts_with("41") {
        return hex::decode(address).is_ok();
    }
    validate_tron_address(address).is_ok()
}

/// Convert Tron Base58 address to hex format
pub fn base58_to_hex(address: &str) -> Result<String, TronError> {
    validate_tron_address(address)?;
    let decoded = bs58::decode(address)
        .into_vec()
        .map_err(|_| TronError::InvalidAddress("Invalid Base58 encoding".to_string()))?;

    Ok(hex::encode(&decoded[..21]))
}

/// Convert hex address to Tron Base58 format
pub fn hex_to_base58(hex_str: &str) -> Result<String, TronError> {
    let hex_str = hex_str.trim_start_matches("0x");
    let address_bytes = hex::decode(hex_str)
        .map_err(|_| TronError::InvalidAddress("Invalid hex encoding".to_string()))?;

    if address_bytes.len() != 21 {
        return Err(TronError::InvalidAddress(format!(
            "Invalid hex address length: {} (expected 21)",
            address_bytes.len()
        )));
    }

    let mut full_address = address_bytes.clone();
    full_address.extend_from_slice(&checksum(&address_bytes));

    Ok(bs58::encode(&full_address).into_string())
}

/// Hex form of an address given either as base58 or as 41-prefixed hex.
pub fn to_hex_address(address: &str) -> Result<String, TronError> {
    let trimmed = address.trim_start_matches("0x");
    if trimmed.len() == 42 && trimmed.starts_with("41") {
        hex::decode(trimmed)
            .map_err(|_| TronError::InvalidAddress("Invalid hex encoding".to_string()))?;
        return Ok(trimmed.to_lowercase());
    }
    base58_to_hex(address)
}

/// Base58 form of an address given either as base58 or as 41-prefixed hex.
pub fn to_base58_address(address: &str) -> Result<String, TronError> {
    let trimmed = address.trim_start_matches("0x");
    if trimmed.len() == 42 && trimmed.starts_with("41") {
        return hex_to_base58(trimmed);
    }
    validate_tron_address(address)?;
    Ok(address.to_string())
}

/// Derive the Tron address of an uncompressed (65 byte) or raw (64 byte) public key.
pub fn public_key_to_tron_address(public_key: &[u8]) -> Result<String, TronError> {
    let key = match public_key.len() {
        65 if public_key[0] == 0x04 => &public_key[1..],
        64 => public_key,
        len => {
            return Err(TronError::InvalidKey(format!(
                "Invalid public key length: {} (expected uncompressed 65 bytes)",
                len
            )))
        }
    };

    let hash = Keccak256::digest(key);
    let mut address_bytes = Vec::with_capacity(21);
    address_bytes.push(ADDRESS_PREFIX);
    address_bytes.extend_from_slice(&hash[12..]);

    hex_to_base58(&hex::encode(address_bytes))
}

/// Convert sun to TRX.
pub fn from_tron(sun: i64) -> f64 {
    sun as f64 / SUN_PER_TRX as f64
}

/// Convert TRX to sun, truncating below one sun.
///
/// Goes through the shortest decimal representation of `trx` so that values
/// like `0.57` do not lose a sun to binary rounding.
pub fn to_tron(trx: f64) -> Result<i64, TronError> {
    if !trx.is_finite() {
        return Err(TronError::InvalidAmount(format!("{} is not a finite amount", trx)));
    }
    let negative = trx < 0.0;
    let raw = parse_token_amount(&format!("{}", trx.abs()), TRX_DECIMALS)?;
    let sun = i64::try_from(raw)
        .map_err(|_| TronError::InvalidAmount(format!("{} TRX overflows i64 sun", trx)))?;
    Ok(if negative { -sun } else { sun })
}

/// Format an amount from smallest unit to a decimal string with `decimals` places
pub fn format_token_amount(raw: &BigUint, decimals: u32) -> String {
    let digits = raw.to_str_radix(10);
    if decimals == 0 {
        return digits;
    }
    let decimals = decimals as usize;
    let padded = format!("{:0>width$}", digits, width = decimals + 1);
    let (whole, fraction) = padded.split_at(padded.len() - decimals);
    format!("{}.{}", whole, fraction)
}

/// Parse a decimal string into the smallest unit.
///
/// Digits beyond `decimals` places are truncated.
pub fn parse_token_amount(amount_str: &str, decimals: u32) -> Result<BigUint, TronError> {
    let invalid = || TronError::InvalidAmount(format!("Invalid amount format: {:?}", amount_str));
    let amount_str = amount_str.trim();
    let parts: Vec<&str> = amount_str.split('.').collect();

    let (whole, fraction) = match parts.len() {
        1 => (parts[0], ""),
        2 => (parts[0], parts[1]),
        _ => return Err(invalid()),
    };

    if (whole.is_empty() && fraction.is_empty())
        || !whole.chars().all(|c| c.is_ascii_digit())
        || !fraction.chars().all(|c| c.is_ascii_digit())
    {
        return Err(invalid());
    }

    let decimals = decimals as usize;
    let mut fraction = fraction.chars().take(decimals).collect::<String>();
    while fraction.len() < decimals {
        fraction.push('0');
    }

    let digits = format!("{}{}", whole, fraction);
    if digits.is_empty() {
        return Ok(BigUint::zero());
    }
    BigUint::parse_bytes(digits.as_bytes(), 10).ok_or_else(invalid)
}

/// Strip trailing fractional zeros (and a dangling point) from a decimal string.
pub fn trim_decimal(value: &str) -> String {
    if !value.contains('.') {
        return value.to_string();
    }
    value
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

/// Left-pad a 21-byte hex address into a 32-byte ABI word (the 0x41 prefix is dropped).
pub fn encode_address_param(address: &str) -> Result<String, TronError> {
    let hex_address = to_hex_address(address)?;
    Ok(format!("{:0>64}", &hex_address[2..]))
}

pub fn encode_uint256(value: &BigUint) -> Result<String, TronError> {
    let encoded = value.to_str_radix(16);
    if encoded.len() > 64 {
        return Err(TronError::InvalidAmount(format!(
            "{} does not fit in uint256",
            value
        )));
    }
    Ok(format!("{:0>64}", encoded))
}

/// Decode the first ABI word of a constant call result as `uint256`.
pub fn decode_uint256(hex_str: &str) -> Result<BigUint, TronError> {
    let hex_str = hex_str.trim_start_matches("0x");
    if hex_str.is_empty() {
        return Err(TronError::ContractCall("empty constant result".to_string()));
    }
    if !hex_str.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(TronError::ContractCall(format!("invalid uint256 result: {}", hex_str)));
    }
    let word = &hex_str[..hex_str.len().min(64)];
    BigUint::parse_bytes(word.as_bytes(), 16)
        .ok_or_else(|| TronError::ContractCall(format!("invalid uint256 result: {}", word)))
}

/// Decode a constant call result returning `string` (dynamic ABI) or `bytes32`.
pub fn decode_abi_string(hex_str: &str) -> Result<String, TronError> {
    let hex_str = hex_str.trim_start_matches("0x");
    let bytes = hex::decode(hex_str)
        .map_err(|e| TronError::ContractCall(format!("invalid string result: {}", e)))?;

    if bytes.len() == 32 {
        let end = bytes.iter().position(|b| *b == 0).unwrap_or(32);
        return Ok(String::from_utf8_lossy(&bytes[..end]).into_owned());
    }

    if bytes.len() < 64 {
        return Err(TronError::ContractCall(format!(
            "string result too short: {} bytes",
            bytes.len()
        )));
    }

    let offset = word_to_usize(&bytes[..32])?;
    let length_end = offset
        .checked_add(32)
        .filter(|end| *end <= bytes.len())
        .ok_or_else(|| TronError::ContractCall("string offset out of range".to_string()))?;
    let length = word_to_usize(&bytes[offset..length_end])?;
    let data_end = length_end
        .checked_add(length)
        .filter(|end| *end <= bytes.len())
        .ok_or_else(|| TronError::ContractCall("string length out of range".to_string()))?;

    Ok(String::from_utf8_lossy(&bytes[length_end..data_end]).into_owned())
}

fn word_to_usize(word: &[u8]) -> Result<usize, TronError> {
    if word[..24].iter().any(|b| *b != 0) {
        return Err(TronError::ContractCall("ABI word exceeds usize".to_string()));
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&word[24..32]);
    Ok(u64::from_be_bytes(buf) as usize)
}

/// Node messages (`resMessage`, `result.message`) are hex encoded UTF-8; fall
/// back to the raw text when they are not.
pub fn decode_hex_message(message: &str) -> String {
    hex::decode(message)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_else(|| message.to_string())
}
