//! `0x`-prefixed hex as used on the JSON-RPC wire.

use crate::rlp::DecodeError;
use alloy_primitives::U256;

fn strip(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

fn decode_digits(digits: &str, original: &str) -> Result<Vec<u8>, DecodeError> {
    hex::decode(digits).map_err(|e| DecodeError::InvalidHex {
        reason: format!("{e} in {original:?}"),
    })
}

/// Decode hex data. An odd number of digits is an error.
pub fn parse_bytes(s: &str) -> Result<Vec<u8>, DecodeError> {
    decode_digits(strip(s), s)
}

/// Decode hex data of exactly `N` bytes (hashes, addresses, the logs bloom).
pub fn parse_fixed<const N: usize>(s: &str) -> Result<[u8; N], DecodeError> {
    let bytes = parse_bytes(s)?;
    <[u8; N]>::try_from(bytes.as_slice()).map_err(|_| DecodeError::InvalidLength {
        expected: N,
        got: bytes.len(),
    })
}

/// Decode a storage key. Some nodes echo keys back as quantities (`0x1`), so
/// shorter input is left-padded to 32 bytes.
pub fn parse_storage_key(s: &str) -> Result<[u8; 32], DecodeError> {
    let value = parse_quantity_u256(s)?;
    Ok(value.to_be_bytes::<32>())
}

/// Decode a hex quantity (`0x0`, `0x1b4`, ...) of up to 256 bits.
pub fn parse_quantity_u256(s: &str) -> Result<U256, DecodeError> {
    let digits = strip(s);
    let bytes = if digits.len() % 2 == 1 {
        decode_digits(&format!("0{digits}"), s)?
    } else {
        decode_digits(digits, s)?
    };
    let significant = crate::rlp::trim_leading_zeros(&bytes);
    if significant.len() > 32 {
        return Err(DecodeError::InvalidLength {
            expected: 32,
            got: significant.len(),
        });
    }
    Ok(U256::from_be_slice(significant))
}

/// Decode a hex quantity that must fit in 64 bits.
pub fn parse_quantity_u64(s: &str) -> Result<u64, DecodeError> {
    let value = parse_quantity_u256(s)?;
    u64::try_from(value).map_err(|_| DecodeError::InvalidLength {
        expected: 8,
        got: crate::rlp::trim_leading_zeros(&value.to_be_bytes::<32>()).len(),
    })
}

/// Lowercase `0x`-prefixed hex of raw bytes.
pub fn to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Lowercase `0x`-prefixed hex quantity without leading zeros (`0x0` for zero).
pub fn quantity_to_hex(value: U256) -> String {
    format!("0x{:x}", value)
}
