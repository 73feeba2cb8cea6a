use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// An execution block header, field for field as it is RLP-encoded.
///
/// Which optional fields take part in the encoding depends on the hardfork the
/// block belongs to (see [`crate::header::HeaderVariant`]). `hash` is the hash the
/// provider reported; it is only ever compared against, never encoded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub parent_hash: [u8; 32],
    /// Hash of the ommers list (`sha3Uncles`).
    pub ommers_hash: [u8; 32],
    /// Fee recipient (`miner`).
    pub beneficiary: [u8; 20],
    pub state_root: [u8; 32],
    pub transactions_root: [u8; 32],
    pub receipts_root: [u8; 32],
    #[serde(with = "bloom_serde")]
    pub logs_bloom: [u8; 256],
    pub difficulty: U256,
    pub number: u64,
    pub gas_limit: u64,
    pub gas_used: u64,
    pub timestamp: u64,
    pub extra_data: Vec<u8>,
    pub mix_hash: [u8; 32],
    pub nonce: [u8; 8],

    /// EIP-1559 (London).
    #[serde(default)]
    pub base_fee_per_gas: Option<U256>,
    /// EIP-4895 (Shanghai).
    #[serde(default)]
    pub withdrawals_root: Option<[u8; 32]>,
    /// EIP-4844 (Cancun).
    #[serde(default)]
    pub blob_gas_used: Option<u64>,
    #[serde(default)]
    pub excess_blob_gas: Option<u64>,
    /// EIP-4788 (Cancun).
    #[serde(default)]
    pub parent_beacon_block_root: Option<[u8; 32]>,
    /// EIP-7685 (Prague).
    #[serde(default)]
    pub requests_hash: Option<[u8; 32]>,

    /// Block hash as reported by the provider. Untrusted.
    pub hash: [u8; 32],
}

mod bloom_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bloom: &[u8; 256], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("0x{}", hex::encode(bloom)))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 256], D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let s = s.strip_prefix("0x").unwrap_or(&s);
        let bytes = hex::decode(s).map_err(serde::de::Error::custom)?;
        if bytes.len() != 256 {
            return Err(serde::de::Error::custom("bloom must be 256 bytes"));
        }
        let mut arr = [0u8; 256];
        arr.copy_from_slice(&bytes);
        Ok(arr)
    }
}
