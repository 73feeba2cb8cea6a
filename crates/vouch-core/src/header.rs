//! Block header reconstruction and hash check.
//!
//! A header's RLP field list grows with hardforks. [`HardforkConfig`] maps
//! `(chain, block)` to the [`HeaderVariant`] in force, [`encode_header`] produces the
//! variant's RLP, and [`encode_block_header`] refuses any header whose recomputed
//! hash differs from the one the provider reported.

use std::sync::OnceLock;

use crate::execution::proof::keccak256;
use crate::rlp;
use crate::types::block::BlockHeader;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HeaderError {
    #[error("Header field {field} is required by the {variant:?} layout but missing")]
    MissingField {
        field: &'static str,
        variant: HeaderVariant,
    },

    #[error("Header hash mismatch ({variant:?} layout): computed {computed}, reported {reported}")]
    HashMismatch {
        computed: String,
        reported: String,
        variant: HeaderVariant,
    },

    #[error("Invalid hardfork config: {reason}")]
    InvalidConfig { reason: String },
}

/// The header field layouts, oldest first. Each adds fields to the previous one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderVariant {
    /// The 15 original fields.
    Legacy,
    /// + baseFeePerGas
    London,
    /// + withdrawalsRoot
    Shanghai,
    /// + blobGasUsed, excessBlobGas, parentBeaconBlockRoot
    Cancun,
    /// + requestsHash
    Prague,
}

impl HeaderVariant {
    /// The layout assumed for chains the config knows nothing about.
    pub const NEWEST: HeaderVariant = HeaderVariant::Prague;
}

/// One row of the hardfork table: from `activation_block` on, `chain` uses `variant`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardforkRule {
    pub chain: String,
    pub activation_block: u64,
    pub variant: HeaderVariant,
}

/// Ordered threshold table from `(chain, activation block)` to header layout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<HardforkRule>", into = "Vec<HardforkRule>")]
pub struct HardforkConfig {
    rules: Vec<HardforkRule>,
}

impl From<Vec<HardforkRule>> for HardforkConfig {
    fn from(rules: Vec<HardforkRule>) -> Self {
        Self::new(rules)
    }
}

impl From<HardforkConfig> for Vec<HardforkRule> {
    fn from(config: HardforkConfig) -> Self {
        config.rules
    }
}

impl HardforkConfig {
    pub fn new(rules: Vec<HardforkRule>) -> Self {
        let mut rules: Vec<HardforkRule> = rules
            .into_iter()
            .map(|rule| HardforkRule {
                chain: canonical_chain(&rule.chain),
                ..rule
            })
            .collect();
        rules.sort_by(|a, b| {
            (a.chain.as_str(), a.activation_block).cmp(&(b.chain.as_str(), b.activation_block))
        });
        Self { rules }
    }

    /// Parse a table from a JSON array of `{chain, activation_block, variant}` rows.
    pub fn from_json(json: &str) -> Result<Self, HeaderError> {
        serde_json::from_str(json).map_err(|e| HeaderError::InvalidConfig {
            reason: e.to_string(),
        })
    }

    /// The process-wide built-in table, initialised on first use.
    ///
    /// Ropsten and rinkeby were retired before Shanghai, so London is their last row.
    /// Goerli is covered up to London only, and holesky is not listed (it would resolve
    /// to [`HeaderVariant::NEWEST`]); pass a table from [`HardforkConfig::from_json`] for
    /// their later forks.
    pub fn builtin() -> &'static HardforkConfig {
        static BUILTIN: OnceLock<HardforkConfig> = OnceLock::new();
        BUILTIN.get_or_init(|| {
            use HeaderVariant::*;
            let rule = |chain: &str, activation_block: u64, variant| HardforkRule {
                chain: chain.to_string(),
                activation_block,
                variant,
            };
            HardforkConfig::new(vec![
                rule("mainnet", 12_965_000, London),
                rule("mainnet", 17_034_870, Shanghai),
                rule("mainnet", 19_426_587, Cancun),
                rule("mainnet", 22_431_084, Prague),
                rule("ropsten", 10_499_401, London),
                rule("goerli", 5_062_605, London),
                rule("rinkeby", 8_897_988, London),
                rule("sepolia", 0, London),
                rule("sepolia", 2_990_908, Shanghai),
                rule("sepolia", 5_187_023, Cancun),
                rule("sepolia", 7_836_331, Prague),
            ])
        })
    }

    pub fn rules(&self) -> &[HardforkRule] {
        &self.rules
    }

    /// The header layout for `block_number` on `chain`.
    ///
    /// The highest threshold at or below the block wins. A known chain before its first
    /// threshold is `Legacy`; an unknown chain gets [`HeaderVariant::NEWEST`].
    pub fn resolve(&self, chain: &str, block_number: u64) -> HeaderVariant {
        let chain = canonical_chain(chain);
        let mut known = false;
        let mut variant = HeaderVariant::Legacy;

        for rule in self.rules.iter().filter(|rule| rule.chain == chain) {
            known = true;
            if rule.activation_block <= block_number {
                variant = rule.variant;
            }
        }

        if !known {
            tracing::debug!(%chain, "chain not in hardfork table, assuming newest header layout");
            return HeaderVariant::NEWEST;
        }
        variant
    }
}

fn canonical_chain(chain: &str) -> String {
    let chain = chain.to_ascii_lowercase();
    if chain == "homestead" {
        "mainnet".to_string()
    } else {
        chain
    }
}

/// RLP-encode the header fields that make up `variant`'s layout.
pub fn encode_header(header: &BlockHeader, variant: HeaderVariant) -> Result<Vec<u8>, HeaderError> {
    let mut fields = vec![
        rlp::encode_bytes(&header.parent_hash),
        rlp::encode_bytes(&header.ommers_hash),
        rlp::encode_bytes(&header.beneficiary),
        rlp::encode_bytes(&header.state_root),
        rlp::encode_bytes(&header.transactions_root),
        rlp::encode_bytes(&header.receipts_root),
        rlp::encode_bytes(&header.logs_bloom),
        rlp::encode_u256(header.difficulty),
        rlp::encode_uint(header.number),
        rlp::encode_uint(header.gas_limit),
        rlp::encode_uint(header.gas_used),
        rlp::encode_uint(header.timestamp),
        rlp::encode_bytes(&header.extra_data),
        rlp::encode_bytes(&header.mix_hash),
        rlp::encode_bytes(&header.nonce),
    ];

    let missing = |field| HeaderError::MissingField { field, variant };

    if variant >= HeaderVariant::London {
        let base_fee = header.base_fee_per_gas.ok_or_else(|| missing("baseFeePerGas"))?;
        fields.push(rlp::encode_u256(base_fee));
    }
    if variant >= HeaderVariant::Shanghai {
        let root = header.withdrawals_root.ok_or_else(|| missing("withdrawalsRoot"))?;
        fields.push(rlp::encode_bytes(&root));
    }
    if variant >= HeaderVariant::Cancun {
        let blob_gas_used = header.blob_gas_used.ok_or_else(|| missing("blobGasUsed"))?;
        let excess_blob_gas = header.excess_blob_gas.ok_or_else(|| missing("excessBlobGas"))?;
        let beacon_root = header
            .parent_beacon_block_root
            .ok_or_else(|| missing("parentBeaconBlockRoot"))?;
        fields.push(rlp::encode_uint(blob_gas_used));
        fields.push(rlp::encode_uint(excess_blob_gas));
        fields.push(rlp::encode_bytes(&beacon_root));
    }
    if variant >= HeaderVariant::Prague {
        let requests_hash = header.requests_hash.ok_or_else(|| missing("requestsHash"))?;
        fields.push(rlp::encode_bytes(&requests_hash));
    }

    Ok(rlp::encode_list(&fields))
}

/// keccak256 of an encoded header.
pub fn header_hash(encoded: &[u8]) -> [u8; 32] {
    keccak256(encoded)
}

/// Encode `header` with the layout `config` selects for its chain and block, and
/// check the result against the reported block hash.
///
/// Returns the header RLP and its hash. A mismatch is always an error: it is the only
/// signal of a forged header or of a wrong layout choice.
pub fn encode_block_header(
    header: &BlockHeader,
    chain: &str,
    config: &HardforkConfig,
) -> Result<(Vec<u8>, [u8; 32]), HeaderError> {
    let variant = config.resolve(chain, header.number);
    let encoded = encode_header(header, variant)?;
    let hash = header_hash(&encoded);

    if hash != header.hash {
        tracing::warn!(number = header.number, ?variant, "header hash mismatch");
        return Err(HeaderError::HashMismatch {
            computed: hex::encode(hash),
            reported: hex::encode(header.hash),
            variant,
        });
    }

    tracing::debug!(number = header.number, ?variant, "header hash verified");
    Ok((encoded, hash))
}
