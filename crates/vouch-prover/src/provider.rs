//! The state provider abstraction.
//!
//! Everything that reads chain state goes through [`StateProvider`]. Nothing a
//! provider returns is trusted: proofs and headers are checked by `vouch-core`,
//! and plain reads (`storage_at`, `balance_of`) are only used to decide which
//! proofs to ask for.

use std::future::Future;

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use vouch_core::{AccountProof, BlockHeader};

use crate::error::ProverError;

/// Block selector for a proof request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockTag {
    Latest,
    Number(u64),
}

impl BlockTag {
    /// Pin the tag to a concrete block number. `Latest` costs one provider call; the
    /// result must then be used for every read of the same operation.
    pub async fn resolve<P: StateProvider>(self, provider: &P) -> Result<u64, ProverError> {
        match self {
            BlockTag::Number(number) => Ok(number),
            BlockTag::Latest => {
                let number = provider.block_number().await?;
                tracing::debug!(number, "resolved latest block");
                Ok(number)
            }
        }
    }
}

impl From<u64> for BlockTag {
    fn from(number: u64) -> Self {
        BlockTag::Number(number)
    }
}

/// Read access to an Ethereum node.
///
/// Implementations may write the methods as `async fn`. They are responsible for
/// their own retries; every error they return is surfaced as-is.
pub trait StateProvider: Send + Sync {
    /// Name of the chain, as used in the hardfork table (`mainnet`, `sepolia`, ...).
    fn chain_name(&self) -> &str;

    /// Current head block number.
    fn block_number(&self) -> impl Future<Output = Result<u64, ProverError>> + Send;

    /// Account proof for `address` plus storage proofs for `keys`, in `keys` order
    /// (`eth_getProof`).
    fn fetch_storage_proof(
        &self,
        address: [u8; 20],
        keys: &[[u8; 32]],
        block: u64,
    ) -> impl Future<Output = Result<AccountProof, ProverError>> + Send;

    /// Header of `block`, including the hash the node reports for it.
    fn fetch_block_header(
        &self,
        block: u64,
    ) -> impl Future<Output = Result<BlockHeader, ProverError>> + Send;

    /// Raw storage word (`eth_getStorageAt`).
    fn storage_at(
        &self,
        address: [u8; 20],
        slot: [u8; 32],
        block: u64,
    ) -> impl Future<Output = Result<U256, ProverError>> + Send;

    /// ERC20 `balanceOf(holder)` on `token` at `block`.
    fn balance_of(
        &self,
        token: [u8; 20],
        holder: [u8; 20],
        block: u64,
    ) -> impl Future<Output = Result<U256, ProverError>> + Send;
}
