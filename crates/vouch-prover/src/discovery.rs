//! Bounded discovery of the storage position a token keeps balances at.
//!
//! Solidity places `mapping(address => ...)` entries at `keccak256(holder . position)`
//! where `position` is the mapping's declaration slot, which is not part of a token's
//! public interface. These probes read candidate positions until the stored value
//! matches `balanceOf(holder)`. Each probe is one provider read; a failing read only
//! skips that position. Dropping the returned future cancels the search between probes.

use alloy_primitives::U256;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use vouch_core::execution::checkpoint::{checkpoint_length_slot, checkpoint_slot, Checkpoint};
use vouch_core::map_slot;

use crate::error::ProverError;
use crate::provider::{BlockTag, StateProvider};

/// Attempt budgets for slot discovery.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeLimits {
    /// Positions tried for a plain ERC20 balances mapping.
    pub erc20_positions: u64,
    /// Positions tried for a MiniMe checkpoints mapping.
    pub minime_positions: u64,
}

impl Default for ProbeLimits {
    fn default() -> Self {
        Self {
            erc20_positions: 50,
            minime_positions: 20,
        }
    }
}

async fn nonzero_balance<P: StateProvider>(
    provider: &P,
    token: [u8; 20],
    holder: [u8; 20],
    block: u64,
) -> Result<U256, ProverError> {
    let balance = provider.balance_of(token, holder, block).await?;
    if balance.is_zero() {
        return Err(ProverError::ZeroBalance {
            holder: hex::encode(holder),
        });
    }
    Ok(balance)
}

/// Find the position of `token`'s ERC20 balances mapping by probing positions
/// `0..max_attempts` for `holder`.
///
/// Returns `Ok(None)` once the budget is exhausted. Errors only come from resolving the
/// block and reading the reference balance, which must be non-zero to tell positions apart.
pub async fn find_balance_slot<P: StateProvider>(
    provider: &P,
    token: [u8; 20],
    holder: [u8; 20],
    block: BlockTag,
    max_attempts: u64,
) -> Result<Option<u64>, ProverError> {
    let block = block.resolve(provider).await?;
    let balance = nonzero_balance(provider, token, holder, block).await?;

    for position in 0..max_attempts {
        match provider.storage_at(token, map_slot(holder, position), block).await {
            Ok(value) if value == balance => {
                tracing::info!(token = %hex::encode(token), position, "found balances mapping");
                return Ok(Some(position));
            }
            Ok(_) => {}
            Err(err) => {
                tracing::debug!(position, error = %err, "balance probe failed, skipping position");
            }
        }
    }

    tracing::info!(token = %hex::encode(token), max_attempts, "balances mapping not found");
    Ok(None)
}

/// Find the position of a MiniMe token's checkpoints mapping for `holder`.
///
/// A position matches when the holder's checkpoint array there is non-empty, its latest
/// checkpoint has a non-zero block, and that checkpoint's balance equals `balanceOf`.
pub async fn find_checkpoint_map_index<P: StateProvider>(
    provider: &P,
    token: [u8; 20],
    holder: [u8; 20],
    block: BlockTag,
    max_attempts: u64,
) -> Result<Option<u64>, ProverError> {
    let block = block.resolve(provider).await?;
    let balance = nonzero_balance(provider, token, holder, block).await?;

    for map_index in 0..max_attempts {
        match probe_checkpoints(provider, token, holder, map_index, block).await {
            Ok(Some(latest)) if U256::from(latest.balance) == balance => {
                tracing::info!(token = %hex::encode(token), map_index, "found checkpoints mapping");
                return Ok(Some(map_index));
            }
            Ok(_) => {}
            Err(err) => {
                tracing::debug!(map_index, error = %err, "checkpoint probe failed, skipping position");
            }
        }
    }

    tracing::info!(token = %hex::encode(token), max_attempts, "checkpoints mapping not found");
    Ok(None)
}

/// The latest checkpoint at `map_index`, if the position looks like a checkpoint array.
async fn probe_checkpoints<P: StateProvider>(
    provider: &P,
    token: [u8; 20],
    holder: [u8; 20],
    map_index: u64,
    block: u64,
) -> Result<Option<Checkpoint>, ProverError> {
    let length = provider
        .storage_at(token, checkpoint_length_slot(holder, map_index), block)
        .await?;
    if length.is_zero() {
        return Ok(None);
    }
    let Ok(length) = u64::try_from(length) else {
        return Ok(None);
    };

    let word = provider
        .storage_at(token, checkpoint_slot(holder, map_index, length - 1), block)
        .await?;
    let latest = Checkpoint::unpack(word);
    if latest.block == 0 {
        return Ok(None);
    }
    Ok(Some(latest))
}

/// [`find_balance_slot`] for several holders at once.
///
/// `Latest` is resolved once up front so every holder is probed at the same block.
/// Results are in `holders` order.
pub async fn find_balance_slots<P: StateProvider>(
    provider: &P,
    token: [u8; 20],
    holders: &[[u8; 20]],
    block: BlockTag,
    max_attempts: u64,
) -> Result<Vec<Result<Option<u64>, ProverError>>, ProverError> {
    let block = BlockTag::Number(block.resolve(provider).await?);
    let searches = holders
        .iter()
        .map(|&holder| find_balance_slot(provider, token, holder, block, max_attempts));
    Ok(join_all(searches).await)
}

/// Turn an exhausted search into [`ProverError::SlotNotFound`].
pub fn require_slot(found: Option<u64>, attempts: u64) -> Result<u64, ProverError> {
    found.ok_or(ProverError::SlotNotFound { attempts })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let limits = ProbeLimits::default();
        assert_eq!(limits.erc20_positions, 50);
        assert_eq!(limits.minime_positions, 20);
    }

    #[test]
    fn test_require_slot() {
        assert_eq!(require_slot(Some(3), 50).unwrap(), 3);
        assert!(matches!(
            require_slot(None, 50),
            Err(ProverError::SlotNotFound { attempts: 50 })
        ));
    }
}
