//! Locating and fetching the checkpoint pair that proves a MiniMe balance.
//!
//! Construction runs: read the array length, locate the bracket (binary search over
//! the strictly increasing checkpoint blocks), then fetch both slot proofs in one
//! `eth_getProof` call. A holder without checkpoints, or a target block before the
//! first checkpoint, ends in [`ProverError::NotFound`].

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use vouch_core::execution::checkpoint::{
    checkpoint_length_slot, checkpoint_slot, Checkpoint, CHECKPOINT_SLOT_WINDOW,
};
use vouch_core::{AccountProof, StorageProofEntry};

use crate::error::ProverError;
use crate::provider::{BlockTag, StateProvider};

/// Two adjacent 1-based positions in a holder's checkpoint array: the checkpoint in
/// force at the target block, and the one after it (possibly past the end).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointBracket {
    pub previous: u64,
    pub next: u64,
    /// Length of the checkpoint array.
    pub count: u64,
    /// The checkpoint stored at `previous`.
    pub checkpoint: Checkpoint,
}

/// A checkpoint bracket together with the proofs of both of its slots.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointProof {
    /// Block every read was made at.
    pub block: u64,
    pub bracket: CheckpointBracket,
    /// Token account proof; its `storage_proof` holds the two bracket slots in order.
    pub proof: AccountProof,
}

impl CheckpointProof {
    pub fn entries(&self) -> &[StorageProofEntry] {
        &self.proof.storage_proof
    }
}

async fn checkpoint_at<P: StateProvider>(
    provider: &P,
    token: [u8; 20],
    holder: [u8; 20],
    map_index: u64,
    position: u64,
    block: u64,
) -> Result<Checkpoint, ProverError> {
    let slot = checkpoint_slot(holder, map_index, position - 1);
    let word = provider.storage_at(token, slot, block).await?;
    Ok(Checkpoint::unpack(word))
}

/// Find the checkpoint in force at `target_block`.
///
/// All reads are made at `target_block` itself, so the array seen is the one that
/// existed then.
pub async fn find_bracket<P: StateProvider>(
    provider: &P,
    token: [u8; 20],
    holder: [u8; 20],
    map_index: u64,
    target_block: u64,
) -> Result<CheckpointBracket, ProverError> {
    let length = provider
        .storage_at(token, checkpoint_length_slot(holder, map_index), target_block)
        .await?;
    if length.is_zero() {
        return Err(ProverError::not_found(format!(
            "checkpoints for holder {}",
            hex::encode(holder)
        )));
    }
    let count = u64::try_from(length).map_err(|_| {
        ProverError::not_found(format!("checkpoint array of length {}", length))
    })?;

    let latest = checkpoint_at(provider, token, holder, map_index, count, target_block).await?;
    let (previous, checkpoint) = if u128::from(target_block) >= latest.block {
        (count, latest)
    } else {
        let first = checkpoint_at(provider, token, holder, map_index, 1, target_block).await?;
        if u128::from(target_block) < first.block {
            return Err(ProverError::not_found(format!(
                "checkpoint at or before block {}",
                target_block
            )));
        }

        // Invariant: block(lo) <= target < block(hi)
        let (mut lo, mut hi) = (1u64, count);
        let mut found = first;
        while hi - lo > 1 {
            let mid = lo + (hi - lo) / 2;
            let checkpoint =
                checkpoint_at(provider, token, holder, map_index, mid, target_block).await?;
            tracing::trace!(lo, mid, hi, block = %checkpoint.block, "checkpoint bracket step");
            if checkpoint.block <= u128::from(target_block) {
                lo = mid;
                found = checkpoint;
            } else {
                hi = mid;
            }
        }
        (lo, found)
    };

    if previous - 1 >= CHECKPOINT_SLOT_WINDOW {
        return Err(ProverError::not_found(format!(
            "checkpoint {} within the provable slot window",
            previous
        )));
    }

    tracing::debug!(previous, count, target_block, "located checkpoint bracket");
    Ok(CheckpointBracket {
        previous,
        next: previous + 1,
        count,
        checkpoint,
    })
}

/// Locate the bracket for `target` and fetch the proofs of both of its slots, in
/// increasing key order, at the same block.
pub async fn build_checkpoint_proof<P: StateProvider>(
    provider: &P,
    token: [u8; 20],
    holder: [u8; 20],
    map_index: u64,
    target: BlockTag,
) -> Result<CheckpointProof, ProverError> {
    let block = target.resolve(provider).await?;
    let bracket = find_bracket(provider, token, holder, map_index, block).await?;

    let keys = [
        checkpoint_slot(holder, map_index, bracket.previous - 1),
        checkpoint_slot(holder, map_index, bracket.previous),
    ];
    let proof = provider.fetch_storage_proof(token, &keys, block).await?;

    let returned: Vec<[u8; 32]> = proof.storage_proof.iter().map(|e| e.key).collect();
    if returned != keys {
        return Err(ProverError::not_found(format!(
            "storage proofs for the requested checkpoint slots (got {} entries)",
            returned.len()
        )));
    }

    Ok(CheckpointProof {
        block,
        bracket,
        proof,
    })
}

/// The balance a bracket proves, as the claim to verify it against.
pub fn claimed_balance(bracket: &CheckpointBracket) -> U256 {
    U256::from(bracket.checkpoint.balance)
}
