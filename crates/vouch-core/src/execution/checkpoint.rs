//! MiniMe checkpoint proofs.
//!
//! A MiniMe token keeps, per holder, a dynamic array of checkpoints in a mapping at
//! some storage position (the "map index"). Each checkpoint is one storage word:
//! the high 16 bytes hold the balance, the low 16 bytes the block it took effect.
//!
//! A historical balance is proven with two adjacent array slots: the checkpoint in
//! force at the target block, and the next one (or an empty slot when there is none).

use crate::execution::proof::{verify_account_proof, verify_storage_slot, ProofError};
use crate::execution::slots::{array_slot, map_slot, offset_slot};
use crate::types::execution::{AccountProof, StorageProofEntry};
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest accepted distance between a checkpoint key and the holder's array base.
pub const CHECKPOINT_SLOT_WINDOW: u64 = 65_536;

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("Checkpoint proof needs exactly 2 storage entries, got {got}")]
    WrongEntryCount { got: usize },

    #[error("First checkpoint slot is empty")]
    EmptyCheckpoint,

    #[error("Checkpoint keys are not consecutive: {first} then {second}")]
    NonConsecutiveKeys { first: String, second: String },

    #[error("Checkpoint key is {offset} slots past the holder's array base, outside the window")]
    SlotOutOfWindow { offset: String },

    #[error("Checkpoint balance {proven} does not match the claimed balance {claimed}")]
    BalanceMismatch { claimed: String, proven: String },

    #[error("Checkpoint block {checkpoint_block} is after the target block {target_block}")]
    CheckpointAfterTarget {
        checkpoint_block: u128,
        target_block: u64,
    },

    #[error("Checkpoint blocks are not increasing: {first} then {next}")]
    NonIncreasingCheckpoints { first: u128, next: u128 },

    #[error("Target block {target_block} is not before the next checkpoint at block {next_block}")]
    TargetNotBeforeNextCheckpoint { target_block: u64, next_block: u128 },

    #[error("Storage proof {index} is not valid: {source}")]
    InvalidStorageProof {
        index: usize,
        #[source]
        source: ProofError,
    },

    #[error("Token account proof is not valid: {0}")]
    AccountProof(#[source] ProofError),
}

/// One `(block, balance)` pair as packed into a storage word.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub block: u128,
    pub balance: u128,
}

impl Checkpoint {
    /// Split a storage word: high 16 bytes are the balance, low 16 bytes the block.
    pub fn unpack(word: U256) -> Self {
        let bytes = word.to_be_bytes::<32>();
        let mut balance = [0u8; 16];
        let mut block = [0u8; 16];
        balance.copy_from_slice(&bytes[..16]);
        block.copy_from_slice(&bytes[16..]);
        Self {
            block: u128::from_be_bytes(block),
            balance: u128::from_be_bytes(balance),
        }
    }

    pub fn pack(&self) -> U256 {
        let mut bytes = [0u8; 32];
        bytes[..16].copy_from_slice(&self.balance.to_be_bytes());
        bytes[16..].copy_from_slice(&self.block.to_be_bytes());
        U256::from_be_bytes(bytes)
    }
}

/// Slot holding the length of `holder`'s checkpoint array.
pub fn checkpoint_length_slot(holder: [u8; 20], map_index: u64) -> [u8; 32] {
    map_slot(holder, map_index)
}

/// Slot of the first element of `holder`'s checkpoint array.
pub fn checkpoint_base_slot(holder: [u8; 20], map_index: u64) -> [u8; 32] {
    array_slot(checkpoint_length_slot(holder, map_index))
}

/// Slot of the checkpoint at zero-based `index` in `holder`'s array.
pub fn checkpoint_slot(holder: [u8; 20], map_index: u64, index: u64) -> [u8; 32] {
    offset_slot(checkpoint_base_slot(holder, map_index), index)
}

/// Verify that `holder` had `claimed_balance` at `claimed_block`, given the two
/// bracketing checkpoint slots from the token's storage trie.
///
/// Structural checks (entry count, consecutive keys, slot window) and the balance and
/// block bounds are all done before any trie proof is touched. Returns the proven
/// checkpoint.
pub fn verify_checkpoint_proof(
    holder: [u8; 20],
    storage_root: &[u8; 32],
    entries: &[StorageProofEntry],
    map_index: u64,
    claimed_balance: U256,
    claimed_block: u64,
) -> Result<Checkpoint, CheckpointError> {
    let [current, next] = entries else {
        return Err(CheckpointError::WrongEntryCount { got: entries.len() });
    };
    if current.value.is_zero() {
        return Err(CheckpointError::EmptyCheckpoint);
    }

    let first_key = U256::from_be_bytes(current.key);
    let second_key = U256::from_be_bytes(next.key);
    if first_key.wrapping_add(U256::from(1u64)) != second_key {
        return Err(CheckpointError::NonConsecutiveKeys {
            first: hex::encode(current.key),
            second: hex::encode(next.key),
        });
    }

    let base = U256::from_be_bytes(checkpoint_base_slot(holder, map_index));
    let offset = first_key.wrapping_sub(base);
    if offset >= U256::from(CHECKPOINT_SLOT_WINDOW) {
        return Err(CheckpointError::SlotOutOfWindow {
            offset: offset.to_string(),
        });
    }

    let checkpoint = Checkpoint::unpack(current.value);
    if U256::from(checkpoint.balance) != claimed_balance {
        return Err(CheckpointError::BalanceMismatch {
            claimed: claimed_balance.to_string(),
            proven: checkpoint.balance.to_string(),
        });
    }
    if checkpoint.block > u128::from(claimed_block) {
        return Err(CheckpointError::CheckpointAfterTarget {
            checkpoint_block: checkpoint.block,
            target_block: claimed_block,
        });
    }

    if !next.value.is_zero() {
        let following = Checkpoint::unpack(next.value);
        if checkpoint.block >= following.block {
            return Err(CheckpointError::NonIncreasingCheckpoints {
                first: checkpoint.block,
                next: following.block,
            });
        }
        if u128::from(claimed_block) >= following.block {
            return Err(CheckpointError::TargetNotBeforeNextCheckpoint {
                target_block: claimed_block,
                next_block: following.block,
            });
        }
    }

    for (index, entry) in entries.iter().enumerate() {
        verify_storage_slot(storage_root, &entry.key, &entry.proof, entry.value)
            .map_err(|source| CheckpointError::InvalidStorageProof { index, source })?;
    }

    tracing::debug!(
        holder = %hex::encode(holder),
        block = claimed_block,
        checkpoint_block = %checkpoint.block,
        "checkpoint proof verified"
    );
    Ok(checkpoint)
}

/// Verify the token account against `state_root`, then the checkpoint pair in
/// `proof.storage_proof` against the proven storage root.
pub fn verify_checkpoint_proof_full(
    state_root: &[u8; 32],
    holder: [u8; 20],
    proof: &AccountProof,
    map_index: u64,
    claimed_balance: U256,
    claimed_block: u64,
) -> Result<Checkpoint, CheckpointError> {
    let account = verify_account_proof(state_root, proof.address, proof)
        .map_err(CheckpointError::AccountProof)?;
    verify_checkpoint_proof(
        holder,
        &account.storage_root,
        &proof.storage_proof,
        map_index,
        claimed_balance,
        claimed_block,
    )
}
