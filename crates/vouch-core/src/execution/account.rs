use crate::execution::proof::{verify_account_proof, verify_storage_slot, ProofError};
use crate::rlp::{self, DecodeError, RlpItem};
use crate::types::execution::*;
use alloy_primitives::U256;

/// RLP-encode an account as it is stored in the state trie:
/// `[nonce, balance, storageRoot, codeHash]`.
///
/// Integers are minimal big-endian, so a zero balance (or nonce) is the empty string.
pub fn encode_account_rlp(account: &AccountState) -> Vec<u8> {
    rlp::encode_list(&[
        rlp::encode_uint(account.nonce),
        rlp::encode_u256(account.balance),
        rlp::encode_bytes(&account.storage_root),
        rlp::encode_bytes(&account.code_hash),
    ])
}

/// Decode an account leaf value back into its four fields.
pub fn decode_account_rlp(data: &[u8]) -> Result<AccountState, DecodeError> {
    let items = rlp::split_list(data)?;
    if items.len() != 4 {
        return Err(DecodeError::InvalidLength {
            expected: 4,
            got: items.len(),
        });
    }

    let nonce = u64::try_from(rlp::decode_u256(rlp::decode_bytes(items[0])?)?).map_err(|_| {
        DecodeError::NonCanonical {
            reason: "account nonce exceeds 64 bits",
        }
    })?;
    let balance = rlp::decode_u256(rlp::decode_bytes(items[1])?)?;

    Ok(AccountState {
        nonce,
        balance,
        storage_root: hash_field(items[2])?,
        code_hash: hash_field(items[3])?,
    })
}

fn hash_field(item: &[u8]) -> Result<[u8; 32], DecodeError> {
    let bytes = rlp::decode_bytes(item)?;
    if bytes.len() != 32 {
        return Err(DecodeError::InvalidLength {
            expected: 32,
            got: bytes.len(),
        });
    }
    let mut hash = [0u8; 32];
    hash.copy_from_slice(bytes);
    Ok(hash)
}

/// Re-encode a list of independently RLP-encoded proof nodes as one RLP list,
/// the form on-chain verifiers take proofs in.
///
/// Each node is decoded first, so a malformed node is rejected here rather than
/// producing an artifact nobody can verify.
pub fn encode_proof_for_submission(proof_nodes: &[Vec<u8>]) -> Result<Vec<u8>, DecodeError> {
    let nodes = proof_nodes
        .iter()
        .map(|node| rlp::decode(node))
        .collect::<Result<Vec<RlpItem>, _>>()?;
    Ok(rlp::encode(&RlpItem::List(nodes)))
}

/// Verify an account's full state including all of its storage proofs.
/// This is the high-level API that combines account proof and storage proof verification.
///
/// The account is verified first and any failure there aborts. Storage entries are
/// then checked independently against the proven storage root; every failing index
/// is collected into a single [`ProofError::StorageProofsInvalid`].
///
/// The state_root must come from a trusted header. The proof data can come from any
/// source (including untrusted RPCs).
pub fn verify_full_account_state(
    state_root: &[u8; 32],
    proof: &AccountProof,
) -> Result<VerifiedAccountState, ProofError> {
    let account = verify_account_proof(state_root, proof.address, proof)?;

    let mut storage_slots = Vec::with_capacity(proof.storage_proof.len());
    let mut indices = Vec::new();
    let mut reasons = Vec::new();

    for (index, entry) in proof.storage_proof.iter().enumerate() {
        match verify_storage_slot(&account.storage_root, &entry.key, &entry.proof, entry.value) {
            Ok(()) => storage_slots.push(VerifiedStorageSlot {
                key: entry.key,
                value: entry.value,
            }),
            Err(err) => {
                tracing::warn!(index, key = %hex::encode(entry.key), error = %err, "storage proof rejected");
                indices.push(index);
                reasons.push(err.to_string());
            }
        }
    }

    if !indices.is_empty() {
        return Err(ProofError::StorageProofsInvalid { indices, reasons });
    }

    Ok(VerifiedAccountState {
        address: proof.address,
        account,
        storage_slots,
    })
}

/// A fully verified account state with verified storage slots.
/// Every field in this struct has been checked against the supplied state root.
#[derive(Clone, Debug)]
pub struct VerifiedAccountState {
    /// The Ethereum address.
    pub address: [u8; 20],
    /// The verified account state (nonce, balance, storage root, code hash).
    pub account: AccountState,
    /// Verified storage slot values.
    pub storage_slots: Vec<VerifiedStorageSlot>,
}

/// A single verified storage slot.
#[derive(Clone, Debug)]
pub struct VerifiedStorageSlot {
    /// The storage key (slot number).
    pub key: [u8; 32],
    /// The verified storage value.
    pub value: U256,
}

impl VerifiedAccountState {
    /// Check if this is a contract account.
    pub fn is_contract(&self) -> bool {
        self.account.is_contract()
    }

    /// Look up a verified storage slot value by key.
    pub fn get_storage(&self, key: &[u8; 32]) -> Option<U256> {
        self.storage_slots
            .iter()
            .find(|s| &s.key == key)
            .map(|s| s.value)
    }
}
