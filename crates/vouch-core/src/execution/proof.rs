use crate::execution::account::encode_account_rlp;
use crate::rlp::{self, DecodeError};
use crate::types::execution::{AccountProof, AccountState};
use alloy_primitives::U256;
use thiserror::Error;
use tiny_keccak::{Hasher, Keccak};

/// Errors during Merkle-Patricia trie proof verification.
/// Each variant names the check that failed and, where it applies, the proof node
/// (or storage proof) index, so a rejected proof can be diagnosed without guessing.
#[derive(Debug, Error)]
pub enum ProofError {
    #[error("Empty proof: no trie nodes provided for a non-empty root")]
    EmptyProof,

    #[error("Key path contains a value that is not a nibble")]
    InvalidKeyPath,

    #[error("Invalid RLP encoding in proof node {index}: {source}")]
    InvalidRlp {
        index: usize,
        #[source]
        source: DecodeError,
    },

    #[error("Hash mismatch at proof node {index}: computed {computed}, expected {expected}")]
    HashMismatch {
        index: usize,
        computed: String,
        expected: String,
    },

    #[error("Invalid trie node at proof node {index}: {item_count}-element list is neither branch, extension nor leaf")]
    InvalidNodeType { index: usize, item_count: usize },

    #[error("Invalid hex-prefix path encoding in proof node {index}")]
    InvalidPathEncoding { index: usize },

    #[error("Invalid child reference in proof node {index}: {reason}")]
    InvalidNodeReference { index: usize, reason: String },

    #[error("Key path diverges from proof node {index} but more proof nodes follow")]
    PathDivergence { index: usize },

    #[error("Proof path incomplete: trie traversal needs more than the {depth} nodes supplied")]
    IncompleteProof { depth: usize },

    #[error("Proof walk ended at node {index} but more proof nodes follow")]
    TrailingNodes { index: usize },

    #[error("Account not found at address {address}")]
    AccountNotFound { address: String },

    #[error("Account proof invalid for {address}: proven account does not match the claimed fields")]
    AccountMismatch { address: String },

    #[error("Storage value mismatch at key {key}: claimed {claimed}, proven {proven}")]
    StorageValueMismatch {
        key: String,
        claimed: String,
        proven: String,
    },

    #[error("Some storage proof(s) are not valid: indices {indices:?} ({})", .reasons.join("; "))]
    StorageProofsInvalid {
        indices: Vec<usize>,
        reasons: Vec<String>,
    },
}

/// Compute keccak256 hash of data.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    let mut output = [0u8; 32];
    hasher.update(data);
    hasher.finalize(&mut output);
    output
}

/// Nibble path of a secure-trie key: the nibbles of keccak256(raw key).
pub fn secure_key_path(raw_key: &[u8]) -> Vec<u8> {
    bytes_to_nibbles(&keccak256(raw_key))
}

/// Verify a proof in a secure trie, where the path is keccak256 of the raw key.
pub fn verify_secure_proof(
    root: &[u8; 32],
    raw_key: &[u8],
    proof_nodes: &[Vec<u8>],
) -> Result<Option<Vec<u8>>, ProofError> {
    verify_proof(root, &secure_key_path(raw_key), proof_nodes)
}

/// Verify an account proof against a known state root.
///
/// The proven leaf must be byte-for-byte the RLP encoding of the account fields the
/// proof claims (nonce, balance, storage hash, code hash). Returns the proven account.
///
/// IMPORTANT: The state root must come from a trusted block header.
/// Never accept a state root from the same untrusted source as the proof.
pub fn verify_account_proof(
    state_root: &[u8; 32],
    address: [u8; 20],
    proof: &AccountProof,
) -> Result<AccountState, ProofError> {
    // The key in the state trie is keccak256(address)
    let value_bytes = verify_secure_proof(state_root, &address, &proof.account_proof)?;

    let Some(rlp_bytes) = value_bytes else {
        return Err(ProofError::AccountNotFound {
            address: hex::encode(address),
        });
    };

    let claimed = proof.account();
    let expected = encode_account_rlp(&claimed);
    if rlp_bytes != expected {
        tracing::warn!(address = %hex::encode(address), "account leaf differs from claimed fields");
        return Err(ProofError::AccountMismatch {
            address: hex::encode(address),
        });
    }

    tracing::debug!(address = %hex::encode(address), "account proof verified");
    Ok(claimed)
}

/// Verify that `key` holds `claimed` in the storage trie rooted at `storage_root`.
///
/// A proof of non-existence is only accepted for a claimed value of zero; otherwise
/// the proven leaf must equal the RLP encoding of the claimed value.
pub fn verify_storage_slot(
    storage_root: &[u8; 32],
    key: &[u8; 32],
    proof: &[Vec<u8>],
    claimed: U256,
) -> Result<(), ProofError> {
    // The key in the storage trie is keccak256(slot)
    let proven = verify_secure_proof(storage_root, key, proof)?;

    let matches = match &proven {
        None => claimed.is_zero(),
        Some(leaf) => *leaf == rlp::encode_u256(claimed),
    };
    if !matches {
        return Err(ProofError::StorageValueMismatch {
            key: hex::encode(key),
            claimed: format!("0x{:x}", claimed),
            proven: match proven {
                None => "absent".to_string(),
                Some(leaf) => hex::encode(leaf),
            },
        });
    }
    Ok(())
}

/// How a parent node points at the next node on the path.
#[derive(Clone, Copy, Debug)]
enum NodeRef<'a> {
    /// keccak256 of a node that must appear as the next proof entry.
    Hash([u8; 32]),
    /// A node shorter than 32 bytes, embedded in its parent.
    Inline(&'a [u8]),
}

#[derive(Debug)]
enum TrieNode<'a> {
    Branch {
        children: Vec<&'a [u8]>,
        value: &'a [u8],
    },
    Extension {
        path: Vec<u8>,
        child: &'a [u8],
    },
    Leaf {
        path: Vec<u8>,
        value: &'a [u8],
    },
}

/// Core Merkle-Patricia trie proof verification.
///
/// Walks the trie from `root` along the nibble `path`, consuming `proof_nodes` in
/// order. Every node reached through a hash reference must hash to that reference;
/// embedded (inline) children are decoded straight from their parent.
///
/// Returns `Some(value)` if the key exists and `None` for a proof of non-existence.
/// Non-existence is only accepted when the divergence (empty branch slot, or an
/// extension/leaf whose path does not match) happens at the final proof node. A
/// divergence with nodes left over is an error, as is any hash mismatch or
/// malformed node.
pub fn verify_proof(
    root: &[u8; 32],
    path: &[u8],
    proof_nodes: &[Vec<u8>],
) -> Result<Option<Vec<u8>>, ProofError> {
    if path.iter().any(|&nibble| nibble > 0x0f) {
        return Err(ProofError::InvalidKeyPath);
    }

    if proof_nodes.is_empty() {
        // The empty trie proves every key absent without any nodes.
        if *root == AccountState::EMPTY_STORAGE_ROOT {
            return Ok(None);
        }
        return Err(ProofError::EmptyProof);
    }

    let mut next = 0usize;
    let mut reference = NodeRef::Hash(*root);
    let mut remaining = path;

    loop {
        let raw: &[u8] = match reference {
            NodeRef::Hash(expected) => {
                let node = proof_nodes
                    .get(next)
                    .ok_or(ProofError::IncompleteProof { depth: next })?;
                let computed = keccak256(node);
                if computed != expected {
                    return Err(ProofError::HashMismatch {
                        index: next,
                        computed: hex::encode(computed),
                        expected: hex::encode(expected),
                    });
                }
                next += 1;
                node
            }
            NodeRef::Inline(node) => {
                // Proof producers may or may not repeat an embedded node as its own entry.
                if proof_nodes.get(next).is_some_and(|n| n.as_slice() == node) {
                    next += 1;
                }
                node
            }
        };
        // The root is always hash-referenced, so at least one node has been consumed.
        let index = next - 1;
        let is_last = next == proof_nodes.len();

        match decode_node(index, raw)? {
            TrieNode::Branch { children, value } => {
                let Some((&nibble, rest)) = remaining.split_first() else {
                    let value = (!value.is_empty()).then(|| value.to_vec());
                    return finish(index, is_last, value);
                };
                match child_ref(index, children[nibble as usize])? {
                    Some(child) => {
                        reference = child;
                        remaining = rest;
                    }
                    None => return finish(index, is_last, None),
                }
            }
            TrieNode::Extension {
                path: shared,
                child,
            } => {
                if !remaining.starts_with(&shared) {
                    return diverged(index, is_last);
                }
                remaining = &remaining[shared.len()..];
                reference = child_ref(index, child)?.ok_or_else(|| {
                    ProofError::InvalidNodeReference {
                        index,
                        reason: "extension node without a child".to_string(),
                    }
                })?;
            }
            TrieNode::Leaf {
                path: leaf_path,
                value,
            } => {
                if leaf_path.as_slice() != remaining {
                    return diverged(index, is_last);
                }
                return finish(index, is_last, Some(value.to_vec()));
            }
        }
    }
}

fn finish(
    index: usize,
    is_last: bool,
    result: Option<Vec<u8>>,
) -> Result<Option<Vec<u8>>, ProofError> {
    if !is_last {
        return Err(ProofError::TrailingNodes { index });
    }
    Ok(result)
}

fn diverged(index: usize, is_last: bool) -> Result<Option<Vec<u8>>, ProofError> {
    if !is_last {
        return Err(ProofError::PathDivergence { index });
    }
    tracing::debug!(index, "key path diverges at final proof node: proof of non-existence");
    Ok(None)
}

fn decode_node(index: usize, raw: &[u8]) -> Result<TrieNode<'_>, ProofError> {
    let invalid_rlp = |source| ProofError::InvalidRlp { index, source };
    let items = rlp::split_list(raw).map_err(invalid_rlp)?;

    match items.len() {
        17 => Ok(TrieNode::Branch {
            children: items[..16].to_vec(),
            value: rlp::decode_bytes(items[16]).map_err(invalid_rlp)?,
        }),
        2 => {
            let encoded_path = rlp::decode_bytes(items[0]).map_err(invalid_rlp)?;
            let (path, is_leaf) = decode_compact_path(encoded_path)
                .ok_or(ProofError::InvalidPathEncoding { index })?;
            if is_leaf {
                Ok(TrieNode::Leaf {
                    path,
                    value: rlp::decode_bytes(items[1]).map_err(invalid_rlp)?,
                })
            } else {
                Ok(TrieNode::Extension {
                    path,
                    child: items[1],
                })
            }
        }
        item_count => Err(ProofError::InvalidNodeType { index, item_count }),
    }
}

/// Interpret a raw child slot: empty, a 32-byte hash, or an embedded node.
fn child_ref(index: usize, raw_child: &[u8]) -> Result<Option<NodeRef<'_>>, ProofError> {
    if rlp::is_list(raw_child) {
        if raw_child.len() >= 32 {
            return Err(ProofError::InvalidNodeReference {
                index,
                reason: format!("embedded node of {} bytes", raw_child.len()),
            });
        }
        return Ok(Some(NodeRef::Inline(raw_child)));
    }

    let reference = rlp::decode_bytes(raw_child)
        .map_err(|source| ProofError::InvalidRlp { index, source })?;
    match reference.len() {
        0 => Ok(None),
        32 => {
            let mut hash = [0u8; 32];
            hash.copy_from_slice(reference);
            Ok(Some(NodeRef::Hash(hash)))
        }
        len => Err(ProofError::InvalidNodeReference {
            index,
            reason: format!("child hash of {} bytes", len),
        }),
    }
}

/// Convert bytes to nibbles (4 bits each), high nibble first.
pub fn bytes_to_nibbles(bytes: &[u8]) -> Vec<u8> {
    let mut nibbles = Vec::with_capacity(bytes.len() * 2);
    for byte in bytes {
        nibbles.push(byte >> 4);
        nibbles.push(byte & 0x0F);
    }
    nibbles
}

/// Decode compact (hex-prefix) encoding used in trie nodes.
/// Returns (nibbles, is_leaf), or None if the flag nibble or padding is invalid.
fn decode_compact_path(encoded: &[u8]) -> Option<(Vec<u8>, bool)> {
    let (&first, rest) = encoded.split_first()?;

    let flag = first >> 4;
    if flag > 3 {
        return None;
    }
    let is_leaf = flag & 0x2 != 0;
    let is_odd = flag & 0x1 != 0;

    let mut nibbles = Vec::with_capacity(rest.len() * 2 + 1);
    if is_odd {
        nibbles.push(first & 0x0F);
    } else if first & 0x0F != 0 {
        return None;
    }

    for &byte in rest {
        nibbles.push(byte >> 4);
        nibbles.push(byte & 0x0F);
    }

    Some((nibbles, is_leaf))
}
