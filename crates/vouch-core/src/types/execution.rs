use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// An Ethereum account as stored in the state trie.
/// Verified via Merkle-Patricia trie proofs against a known state root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    /// Number of transactions sent from this account.
    pub nonce: u64,
    /// Balance in wei.
    pub balance: U256,
    /// Root hash of the account's storage trie.
    /// For externally owned accounts (EOAs), this is the empty trie root.
    pub storage_root: [u8; 32],
    /// Keccak256 hash of the account's code.
    /// For EOAs, this is the hash of the empty string.
    pub code_hash: [u8; 32],
}

impl AccountState {
    /// The keccak256 hash of empty bytes, the code hash for EOAs.
    pub const EMPTY_CODE_HASH: [u8; 32] = [
        0xc5, 0xd2, 0x46, 0x01, 0x86, 0xf7, 0x23, 0x3c, 0x92, 0x7e, 0x7d, 0xb2, 0xdc, 0xc7,
        0x03, 0xc0, 0xe5, 0x00, 0xb6, 0x53, 0xca, 0x82, 0x27, 0x3b, 0x7b, 0xfa, 0xd8, 0x04,
        0x5d, 0x85, 0xa4, 0x70,
    ];

    /// The root of an empty Merkle-Patricia trie.
    pub const EMPTY_STORAGE_ROOT: [u8; 32] = [
        0x56, 0xe8, 0x1f, 0x17, 0x1b, 0xcc, 0x55, 0xa6, 0xff, 0x83, 0x45, 0xe6, 0x92, 0xc0,
        0xf8, 0x6e, 0x5b, 0x48, 0xe0, 0x1b, 0x99, 0x6c, 0xad, 0xc0, 0x01, 0x62, 0x2f, 0xb5,
        0xe3, 0x63, 0xb4, 0x21,
    ];

    /// Check if this is a contract account (has code deployed).
    pub fn is_contract(&self) -> bool {
        self.code_hash != Self::EMPTY_CODE_HASH
    }
}

/// Account and storage proofs for one address at one block, in the shape of an
/// `eth_getProof` response. Obtained from an untrusted provider, verified locally.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountProof {
    /// The address this proof is for.
    pub address: [u8; 20],
    pub nonce: u64,
    pub balance: U256,
    pub code_hash: [u8; 32],
    /// Root of the account's storage trie, as claimed by the provider.
    pub storage_hash: [u8; 32],
    /// RLP-encoded state trie nodes, root first.
    pub account_proof: Vec<Vec<u8>>,
    /// Storage proofs for the requested slots, in request order.
    pub storage_proof: Vec<StorageProofEntry>,
}

impl AccountProof {
    /// The account fields this proof claims.
    pub fn account(&self) -> AccountState {
        AccountState {
            nonce: self.nonce,
            balance: self.balance,
            storage_root: self.storage_hash,
            code_hash: self.code_hash,
        }
    }
}

/// A Merkle-Patricia trie proof for a storage slot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageProofEntry {
    /// The storage key (slot) this proof is for.
    pub key: [u8; 32],
    /// The storage value at this key. Zero means the slot is absent.
    pub value: U256,
    /// RLP-encoded storage trie nodes, root first.
    pub proof: Vec<Vec<u8>>,
}
