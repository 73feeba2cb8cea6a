//! # Vouch Core
//!
//! Pure Rust verification of Ethereum state proofs.
//!
//! This crate contains **no networking code** and **no async**. Everything a
//! provider hands us (account proofs, storage proofs, block headers) passes
//! through these functions before it is trusted.
//!
//! ## Trust Model
//!
//! - **Header verification** (`header` module): re-encodes a block header with the
//!   field layout of its hardfork and requires the keccak256 hash to match the block
//!   hash the caller trusts.
//!
//! - **Execution proof verification** (`execution` module): verifies
//!   Merkle-Patricia trie proofs for accounts and storage slots, and the MiniMe
//!   checkpoint pairs built on them. Zero trust assumptions beyond the state root.
//!
//! ## Usage
//!
//! ```ignore
//! use vouch_core::execution::{verify_full_account_state, verify_checkpoint_proof};
//! use vouch_core::header::{encode_block_header, HardforkConfig};
//! ```

pub mod execution;
pub mod header;
pub mod hexutil;
pub mod rlp;
pub mod types;

// Re-export commonly used types for convenience
pub use execution::{
    account::{
        encode_account_rlp, encode_proof_for_submission, verify_full_account_state,
        VerifiedAccountState,
    },
    checkpoint::{
        verify_checkpoint_proof, verify_checkpoint_proof_full, Checkpoint, CheckpointError,
        CHECKPOINT_SLOT_WINDOW,
    },
    proof::{keccak256, verify_account_proof, verify_proof, verify_storage_slot, ProofError},
    slots::{array_slot, map_slot},
};
pub use header::{encode_block_header, HardforkConfig, HeaderError, HeaderVariant};
pub use rlp::DecodeError;
pub use types::{block::*, execution::*};
