//! # Vouch Prover
//!
//! Builds Ethereum storage proofs over an abstract [`StateProvider`]: plain ERC20
//! balance proofs, MiniMe checkpoint proofs, and the header and RLP artifacts that go
//! with them.
//!
//! Providers are untrusted. Everything returned here can be (and, with `verify`,
//! is) checked by `vouch-core` against a header whose hash is recomputed locally.

pub mod bundle;
pub mod checkpoints;
pub mod discovery;
pub mod error;
pub mod provider;
pub mod rpc;

pub use bundle::{build_checkpoint_bundle, build_erc20_proof, build_full_proof, ProofBundle};
pub use checkpoints::{build_checkpoint_proof, find_bracket, CheckpointBracket, CheckpointProof};
pub use discovery::{
    find_balance_slot, find_balance_slots, find_checkpoint_map_index, require_slot, ProbeLimits,
};
pub use error::ProverError;
pub use provider::{BlockTag, StateProvider};
pub use rpc::{JsonRpcTransport, RpcStateProvider};
