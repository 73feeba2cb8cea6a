use thiserror::Error;
use vouch_core::execution::checkpoint::CheckpointError;
use vouch_core::{DecodeError, HeaderError, ProofError};

/// Errors while building (and optionally verifying) proofs.
#[derive(Debug, Error)]
pub enum ProverError {
    /// The provider could not be reached or answered with an RPC error.
    /// Not retried here; retry policy belongs to the provider.
    #[error("Transport error: {reason}")]
    Transport { reason: String },

    /// The provider answered, but the result does not have the expected shape.
    #[error("Malformed {method} result: {reason}")]
    MalformedResult { method: String, reason: String },

    #[error("Not found: {what}")]
    NotFound { what: String },

    #[error("Holder {holder} has no balance")]
    ZeroBalance { holder: String },

    #[error("Storage slot not found after {attempts} attempts")]
    SlotNotFound { attempts: u64 },

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Proof(#[from] ProofError),

    #[error(transparent)]
    Header(#[from] HeaderError),

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
}

impl ProverError {
    pub fn transport(reason: impl std::fmt::Display) -> Self {
        ProverError::Transport {
            reason: reason.to_string(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        ProverError::NotFound { what: what.into() }
    }
}
