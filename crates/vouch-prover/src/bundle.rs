//! Proof bundles: everything an on-chain verifier needs for one storage claim.

use vouch_core::execution::checkpoint::verify_checkpoint_proof_full;
use vouch_core::{
    encode_block_header, encode_proof_for_submission, map_slot, verify_full_account_state,
    AccountProof, BlockHeader, HardforkConfig,
};

use crate::checkpoints::{build_checkpoint_proof, claimed_balance, CheckpointBracket};
use crate::error::ProverError;
use crate::provider::{BlockTag, StateProvider};

/// A storage proof with its block header, plus the RLP artifacts submitted on chain.
#[derive(Clone, Debug)]
pub struct ProofBundle {
    pub proof: AccountProof,
    pub header: BlockHeader,
    /// RLP of the header; hashes to `header.hash`.
    pub header_rlp: Vec<u8>,
    /// The account proof nodes as one RLP list.
    pub account_proof_rlp: Vec<u8>,
    /// Each storage proof's nodes as one RLP list, in `proof.storage_proof` order.
    pub storage_proofs_rlp: Vec<Vec<u8>>,
}

async fn fetch_header<P: StateProvider>(
    provider: &P,
    block: u64,
    config: &HardforkConfig,
) -> Result<(BlockHeader, Vec<u8>), ProverError> {
    let header = provider.fetch_block_header(block).await?;
    if header.number != block {
        return Err(ProverError::transport(format!(
            "asked for header {} but got {}",
            block, header.number
        )));
    }
    let (header_rlp, _) = encode_block_header(&header, provider.chain_name(), config)?;
    Ok((header, header_rlp))
}

fn assemble(
    proof: AccountProof,
    header: BlockHeader,
    header_rlp: Vec<u8>,
) -> Result<ProofBundle, ProverError> {
    let account_proof_rlp = encode_proof_for_submission(&proof.account_proof)?;
    let storage_proofs_rlp = proof
        .storage_proof
        .iter()
        .map(|entry| encode_proof_for_submission(&entry.proof))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ProofBundle {
        proof,
        header,
        header_rlp,
        account_proof_rlp,
        storage_proofs_rlp,
    })
}

/// Fetch the proof of `keys` in `address` and the header of the same block.
///
/// The header hash is always checked. With `verify`, the account and every storage
/// proof are also checked against the header's state root before anything is returned.
pub async fn build_full_proof<P: StateProvider>(
    provider: &P,
    address: [u8; 20],
    keys: &[[u8; 32]],
    block: BlockTag,
    config: &HardforkConfig,
    verify: bool,
) -> Result<ProofBundle, ProverError> {
    let block = block.resolve(provider).await?;
    let proof = provider.fetch_storage_proof(address, keys, block).await?;
    let (header, header_rlp) = fetch_header(provider, block, config).await?;

    if verify {
        verify_full_account_state(&header.state_root, &proof)?;
        tracing::info!(address = %hex::encode(address), block, "proof bundle verified");
    }

    assemble(proof, header, header_rlp)
}

/// [`build_full_proof`] for the balance of `holder` in a token whose balances mapping
/// is declared at `mapping_position`.
pub async fn build_erc20_proof<P: StateProvider>(
    provider: &P,
    token: [u8; 20],
    holder: [u8; 20],
    mapping_position: u64,
    block: BlockTag,
    config: &HardforkConfig,
    verify: bool,
) -> Result<ProofBundle, ProverError> {
    let key = map_slot(holder, mapping_position);
    build_full_proof(provider, token, &[key], block, config, verify).await
}

/// Bundle for a MiniMe historical balance: the bracketing checkpoint pair at `target`.
///
/// With `verify`, the token account is checked against the header's state root and
/// the pair against the proven storage root, claiming the bracketed checkpoint's balance.
pub async fn build_checkpoint_bundle<P: StateProvider>(
    provider: &P,
    token: [u8; 20],
    holder: [u8; 20],
    map_index: u64,
    target: BlockTag,
    config: &HardforkConfig,
    verify: bool,
) -> Result<(CheckpointBracket, ProofBundle), ProverError> {
    let checkpoint_proof = build_checkpoint_proof(provider, token, holder, map_index, target).await?;
    let block = checkpoint_proof.block;
    let (header, header_rlp) = fetch_header(provider, block, config).await?;

    if verify {
        verify_checkpoint_proof_full(
            &header.state_root,
            holder,
            &checkpoint_proof.proof,
            map_index,
            claimed_balance(&checkpoint_proof.bracket),
            block,
        )?;
        tracing::info!(holder = %hex::encode(holder), block, "checkpoint bundle verified");
    }

    let bundle = assemble(checkpoint_proof.proof, header, header_rlp)?;
    Ok((checkpoint_proof.bracket, bundle))
}
