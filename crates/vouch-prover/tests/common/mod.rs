#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use alloy_primitives::U256;
use vouch_core::header::{encode_header, header_hash, HardforkConfig, HeaderVariant};
use vouch_core::rlp::{self, RlpItem};
use vouch_core::{
    encode_account_rlp, keccak256, AccountProof, AccountState, BlockHeader, StorageProofEntry,
};
use vouch_prover::{ProverError, StateProvider};

pub const TOKEN: [u8; 20] = [0x4d; 20];
pub const HEAD: u64 = 13_000_000;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// In-memory chain state. Every read is recorded so tests can check budgets and
/// block consistency.
#[derive(Default)]
pub struct MockProvider {
    pub head: u64,
    pub storage: HashMap<[u8; 32], U256>,
    pub failing_slots: HashSet<[u8; 32]>,
    pub balances: HashMap<[u8; 20], U256>,
    pub account: Option<AccountProof>,
    pub storage_proofs: HashMap<[u8; 32], StorageProofEntry>,
    pub headers: HashMap<u64, BlockHeader>,
    pub storage_reads: AtomicUsize,
    pub blocks_read: Mutex<Vec<u64>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            head: HEAD,
            ..Default::default()
        }
    }

    pub fn reads(&self) -> usize {
        self.storage_reads.load(Ordering::SeqCst)
    }

    pub fn blocks_read(&self) -> Vec<u64> {
        self.blocks_read.lock().unwrap().clone()
    }

    fn record(&self, block: u64) {
        self.blocks_read.lock().unwrap().push(block);
    }
}

impl StateProvider for MockProvider {
    fn chain_name(&self) -> &str {
        "mainnet"
    }

    async fn block_number(&self) -> Result<u64, ProverError> {
        Ok(self.head)
    }

    async fn fetch_storage_proof(
        &self,
        address: [u8; 20],
        keys: &[[u8; 32]],
        block: u64,
    ) -> Result<AccountProof, ProverError> {
        self.record(block);
        let mut proof = self
            .account
            .clone()
            .ok_or_else(|| ProverError::not_found(hex::encode(address)))?;
        proof.storage_proof = keys
            .iter()
            .map(|key| {
                self.storage_proofs
                    .get(key)
                    .cloned()
                    .ok_or_else(|| ProverError::not_found(hex::encode(key)))
            })
            .collect::<Result<_, _>>()?;
        Ok(proof)
    }

    async fn fetch_block_header(&self, block: u64) -> Result<BlockHeader, ProverError> {
        self.record(block);
        self.headers
            .get(&block)
            .cloned()
            .ok_or_else(|| ProverError::not_found(format!("block {block}")))
    }

    async fn storage_at(
        &self,
        _address: [u8; 20],
        slot: [u8; 32],
        block: u64,
    ) -> Result<U256, ProverError> {
        self.storage_reads.fetch_add(1, Ordering::SeqCst);
        self.record(block);
        if self.failing_slots.contains(&slot) {
            return Err(ProverError::transport("connection reset"));
        }
        Ok(self.storage.get(&slot).copied().unwrap_or(U256::ZERO))
    }

    async fn balance_of(
        &self,
        _token: [u8; 20],
        holder: [u8; 20],
        block: u64,
    ) -> Result<U256, ProverError> {
        self.record(block);
        Ok(self.balances.get(&holder).copied().unwrap_or(U256::ZERO))
    }
}

/// A leaf node holding `value` under the full secure-trie path of `raw_key`.
pub fn secure_leaf(raw_key: &[u8], value: Vec<u8>) -> Vec<u8> {
    let mut path = vec![0x20];
    path.extend_from_slice(&keccak256(raw_key));
    rlp::encode(&RlpItem::List(vec![
        RlpItem::Bytes(path),
        RlpItem::Bytes(value),
    ]))
}

/// An empty RLP list wrapped in `depth` further lists.
pub fn nested_lists(depth: usize) -> Vec<u8> {
    let mut headers = Vec::with_capacity(depth);
    let mut len = 1usize;
    for _ in 0..depth {
        let header = if len <= 55 {
            vec![0xc0 + len as u8]
        } else {
            let be = len.to_be_bytes();
            let start = be.iter().position(|&b| b != 0).unwrap_or(be.len() - 1);
            let mut header = vec![0xf7 + (be.len() - start) as u8];
            header.extend_from_slice(&be[start..]);
            header
        };
        len += header.len();
        headers.push(header);
    }
    let mut out: Vec<u8> = headers.into_iter().rev().flatten().collect();
    out.push(0xc0);
    out
}

/// A token whose storage trie holds one slot, in a state trie holding only the token.
/// Returns the state root and the provider-side proof data.
pub fn single_slot_state(
    slot: [u8; 32],
    value: U256,
) -> ([u8; 32], AccountProof, StorageProofEntry) {
    let storage_leaf = secure_leaf(&slot, rlp::encode_u256(value));
    let account = AccountState {
        nonce: 1,
        balance: U256::ZERO,
        storage_root: keccak256(&storage_leaf),
        code_hash: keccak256(b"token code"),
    };
    let account_leaf = secure_leaf(&TOKEN, encode_account_rlp(&account));

    let proof = AccountProof {
        address: TOKEN,
        nonce: account.nonce,
        balance: account.balance,
        code_hash: account.code_hash,
        storage_hash: account.storage_root,
        account_proof: vec![account_leaf.clone()],
        storage_proof: vec![],
    };
    let entry = StorageProofEntry {
        key: slot,
        value,
        proof: vec![storage_leaf],
    };
    (keccak256(&account_leaf), proof, entry)
}

/// A mainnet header at `number` committing to `state_root`, laid out for the hardfork
/// active at `number`, with a matching hash.
pub fn header_for(number: u64, state_root: [u8; 32]) -> BlockHeader {
    let variant = HardforkConfig::builtin().resolve("mainnet", number);
    let london = variant >= HeaderVariant::London;
    let mut header = BlockHeader {
        parent_hash: [0x01; 32],
        ommers_hash: [0x02; 32],
        beneficiary: [0x03; 20],
        state_root,
        transactions_root: [0x04; 32],
        receipts_root: [0x05; 32],
        logs_bloom: [0; 256],
        difficulty: U256::from(0x2000u64),
        number,
        gas_limit: 30_000_000,
        gas_used: 21_000,
        timestamp: 1_700_000_000,
        extra_data: b"vouch".to_vec(),
        mix_hash: [0x06; 32],
        nonce: [0; 8],
        base_fee_per_gas: london.then(|| U256::from(7u64)),
        withdrawals_root: None,
        blob_gas_used: None,
        excess_blob_gas: None,
        parent_beacon_block_root: None,
        requests_hash: None,
        hash: [0; 32],
    };
    let encoded = encode_header(&header, variant).unwrap();
    header.hash = header_hash(&encoded);
    header
}
