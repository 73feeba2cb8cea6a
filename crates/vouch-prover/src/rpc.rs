//! JSON-RPC wire types and a [`StateProvider`] on top of any JSON-RPC transport.
//!
//! All hex on the wire is lowercase and `0x`-prefixed. Conversions into core types
//! go through `vouch_core::hexutil` and fail with a `DecodeError` on malformed input.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use alloy_primitives::U256;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use vouch_core::hexutil::{
    parse_bytes, parse_fixed, parse_quantity_u256, parse_quantity_u64, parse_storage_key,
    quantity_to_hex, to_hex,
};
use vouch_core::{AccountProof, BlockHeader, DecodeError, StorageProofEntry};

use crate::error::ProverError;
use crate::provider::StateProvider;

/// `balanceOf(address)` selector.
const BALANCE_OF_SELECTOR: [u8; 4] = [0x70, 0xa0, 0x82, 0x31];

/// JSON-RPC request.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    pub params: Vec<serde_json::Value>,
    #[serde(default)]
    pub id: serde_json::Value,
}

/// JSON-RPC response.
#[derive(Serialize, Deserialize, Debug)]
pub struct JsonRpcResponse {
    pub id: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC error object.
#[derive(Serialize, Deserialize, Debug)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl JsonRpcRequest {
    pub fn new(id: u64, method: &str, params: Vec<serde_json::Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
            id: id.into(),
        }
    }
}

impl JsonRpcResponse {
    /// Unwrap the `result` member, mapping RPC errors to [`ProverError::Transport`], a
    /// missing or `null` result to [`ProverError::NotFound`] and a result of the wrong
    /// shape to [`ProverError::MalformedResult`].
    pub fn into_result<T: DeserializeOwned>(self, what: &str) -> Result<T, ProverError> {
        if let Some(err) = self.error {
            return Err(ProverError::transport(format!(
                "{} failed with RPC error {}: {}",
                what, err.code, err.message
            )));
        }
        match self.result {
            None | Some(serde_json::Value::Null) => Err(ProverError::not_found(what)),
            Some(value) => {
                serde_json::from_value(value).map_err(|e| ProverError::MalformedResult {
                    method: what.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }
}

/// `eth_getProof` params.
pub fn get_proof_params(address: [u8; 20], keys: &[[u8; 32]], block: u64) -> Vec<serde_json::Value> {
    let keys: Vec<serde_json::Value> = keys.iter().map(|k| to_hex(k).into()).collect();
    vec![
        to_hex(&address).into(),
        keys.into(),
        quantity_to_hex(U256::from(block)).into(),
    ]
}

/// `eth_getBlockByNumber` params, without transaction bodies.
pub fn get_block_params(block: u64) -> Vec<serde_json::Value> {
    vec![quantity_to_hex(U256::from(block)).into(), false.into()]
}

/// `eth_getStorageAt` params.
pub fn get_storage_at_params(address: [u8; 20], slot: [u8; 32], block: u64) -> Vec<serde_json::Value> {
    vec![
        to_hex(&address).into(),
        to_hex(&slot).into(),
        quantity_to_hex(U256::from(block)).into(),
    ]
}

/// `eth_call` params for `token.balanceOf(holder)`.
pub fn balance_of_params(token: [u8; 20], holder: [u8; 20], block: u64) -> Vec<serde_json::Value> {
    let mut data = Vec::with_capacity(36);
    data.extend_from_slice(&BALANCE_OF_SELECTOR);
    data.extend_from_slice(&[0u8; 12]);
    data.extend_from_slice(&holder);
    vec![
        serde_json::json!({ "to": to_hex(&token), "data": to_hex(&data) }),
        quantity_to_hex(U256::from(block)).into(),
    ]
}

/// An `eth_getProof` result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcProof {
    pub address: String,
    pub account_proof: Vec<String>,
    pub balance: String,
    pub code_hash: String,
    pub nonce: String,
    pub storage_hash: String,
    pub storage_proof: Vec<RpcStorageProof>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcStorageProof {
    pub key: String,
    pub value: String,
    pub proof: Vec<String>,
}

fn parse_nodes(nodes: &[String]) -> Result<Vec<Vec<u8>>, DecodeError> {
    nodes.iter().map(|node| parse_bytes(node)).collect()
}

fn hex_nodes(nodes: &[Vec<u8>]) -> Vec<String> {
    nodes.iter().map(|node| to_hex(node)).collect()
}

impl RpcProof {
    /// Convert the hex-encoded proof into core types. Nothing is verified here.
    pub fn to_core(&self) -> Result<AccountProof, DecodeError> {
        Ok(AccountProof {
            address: parse_fixed(&self.address)?,
            nonce: parse_quantity_u64(&self.nonce)?,
            balance: parse_quantity_u256(&self.balance)?,
            code_hash: parse_fixed(&self.code_hash)?,
            storage_hash: parse_fixed(&self.storage_hash)?,
            account_proof: parse_nodes(&self.account_proof)?,
            storage_proof: self
                .storage_proof
                .iter()
                .map(RpcStorageProof::to_core)
                .collect::<Result<_, _>>()?,
        })
    }

    pub fn from_core(proof: &AccountProof) -> Self {
        Self {
            address: to_hex(&proof.address),
            account_proof: hex_nodes(&proof.account_proof),
            balance: quantity_to_hex(proof.balance),
            code_hash: to_hex(&proof.code_hash),
            nonce: quantity_to_hex(U256::from(proof.nonce)),
            storage_hash: to_hex(&proof.storage_hash),
            storage_proof: proof
                .storage_proof
                .iter()
                .map(RpcStorageProof::from_core)
                .collect(),
        }
    }
}

impl RpcStorageProof {
    pub fn to_core(&self) -> Result<StorageProofEntry, DecodeError> {
        Ok(StorageProofEntry {
            key: parse_storage_key(&self.key)?,
            value: parse_quantity_u256(&self.value)?,
            proof: parse_nodes(&self.proof)?,
        })
    }

    pub fn from_core(entry: &StorageProofEntry) -> Self {
        Self {
            key: to_hex(&entry.key),
            value: quantity_to_hex(entry.value),
            proof: hex_nodes(&entry.proof),
        }
    }
}

/// The header part of an `eth_getBlockByNumber` result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcBlock {
    pub hash: String,
    pub parent_hash: String,
    pub sha3_uncles: String,
    pub miner: String,
    pub state_root: String,
    pub transactions_root: String,
    pub receipts_root: String,
    pub logs_bloom: String,
    pub difficulty: String,
    pub number: String,
    pub gas_limit: String,
    pub gas_used: String,
    pub timestamp: String,
    pub extra_data: String,
    pub mix_hash: String,
    pub nonce: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_fee_per_gas: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub withdrawals_root: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob_gas_used: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excess_blob_gas: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_beacon_block_root: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests_hash: Option<String>,
}

impl RpcBlock {
    pub fn to_core(&self) -> Result<BlockHeader, DecodeError> {
        Ok(BlockHeader {
            parent_hash: parse_fixed(&self.parent_hash)?,
            ommers_hash: parse_fixed(&self.sha3_uncles)?,
            beneficiary: parse_fixed(&self.miner)?,
            state_root: parse_fixed(&self.state_root)?,
            transactions_root: parse_fixed(&self.transactions_root)?,
            receipts_root: parse_fixed(&self.receipts_root)?,
            logs_bloom: parse_fixed(&self.logs_bloom)?,
            difficulty: parse_quantity_u256(&self.difficulty)?,
            number: parse_quantity_u64(&self.number)?,
            gas_limit: parse_quantity_u64(&self.gas_limit)?,
            gas_used: parse_quantity_u64(&self.gas_used)?,
            timestamp: parse_quantity_u64(&self.timestamp)?,
            extra_data: parse_bytes(&self.extra_data)?,
            mix_hash: parse_fixed(&self.mix_hash)?,
            nonce: parse_fixed(&self.nonce)?,
            base_fee_per_gas: self.base_fee_per_gas.as_deref().map(parse_quantity_u256).transpose()?,
            withdrawals_root: self.withdrawals_root.as_deref().map(parse_fixed).transpose()?,
            blob_gas_used: self.blob_gas_used.as_deref().map(parse_quantity_u64).transpose()?,
            excess_blob_gas: self.excess_blob_gas.as_deref().map(parse_quantity_u64).transpose()?,
            parent_beacon_block_root: self
                .parent_beacon_block_root
                .as_deref()
                .map(parse_fixed)
                .transpose()?,
            requests_hash: self.requests_hash.as_deref().map(parse_fixed).transpose()?,
            hash: parse_fixed(&self.hash)?,
        })
    }
}

/// Anything that can carry a JSON-RPC request to a node: HTTP, IPC, a test double.
pub trait JsonRpcTransport: Send + Sync {
    fn send(
        &self,
        request: JsonRpcRequest,
    ) -> impl Future<Output = Result<JsonRpcResponse, ProverError>> + Send;
}

impl<T: JsonRpcTransport> JsonRpcTransport for &T {
    fn send(
        &self,
        request: JsonRpcRequest,
    ) -> impl Future<Output = Result<JsonRpcResponse, ProverError>> + Send {
        (**self).send(request)
    }
}

/// A [`StateProvider`] speaking standard JSON-RPC over `T`.
pub struct RpcStateProvider<T> {
    transport: T,
    chain: String,
    next_id: AtomicU64,
}

impl<T: JsonRpcTransport> RpcStateProvider<T> {
    pub fn new(transport: T, chain: impl Into<String>) -> Self {
        Self {
            transport,
            chain: chain.into(),
            next_id: AtomicU64::new(1),
        }
    }

    async fn call<R: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<serde_json::Value>,
    ) -> Result<R, ProverError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(id, method, "json-rpc request");
        let response = self
            .transport
            .send(JsonRpcRequest::new(id, method, params))
            .await?;
        response.into_result(method)
    }
}

impl<T: JsonRpcTransport> StateProvider for RpcStateProvider<T> {
    fn chain_name(&self) -> &str {
        &self.chain
    }

    async fn block_number(&self) -> Result<u64, ProverError> {
        let number: String = self.call("eth_blockNumber", vec![]).await?;
        Ok(parse_quantity_u64(&number)?)
    }

    async fn fetch_storage_proof(
        &self,
        address: [u8; 20],
        keys: &[[u8; 32]],
        block: u64,
    ) -> Result<AccountProof, ProverError> {
        let proof: RpcProof = self
            .call("eth_getProof", get_proof_params(address, keys, block))
            .await?;
        Ok(proof.to_core()?)
    }

    async fn fetch_block_header(&self, block: u64) -> Result<BlockHeader, ProverError> {
        let rpc_block: RpcBlock = self
            .call("eth_getBlockByNumber", get_block_params(block))
            .await?;
        Ok(rpc_block.to_core()?)
    }

    async fn storage_at(
        &self,
        address: [u8; 20],
        slot: [u8; 32],
        block: u64,
    ) -> Result<U256, ProverError> {
        let word: String = self
            .call("eth_getStorageAt", get_storage_at_params(address, slot, block))
            .await?;
        Ok(parse_quantity_u256(&word)?)
    }

    async fn balance_of(
        &self,
        token: [u8; 20],
        holder: [u8; 20],
        block: u64,
    ) -> Result<U256, ProverError> {
        let output: String = self
            .call("eth_call", balance_of_params(token, holder, block))
            .await?;
        Ok(parse_quantity_u256(&output)?)
    }
}
