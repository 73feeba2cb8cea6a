use std::sync::Mutex;

use alloy_primitives::U256;
use serde_json::json;
use vouch_core::map_slot;
use vouch_prover::rpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
use vouch_prover::{
    find_balance_slot, BlockTag, JsonRpcTransport, ProverError, RpcStateProvider,
    StateProvider,
};

const TOKEN: [u8; 20] = [0x4d; 20];
const HOLDER: [u8; 20] = [0xa0; 20];

/// Answers from a fixed script and records every request.
#[derive(Default)]
struct CannedTransport {
    requests: Mutex<Vec<JsonRpcRequest>>,
}

impl CannedTransport {
    fn methods(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.method.clone())
            .collect()
    }
}

fn response(id: serde_json::Value, result: serde_json::Value) -> JsonRpcResponse {
    JsonRpcResponse {
        id,
        result: Some(result),
        error: None,
    }
}

impl JsonRpcTransport for CannedTransport {
    async fn send(&self, request: JsonRpcRequest) -> Result<JsonRpcResponse, ProverError> {
        self.requests.lock().unwrap().push(request.clone());
        let id = request.id.clone();
        match request.method.as_str() {
            "eth_blockNumber" => Ok(response(id, json!("0xc65d40"))),
            "eth_call" => Ok(response(
                id,
                json!(format!("0x{}{}", "00".repeat(31), "2a")),
            )),
            "eth_getStorageAt" => {
                let slot = request.params[1].as_str().unwrap_or_default().to_string();
                let target = format!("0x{}", hex::encode(map_slot(HOLDER, 2)));
                let word = if slot == target { "0x2a" } else { "0x0" };
                Ok(response(id, json!(word)))
            }
            "eth_getProof" => Ok(JsonRpcResponse {
                id,
                result: None,
                error: Some(JsonRpcError {
                    code: -32000,
                    message: "missing trie node".to_string(),
                    data: None,
                }),
            }),
            "eth_getBlockByNumber" => Ok(response(id, serde_json::Value::Null)),
            other => Err(ProverError::transport(format!("unexpected method {other}"))),
        }
    }
}

#[tokio::test]
async fn test_plain_reads_decode_quantities() {
    let provider = RpcStateProvider::new(CannedTransport::default(), "mainnet");
    assert_eq!(provider.chain_name(), "mainnet");
    assert_eq!(provider.block_number().await.unwrap(), 13_000_000);
    assert_eq!(
        provider.balance_of(TOKEN, HOLDER, 1).await.unwrap(),
        U256::from(42u64)
    );
    assert_eq!(
        provider
            .storage_at(TOKEN, map_slot(HOLDER, 2), 1)
            .await
            .unwrap(),
        U256::from(42u64)
    );
}

#[tokio::test]
async fn test_null_header_is_not_found() {
    let provider = RpcStateProvider::new(CannedTransport::default(), "mainnet");
    let err = provider.fetch_block_header(1).await.unwrap_err();
    assert!(matches!(err, ProverError::NotFound { .. }));
}

#[tokio::test]
async fn test_rpc_errors_surface_as_transport_errors() {
    let provider = RpcStateProvider::new(CannedTransport::default(), "mainnet");
    let err = provider
        .fetch_storage_proof(TOKEN, &[[0; 32]], 1)
        .await
        .unwrap_err();
    match err {
        ProverError::Transport { reason } => assert!(reason.contains("missing trie node")),
        other => panic!("expected a transport error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_discovery_over_json_rpc() {
    let transport = CannedTransport::default();
    let provider = RpcStateProvider::new(transport, "mainnet");
    let found = find_balance_slot(&provider, TOKEN, HOLDER, BlockTag::Latest, 50)
        .await
        .unwrap();
    assert_eq!(found, Some(2));
}

#[tokio::test]
async fn test_discovery_pins_latest_once() {
    let transport = CannedTransport::default();
    let provider = RpcStateProvider::new(&transport, "mainnet");
    find_balance_slot(&provider, TOKEN, HOLDER, BlockTag::Latest, 50)
        .await
        .unwrap();

    let methods = transport.methods();
    assert_eq!(
        methods.iter().filter(|m| *m == "eth_blockNumber").count(),
        1
    );
    assert_eq!(
        methods,
        ["eth_blockNumber", "eth_call", "eth_getStorageAt", "eth_getStorageAt", "eth_getStorageAt"]
    );

    let requests = transport.requests.lock().unwrap();
    let ids: Vec<u64> = requests.iter().filter_map(|r| r.id.as_u64()).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    // Every state read carries the pinned block.
    for request in requests.iter().skip(1) {
        assert_eq!(request.params.last().unwrap(), "0xc65d40");
    }
}
