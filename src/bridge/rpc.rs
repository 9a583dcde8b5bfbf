//! JSON-RPC plumbing for the sidecar bridge
//!
//! Line-delimited JSON-RPC over the sidecar's stdin/stdout. A single
//! background task owns both pipes; callers submit requests through an mpsc
//! channel and await their response on a oneshot.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{ChildStdin, ChildStdout};
use tokio::sync::{mpsc, oneshot};

use super::BridgeError;

/// JSON-RPC request
#[derive(Debug, Serialize)]
pub struct RpcRequest {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: String,
    pub params: Value,
}

/// JSON-RPC response
#[derive(Debug, Deserialize)]
pub struct RpcResponse {
    #[allow(dead_code)]
    pub jsonrpc: String,
    pub id: u64,
    pub result: Option<Value>,
    pub error: Option<RpcError>,
}

/// JSON-RPC error
#[derive(Debug, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
}

/// Request sender type alias
pub type RequestSender = mpsc::Sender<(RpcRequest, oneshot::Sender<Result<Value, BridgeError>>)>;

static REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Create a new RPC request with an auto-incremented ID
pub fn new_request(method: &str, params: Value) -> RpcRequest {
    RpcRequest {
        jsonrpc: "2.0",
        id: REQUEST_ID.fetch_add(1, Ordering::SeqCst),
        method: method.to_string(),
        params,
    }
}

/// Send an RPC request and wait for its response
pub async fn send_request(
    request_tx: &RequestSender,
    method: &str,
    params: Value,
) -> Result<Value, BridgeError> {
    let req = new_request(method, params);
    let (tx, rx) = oneshot::channel();

    request_tx
        .send((req, tx))
        .await
        .map_err(|_| BridgeError::Disconnected)?;

    rx.await.map_err(|_| BridgeError::Disconnected)?
}

/// Spawn the background communication task that multiplexes requests over
/// the sidecar's stdio. Responses may arrive out of order; the pending map
/// routes each one back to its waiting caller.
pub fn spawn_communication_task(
    mut request_rx: mpsc::Receiver<(RpcRequest, oneshot::Sender<Result<Value, BridgeError>>)>,
    stdin: ChildStdin,
    stdout: ChildStdout,
) {
    tokio::spawn(async move {
        let mut stdin = stdin;
        let mut reader = BufReader::new(stdout);
        let mut pending: HashMap<u64, oneshot::Sender<Result<Value, BridgeError>>> = HashMap::new();
        let mut line = String::new();

        loop {
            tokio::select! {
                request = request_rx.recv() => {
                    match request {
                        Some((req, response_tx)) => {
                            let id = req.id;
                            let json = match serde_json::to_string(&req) {
                                Ok(json) => json + "\n",
                                Err(e) => {
                                    let _ = response_tx.send(Err(e.into()));
                                    continue;
                                }
                            };
                            if stdin.write_all(json.as_bytes()).await.is_err() {
                                let _ = response_tx.send(Err(BridgeError::Disconnected));
                                break;
                            }
                            pending.insert(id, response_tx);
                        }
                        None => break,
                    }
                }

                result = reader.read_line(&mut line) => {
                    match result {
                        Ok(0) => break,
                        Ok(_) => {
                            if let Ok(response) = serde_json::from_str::<RpcResponse>(&line) {
                                if let Some(tx) = pending.remove(&response.id) {
                                    let result = match response.error {
                                        Some(err) => Err(BridgeError::ServerError(
                                            format!("[{}] {}", err.code, err.message)
                                        )),
                                        None => Ok(response.result.unwrap_or(Value::Null)),
                                    };
                                    let _ = tx.send(result);
                                }
                            }
                            line.clear();
                        }
                        Err(_) => break,
                    }
                }
            }
        }

        // Sidecar gone: fail anything still in flight.
        for (_, tx) in pending.drain() {
            let _ = tx.send(Err(BridgeError::Disconnected));
        }
    });
}
