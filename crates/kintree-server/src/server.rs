//! WebSocket server implementation.
//!
//! Handles client connections and routes messages to handlers.

use crate::handlers::{
    handle_families, handle_forest, handle_info, handle_member_relationships, handle_members,
    handle_nuclear, handle_search,
};
use crate::protocol::{Request, Response};
use futures_util::{SinkExt, StreamExt};
use kintree_core::SnapshotSource;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

/// Default port for the tree server.
pub const DEFAULT_PORT: u16 = 7431;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
        }
    }
}

/// The Kintree WebSocket server.
pub struct TreeServer<S> {
    config: ServerConfig,
    source: Arc<S>,
}

impl<S> TreeServer<S>
where
    S: SnapshotSource + Send + Sync + 'static,
{
    /// Creates a new server reading records from `source`.
    pub fn new(source: S, config: ServerConfig) -> Self {
        Self {
            config,
            source: Arc::new(source),
        }
    }

    /// Returns a handle to the shared source.
    pub fn source(&self) -> Arc<S> {
        self.source.clone()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Runs the server, accepting connections forever.
    pub async fn run(&self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(&self.config.addr).await?;
        info!("Kintree server listening on {}", self.config.addr);

        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    debug!("New connection from {}", addr);
                    let source = self.source.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, addr, source).await {
                            error!("Connection error from {}: {}", addr, e);
                        }
                    });
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                }
            }
        }
    }
}

/// Handles a single WebSocket connection.
async fn handle_connection<S>(
    stream: TcpStream,
    addr: SocketAddr,
    source: Arc<S>,
) -> Result<(), ServerError>
where
    S: SnapshotSource + Send + Sync + 'static,
{
    let ws_stream = accept_async(stream).await?;
    info!("WebSocket connection established with {}", addr);

    let (mut write, mut read) = ws_stream.split();

    while let Some(msg) = read.next().await {
        let msg = match msg {
            Ok(m) => m,
            Err(e) => {
                warn!("Message error from {}: {}", addr, e);
                break;
            }
        };

        if msg.is_close() {
            debug!("Client {} disconnected", addr);
            break;
        }

        if msg.is_ping() {
            write.send(Message::Pong(msg.into_data())).await?;
            continue;
        }

        if msg.is_text() {
            let text = msg.to_text().unwrap_or("");
            let response = process_message(text, source.clone()).await;
            let json = serde_json::to_string(&response)?;
            write.send(Message::Text(json)).await?;
        }
    }

    info!("Connection closed: {}", addr);
    Ok(())
}

/// Processes a JSON-RPC message and returns a response.
///
/// Listing records may block, so dispatch runs on the blocking pool.
async fn process_message<S>(text: &str, source: Arc<S>) -> Response
where
    S: SnapshotSource + Send + Sync + 'static,
{
    let request: Request = match serde_json::from_str(text) {
        Ok(r) => r,
        Err(_) => return Response::parse_error(),
    };

    if request.jsonrpc.as_deref().is_some_and(|v| v != "2.0") {
        return Response::invalid_request(request.id, "Unsupported jsonrpc version");
    }

    let id = request.id.clone();
    match tokio::task::spawn_blocking(move || dispatch(source.as_ref(), request)).await {
        Ok(response) => response,
        Err(e) => {
            error!("Request handler failed: {}", e);
            Response::internal_error(id, "Request handler failed")
        }
    }
}

fn parse_params<T: DeserializeOwned>(params: Value) -> Result<T, String> {
    // Methods whose params are all optional may be called with none.
    let params = if params.is_null() {
        Value::Object(Default::default())
    } else {
        params
    };
    serde_json::from_value(params).map_err(|e| e.to_string())
}

/// Routes a request to its handler.
fn dispatch<S: SnapshotSource>(source: &S, request: Request) -> Response {
    let id = request.id;
    let method = request.method.as_str();

    debug!("Processing method: {}", method);

    match method {
        "graph.info" => handle_info(source, id),

        "families.list" => handle_families(source, id),

        "members.list" => match parse_params(request.params) {
            Ok(params) => handle_members(source, id, params),
            Err(e) => Response::invalid_params(id, e),
        },

        "tree.forest" => match parse_params(request.params) {
            Ok(params) => handle_forest(source, id, params),
            Err(e) => Response::invalid_params(id, e),
        },

        "tree.nuclear" => match parse_params(request.params) {
            Ok(params) => handle_nuclear(source, id, params),
            Err(e) => Response::invalid_params(id, e),
        },

        "member.relationships" => match parse_params(request.params) {
            Ok(params) => handle_member_relationships(source, id, params),
            Err(e) => Response::invalid_params(id, e),
        },

        "search" => match parse_params(request.params) {
            Ok(params) => handle_search(source, id, params),
            Err(e) => Response::invalid_params(id, e),
        },

        _ => Response::method_not_found(id, method),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::codes;
    use kintree_core::{sample_snapshot, Snapshot};
    use kintree_graph::SnapshotStore;
    use serde_json::json;
    use tempfile::tempdir;

    fn source() -> Arc<Snapshot> {
        Arc::new(sample_snapshot())
    }

    #[tokio::test]
    async fn test_parse_error() {
        let response = process_message("not json", source()).await;
        assert_eq!(response.error.unwrap().code, codes::PARSE_ERROR);
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let text = json!({"jsonrpc": "2.0", "method": "tree.grow", "id": 1}).to_string();
        let response = process_message(&text, source()).await;

        assert_eq!(response.error.unwrap().code, codes::METHOD_NOT_FOUND);
        assert_eq!(response.id, Some(json!(1)));
    }

    #[tokio::test]
    async fn test_forest_without_params() {
        let text = json!({"jsonrpc": "2.0", "method": "tree.forest", "id": 2}).to_string();
        let response = process_message(&text, source()).await;

        let result = response.result.unwrap();
        assert_eq!(result["roots"], 7);
        assert_eq!(result["scope"], "all");
    }

    #[tokio::test]
    async fn test_missing_required_params() {
        let text = json!({"jsonrpc": "2.0", "method": "tree.nuclear", "id": 3}).to_string();
        let response = process_message(&text, source()).await;

        assert_eq!(response.error.unwrap().code, codes::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_wrong_version() {
        let text = json!({"jsonrpc": "1.0", "method": "graph.info", "id": 4}).to_string();
        let response = process_message(&text, source()).await;

        assert_eq!(response.error.unwrap().code, codes::INVALID_REQUEST);
    }

    #[tokio::test]
    async fn test_search_against_store() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::open(dir.path()).unwrap();
        store.save_snapshot(&sample_snapshot()).unwrap();

        let text = json!({
            "jsonrpc": "2.0",
            "method": "search",
            "params": {"query": "बढ़ई"},
            "id": 5
        })
        .to_string();
        let response = process_message(&text, Arc::new(store)).await;

        let result = response.result.unwrap();
        assert_eq!(result["members"].as_array().unwrap().len(), 2);
        assert_eq!(result["families"], json!([]));
    }

    #[test]
    fn test_default_config() {
        assert_eq!(ServerConfig::default().addr.port(), DEFAULT_PORT);
    }
}
