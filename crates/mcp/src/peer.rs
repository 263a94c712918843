//! JSON-RPC session with an MCP peer over any async byte stream.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tokio::io::{AsyncBufRead, AsyncWrite};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::debug;

use crate::codec::{Incoming, LineCodec};
use crate::error::{Error, Result};
use crate::protocol::{
    CallToolParams, CallToolResult, InitializeParams, InitializeResult, JsonRpcError,
    JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, ListToolsResult, RequestId, Tool,
};

/// Client side of an MCP connection.
///
/// Requests are strictly sequential: the codec lock is held from the moment a
/// request is written until its response has been read.
pub struct Peer<R, W> {
    codec: Mutex<LineCodec<R, W>>,
    next_id: AtomicI64,
    initialized: AtomicBool,
    timeout: Option<Duration>,
}

impl<R, W> Peer<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            codec: Mutex::new(LineCodec::new(reader, writer)),
            next_id: AtomicI64::new(1),
            initialized: AtomicBool::new(false),
            timeout: None,
        }
    }

    /// Bound every request by `timeout`. Unbounded when `None`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Perform the initialize handshake.
    pub async fn initialize(&self) -> Result<InitializeResult> {
        let result: InitializeResult = self
            .request("initialize", Some(InitializeParams::default()))
            .await?;
        self.notify("notifications/initialized").await?;
        self.initialized.store(true, Ordering::SeqCst);
        debug!(
            server = %result.server_info.name,
            protocol = %result.protocol_version,
            "mcp handshake complete"
        );
        Ok(result)
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Fetch the peer's current tool list.
    pub async fn list_tools(&self) -> Result<Vec<Tool>> {
        self.ensure_initialized()?;
        let result: ListToolsResult = self.request("tools/list", None::<()>).await?;
        Ok(result.tools)
    }

    /// Call a tool by name. Arguments are forwarded untouched.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<CallToolResult> {
        self.ensure_initialized()?;
        let params = CallToolParams {
            name: name.to_string(),
            arguments,
        };

        let result: CallToolResult = self.request("tools/call", Some(params)).await?;

        if result.is_error {
            return Err(Error::ToolCallFailed(result.text()));
        }

        Ok(result)
    }

    // --- Internal methods ---

    fn ensure_initialized(&self) -> Result<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(Error::NotInitialized)
        }
    }

    fn next_request_id(&self) -> RequestId {
        RequestId::Number(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn request<P, T>(&self, method: &str, params: Option<P>) -> Result<T>
    where
        P: Serialize,
        T: DeserializeOwned,
    {
        let exchange = self.exchange(method, params);
        let response = match self.timeout {
            Some(limit) => timeout(limit, exchange).await.map_err(|_| Error::Timeout)??,
            None => exchange.await?,
        };

        let value = response.into_result()?;
        Ok(serde_json::from_value(value)?)
    }

    async fn exchange<P: Serialize>(
        &self,
        method: &str,
        params: Option<P>,
    ) -> Result<JsonRpcResponse> {
        let id = self.next_request_id();
        let mut request = JsonRpcRequest::new(id.clone(), method);
        if let Some(p) = params {
            request = request.with_params(serde_json::to_value(p)?);
        }

        let mut codec = self.codec.lock().await;
        codec.send(&request).await?;

        loop {
            match codec.recv().await? {
                Incoming::Response(response) if response.id == id => return Ok(response),
                Incoming::Response(response) => {
                    return Err(Error::InvalidResponse(format!(
                        "response ID mismatch: expected {id:?}, got {:?}",
                        response.id
                    )));
                }
                Incoming::Notification { method } => {
                    debug!(%method, "skipping server notification");
                }
                Incoming::Request { id, method } => {
                    let reply = if method == "ping" {
                        JsonRpcResponse::success(id, Value::Object(Map::new()))
                    } else {
                        debug!(%method, "rejecting server request");
                        JsonRpcResponse::failure(id, JsonRpcError::method_not_found(&method))
                    };
                    codec.send(&reply).await?;
                }
            }
        }
    }

    async fn notify(&self, method: &str) -> Result<()> {
        let mut codec = self.codec.lock().await;
        codec.send(&JsonRpcNotification::new(method)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, ReadHalf, WriteHalf};

    type TestPeer = Peer<BufReader<ReadHalf<DuplexStream>>, WriteHalf<DuplexStream>>;

    /// Fake server: answers each request line with the next scripted reply.
    ///
    /// `{id}` in a scripted line is replaced by the incoming request id.
    fn fake_server(script: Vec<Vec<&'static str>>) -> (TestPeer, tokio::task::JoinHandle<Vec<Value>>) {
        let (client, server) = tokio::io::duplex(64 * 1024);
        let (client_read, client_write) = tokio::io::split(client);
        let peer = Peer::new(BufReader::new(client_read), client_write);

        let handle = tokio::spawn(async move {
            let (server_read, mut server_write) = tokio::io::split(server);
            let mut lines = BufReader::new(server_read).lines();
            let mut script = script.into_iter();
            let mut seen = Vec::new();

            while let Ok(Some(line)) = lines.next_line().await {
                let message: Value = serde_json::from_str(&line).unwrap();
                seen.push(message.clone());
                if message.get("id").is_none() || message.get("method").is_none() {
                    continue;
                }
                let Some(replies) = script.next() else { break };
                for reply in replies {
                    let reply = reply.replace("{id}", &message["id"].to_string());
                    server_write.write_all(reply.as_bytes()).await.unwrap();
                    server_write.write_all(b"\n").await.unwrap();
                }
            }
            seen
        });

        (peer, handle)
    }

    const INIT_REPLY: &str = r#"{"jsonrpc":"2.0","id":{id},"result":{"protocolVersion":"2024-11-05","capabilities":{"tools":{}},"serverInfo":{"name":"news","version":"1.0"}}}"#;

    #[tokio::test]
    async fn handshake_sends_initialized_notification() {
        let (peer, server) = fake_server(vec![vec![INIT_REPLY]]);

        let info = peer.initialize().await.unwrap();
        assert_eq!(info.server_info.name, "news");
        assert!(peer.is_initialized());

        drop(peer);
        let seen = server.await.unwrap();
        assert_eq!(seen[0]["method"], "initialize");
        assert_eq!(seen[1]["method"], "notifications/initialized");
        assert!(seen[1].get("id").is_none());
    }

    #[tokio::test]
    async fn calls_before_handshake_are_refused() {
        let (peer, _server) = fake_server(vec![]);
        assert!(matches!(peer.list_tools().await, Err(Error::NotInitialized)));
        assert!(matches!(
            peer.call_tool("x", Map::new()).await,
            Err(Error::NotInitialized)
        ));
    }

    #[tokio::test]
    async fn notifications_and_pings_are_handled_while_waiting() {
        let (peer, server) = fake_server(vec![
            vec![INIT_REPLY],
            vec![
                r#"{"jsonrpc":"2.0","method":"notifications/message","params":{"level":"info"}}"#,
                r#"{"jsonrpc":"2.0","id":"srv-1","method":"ping"}"#,
                r#"{"jsonrpc":"2.0","id":{id},"result":{"tools":[{"name":"get_news","inputSchema":{"type":"object"}}]}}"#,
            ],
        ]);

        peer.initialize().await.unwrap();
        let tools = peer.list_tools().await.unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "get_news");

        drop(peer);
        let seen = server.await.unwrap();
        let pong = seen
            .iter()
            .find(|m| m["id"] == json!("srv-1"))
            .expect("ping answered");
        assert_eq!(pong["result"], json!({}));
    }

    #[tokio::test]
    async fn arguments_are_forwarded_verbatim() {
        let (peer, server) = fake_server(vec![
            vec![INIT_REPLY],
            vec![r#"{"jsonrpc":"2.0","id":{id},"result":{"content":[{"type":"text","text":"ok"}]}}"#],
        ]);
        peer.initialize().await.unwrap();

        let args = json!({"news_type": "markets", "max_items": 3, "extra": [1, 2]});
        let result = peer
            .call_tool("get_news", args.as_object().cloned().unwrap())
            .await
            .unwrap();
        assert_eq!(result.text(), "ok");

        drop(peer);
        let seen = server.await.unwrap();
        let call = seen.iter().find(|m| m["method"] == "tools/call").unwrap();
        assert_eq!(call["params"]["name"], "get_news");
        assert_eq!(call["params"]["arguments"], args);
    }

    #[tokio::test]
    async fn error_flag_becomes_tool_failure() {
        let (peer, _server) = fake_server(vec![
            vec![INIT_REPLY],
            vec![r#"{"jsonrpc":"2.0","id":{id},"result":{"content":[{"type":"text","text":"bad news type"}],"isError":true}}"#],
        ]);
        peer.initialize().await.unwrap();

        match peer.call_tool("get_news", Map::new()).await {
            Err(Error::ToolCallFailed(message)) => assert_eq!(message, "bad news type"),
            other => panic!("expected tool failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn rpc_errors_are_surfaced() {
        let (peer, _server) = fake_server(vec![
            vec![INIT_REPLY],
            vec![r#"{"jsonrpc":"2.0","id":{id},"error":{"code":-32602,"message":"unknown tool"}}"#],
        ]);
        peer.initialize().await.unwrap();

        match peer.call_tool("nope", Map::new()).await {
            Err(Error::JsonRpc(err)) => assert_eq!(err.code, -32602),
            other => panic!("expected rpc error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn closed_stream_reports_exit() {
        let (peer, _server) = fake_server(vec![]);
        assert!(matches!(peer.initialize().await, Err(Error::ServerExited)));
    }

    #[tokio::test]
    async fn timeout_bounds_a_silent_server() {
        let (client, _server) = tokio::io::duplex(1024);
        let (read, write) = tokio::io::split(client);
        let peer = Peer::new(BufReader::new(read), write)
            .with_timeout(Some(Duration::from_millis(20)));
        assert!(matches!(peer.initialize().await, Err(Error::Timeout)));
    }
}
