//! Newline-delimited JSON framing for the stdio transport.
//!
//! Every message is one line of JSON. Incoming lines are classified into
//! responses, notifications and server-initiated requests so the peer can
//! skip what it is not waiting for.

use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result};
use crate::protocol::{JsonRpcResponse, RequestId};

/// Maximum size of a single frame (1MB).
/// Sized for large tool outputs (feed dumps, search results).
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// A decoded incoming frame.
#[derive(Debug, Clone)]
pub enum Incoming {
    /// Reply to one of our requests.
    Response(JsonRpcResponse),
    /// Fire-and-forget message from the server (logging, progress).
    Notification { method: String },
    /// Request initiated by the server (ping, roots/list).
    Request { id: RequestId, method: String },
}

impl Incoming {
    /// Classify a raw JSON-RPC message.
    pub fn decode(line: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(line)?;
        let method = value.get("method").and_then(Value::as_str).map(str::to_string);
        let has_id = value.get("id").is_some_and(|id| !id.is_null());

        match (method, has_id) {
            (Some(method), true) => {
                let id: RequestId = serde_json::from_value(value["id"].clone())?;
                Ok(Self::Request { id, method })
            }
            (Some(method), false) => Ok(Self::Notification { method }),
            (None, true) => Ok(Self::Response(serde_json::from_value(value)?)),
            (None, false) => Err(Error::InvalidResponse(format!(
                "message has neither id nor method: {line}"
            ))),
        }
    }
}

/// Line-framed JSON transport over an async reader/writer pair.
pub struct LineCodec<R, W> {
    reader: R,
    writer: W,
    line: Vec<u8>,
}

impl<R, W> LineCodec<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            line: Vec::new(),
        }
    }

    /// Write one message followed by a newline.
    pub async fn send(&mut self, message: &impl Serialize) -> Result<()> {
        let json = serde_json::to_string(message)?;
        self.writer.write_all(json.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Read the next non-empty frame.
    ///
    /// At most `MAX_FRAME_SIZE + 1` bytes are buffered per frame; a longer
    /// line fails with [`Error::OutputTooLarge`] and leaves the stream
    /// unusable.
    pub async fn recv(&mut self) -> Result<Incoming> {
        let limit = MAX_FRAME_SIZE as u64 + 1;
        loop {
            self.line.clear();
            let bytes_read = (&mut self.reader)
                .take(limit)
                .read_until(b'\n', &mut self.line)
                .await?;
            if bytes_read == 0 {
                return Err(Error::ServerExited);
            }

            if self.line.len() > MAX_FRAME_SIZE {
                return Err(Error::OutputTooLarge {
                    size: self.line.len(),
                    max: MAX_FRAME_SIZE,
                });
            }

            let text = std::str::from_utf8(&self.line)
                .map_err(|e| Error::InvalidResponse(format!("frame is not UTF-8: {e}")))?;
            let trimmed = text.trim();
            if trimmed.is_empty() {
                continue;
            }
            return Incoming::decode(trimmed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    #[test]
    fn decode_classifies_messages() {
        let response = Incoming::decode(r#"{"jsonrpc":"2.0","id":3,"result":{}}"#).unwrap();
        assert!(matches!(response, Incoming::Response(r) if r.id == RequestId::Number(3)));

        let note =
            Incoming::decode(r#"{"jsonrpc":"2.0","method":"notifications/message"}"#).unwrap();
        assert!(matches!(note, Incoming::Notification { method } if method == "notifications/message"));

        let ping = Incoming::decode(r#"{"jsonrpc":"2.0","id":"s-1","method":"ping"}"#).unwrap();
        assert!(matches!(ping, Incoming::Request { method, .. } if method == "ping"));
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(Incoming::decode("not json").is_err());
        assert!(Incoming::decode(r#"{"jsonrpc":"2.0"}"#).is_err());
    }

    #[tokio::test]
    async fn recv_skips_blank_lines_and_reports_eof() {
        let input: &[u8] = b"\n\n{\"jsonrpc\":\"2.0\",\"id\":1,\"result\":null}\n";
        let mut codec = LineCodec::new(BufReader::new(input), tokio::io::sink());

        assert!(matches!(codec.recv().await.unwrap(), Incoming::Response(_)));
        assert!(matches!(codec.recv().await, Err(Error::ServerExited)));
    }

    #[tokio::test]
    async fn oversized_frame_is_rejected_without_buffering_it() {
        let mut input = vec![b'a'; MAX_FRAME_SIZE * 3];
        input.push(b'\n');
        let mut codec = LineCodec::new(BufReader::new(input.as_slice()), tokio::io::sink());

        match codec.recv().await {
            Err(Error::OutputTooLarge { size, max }) => {
                assert_eq!(max, MAX_FRAME_SIZE);
                assert_eq!(size, MAX_FRAME_SIZE + 1);
            }
            other => panic!("expected OutputTooLarge, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn frame_at_the_limit_is_accepted() {
        let body = r#"{"jsonrpc":"2.0","id":1,"result":""}"#;
        let padding = " ".repeat(MAX_FRAME_SIZE - body.len() - 1);
        let input = format!("{body}{padding}\n");
        assert_eq!(input.len(), MAX_FRAME_SIZE);

        let mut codec = LineCodec::new(BufReader::new(input.as_bytes()), tokio::io::sink());
        assert!(matches!(codec.recv().await.unwrap(), Incoming::Response(_)));
    }

    #[tokio::test]
    async fn closed_peer_is_an_io_error() {
        let (client, server) = tokio::io::duplex(64);
        drop(server);
        let (_, write_half) = tokio::io::split(client);
        let mut codec = LineCodec::new(BufReader::new(tokio::io::empty()), write_half);

        let err = codec
            .send(&serde_json::json!({"jsonrpc": "2.0", "method": "x"}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)), "{err}");
        assert!(!err.to_string().contains("spawn"));
    }

    #[tokio::test]
    async fn send_writes_one_line() {
        let (client, server) = tokio::io::duplex(1024);
        let (_, write_half) = tokio::io::split(client);
        let mut codec = LineCodec::new(BufReader::new(tokio::io::empty()), write_half);
        codec
            .send(&serde_json::json!({"jsonrpc": "2.0", "method": "x"}))
            .await
            .unwrap();

        let mut lines = BufReader::new(server).lines();
        let line = lines.next_line().await.unwrap().unwrap();
        assert_eq!(line, r#"{"jsonrpc":"2.0","method":"x"}"#);
    }
}
