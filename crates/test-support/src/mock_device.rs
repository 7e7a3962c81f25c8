use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use dispatch_protocol::MAX_FRAME_BYTES;

/// A minimal stand-in for a real logical/physical device, for tests that
/// exercise the dispatcher's TCP surface end to end. Mirrors the framing
/// the dispatcher itself expects: one JSON object per write, read back in a
/// single `read()` call, no length prefix.
pub struct MockDeviceClient {
    stream: TcpStream,
}

impl MockDeviceClient {
    pub async fn connect(addr: &str) -> std::io::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self { stream })
    }

    pub async fn send(&mut self, value: &Value) -> std::io::Result<()> {
        let bytes = serde_json::to_vec(value).expect("test payloads are always valid JSON");
        self.stream.write_all(&bytes).await
    }

    /// Reads one frame and parses it as JSON, failing the test (via the
    /// returned error) if nothing arrives within `timeout`.
    pub async fn recv(&mut self, wait: Duration) -> std::io::Result<Value> {
        let mut buf = vec![0u8; MAX_FRAME_BYTES];
        let n = timeout(wait, self.stream.read(&mut buf))
            .await
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::TimedOut, "no frame within deadline"))??;
        if n == 0 {
            return Err(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "peer closed"));
        }
        serde_json::from_slice(&buf[..n])
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Sends a handshake and waits briefly — callers that don't care about
    /// an ack (the dispatcher doesn't send one on handshake) just use this
    /// to register before exercising the rest of the scenario.
    pub async fn handshake(&mut self, payload: &Value) -> std::io::Result<()> {
        self.send(payload).await
    }

    pub async fn shutdown(&mut self) -> std::io::Result<()> {
        self.stream.shutdown().await
    }
}
