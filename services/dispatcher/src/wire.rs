use socket2::{SockRef, TcpKeepalive};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use dispatch_protocol::MAX_FRAME_BYTES;

use crate::config::{KEEPALIVE_IDLE, KEEPALIVE_INTERVAL, KEEPALIVE_RETRIES};
use crate::error::SessionError;

/// Applies the dead-peer-detection keepalive of §4.2 to a freshly accepted
/// socket. Grounded on the `configure_tcp_keepalive` helper used elsewhere
/// in the corpus for the same `socket2::SockRef` + `TcpKeepalive` pattern.
pub fn configure_keepalive(stream: &TcpStream) -> std::io::Result<()> {
    stream.set_nodelay(true)?;
    let sock = SockRef::from(stream);
    let keepalive = TcpKeepalive::new()
        .with_time(KEEPALIVE_IDLE)
        .with_interval(KEEPALIVE_INTERVAL);
    #[cfg(any(target_os = "linux", target_os = "macos"))]
    let keepalive = keepalive.with_retries(KEEPALIVE_RETRIES);
    sock.set_tcp_keepalive(&keepalive)
}

/// Reads exactly one frame: one `read()` call, at most [`MAX_FRAME_BYTES`].
/// The wire has no length prefix (§4.2/§4.3) — every write from the peer is
/// expected to land in a single `read()`, which holds for the small,
/// infrequent messages this protocol exchanges.
pub async fn read_frame(stream: &mut TcpStream) -> Result<Vec<u8>, SessionError> {
    let mut buf = vec![0u8; MAX_FRAME_BYTES];
    let n = stream.read(&mut buf).await?;
    if n == 0 {
        return Err(SessionError::ConnectionClosed);
    }
    buf.truncate(n);
    Ok(buf)
}

pub async fn write_frame(stream: &mut TcpStream, bytes: &[u8]) -> Result<(), SessionError> {
    stream.write_all(bytes).await?;
    Ok(())
}
