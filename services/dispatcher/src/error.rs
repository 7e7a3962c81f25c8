use dispatch_bus::BusError;
use dispatch_protocol::ProtocolError;

/// Session-level errors. These never propagate to a caller — each session
/// runs to completion on its own task, and a session that hits one of these
/// logs it and falls through to its own teardown path, the same way
/// `ws_forwarder`'s loop exits on any fatal branch.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("socket I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Bus(#[from] BusError),

    #[error("peer closed the connection")]
    ConnectionClosed,
}
