use std::net::SocketAddr;
use std::sync::Arc;

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use dispatch_bus::{Bus, FleetRegistry};

use crate::config::{Config, ACCEPT_POLL_INTERVAL};
use crate::session::{handshake, logical, physical};
use crate::status;

/// Binds the listener with `SO_REUSEADDR` and runs the accept loop of
/// §4.1: re-check the server status flag on a short timeout, refuse new
/// connections while `stopped`, and stop listening entirely once the flag
/// is observed while we're up (existing sessions detect the flag on their
/// own next poll).
pub async fn run<B: Bus>(config: &Config, bus: Arc<B>, registry: Arc<FleetRegistry<B>>) -> std::io::Result<()> {
    let addr: SocketAddr = config
        .listen_addr()
        .parse()
        .unwrap_or_else(|e| panic!("invalid listen address {:?}: {e}", config.listen_addr()));

    let listener = bind_reuseaddr(addr)?;
    info!(%addr, "acceptor listening");

    loop {
        if !status::is_running(bus.as_ref()).await {
            info!("server status is stopped, acceptor exiting");
            return Ok(());
        }

        match tokio::time::timeout(ACCEPT_POLL_INTERVAL, listener.accept()).await {
            Ok(Ok((stream, peer))) => {
                info!(%peer, "accepted connection");
                let bus = bus.clone();
                let registry = registry.clone();
                tokio::spawn(async move {
                    run_session(stream, bus, registry).await;
                });
            }
            Ok(Err(error)) => {
                warn!(%error, "accept() failed");
            }
            Err(_timeout) => {
                // No connection within the poll window; loop back to
                // re-check server status.
            }
        }
    }
}

async fn run_session<B: Bus>(mut stream: tokio::net::TcpStream, bus: Arc<B>, registry: Arc<FleetRegistry<B>>) {
    let registered = match handshake::perform(&mut stream, registry.as_ref()).await {
        Ok(registered) => registered,
        Err(error) => {
            warn!(%error, "handshake failed, closing connection");
            return;
        }
    };

    match registered {
        handshake::Registered::Logical { device_id, sub_ids } => {
            info!(%device_id, num_sub_devices = sub_ids.len(), "logical device registered");
            logical::run(stream, &device_id, &sub_ids, registry.as_ref(), bus.as_ref()).await;
        }
        handshake::Registered::Physical { device_id } => {
            info!(%device_id, "physical device registered");
            physical::run(stream, &device_id, registry.as_ref(), bus.as_ref()).await;
        }
    }
}

fn bind_reuseaddr(addr: SocketAddr) -> std::io::Result<TcpListener> {
    let domain = if addr.is_ipv6() { Domain::IPV6 } else { Domain::IPV4 };
    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(1024)?;
    match TcpListener::from_std(socket.into()) {
        Ok(listener) => Ok(listener),
        Err(error) => {
            error!(%error, "failed to convert std listener to tokio listener");
            Err(error)
        }
    }
}
