use tokio::net::TcpStream;

use dispatch_bus::{Bus, FleetRegistry, LogicalRecord};
use dispatch_protocol::{build_device_id, sub_device_id, DeviceKind, Handshake};

use crate::error::SessionError;
use crate::wire::{configure_keepalive, read_frame};

/// What a successful handshake produced, driving which protocol loop the
/// session runs next (§4.2).
pub enum Registered {
    Logical { device_id: String, sub_ids: Vec<String> },
    Physical { device_id: String },
}

/// Runs the registration handshake of §4.2: configure keepalive, read one
/// framed JSON object, build the device id(s), and publish into the Fleet
/// Registry. Any I/O or parse failure here means no registry entry is ever
/// created — the caller closes the socket and gives up on this connection.
pub async fn perform<B: Bus>(
    stream: &mut TcpStream,
    registry: &FleetRegistry<B>,
) -> Result<Registered, SessionError> {
    configure_keepalive(stream)?;

    let peer_ip = stream.peer_addr()?.ip().to_string();
    let frame = read_frame(stream).await?;
    let handshake: Handshake =
        serde_json::from_slice(&frame).map_err(dispatch_protocol::ProtocolError::from)?;

    match handshake.kind {
        DeviceKind::Physical => {
            let device_id = build_device_id(&peer_ip, DeviceKind::Physical, None);
            registry.register_physical(&device_id).await?;
            Ok(Registered::Physical { device_id })
        }
        DeviceKind::Logical => {
            let device_id = build_device_id(&peer_ip, DeviceKind::Logical, handshake.device_name.as_deref());
            let num_nodes = handshake.num_nodes.max(1);
            let sub_ids: Vec<String> = if num_nodes > 1 {
                (1..=num_nodes).map(|i| sub_device_id(&device_id, i)).collect()
            } else {
                vec![device_id.clone()]
            };
            let record = LogicalRecord {
                device_name: handshake.device_name,
                num_hints: handshake.num_hints,
                status: handshake.status,
                config: handshake.config,
            };
            registry.register_logical(&sub_ids, record).await?;
            Ok(Registered::Logical { device_id, sub_ids })
        }
    }
}
