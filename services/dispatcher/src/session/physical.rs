use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use dispatch_bus::{keys, Bus, FleetRegistry};
use dispatch_protocol::PhysicalAck;

use crate::config::{PHYSICAL_POLL_INTERVAL, PHYSICAL_RESPONSE_READ_TIMEOUT, PHYSICAL_RESPONSE_TTL};
use crate::status;
use crate::wire::{read_frame, write_frame};

/// Runs the physical protocol loop of §4.4: poll the Direct-Command slot,
/// forward whatever arrives verbatim, and write the device's reply (or a
/// synthetic failure) to the response slot. Physical sessions have no
/// disconnect flag and exit only on socket error or server stop.
pub async fn run<B: Bus>(mut stream: TcpStream, device_id: &str, registry: &FleetRegistry<B>, bus: &B) {
    let command_key = keys::physical_command_key(device_id);
    let response_key = keys::physical_response_key(device_id);

    loop {
        if !status::is_running(bus).await {
            debug!(%device_id, "server status is stopped, tearing down physical session");
            break;
        }

        let command = match bus.get(&command_key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                tokio::time::sleep(PHYSICAL_POLL_INTERVAL).await;
                continue;
            }
            Err(error) => {
                warn!(%device_id, %error, "bus error polling physical command slot");
                tokio::time::sleep(PHYSICAL_POLL_INTERVAL).await;
                continue;
            }
        };

        // At-most-once dispatch: the slot is cleared before we touch the
        // socket, so a crash mid-forward never replays the command.
        let _ = bus.del(&command_key).await;

        let outcome = forward(&mut stream, command.as_bytes()).await;
        let ack = match &outcome {
            Ok(ack) => ack.clone(),
            Err(ForwardError::Timeout) => PhysicalAck::failed("device did not respond within the read timeout"),
            Err(ForwardError::MalformedResponse(reason)) => PhysicalAck::failed(reason.clone()),
            Err(ForwardError::Transport(reason)) => PhysicalAck::failed(reason.clone()),
        };
        if let Err(error) = write_response(bus, &response_key, &ack).await {
            warn!(%device_id, %error, "failed to write physical response slot");
        }
        // A transport-level error means the connection itself is dead;
        // timeouts and malformed replies are per-command and the session
        // keeps polling for the next direct command (§4.7).
        if matches!(outcome, Err(ForwardError::Transport(_))) {
            warn!(%device_id, "physical session transport error, disconnecting");
            break;
        }
    }

    info!(%device_id, "physical session disconnected");
    let _ = registry.remove_physical(device_id).await;
}

enum ForwardError {
    Transport(String),
    Timeout,
    MalformedResponse(String),
}

async fn forward(stream: &mut TcpStream, command_bytes: &[u8]) -> Result<PhysicalAck, ForwardError> {
    write_frame(stream, command_bytes)
        .await
        .map_err(|e| ForwardError::Transport(e.to_string()))?;
    match timeout(PHYSICAL_RESPONSE_READ_TIMEOUT, read_frame(stream)).await {
        Ok(Ok(frame)) => {
            serde_json::from_slice(&frame).map_err(|e| ForwardError::MalformedResponse(e.to_string()))
        }
        Ok(Err(error)) => Err(ForwardError::Transport(error.to_string())),
        Err(_) => Err(ForwardError::Timeout),
    }
}

async fn write_response<B: Bus>(bus: &B, response_key: &str, ack: &PhysicalAck) -> Result<(), dispatch_bus::BusError> {
    let json = serde_json::to_string(ack).map_err(dispatch_bus::BusError::from)?;
    bus.set_ex(response_key, &json, PHYSICAL_RESPONSE_TTL).await
}
