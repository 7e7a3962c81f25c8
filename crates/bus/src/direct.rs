use std::time::Duration;

use dispatch_protocol::{PhysicalAck, PhysicalCommand};

use crate::client::Bus;
use crate::error::BusError;
use crate::keys::{physical_command_key, physical_response_key};
use crate::registry::is_physical_connected;

/// How often the bridge polls the response slot while waiting (§4.5).
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Default caller timeout if none is specified (§4.5 step 4).
pub const DEFAULT_DIRECT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum DirectCommandError {
    #[error("device {0} is not connected")]
    NotConnected(String),

    #[error("timed out waiting for a response from {0}")]
    Timeout(String),

    #[error(transparent)]
    Bus(#[from] BusError),

    #[error(transparent)]
    Protocol(#[from] dispatch_protocol::ProtocolError),
}

/// Implements the Direct-Command Channel bridge of §4.5: verify the target
/// is connected, push a command onto its single-slot request key, then poll
/// the matching response key until it appears or `timeout` elapses.
///
/// Connectivity is checked against the bus-mirrored physical registry
/// rather than any in-process socket table, so this function's caller (an
/// out-of-scope HTTP handler, per §9) can live in a different process from
/// the dispatcher that owns the actual socket.
pub async fn send_direct_command<B: Bus + ?Sized>(
    bus: &B,
    device_id: &str,
    command: &PhysicalCommand,
    timeout: Duration,
) -> Result<PhysicalAck, DirectCommandError> {
    if !is_physical_connected(bus, device_id).await? {
        return Err(DirectCommandError::NotConnected(device_id.to_owned()));
    }

    let response_key = physical_response_key(device_id);
    let command_key = physical_command_key(device_id);

    // Clear any stale response left over from a prior, timed-out call
    // before handing the dispatcher a fresh command to answer.
    bus.del(&response_key).await?;
    bus.set(&command_key, &serde_json::to_string(command)?).await?;

    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if let Some(raw) = bus.get(&response_key).await? {
            bus.del(&response_key).await?;
            return Ok(serde_json::from_str(&raw)?);
        }
        if tokio::time::Instant::now() >= deadline {
            let _ = bus.del(&command_key).await;
            return Err(DirectCommandError::Timeout(device_id.to_owned()));
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispatch_protocol::PhysicalAction;
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;
    use std::sync::Arc;

    #[derive(Default)]
    struct ScriptedBus {
        values: StdMutex<HashMap<String, String>>,
    }

    #[async_trait::async_trait]
    impl Bus for ScriptedBus {
        async fn get(&self, key: &str) -> Result<Option<String>, BusError> {
            Ok(self.values.lock().unwrap().get(key).cloned())
        }
        async fn set(&self, key: &str, value: &str) -> Result<(), BusError> {
            self.values.lock().unwrap().insert(key.to_owned(), value.to_owned());
            Ok(())
        }
        async fn set_ex(&self, key: &str, value: &str, _ttl: Duration) -> Result<(), BusError> {
            self.set(key, value).await
        }
        async fn del(&self, key: &str) -> Result<(), BusError> {
            self.values.lock().unwrap().remove(key);
            Ok(())
        }
        async fn lpush(&self, _key: &str, _value: &str) -> Result<(), BusError> {
            Ok(())
        }
        async fn rpop(&self, _key: &str) -> Result<Option<String>, BusError> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn rejects_unconnected_device() {
        let bus = ScriptedBus::default();
        let command = PhysicalCommand {
            action: PhysicalAction::GetMetrics,
            params: serde_json::json!({}),
        };
        let err = send_direct_command(&bus, "1.2.3.4", &command, Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, DirectCommandError::NotConnected(_)));
    }

    #[tokio::test]
    async fn times_out_when_no_response_arrives() {
        let bus = Arc::new(ScriptedBus::default());
        bus.values
            .lock()
            .unwrap()
            .insert("connected_physical_devices".to_owned(), r#"{"1.2.3.4":{}}"#.to_owned());
        let command = PhysicalCommand {
            action: PhysicalAction::ListDevices,
            params: serde_json::json!({}),
        };
        let err = send_direct_command(bus.as_ref(), "1.2.3.4", &command, Duration::from_millis(150))
            .await
            .unwrap_err();
        assert!(matches!(err, DirectCommandError::Timeout(_)));
        assert!(bus.values.lock().unwrap().get("1.2.3.4:physical_command").is_none());
    }
}
