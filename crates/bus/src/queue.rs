use crate::client::Bus;
use crate::error::BusError;
use crate::keys::commands_key;

/// Producer-side helper. Appends a serialized envelope with `LPUSH`. The
/// production producer is the (out-of-scope) HTTP/flow-engine layer; tests
/// call this directly to stand in for it.
pub async fn push_command<B: Bus + ?Sized>(
    bus: &B,
    device_id: &str,
    envelope_json: &str,
) -> Result<(), BusError> {
    bus.lpush(&commands_key(device_id), envelope_json).await
}

/// Dispatcher-side helper. Pops the oldest queued envelope with `RPOP` —
/// the FIFO resolution of Open Question 1 (see DESIGN.md).
pub async fn pop_next<B: Bus + ?Sized>(bus: &B, device_id: &str) -> Result<Option<String>, BusError> {
    bus.rpop(&commands_key(device_id)).await
}

/// Drains every remaining envelope in a device's queue, oldest first. Used
/// when a device disconnects with commands still queued, so each can be
/// marked `failed` in the Execution Ledger (§4.3/§4.7).
pub async fn drain<B: Bus + ?Sized>(bus: &B, device_id: &str) -> Result<Vec<String>, BusError> {
    let mut drained = Vec::new();
    while let Some(raw) = bus.rpop(&commands_key(device_id)).await? {
        drained.push(raw);
    }
    Ok(drained)
}
