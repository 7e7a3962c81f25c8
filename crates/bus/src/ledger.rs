use crate::client::Bus;
use crate::error::BusError;

/// The Execution Ledger key for a flow node, per §4.3/§5. Entries are never
/// deleted or given a TTL — they're the durable record of what ran.
pub fn ledger_key(node_id: &str) -> String {
    format!("flow_execution:{node_id}")
}

pub async fn mark_started<B: Bus + ?Sized>(bus: &B, node_id: &str) -> Result<(), BusError> {
    bus.set(&ledger_key(node_id), "started").await
}

pub async fn mark_completed<B: Bus + ?Sized>(bus: &B, node_id: &str) -> Result<(), BusError> {
    bus.set(&ledger_key(node_id), "completed").await
}

pub async fn mark_failed<B: Bus + ?Sized>(bus: &B, node_id: &str) -> Result<(), BusError> {
    bus.set(&ledger_key(node_id), "failed").await
}
