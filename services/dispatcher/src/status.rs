use dispatch_bus::{keys, Bus};

/// Reads `tcp_server:status` fresh from the bus. No caching beyond whatever
/// the caller does between ticks — each Idle/accept poll calls this
/// directly, matching §9's "watched bus key with a cached local view
/// refreshed on each Idle tick" (the refresh interval, not an extra cache
/// layer, is what keeps this cheap).
pub async fn is_running<B: Bus + ?Sized>(bus: &B) -> bool {
    match bus.get(keys::SERVER_STATUS).await {
        Ok(Some(value)) => value != "stopped",
        // Absent key: the source treats this as running (no explicit
        // "stopped" has ever been written).
        Ok(None) => true,
        Err(error) => {
            tracing::warn!(%error, "failed to read server status, assuming running");
            true
        }
    }
}
