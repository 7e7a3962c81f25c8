use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;

use crate::client::Bus;
use crate::error::BusError;
use crate::keys::{CONNECTED_DEVICES, CONNECTED_PHYSICAL_DEVICES};

/// What the registry remembers about one connected logical sub-device, for
/// the mirror written to [`CONNECTED_DEVICES`] (§4.2/§4.6). The UI reads
/// this blob; the dispatcher never reads it back.
#[derive(Debug, Clone, Serialize)]
pub struct LogicalRecord {
    pub device_name: Option<String>,
    pub num_hints: Option<u32>,
    pub status: Option<String>,
    pub config: serde_json::Value,
}

/// Connected physical devices carry no per-device metadata the UI needs —
/// presence in the mirror is the whole signal.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PhysicalRecord {}

/// In-process view of every connected device, mirrored to the bus on every
/// mutation. The mirror write happens inside the same lock as the map
/// mutation so a concurrent reader of the bus key never observes a state
/// the in-process map hasn't reached yet (and vice versa).
///
/// Deliberately does *not* keep a `device_id -> socket` map: the
/// Direct-Command Channel bridge (§4.5) checks connectivity through this
/// registry's bus mirror rather than in-process state, which is what lets
/// the bridge's caller live in a separate process (§9).
pub struct FleetRegistry<B: Bus> {
    bus: Arc<B>,
    logical: Mutex<HashMap<String, LogicalRecord>>,
    physical: Mutex<HashMap<String, PhysicalRecord>>,
}

impl<B: Bus> FleetRegistry<B> {
    pub fn new(bus: Arc<B>) -> Self {
        Self {
            bus,
            logical: Mutex::new(HashMap::new()),
            physical: Mutex::new(HashMap::new()),
        }
    }

    pub async fn register_logical(&self, ids: &[String], record: LogicalRecord) -> Result<(), BusError> {
        let mut map = self.logical.lock().await;
        for id in ids {
            map.insert(id.clone(), record.clone());
        }
        self.mirror_logical(&map).await
    }

    pub async fn remove_logical(&self, ids: &[String]) -> Result<(), BusError> {
        let mut map = self.logical.lock().await;
        for id in ids {
            map.remove(id);
        }
        self.mirror_logical(&map).await
    }

    pub async fn register_physical(&self, id: &str) -> Result<(), BusError> {
        let mut map = self.physical.lock().await;
        map.insert(id.to_owned(), PhysicalRecord::default());
        self.mirror_physical(&map).await
    }

    pub async fn remove_physical(&self, id: &str) -> Result<(), BusError> {
        let mut map = self.physical.lock().await;
        map.remove(id);
        self.mirror_physical(&map).await
    }

    pub async fn is_physical_registered(&self, id: &str) -> bool {
        self.physical.lock().await.contains_key(id)
    }

    pub async fn logical_count(&self) -> usize {
        self.logical.lock().await.len()
    }

    async fn mirror_logical(&self, map: &HashMap<String, LogicalRecord>) -> Result<(), BusError> {
        let json = serde_json::to_string(map)?;
        self.bus.set(CONNECTED_DEVICES, &json).await
    }

    async fn mirror_physical(&self, map: &HashMap<String, PhysicalRecord>) -> Result<(), BusError> {
        let json = serde_json::to_string(map)?;
        self.bus.set(CONNECTED_PHYSICAL_DEVICES, &json).await
    }
}

/// Standalone read of the physical mirror, for callers that don't hold a
/// [`FleetRegistry`] — namely the Direct-Command Channel bridge, which may
/// run in a different process than the dispatcher that owns the registry.
pub async fn is_physical_connected<B: Bus + ?Sized>(bus: &B, device_id: &str) -> Result<bool, BusError> {
    let Some(raw) = bus.get(CONNECTED_PHYSICAL_DEVICES).await? else {
        return Ok(false);
    };
    let map: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&raw)?;
    Ok(map.contains_key(device_id))
}
