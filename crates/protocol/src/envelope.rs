use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ProtocolError;

/// A command envelope popped off a device's command queue, before the
/// dispatcher injects its `index` field (§3). The dispatcher is oblivious to
/// everything inside except `node_id` — `command`, `config`, and
/// `scenario_name` pass through verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Envelope(Map<String, Value>);

impl Envelope {
    /// Parses a queued command string. Returns `NotAnObject` for any JSON
    /// value that isn't a top-level object — the dispatcher never sends
    /// bare arrays/scalars.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        match serde_json::from_str(raw)? {
            Value::Object(map) => Ok(Self(map)),
            _ => Err(ProtocolError::NotAnObject),
        }
    }

    /// The envelope's `node_id`, if present and non-empty. Per §3's
    /// invariant, only envelopes with a node id participate in the
    /// Execution Ledger.
    pub fn node_id(&self) -> Option<&str> {
        self.0.get("node_id").and_then(Value::as_str).filter(|s| !s.is_empty())
    }

    /// Consumes the envelope, injects the dispatcher-assigned sub-device
    /// slot, and serializes the result for the wire.
    pub fn into_wire_bytes(mut self, index: usize) -> Result<Vec<u8>, ProtocolError> {
        self.0.insert("index".to_owned(), Value::from(index));
        Ok(serde_json::to_vec(&self.0)?)
    }
}
