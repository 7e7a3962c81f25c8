use serde::Deserialize;

use crate::device_id::DeviceKind;

fn default_num_nodes() -> u32 {
    1
}

/// The initial message a device sends after connecting, per §4.2/§6.
///
/// `config`, `num_hints`, and `status` are preserved verbatim for the UI and
/// never inspected by the dispatcher (§9).
#[derive(Debug, Clone, Deserialize)]
pub struct Handshake {
    #[serde(rename = "type", default)]
    pub kind: DeviceKind,
    pub device_name: Option<String>,
    #[serde(default = "default_num_nodes")]
    pub num_nodes: u32,
    pub num_hints: Option<u32>,
    pub status: Option<String>,
    #[serde(default)]
    pub config: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_logical_single_node() {
        let h: Handshake = serde_json::from_str(r#"{"device_name":"D"}"#).unwrap();
        assert_eq!(h.kind, DeviceKind::Logical);
        assert_eq!(h.num_nodes, 1);
    }

    #[test]
    fn parses_physical_handshake() {
        let h: Handshake = serde_json::from_str(r#"{"type":"physical"}"#).unwrap();
        assert_eq!(h.kind, DeviceKind::Physical);
    }

    #[test]
    fn parses_multi_node_handshake() {
        let h: Handshake =
            serde_json::from_str(r#"{"device_name":"D","num_nodes":3,"num_hints":2}"#).unwrap();
        assert_eq!(h.num_nodes, 3);
        assert_eq!(h.num_hints, Some(2));
    }
}
