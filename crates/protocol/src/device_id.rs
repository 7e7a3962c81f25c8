use serde::{Deserialize, Serialize};

/// The two device classes the dispatcher distinguishes, per §3/§4.4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    #[default]
    Logical,
    Physical,
}

/// Builds the device-id per §3: `"<peer-ip>:<device_name>"` for logical
/// devices, `"<peer-ip>"` for physical ones.
pub fn build_device_id(peer_ip: &str, kind: DeviceKind, device_name: Option<&str>) -> String {
    match kind {
        DeviceKind::Physical => peer_ip.to_owned(),
        DeviceKind::Logical => format!("{peer_ip}:{}", device_name.unwrap_or_default()),
    }
}

/// Builds the id of the `i`th (1-indexed) sub-device of a multi-node
/// logical device, per §3.
pub fn sub_device_id(device_id: &str, i: u32) -> String {
    format!("{device_id}_{i}")
}
