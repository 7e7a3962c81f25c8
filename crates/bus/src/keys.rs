//! Bus key names, gathered in one place so a typo in a key string is a
//! compile error instead of a silent no-op GET.

/// Global server pause/resume flag, polled by the Acceptor (§4.1/§4.8).
pub const SERVER_STATUS: &str = "tcp_server:status";

/// Mirror of every connected logical (sub-)device, keyed by sub-device id
/// (§4.2/§4.6).
pub const CONNECTED_DEVICES: &str = "connected_devices";

/// Mirror of every connected physical device, keyed by device id (§4.2/§4.6).
pub const CONNECTED_PHYSICAL_DEVICES: &str = "connected_physical_devices";

pub fn commands_key(device_id: &str) -> String {
    format!("{device_id}:commands")
}

pub fn status_key(device_id: &str) -> String {
    format!("{device_id}:status")
}

pub fn current_config_key(device_id: &str) -> String {
    format!("{device_id}:current_config")
}

pub fn disconnect_key(device_id: &str) -> String {
    format!("{device_id}:disconnect")
}

pub fn physical_command_key(device_id: &str) -> String {
    format!("{device_id}:physical_command")
}

pub fn physical_response_key(device_id: &str) -> String {
    format!("{device_id}:physical_response")
}
