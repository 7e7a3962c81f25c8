use serde::{Deserialize, Serialize};

/// The enumerated management actions a physical device accepts, per §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhysicalAction {
    GetMetrics,
    ListDevices,
    RestartDevice,
    StopDevice,
    StartDevice,
    RestartPi,
}

/// A direct command sent to a physical device over its Direct-Command slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhysicalCommand {
    pub action: PhysicalAction,
    #[serde(default)]
    pub params: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhysicalStatus {
    Success,
    Failed,
}

/// A physical device's reply to a direct command, per §3.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhysicalAck {
    pub status: PhysicalStatus,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl PhysicalAck {
    /// Builds the synthetic failure ack written to the response slot on
    /// timeout or I/O error (§4.4/§7).
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: PhysicalStatus::Failed,
            message: message.into(),
            data: serde_json::Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_get_metrics_command() {
        let cmd = PhysicalCommand {
            action: PhysicalAction::GetMetrics,
            params: serde_json::json!({}),
        };
        let json = serde_json::to_string(&cmd).unwrap();
        assert_eq!(json, r#"{"action":"get_metrics","params":{}}"#);
    }

    #[test]
    fn failed_ack_has_null_data() {
        let ack = PhysicalAck::failed("timed out");
        assert_eq!(ack.status, PhysicalStatus::Failed);
        assert_eq!(ack.message, "timed out");
        assert!(ack.data.is_null());
    }
}
