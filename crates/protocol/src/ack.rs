use serde::Deserialize;

/// A logical device's acknowledgment of one dispatched command, per §3.
#[derive(Debug, Clone, Deserialize)]
pub struct LogicalAck {
    pub status: LogicalAckStatus,
    #[serde(default)]
    pub node_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalAckStatus {
    Success,
    Error,
    Failed,
}

impl LogicalAckStatus {
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}
