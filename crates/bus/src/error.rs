/// Everything that can go wrong talking to the Shared Bus.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("bus connection error: {0}")]
    Connection(#[from] redis::RedisError),

    #[error("failed to (de)serialize a bus value: {0}")]
    Json(#[from] serde_json::Error),
}
