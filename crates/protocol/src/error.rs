/// Errors raised while parsing or serializing wire messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("message was not a JSON object")]
    NotAnObject,
    #[error("message exceeds the {0}-byte frame limit")]
    FrameTooLarge(usize),
}
