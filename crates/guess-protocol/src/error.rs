/// Game-level errors.
///
/// Wraps transport errors and adds the failure kinds the coordinator
/// absorbs locally (bad snapshots, closed input, stopped runtime).
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("transport error: {0}")]
    Transport(#[from] guess_transport::TransportError),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("input closed: {0}")]
    InputClosed(String),

    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("game runtime stopped")]
    RuntimeStopped,
}

impl From<rmp_serde::encode::Error> for GameError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        GameError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for GameError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        GameError::Deserialization(e.to_string())
    }
}
