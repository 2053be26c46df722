use crate::NodeId;

/// Errors returned by the group transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("member is disconnected")]
    Disconnected,

    #[error("unknown member: {0}")]
    UnknownMember(NodeId),

    #[error("identity already in use: {0}")]
    DuplicateIdentity(NodeId),

    #[error("invalid node id: {0:?}")]
    InvalidNodeId(String),

    #[error("state transfer failed: {0}")]
    StateTransfer(String),

    #[error("delivery channel closed for {0}")]
    ChannelClosed(NodeId),
}
