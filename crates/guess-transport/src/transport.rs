use crate::{Destination, NodeId, TransportError, View};

/// Abstraction over the group-communication substrate.
///
/// In production: any reliable group layer delivering views and messages.
/// In this workspace: [`LocalMember`](crate::LocalMember). In tests: mocks
/// that record sends.
///
/// Inbound traffic (views, messages, snapshot requests) is not pulled through
/// this trait; it arrives on the `TransportEvent` receiver handed out at
/// connect time.
#[async_trait::async_trait]
pub trait GroupTransport: Send + Sync {
    /// This member's identity.
    fn local_id(&self) -> &NodeId;

    /// The most recently installed view.
    fn view(&self) -> View;

    /// Send a payload to one member or to everyone else.
    async fn send(&self, to: Destination, payload: Vec<u8>) -> Result<(), TransportError>;

    /// Leave the group. Later sends fail with `Disconnected`.
    async fn disconnect(&self) -> Result<(), TransportError>;
}
