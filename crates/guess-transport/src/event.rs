use tokio::sync::oneshot;

use crate::{Destination, NodeId, View};

/// A message delivered to a member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub from: NodeId,
    pub to: Destination,
    pub payload: Vec<u8>,
}

/// Everything the transport pushes to a member, in delivery order.
#[derive(Debug)]
pub enum TransportEvent {
    /// The membership changed. Carries the complete new view.
    ViewChanged(View),
    /// A broadcast or unicast message from another member.
    Message(Delivery),
    /// A joining member wants a snapshot of our shared state.
    ///
    /// Dropping `reply` without answering makes the joiner start from defaults.
    SnapshotRequested { reply: oneshot::Sender<Vec<u8>> },
    /// Snapshot received at join time, delivered before the first view.
    SnapshotReceived(Vec<u8>),
}
