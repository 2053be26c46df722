//! Group transport layer for the guessing game.
//!
//! Defines the contract the game core consumes from a group-communication
//! substrate: membership views, reliable point-to-point and broadcast
//! delivery, and state transfer for late joiners. Ships [`LocalGroup`], an
//! in-process implementation of that contract.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use guess_transport::{Destination, GroupTransport, LocalGroup, NodeId, TransportEvent};
//!
//! # async fn example() -> Result<(), guess_transport::TransportError> {
//! let group = LocalGroup::new("demo");
//! let (alice, mut events) = group.connect("alice".parse()?).await?;
//!
//! alice.send(Destination::Broadcast, b"hello".to_vec()).await?;
//!
//! while let Some(event) = events.recv().await {
//!     if let TransportEvent::ViewChanged(view) = event {
//!         println!("members: {:?}", view.members);
//!     }
//! }
//! alice.disconnect().await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod event;
mod local;
mod transport;
mod view;

pub use config::GroupConfig;
pub use error::TransportError;
pub use event::{Delivery, TransportEvent};
pub use local::{LocalGroup, LocalMember};
pub use transport::GroupTransport;
pub use view::View;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identity of a group member.
///
/// Members are named, not keyed: the name chosen at connect time is the
/// identity for the whole session. Ordered lexicographically so every node
/// breaks ties the same way.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeId(String);

impl NodeId {
    /// Create an identity, rejecting empty or blank names.
    pub fn new(name: impl Into<String>) -> Result<Self, TransportError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(TransportError::InvalidNodeId(name));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl FromStr for NodeId {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.trim())
    }
}

impl TryFrom<String> for NodeId {
    type Error = TransportError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<NodeId> for String {
    fn from(id: NodeId) -> Self {
        id.0
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Where a message is addressed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Destination {
    /// Every member of the current view except the sender.
    Broadcast,
    /// A single member.
    Member(NodeId),
}

impl Destination {
    /// True if a message with this destination is meant for `id`.
    pub fn includes(&self, id: &NodeId) -> bool {
        match self {
            Destination::Broadcast => true,
            Destination::Member(target) => target == id,
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Broadcast => f.write_str("all"),
            Destination::Member(id) => write!(f, "{id}"),
        }
    }
}
