use serde::{Deserialize, Serialize};

use crate::NodeId;

/// A membership view: the members connected at one point in time, in join order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct View {
    /// Monotonic view number, bumped on every membership change.
    pub id: u64,
    pub members: Vec<NodeId>,
}

impl View {
    pub fn new(id: u64, members: Vec<NodeId>) -> Self {
        Self { id, members }
    }

    pub fn contains(&self, node_id: &NodeId) -> bool {
        self.members.contains(node_id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Oldest member of the view (the reference member).
    pub fn first(&self) -> Option<&NodeId> {
        self.members.first()
    }

    /// Members present in `next` but not in `prev`.
    pub fn new_members(prev: &View, next: &View) -> Vec<NodeId> {
        next.members
            .iter()
            .filter(|m| !prev.contains(m))
            .cloned()
            .collect()
    }

    /// Members present in `prev` but gone from `next`.
    pub fn left_members(prev: &View, next: &View) -> Vec<NodeId> {
        prev.members
            .iter()
            .filter(|m| !next.contains(m))
            .cloned()
            .collect()
    }
}
