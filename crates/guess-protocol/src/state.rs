/// Replicated game state.
///
/// Every member holds a copy. Whoever mutates it last broadcasts it; a
/// joining member receives it wholesale through state transfer. The secret
/// number has no field here, so it can never leave the master's process.
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::GameError;
use crate::types::{GameStatus, NodeId};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedState {
    /// Member that picks the master. Elected from the first view.
    pub leader_name: Option<NodeId>,
    /// Member that thinks of the number this round.
    pub master_name: Option<NodeId>,
    pub status: GameStatus,
    /// Members that declared readiness. Only meaningful in `ChoosingMaster`.
    pub ready_players: BTreeSet<NodeId>,
    pub range_low: Option<i64>,
    pub range_high: Option<i64>,
    /// Reference member of the last view seen by whoever wrote this state.
    pub last_view_member_id: Option<NodeId>,
    /// Bumped on every return to `ChoosingMaster`.
    #[serde(default)]
    pub round: u64,
}

impl SharedState {
    /// Serialize for state transfer (MessagePack, named fields).
    pub fn to_snapshot(&self) -> Result<Vec<u8>, GameError> {
        rmp_serde::to_vec_named(self).map_err(Into::into)
    }

    /// Deserialize a state transfer snapshot.
    pub fn from_snapshot(data: &[u8]) -> Result<Self, GameError> {
        rmp_serde::from_slice(data).map_err(Into::into)
    }

    pub fn is_leader(&self, node_id: &NodeId) -> bool {
        self.leader_name.as_ref() == Some(node_id)
    }

    pub fn is_master(&self, node_id: &NodeId) -> bool {
        self.master_name.as_ref() == Some(node_id)
    }

    /// The announced guessing range, once the master has set it.
    pub fn range(&self) -> Option<(i64, i64)> {
        Some((self.range_low?, self.range_high?))
    }

    /// Reset to `ChoosingMaster` for the next round.
    ///
    /// Clears readiness, the master and the range; keeps the leader.
    pub fn reset_round(&mut self) {
        self.status = GameStatus::ChoosingMaster;
        self.ready_players.clear();
        self.master_name = None;
        self.range_low = None;
        self.range_high = None;
        self.round += 1;
    }

    /// True if `other` is at least as far along as this state.
    ///
    /// A newer round always wins; within a round the status may not move
    /// backwards.
    pub fn is_superseded_by(&self, other: &SharedState) -> bool {
        other.round > self.round || (other.round == self.round && other.status >= self.status)
    }
}
