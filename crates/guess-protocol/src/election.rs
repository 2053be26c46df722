/// Deterministic leader election and master selection.
///
/// Every member runs the same functions over the same view and arrives at
/// the same answer, so no negotiation messages are needed and two nodes can
/// never disagree about who leads.
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};

use crate::types::{NodeId, View};

/// Result of a leader election.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderElection {
    /// The elected leader (None if the view was empty).
    pub leader: Option<NodeId>,
    /// Why the election ran.
    pub reason: ElectionReason,
    /// How many members were considered.
    pub candidate_count: usize,
}

/// Why a leader election ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElectionReason {
    /// First view observed with no leader on record.
    InitialView,
    /// The recorded leader is no longer in the view.
    LeaderLeft,
    /// Empty view.
    NoCandidates,
}

/// Elect the leader for `view`: the lexicographically smallest identity.
///
/// Arrival order of views and join order inside the view don't matter.
pub fn elect_leader(view: &View, reason: ElectionReason) -> LeaderElection {
    let Some(leader) = view.members.iter().min().cloned() else {
        return LeaderElection {
            leader: None,
            reason: ElectionReason::NoCandidates,
            candidate_count: 0,
        };
    };

    LeaderElection {
        leader: Some(leader),
        reason,
        candidate_count: view.len(),
    }
}

/// Pick this round's master uniformly among `members`.
///
/// The leader is a candidate like everyone else. The choice is a pure
/// function of (seed, round, member set): members are sorted, hashed with
/// SHA-256 together with the seed and round, and the digest seeds a
/// `StdRng`.
pub fn choose_master(members: &[NodeId], round: u64, seed: u64) -> Option<NodeId> {
    if members.is_empty() {
        return None;
    }

    let mut sorted: Vec<&NodeId> = members.iter().collect();
    sorted.sort();
    sorted.dedup();

    let mut rng = StdRng::seed_from_u64(selection_seed(&sorted, round, seed));
    let index = rng.random_range(0..sorted.len());
    Some(sorted[index].clone())
}

fn selection_seed(sorted: &[&NodeId], round: u64, seed: u64) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(seed.to_be_bytes());
    hasher.update(round.to_be_bytes());
    for member in sorted {
        hasher.update(member.as_str().as_bytes());
        hasher.update([0u8]);
    }
    let digest = hasher.finalize();

    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(head)
}
