use std::fmt;

use serde::{Deserialize, Serialize};

pub use guess_transport::{Destination, NodeId, View};

/// Players that must be present for a round to start, unless configured otherwise.
pub const DEFAULT_REQUIRED_PLAYERS: usize = 2;

/// Round status.
///
/// Strict cycle: ChoosingMaster -> RoundStarted -> Thinking -> Playing ->
/// ChoosingMaster. Ordered by position in the cycle.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum GameStatus {
    /// Collecting ready players; the leader picks a master.
    #[default]
    ChoosingMaster,
    /// Everyone is ready; waiting for the master to take over.
    RoundStarted,
    /// The master is choosing a secret number and a range.
    Thinking,
    /// Players are guessing.
    Playing,
}

impl GameStatus {
    /// Successor in the round cycle.
    pub fn next(self) -> Self {
        match self {
            GameStatus::ChoosingMaster => GameStatus::RoundStarted,
            GameStatus::RoundStarted => GameStatus::Thinking,
            GameStatus::Thinking => GameStatus::Playing,
            GameStatus::Playing => GameStatus::ChoosingMaster,
        }
    }

    /// A move to the successor, or a reset back to `ChoosingMaster`.
    pub fn is_valid_transition(self, to: GameStatus) -> bool {
        to == self.next() || (to == GameStatus::ChoosingMaster && self != to)
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GameStatus::ChoosingMaster => "CHOOSING_MASTER",
            GameStatus::RoundStarted => "ROUND_STARTED",
            GameStatus::Thinking => "THINKING",
            GameStatus::Playing => "PLAYING",
        };
        f.write_str(s)
    }
}
