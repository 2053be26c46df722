use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::GameError;
use crate::state::SharedState;
use crate::types::NodeId;

/// Everything one member says to another.
///
/// Wire format: MessagePack. `Display` gives the text shown to players.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameMessage {
    /// Sender is ready for the given round (sent to the leader by broadcast).
    Ready { round: u64 },
    /// Full replicated state after a mutation by the leader or master.
    StateSync(SharedState),
    /// The master started thinking of a number.
    MasterThinking { master: NodeId },
    /// A guess, unicast to the master.
    Guess { round: u64, number: i64 },
    /// Someone guessed the secret.
    Winner { player: NodeId, number: i64 },
    /// The round is over; a new master will be chosen.
    RoundEnded { round: u64 },
}

impl GameMessage {
    pub fn to_bytes(&self) -> Result<Vec<u8>, GameError> {
        rmp_serde::to_vec(self).map_err(Into::into)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, GameError> {
        rmp_serde::from_slice(data).map_err(Into::into)
    }

    /// Short tag for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            GameMessage::Ready { .. } => "ready",
            GameMessage::StateSync(_) => "state-sync",
            GameMessage::MasterThinking { .. } => "master-thinking",
            GameMessage::Guess { .. } => "guess",
            GameMessage::Winner { .. } => "winner",
            GameMessage::RoundEnded { .. } => "round-ended",
        }
    }
}

impl fmt::Display for GameMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameMessage::Ready { .. } => f.write_str("READY"),
            GameMessage::StateSync(state) => write!(f, "State {}", state.status),
            GameMessage::MasterThinking { .. } => f.write_str("Master is thinking of a number"),
            GameMessage::Guess { number, .. } => write!(f, "{number}"),
            GameMessage::Winner { player, number } => {
                write!(f, "The winner is {player}. And the number was {number}")
            }
            GameMessage::RoundEnded { .. } => f.write_str("Round has ended!"),
        }
    }
}
