use crate::message::GameMessage;
use crate::types::NodeId;

use super::GameEvent;

/// Intent produced by the pure `GameCoordinator` logic.
///
/// Every `handle_*` / `tick` method returns `Vec<GameEffect>`; the event
/// loop then carries them out through the transport and channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEffect {
    /// Send to every other member.
    Broadcast(GameMessage),

    /// Send to one member.
    SendTo { target: NodeId, message: GameMessage },

    /// Surface an event to the front end.
    Emit(GameEvent),
}
