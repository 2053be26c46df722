//! Guessing game coordination layer.
//!
//! Implements leader election, master selection, the round state machine
//! and state transfer on top of `guess-transport`.
//!
//! Wire format: MessagePack (compact binary).
//! Roles: one leader per view (smallest identity), one master per round
//! (seeded choice among all members).

pub mod coordinator;
pub mod election;
pub mod error;
pub mod message;
pub mod runtime;
pub mod state;
pub mod types;

pub use coordinator::{GameConfig, GameCoordinator};
pub use election::{choose_master, elect_leader, ElectionReason, LeaderElection};
pub use error::GameError;
pub use message::GameMessage;
pub use runtime::input::run_console;
pub use runtime::{
    GameChannels, GameEffect, GameEvent, GameHandle, GameRuntime, Intent, Prompt, RuntimeConfig,
    WaitReason,
};
pub use state::SharedState;
pub use types::{Destination, GameStatus, NodeId, View, DEFAULT_REQUIRED_PLAYERS};
