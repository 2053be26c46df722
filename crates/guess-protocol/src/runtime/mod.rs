/// Game runtime: drives a `GameCoordinator` from a live transport.
///
/// The runtime owns the coordinator and a `GroupTransport`. It exposes a
/// channel-based API so the front end (console, bot, test) never touches
/// bytes or coordinator internals: prompts go out, intents come back.
mod effect;
mod executor;
pub mod input;
mod r#loop;

use std::fmt;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use guess_transport::{GroupTransport, TransportEvent};

use crate::coordinator::GameConfig;
use crate::election::ElectionReason;
use crate::error::GameError;
use crate::types::{Destination, GameStatus, NodeId};

pub use effect::GameEffect;

// ── Configuration ─────────────────────────────────────────────────────

/// Configuration for the game runtime.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Round rules.
    pub game: GameConfig,
    /// Interval for the round-start scheduling check.
    pub tick_interval: Duration,
    /// Capacity of the prompt, intent and event channels.
    pub channel_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            game: GameConfig::default(),
            tick_interval: Duration::from_millis(500),
            channel_capacity: 64,
        }
    }
}

// ── Intents (front end → runtime) ─────────────────────────────────────

/// Decisions made by the local player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Ready to start a round.
    Ready,
    /// The master's secret number and the range announced to everyone.
    Puzzle { secret: i64, low: i64, high: i64 },
    /// A guess at the master's number.
    Guess(i64),
    /// Leave the game.
    Quit,
    /// The input stream ended or failed.
    InputClosed { reason: String },
}

// ── Prompts (runtime → front end) ─────────────────────────────────────

/// What the local player should be asked next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    Ready,
    /// Secret number, then lowest, then highest.
    Puzzle,
    Guess { low: i64, high: i64 },
    Wait(WaitReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitReason {
    /// No view received yet.
    Connecting,
    /// We are ready; others aren't yet.
    OtherPlayers,
    RoundStarting,
    MasterThinking,
    /// We are the master; guesses are being judged.
    JudgingGuesses,
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prompt::Ready => f.write_str("Print READY to start a game"),
            Prompt::Puzzle => f.write_str("Think of a number"),
            Prompt::Guess { low, high } => {
                write!(f, "Guess Your Number! The range is {low} - {high}")
            }
            Prompt::Wait(reason) => write!(f, "{reason}"),
        }
    }
}

impl fmt::Display for WaitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WaitReason::Connecting => "Connecting to the group...",
            WaitReason::OtherPlayers => "Waiting for the other players to get ready...",
            WaitReason::RoundStarting => "Round is starting...",
            WaitReason::MasterThinking => "Master is thinking of a number...",
            WaitReason::JudgingGuesses => "Players are guessing your number...",
        };
        f.write_str(s)
    }
}

// ── Events (runtime → front end) ──────────────────────────────────────

/// Game-level events the front end may want to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    /// First view; the leader was elected from it.
    InitialView {
        members: Vec<NodeId>,
        leader: Option<NodeId>,
    },
    /// Membership changed.
    ViewChanged {
        members: Vec<NodeId>,
        joined: Vec<NodeId>,
        left: Vec<NodeId>,
    },
    /// A new leader took over after the previous one left.
    LeaderElected {
        leader: NodeId,
        reason: ElectionReason,
    },
    /// The leader picked this round's master.
    MasterChosen { master: NodeId },
    RoundStarted { round: u64, master: NodeId },
    MasterThinking { master: NodeId },
    Playing { low: i64, high: i64 },
    /// Our guess went out to the master.
    GuessSent { number: i64, master: NodeId },
    /// (Master only) a guess missed.
    WrongGuess { player: NodeId, number: i64 },
    Winner { player: NodeId, number: i64 },
    RoundEnded { round: u64 },
    /// The round was abandoned (e.g. the master left).
    RoundAborted { round: u64, reason: String },
    /// Local input that doesn't fit the current state.
    InputRejected { reason: String },
    /// Inbound traffic that was observed but not acted on.
    Ignored { from: NodeId, reason: String },
    SnapshotImported { status: GameStatus, round: u64 },
    /// State transfer failed; running on defaults until the next sync.
    SnapshotRejected { reason: String },
    SendFailed { to: Destination, reason: String },
    /// The local loop ended.
    Stopped { reason: String },
}

impl fmt::Display for GameEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameEvent::InitialView { members, leader } => {
                write!(f, "Received initial view: {}", join(members))?;
                if let Some(leader) = leader {
                    write!(f, " (leader: {leader})")?;
                }
                Ok(())
            }
            GameEvent::ViewChanged { members, joined, left } => write!(
                f,
                "Received new view: {}. New members: [{}]. Exited members: [{}]",
                join(members),
                join(joined),
                join(left)
            ),
            GameEvent::LeaderElected { leader, .. } => write!(f, "{leader} is now the leader"),
            GameEvent::MasterChosen { master } => write!(f, "{master} will be the master"),
            GameEvent::RoundStarted { round, master } => {
                write!(f, "Round {round} started, master is {master}")
            }
            GameEvent::MasterThinking { master } => {
                write!(f, "{master}: Master is thinking of a number")
            }
            GameEvent::Playing { low, high } => write!(f, "The range is {low} - {high}"),
            GameEvent::GuessSent { number, master } => write!(f, "Sending {number} to {master}"),
            GameEvent::WrongGuess { player, number } => write!(f, "{player} guessed {number}"),
            GameEvent::Winner { player, number } => {
                write!(f, "The winner is {player}. And the number was {number}")
            }
            GameEvent::RoundEnded { .. } => f.write_str("Round has ended!"),
            GameEvent::RoundAborted { round, reason } => {
                write!(f, "Round {round} aborted: {reason}")
            }
            GameEvent::InputRejected { reason } => write!(f, "Input rejected: {reason}"),
            GameEvent::Ignored { from, reason } => write!(f, "Ignored message from {from}: {reason}"),
            GameEvent::SnapshotImported { status, round } => {
                write!(f, "Joined game in state {status} (round {round})")
            }
            GameEvent::SnapshotRejected { reason } => {
                write!(f, "Error deserializing state: {reason}")
            }
            GameEvent::SendFailed { to, reason } => {
                write!(f, "Exception sending message to {to}: {reason}")
            }
            GameEvent::Stopped { reason } => write!(f, "Exiting ({reason})."),
        }
    }
}

fn join(ids: &[NodeId]) -> String {
    ids.iter()
        .map(NodeId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

// ── GameHandle (front-end API) ────────────────────────────────────────

/// Handle to feed local decisions into a running game.
///
/// Cheap to clone. All methods are channel sends.
#[derive(Clone)]
pub struct GameHandle {
    intent_tx: mpsc::Sender<Intent>,
    local_id: NodeId,
}

impl GameHandle {
    /// This node's identity.
    pub fn local_id(&self) -> &NodeId {
        &self.local_id
    }

    pub async fn submit(&self, intent: Intent) -> Result<(), GameError> {
        self.intent_tx
            .send(intent)
            .await
            .map_err(|_| GameError::RuntimeStopped)
    }

    pub async fn ready(&self) -> Result<(), GameError> {
        self.submit(Intent::Ready).await
    }

    pub async fn puzzle(&self, secret: i64, low: i64, high: i64) -> Result<(), GameError> {
        self.submit(Intent::Puzzle { secret, low, high }).await
    }

    pub async fn guess(&self, number: i64) -> Result<(), GameError> {
        self.submit(Intent::Guess(number)).await
    }

    pub async fn quit(&self) -> Result<(), GameError> {
        self.submit(Intent::Quit).await
    }

    pub async fn input_closed(&self, reason: impl Into<String>) -> Result<(), GameError> {
        self.submit(Intent::InputClosed {
            reason: reason.into(),
        })
        .await
    }
}

// ── GameChannels ──────────────────────────────────────────────────────

/// Channels returned to the front end when the runtime starts.
pub struct GameChannels {
    /// Handle to send intents to the runtime.
    pub handle: GameHandle,
    /// What to ask the local player next.
    pub prompts: mpsc::Receiver<Prompt>,
    /// Game events to display.
    pub events: mpsc::Receiver<GameEvent>,
    /// Resolves once the loop has stopped and left the group.
    pub task: JoinHandle<()>,
}

// ── GameRuntime ───────────────────────────────────────────────────────

/// The game runtime: spawn it and communicate via channels.
pub struct GameRuntime;

impl GameRuntime {
    /// Start the event loop for one member.
    ///
    /// Takes ownership of the transport and its event receiver. Spawns the
    /// loop as a tokio task.
    pub fn spawn<T>(
        transport: T,
        transport_events: mpsc::Receiver<TransportEvent>,
        config: RuntimeConfig,
    ) -> GameChannels
    where
        T: GroupTransport + 'static,
    {
        let local_id = transport.local_id().clone();
        let capacity = config.channel_capacity.max(1);

        let (intent_tx, intent_rx) = mpsc::channel::<Intent>(capacity);
        let (prompt_tx, prompt_rx) = mpsc::channel::<Prompt>(capacity);
        let (event_tx, event_rx) = mpsc::channel::<GameEvent>(capacity);

        let task = tokio::spawn(r#loop::game_loop(
            transport,
            config,
            transport_events,
            intent_rx,
            prompt_tx,
            event_tx,
        ));

        GameChannels {
            handle: GameHandle { intent_tx, local_id },
            prompts: prompt_rx,
            events: event_rx,
            task,
        }
    }
}
