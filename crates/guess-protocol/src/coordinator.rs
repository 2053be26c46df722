/// GameCoordinator: the round state machine.
///
/// Pure decision engine: no I/O, no async. Views, messages, local intents
/// and scheduling ticks go in; `Vec<GameEffect>` comes out for the runtime
/// to execute.
///
/// Roles:
/// - the leader (elected from the first view) collects readiness, picks the
///   master and starts rounds;
/// - the master thinks of the secret, announces the range and judges
///   guesses. Only the master ever holds the secret.
use guess_transport::{Delivery, TransportError};

use crate::election::{choose_master, elect_leader, ElectionReason};
use crate::error::GameError;
use crate::message::GameMessage;
use crate::runtime::{GameEffect, GameEvent, Intent, Prompt, WaitReason};
use crate::state::SharedState;
use crate::types::{Destination, GameStatus, NodeId, View, DEFAULT_REQUIRED_PLAYERS};

/// Round rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameConfig {
    /// Members needed before the leader starts a round.
    pub required_players: usize,
    /// Treat `required_players` as a minimum instead of an exact count.
    pub allow_extra_players: bool,
    /// Mixed into master selection. Same seed, same view, same round: same master.
    pub master_seed: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            required_players: DEFAULT_REQUIRED_PLAYERS,
            allow_extra_players: false,
            master_seed: 0,
        }
    }
}

impl GameConfig {
    /// Whether a view of `members` members may play a round.
    pub fn player_count_met(&self, members: usize) -> bool {
        let required = self.required_players.max(1);
        if self.allow_extra_players {
            members >= required
        } else {
            members == required
        }
    }
}

pub struct GameCoordinator {
    local_id: NodeId,
    config: GameConfig,
    shared: SharedState,
    /// Last view observed (local only).
    view: Option<View>,
    /// Known only while we are the master, between Thinking and round end.
    secret: Option<i64>,
    /// Round in which we declared readiness.
    ready_round: Option<u64>,
    /// Set once the local loop should end.
    stop_reason: Option<String>,
}

impl GameCoordinator {
    pub fn new(local_id: NodeId, config: GameConfig) -> Self {
        Self {
            local_id,
            config,
            shared: SharedState::default(),
            view: None,
            secret: None,
            ready_round: None,
            stop_reason: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────────

    pub fn local_id(&self) -> &NodeId {
        &self.local_id
    }

    pub fn shared(&self) -> &SharedState {
        &self.shared
    }

    pub fn view(&self) -> Option<&View> {
        self.view.as_ref()
    }

    /// The secret number, if we are the master and have chosen it.
    pub fn secret(&self) -> Option<i64> {
        self.secret
    }

    pub fn is_running(&self) -> bool {
        self.stop_reason.is_none()
    }

    pub fn stop_reason(&self) -> Option<&str> {
        self.stop_reason.as_deref()
    }

    pub fn is_leader(&self) -> bool {
        self.shared.is_leader(&self.local_id)
    }

    pub fn is_master(&self) -> bool {
        self.shared.is_master(&self.local_id)
    }

    /// What the local player should be asked right now.
    ///
    /// None once the coordinator has stopped.
    pub fn next_prompt(&self) -> Option<Prompt> {
        if !self.is_running() {
            return None;
        }
        if self.view.is_none() {
            return Some(Prompt::Wait(WaitReason::Connecting));
        }

        let prompt = match self.shared.status {
            GameStatus::ChoosingMaster => {
                if self.has_declared_ready() {
                    Prompt::Wait(WaitReason::OtherPlayers)
                } else {
                    Prompt::Ready
                }
            }
            GameStatus::RoundStarted => Prompt::Wait(WaitReason::RoundStarting),
            GameStatus::Thinking => {
                if self.is_master() && self.secret.is_none() {
                    Prompt::Puzzle
                } else {
                    Prompt::Wait(WaitReason::MasterThinking)
                }
            }
            GameStatus::Playing => {
                if self.is_master() {
                    Prompt::Wait(WaitReason::JudgingGuesses)
                } else {
                    match self.shared.range() {
                        Some((low, high)) => Prompt::Guess { low, high },
                        None => Prompt::Wait(WaitReason::MasterThinking),
                    }
                }
            }
        };
        Some(prompt)
    }

    // ── Membership views ─────────────────────────────────────────────────

    /// Handle a new membership view.
    ///
    /// The first view elects the leader if none is on record (a snapshot
    /// may already have brought one). Later views are diffed for display,
    /// trigger failover when the leader left, and abort the round when the
    /// master left.
    pub fn handle_view(&mut self, view: View) -> Vec<GameEffect> {
        let mut effects = Vec::new();
        let previous = self.view.replace(view.clone());

        if self.shared.leader_name.is_none() {
            let election = elect_leader(&view, ElectionReason::InitialView);
            self.shared.leader_name = election.leader.clone();
            self.shared.status = GameStatus::ChoosingMaster;
            tracing::info!(
                local = %self.local_id,
                view = view.id,
                leader = ?election.leader,
                candidates = election.candidate_count,
                "initial view"
            );
            effects.push(GameEffect::Emit(GameEvent::InitialView {
                members: view.members.clone(),
                leader: election.leader,
            }));
        } else {
            let previous = previous.unwrap_or_default();
            let joined = View::new_members(&previous, &view);
            let left = View::left_members(&previous, &view);
            tracing::info!(
                local = %self.local_id,
                view = view.id,
                joined = joined.len(),
                left = left.len(),
                "view changed"
            );
            effects.push(GameEffect::Emit(GameEvent::ViewChanged {
                members: view.members.clone(),
                joined,
                left,
            }));

            let leader_present = self
                .shared
                .leader_name
                .as_ref()
                .is_some_and(|leader| view.contains(leader));
            if !leader_present {
                let election = elect_leader(&view, ElectionReason::LeaderLeft);
                self.shared.leader_name = election.leader.clone();
                if let Some(leader) = election.leader {
                    tracing::info!(
                        local = %self.local_id,
                        leader = %leader,
                        candidates = election.candidate_count,
                        "leader failover"
                    );
                    effects.push(GameEffect::Emit(GameEvent::LeaderElected {
                        leader,
                        reason: election.reason,
                    }));
                }
            }
        }

        self.shared.last_view_member_id = view.first().cloned();
        self.shared.ready_players.retain(|p| view.contains(p));

        let master_gone = self
            .shared
            .master_name
            .as_ref()
            .is_some_and(|master| !view.contains(master));
        if master_gone {
            if self.shared.status == GameStatus::ChoosingMaster {
                self.shared.master_name = None;
            } else {
                effects.extend(self.abort_round("the master left the game"));
            }
        }

        effects.extend(self.try_start_round());
        effects
    }

    // ── Inbound messages ─────────────────────────────────────────────────

    /// Handle a message delivered by the transport.
    ///
    /// Messages for someone else, undecodable payloads and messages that
    /// don't fit the current state are observed and dropped.
    pub fn handle_message(&mut self, delivery: Delivery) -> Vec<GameEffect> {
        if !self.is_running() {
            return Vec::new();
        }
        let Delivery { from, to, payload } = delivery;

        if !to.includes(&self.local_id) {
            return self.ignore(from, format!("addressed to {to}"));
        }

        let message = match GameMessage::from_bytes(&payload) {
            Ok(m) => m,
            Err(e) => return self.ignore(from, format!("undecodable payload: {e}")),
        };

        tracing::debug!(
            local = %self.local_id,
            from = %from,
            to = %to,
            kind = message.kind(),
            "Message received from: {from} to: {to} -> {message}"
        );

        match message {
            GameMessage::Ready { round } => self.handle_ready(from, round),
            GameMessage::StateSync(state) => self.handle_state_sync(from, state),
            GameMessage::Guess { round, number } => self.handle_guess(from, to, round, number),
            GameMessage::MasterThinking { master } => {
                vec![GameEffect::Emit(GameEvent::MasterThinking { master })]
            }
            GameMessage::Winner { player, number } => {
                vec![GameEffect::Emit(GameEvent::Winner { player, number })]
            }
            GameMessage::RoundEnded { round } => {
                vec![GameEffect::Emit(GameEvent::RoundEnded { round })]
            }
        }
    }

    fn handle_ready(&mut self, from: NodeId, round: u64) -> Vec<GameEffect> {
        let is_member = self.view.as_ref().is_some_and(|v| v.contains(&from));
        if !is_member {
            return self.ignore(from, "readiness from a non-member".into());
        }
        if self.shared.status != GameStatus::ChoosingMaster || round != self.shared.round {
            return self.ignore(from, format!("stale readiness for round {round}"));
        }

        self.shared.ready_players.insert(from);

        let mut effects = Vec::new();
        if self.is_leader() {
            effects.push(self.sync_effect());
        }
        effects.extend(self.try_start_round());
        effects
    }

    fn handle_state_sync(&mut self, from: NodeId, state: SharedState) -> Vec<GameEffect> {
        if !self.shared.is_superseded_by(&state) {
            return self.ignore(
                from,
                format!(
                    "stale state {} (round {}) while at {} (round {})",
                    state.status, state.round, self.shared.status, self.shared.round
                ),
            );
        }

        let previous_status = self.shared.status;
        let previous_round = self.shared.round;
        let previous_leader = self.shared.leader_name.clone();

        self.shared = state;
        if self.shared.leader_name.is_none() {
            self.shared.leader_name = previous_leader;
        }
        if self.shared.round != previous_round {
            self.secret = None;
        }
        if let Some(view) = &self.view {
            self.shared.ready_players.retain(|p| view.contains(p));
        }
        // Our own readiness may not have reached the writer yet.
        if self.shared.status == GameStatus::ChoosingMaster && self.has_declared_ready() {
            self.shared.ready_players.insert(self.local_id.clone());
        }

        let mut effects = Vec::new();
        let status_changed =
            self.shared.status != previous_status || self.shared.round != previous_round;
        if status_changed {
            match (self.shared.status, self.shared.master_name.clone()) {
                (GameStatus::RoundStarted, Some(master)) => {
                    effects.push(GameEffect::Emit(GameEvent::RoundStarted {
                        round: self.shared.round,
                        master,
                    }));
                }
                (GameStatus::Playing, _) => {
                    if let Some((low, high)) = self.shared.range() {
                        effects.push(GameEffect::Emit(GameEvent::Playing { low, high }));
                    }
                }
                _ => {}
            }
        }

        effects.extend(self.advance_master());
        effects.extend(self.try_start_round());
        effects
    }

    fn handle_guess(
        &mut self,
        from: NodeId,
        to: Destination,
        round: u64,
        number: i64,
    ) -> Vec<GameEffect> {
        if to != Destination::Member(self.local_id.clone()) {
            return self.ignore(from, "guess was broadcast".into());
        }
        if self.shared.status != GameStatus::Playing || !self.is_master() {
            return self.ignore(from, "guess received while not judging".into());
        }
        if round != self.shared.round {
            return self.ignore(from, format!("guess for round {round}"));
        }
        let Some(secret) = self.secret else {
            return self.ignore(from, "no secret chosen".into());
        };

        if number == secret {
            self.end_round(from, number)
        } else {
            tracing::debug!(local = %self.local_id, player = %from, number, "wrong guess");
            vec![GameEffect::Emit(GameEvent::WrongGuess {
                player: from,
                number,
            })]
        }
    }

    // ── Local intents ────────────────────────────────────────────────────

    /// Handle a decision from the local player.
    pub fn handle_intent(&mut self, intent: Intent) -> Vec<GameEffect> {
        if !self.is_running() {
            return Vec::new();
        }
        match intent {
            Intent::Ready => self.declare_ready(),
            Intent::Puzzle { secret, low, high } => self.set_puzzle(secret, low, high),
            Intent::Guess(number) => self.send_guess(number),
            Intent::Quit => {
                self.stop("player quit");
                Vec::new()
            }
            Intent::InputClosed { reason } => {
                self.stop(format!("input closed: {reason}"));
                Vec::new()
            }
        }
    }

    fn declare_ready(&mut self) -> Vec<GameEffect> {
        if self.view.is_none() {
            return reject("not connected to the group yet");
        }
        if self.shared.status != GameStatus::ChoosingMaster {
            return reject("a round is already in progress");
        }

        self.shared.ready_players.insert(self.local_id.clone());
        self.ready_round = Some(self.shared.round);

        let mut effects = Vec::new();
        if self.is_leader() {
            if let Some(master) = self.pick_master() {
                tracing::info!(local = %self.local_id, master = %master, "master chosen");
                self.shared.master_name = Some(master.clone());
                effects.push(GameEffect::Emit(GameEvent::MasterChosen { master }));
            }
            effects.push(self.sync_effect());
        } else {
            effects.push(GameEffect::Broadcast(GameMessage::Ready {
                round: self.shared.round,
            }));
        }
        effects.extend(self.try_start_round());
        effects
    }

    fn set_puzzle(&mut self, secret: i64, low: i64, high: i64) -> Vec<GameEffect> {
        if self.shared.status != GameStatus::Thinking || !self.is_master() {
            return reject("only the master picks the number, while thinking");
        }
        if low > high {
            return reject("the lowest bound must not exceed the highest");
        }
        if secret < low || secret > high {
            return reject("the secret number must lie inside the range");
        }
        if !self.transition(GameStatus::Playing) {
            return Vec::new();
        }

        self.secret = Some(secret);
        self.shared.range_low = Some(low);
        self.shared.range_high = Some(high);
        tracing::info!(local = %self.local_id, low, high, "range announced");

        vec![
            GameEffect::Emit(GameEvent::Playing { low, high }),
            self.sync_effect(),
        ]
    }

    fn send_guess(&mut self, number: i64) -> Vec<GameEffect> {
        if self.shared.status != GameStatus::Playing {
            return reject("nobody is guessing right now");
        }
        if self.is_master() {
            return reject("the master can't guess");
        }
        let Some(master) = self.shared.master_name.clone() else {
            return reject("there is no master");
        };
        if let Some((low, high)) = self.shared.range() {
            if number < low || number > high {
                return reject(&format!("{number} is outside the range {low} - {high}"));
            }
        }

        vec![
            GameEffect::SendTo {
                target: master.clone(),
                message: GameMessage::Guess {
                    round: self.shared.round,
                    number,
                },
            },
            GameEffect::Emit(GameEvent::GuessSent { number, master }),
        ]
    }

    // ── Scheduling ───────────────────────────────────────────────────────

    /// Periodic check: start the round if the leader can, take over if we
    /// were made master.
    pub fn tick(&mut self) -> Vec<GameEffect> {
        if !self.is_running() {
            return Vec::new();
        }
        let mut effects = self.try_start_round();
        effects.extend(self.advance_master());
        effects
    }

    // ── State transfer ───────────────────────────────────────────────────

    /// Serialize the shared state for a joining member.
    pub fn export_snapshot(&self) -> Result<Vec<u8>, GameError> {
        self.shared.to_snapshot()
    }

    /// Replace the shared state with a snapshot received at join time.
    ///
    /// A bad snapshot is reported and the state falls back to defaults; the
    /// next `StateSync` brings us back in line.
    pub fn import_snapshot(&mut self, data: &[u8]) -> Vec<GameEffect> {
        self.secret = None;
        self.ready_round = None;

        match SharedState::from_snapshot(data) {
            Ok(state) => {
                tracing::info!(
                    local = %self.local_id,
                    status = %state.status,
                    round = state.round,
                    "snapshot imported"
                );
                self.shared = state;
                vec![GameEffect::Emit(GameEvent::SnapshotImported {
                    status: self.shared.status,
                    round: self.shared.round,
                })]
            }
            Err(e) => {
                tracing::warn!(local = %self.local_id, "snapshot rejected: {e}");
                self.shared = SharedState::default();
                vec![GameEffect::Emit(GameEvent::SnapshotRejected {
                    reason: e.to_string(),
                })]
            }
        }
    }

    // ── Failures ─────────────────────────────────────────────────────────

    /// A send failed: stop participating locally.
    pub fn handle_send_failure(
        &mut self,
        to: Destination,
        error: &TransportError,
    ) -> Vec<GameEffect> {
        tracing::warn!(local = %self.local_id, to = %to, "send failed: {error}");
        self.stop(format!("send to {to} failed"));
        vec![GameEffect::Emit(GameEvent::SendFailed {
            to,
            reason: error.to_string(),
        })]
    }

    /// End local participation. The first reason wins.
    pub fn stop(&mut self, reason: impl Into<String>) {
        if self.stop_reason.is_none() {
            let reason = reason.into();
            tracing::info!(local = %self.local_id, "stopping: {reason}");
            self.stop_reason = Some(reason);
        }
    }

    // ── Internals ────────────────────────────────────────────────────────

    fn has_declared_ready(&self) -> bool {
        self.shared.ready_players.contains(&self.local_id)
            || self.ready_round == Some(self.shared.round)
    }

    fn transition(&mut self, to: GameStatus) -> bool {
        let from = self.shared.status;
        if !from.is_valid_transition(to) {
            tracing::warn!(local = %self.local_id, %from, %to, "invalid status transition");
            return false;
        }
        tracing::debug!(local = %self.local_id, %from, %to, "status transition");
        self.shared.status = to;
        true
    }

    fn pick_master(&self) -> Option<NodeId> {
        let view = self.view.as_ref()?;
        choose_master(&view.members, self.shared.round, self.config.master_seed)
    }

    /// Leader only: start the round once every member is ready.
    fn try_start_round(&mut self) -> Vec<GameEffect> {
        if !self.is_running()
            || self.shared.status != GameStatus::ChoosingMaster
            || !self.is_leader()
        {
            return Vec::new();
        }
        let Some(view) = self.view.as_ref() else {
            return Vec::new();
        };
        if !self.config.player_count_met(view.len()) {
            return Vec::new();
        }
        if !view
            .members
            .iter()
            .all(|m| self.shared.ready_players.contains(m))
        {
            return Vec::new();
        }

        let current = self
            .shared
            .master_name
            .clone()
            .filter(|master| view.contains(master));
        let Some(master) = current.or_else(|| self.pick_master()) else {
            return Vec::new();
        };

        self.shared.master_name = Some(master.clone());
        if !self.transition(GameStatus::RoundStarted) {
            return Vec::new();
        }
        tracing::info!(
            local = %self.local_id,
            round = self.shared.round,
            master = %master,
            "round started"
        );

        let mut effects = vec![
            GameEffect::Emit(GameEvent::RoundStarted {
                round: self.shared.round,
                master,
            }),
            self.sync_effect(),
        ];
        effects.extend(self.advance_master());
        effects
    }

    /// Master only: leave RoundStarted and start thinking.
    fn advance_master(&mut self) -> Vec<GameEffect> {
        if self.shared.status != GameStatus::RoundStarted || !self.is_master() {
            return Vec::new();
        }
        if !self.transition(GameStatus::Thinking) {
            return Vec::new();
        }
        self.secret = None;

        let master = self.local_id.clone();
        vec![
            GameEffect::Broadcast(GameMessage::MasterThinking {
                master: master.clone(),
            }),
            GameEffect::Emit(GameEvent::MasterThinking { master }),
            self.sync_effect(),
        ]
    }

    /// Master only: a guess hit the secret.
    fn end_round(&mut self, winner: NodeId, number: i64) -> Vec<GameEffect> {
        let round = self.shared.round;
        if !self.transition(GameStatus::ChoosingMaster) {
            return Vec::new();
        }
        self.shared.reset_round();
        self.secret = None;
        tracing::info!(local = %self.local_id, round, winner = %winner, "round won");

        vec![
            GameEffect::Broadcast(GameMessage::Winner {
                player: winner.clone(),
                number,
            }),
            GameEffect::Emit(GameEvent::Winner {
                player: winner,
                number,
            }),
            GameEffect::Broadcast(GameMessage::RoundEnded { round }),
            GameEffect::Emit(GameEvent::RoundEnded { round }),
            self.sync_effect(),
        ]
    }

    /// Every member runs this on the same view, so nothing is broadcast.
    fn abort_round(&mut self, reason: &str) -> Vec<GameEffect> {
        let round = self.shared.round;
        if self.shared.status == GameStatus::ChoosingMaster {
            return Vec::new();
        }
        self.shared.reset_round();
        self.secret = None;
        tracing::info!(local = %self.local_id, round, "round aborted: {reason}");
        vec![GameEffect::Emit(GameEvent::RoundAborted {
            round,
            reason: reason.to_string(),
        })]
    }

    fn sync_effect(&self) -> GameEffect {
        GameEffect::Broadcast(GameMessage::StateSync(self.shared.clone()))
    }

    fn ignore(&self, from: NodeId, reason: String) -> Vec<GameEffect> {
        tracing::debug!(local = %self.local_id, from = %from, "ignored: {reason}");
        vec![GameEffect::Emit(GameEvent::Ignored { from, reason })]
    }
}

fn reject(reason: &str) -> Vec<GameEffect> {
    vec![GameEffect::Emit(GameEvent::InputRejected {
        reason: reason.to_string(),
    })]
}
