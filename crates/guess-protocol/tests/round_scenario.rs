//! Full rounds over the in-memory simulation: readiness, master choice,
//! thinking, guessing and round end, plus joins and departures mid-round.

mod common;

use common::{id, seed_for_master, Sim};
use guess_protocol::{
    GameConfig, GameEvent, GameMessage, GameStatus, Intent, Prompt, WaitReason,
};

fn config_with_master(names: &[&str], master: &str) -> GameConfig {
    let members: Vec<_> = names.iter().map(|n| id(n)).collect();
    GameConfig {
        master_seed: seed_for_master(&members, 0, &id(master)),
        ..GameConfig::default()
    }
}

/// alice (leader) is master; both players ready; range 1..=10, secret 7.
fn playing_two_players() -> Sim {
    let mut sim = Sim::new(config_with_master(&["alice", "bob"], "alice"));
    sim.join(&["alice", "bob"]);

    assert_eq!(sim.node("alice").next_prompt(), Some(Prompt::Ready));
    assert_eq!(sim.node("bob").next_prompt(), Some(Prompt::Ready));

    sim.intent("alice", Intent::Ready);
    assert_eq!(sim.node("alice").shared().master_name, Some(id("alice")));
    assert_eq!(sim.node("bob").shared().master_name, Some(id("alice")));
    assert_eq!(sim.node("alice").shared().status, GameStatus::ChoosingMaster);

    sim.intent("bob", Intent::Ready);
    assert_eq!(sim.node("alice").shared().status, GameStatus::Thinking);
    assert_eq!(sim.node("bob").shared().status, GameStatus::Thinking);
    assert_eq!(sim.node("alice").next_prompt(), Some(Prompt::Puzzle));
    assert_eq!(
        sim.node("bob").next_prompt(),
        Some(Prompt::Wait(WaitReason::MasterThinking))
    );

    sim.intent(
        "alice",
        Intent::Puzzle {
            secret: 7,
            low: 1,
            high: 10,
        },
    );
    assert_eq!(sim.node("bob").shared().status, GameStatus::Playing);
    assert_eq!(
        sim.node("bob").next_prompt(),
        Some(Prompt::Guess { low: 1, high: 10 })
    );
    sim
}

#[test]
fn two_player_round_end_to_end() {
    let mut sim = playing_two_players();
    assert_eq!(sim.messages_of_kind("master-thinking"), 1);

    sim.intent("bob", Intent::Guess(5));
    assert_eq!(sim.node("alice").shared().status, GameStatus::Playing);
    assert_eq!(sim.messages_of_kind("winner"), 0);
    assert!(sim
        .events_at("alice")
        .iter()
        .any(|e| matches!(e, GameEvent::WrongGuess { number: 5, .. })));

    sim.intent("bob", Intent::Guess(7));
    assert_eq!(sim.messages_of_kind("winner"), 1);
    assert_eq!(sim.messages_of_kind("round-ended"), 1);

    let winner = sim
        .wire
        .iter()
        .map(|w| w.message())
        .find(|m| matches!(m, GameMessage::Winner { .. }))
        .unwrap();
    assert_eq!(
        winner.to_string(),
        "The winner is bob. And the number was 7"
    );
    assert!(sim
        .events_at("bob")
        .iter()
        .any(|e| matches!(e, GameEvent::Winner { number: 7, .. })));

    for name in ["alice", "bob"] {
        let shared = sim.node(name).shared();
        assert_eq!(shared.status, GameStatus::ChoosingMaster, "{name}");
        assert!(shared.ready_players.is_empty(), "{name}");
        assert!(shared.master_name.is_none(), "{name}");
        assert_eq!(shared.round, 1, "{name}");
        assert_eq!(sim.node(name).next_prompt(), Some(Prompt::Ready), "{name}");
    }
    assert!(sim.node("alice").secret().is_none());
}

#[test]
fn guesses_are_unicast_to_the_master() {
    let mut sim = playing_two_players();
    sim.intent("bob", Intent::Guess(3));

    let guess = sim
        .wire
        .iter()
        .find(|w| matches!(w.message(), GameMessage::Guess { .. }))
        .unwrap();
    assert_eq!(guess.to, guess_protocol::Destination::Member(id("alice")));
}

#[test]
fn only_the_master_holds_the_secret() {
    let sim = playing_two_players();
    assert_eq!(sim.node("alice").secret(), Some(7));
    assert!(sim.node("bob").secret().is_none());
}

#[test]
fn second_round_can_start() {
    let mut sim = playing_two_players();
    sim.intent("bob", Intent::Guess(7));

    sim.intent("alice", Intent::Ready);
    sim.intent("bob", Intent::Ready);
    sim.tick();

    for name in ["alice", "bob"] {
        let shared = sim.node(name).shared();
        assert_eq!(shared.round, 1);
        assert!(shared.status >= GameStatus::RoundStarted, "{name}: {}", shared.status);
        assert!(shared.master_name.is_some());
    }
}

#[test]
fn round_needs_every_member_ready() {
    let mut sim = Sim::new(GameConfig::default());
    sim.join(&["alice", "bob"]);

    sim.intent("bob", Intent::Ready);
    sim.tick();
    assert_eq!(sim.node("alice").shared().status, GameStatus::ChoosingMaster);
    assert_eq!(
        sim.node("bob").next_prompt(),
        Some(Prompt::Wait(WaitReason::OtherPlayers))
    );

    sim.intent("alice", Intent::Ready);
    assert_ne!(sim.node("alice").shared().status, GameStatus::ChoosingMaster);
}

#[test]
fn round_needs_exact_player_count_by_default() {
    let mut sim = Sim::new(GameConfig::default());
    sim.join(&["alice", "bob", "carol"]);

    for name in ["alice", "bob", "carol"] {
        sim.intent(name, Intent::Ready);
    }
    sim.tick();
    assert_eq!(sim.node("alice").shared().status, GameStatus::ChoosingMaster);
    assert!(!sim
        .wire
        .iter()
        .any(|w| matches!(w.message(), GameMessage::MasterThinking { .. })));
}

#[test]
fn late_joiner_imports_state_without_the_secret() {
    let mut sim = playing_two_players();
    sim.join(&["carol"]);

    let carol = sim.node("carol");
    assert_eq!(carol.shared().status, GameStatus::Playing);
    assert_eq!(carol.shared().leader_name, Some(id("alice")));
    assert_eq!(carol.shared().master_name, Some(id("alice")));
    assert_eq!(carol.shared().range(), Some((1, 10)));
    assert!(carol.secret().is_none());
    assert_eq!(carol.next_prompt(), Some(Prompt::Guess { low: 1, high: 10 }));
    assert!(sim
        .events_at("carol")
        .iter()
        .any(|e| matches!(e, GameEvent::SnapshotImported { status: GameStatus::Playing, .. })));

    // The round goes on and carol can win it.
    sim.intent("carol", Intent::Guess(7));
    assert_eq!(sim.messages_of_kind("winner"), 1);
    assert_eq!(sim.node("bob").shared().round, 1);
}

#[test]
fn master_leaving_aborts_round_everywhere() {
    let names = ["alice", "bob", "carol"];
    let members: Vec<_> = names.iter().map(|n| id(n)).collect();
    let config = GameConfig {
        allow_extra_players: true,
        master_seed: seed_for_master(&members, 0, &id("bob")),
        ..GameConfig::default()
    };
    let mut sim = Sim::new(config);
    sim.join(&names);
    for name in names {
        sim.intent(name, Intent::Ready);
    }
    assert_eq!(sim.node("bob").next_prompt(), Some(Prompt::Puzzle));

    sim.leave("bob");

    for name in ["alice", "carol"] {
        let shared = sim.node(name).shared();
        assert_eq!(shared.status, GameStatus::ChoosingMaster, "{name}");
        assert_eq!(shared.round, 1, "{name}");
        assert!(shared.master_name.is_none(), "{name}");
        assert!(sim
            .events_at(name)
            .iter()
            .any(|e| matches!(e, GameEvent::RoundAborted { round: 0, .. })));
    }
}

#[test]
fn leader_failover_keeps_game_going() {
    let mut sim = Sim::new(GameConfig {
        allow_extra_players: true,
        ..GameConfig::default()
    });
    sim.join(&["alice", "bob", "carol"]);
    sim.leave("alice");

    assert_eq!(sim.node("bob").shared().leader_name, Some(id("bob")));
    assert_eq!(sim.node("carol").shared().leader_name, Some(id("bob")));

    sim.intent("carol", Intent::Ready);
    sim.intent("bob", Intent::Ready);
    assert_ne!(sim.node("carol").shared().status, GameStatus::ChoosingMaster);
}

#[test]
fn readiness_from_a_non_member_is_ignored() {
    let mut sim = Sim::new(GameConfig::default());
    sim.join(&["alice", "bob"]);

    let mut alice = guess_protocol::GameCoordinator::new(id("alice"), GameConfig::default());
    alice.handle_view(sim.view.clone());
    let effects = alice.handle_message(guess_transport::Delivery {
        from: id("mallory"),
        to: guess_protocol::Destination::Broadcast,
        payload: GameMessage::Ready { round: 0 }.to_bytes().unwrap(),
    });
    assert!(alice.shared().ready_players.is_empty());
    assert!(matches!(
        effects.as_slice(),
        [guess_protocol::GameEffect::Emit(GameEvent::Ignored { .. })]
    ));
}
