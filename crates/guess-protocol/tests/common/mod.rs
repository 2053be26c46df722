//! In-memory group simulation for the pure coordinator.
//!
//! Routes effects between coordinators synchronously: broadcasts go to every
//! other member of the current view, `SendTo` to its target only. Every
//! payload that crosses the wire is recorded.
#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};

use guess_protocol::{
    choose_master, Destination, GameConfig, GameCoordinator, GameEffect, GameEvent, GameMessage,
    Intent, NodeId, View,
};
use guess_transport::Delivery;

pub fn id(name: &str) -> NodeId {
    name.parse().unwrap()
}

/// Smallest seed that makes `master` this round's master among `members`.
pub fn seed_for_master(members: &[NodeId], round: u64, master: &NodeId) -> u64 {
    (0..10_000)
        .find(|seed| choose_master(members, round, *seed).as_ref() == Some(master))
        .expect("no seed selects the wanted master")
}

pub struct Wire {
    pub from: NodeId,
    pub to: Destination,
    pub payload: Vec<u8>,
}

impl Wire {
    pub fn message(&self) -> GameMessage {
        GameMessage::from_bytes(&self.payload).unwrap()
    }
}

pub struct Sim {
    pub config: GameConfig,
    pub nodes: BTreeMap<NodeId, GameCoordinator>,
    pub view: View,
    pub wire: Vec<Wire>,
    pub events: Vec<(NodeId, GameEvent)>,
}

impl Sim {
    pub fn new(config: GameConfig) -> Self {
        Self {
            config,
            nodes: BTreeMap::new(),
            view: View::default(),
            wire: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn node(&self, name: &str) -> &GameCoordinator {
        &self.nodes[&id(name)]
    }

    /// Add members and install the new view everywhere.
    ///
    /// A member joining an existing group imports the oldest member's
    /// snapshot first.
    pub fn join(&mut self, names: &[&str]) {
        for name in names {
            let mut coordinator = GameCoordinator::new(id(name), self.config.clone());
            if let Some(provider) = self.view.first() {
                let snapshot = self.nodes[provider].export_snapshot().unwrap();
                let effects = coordinator.import_snapshot(&snapshot);
                self.record(&id(name), &effects);
            }
            self.nodes.insert(id(name), coordinator);
            let mut members = self.view.members.clone();
            members.push(id(name));
            self.view = View::new(self.view.id + 1, members);
        }
        self.install_view();
    }

    pub fn leave(&mut self, name: &str) {
        self.nodes.remove(&id(name));
        let members = self
            .view
            .members
            .iter()
            .filter(|m| m.as_str() != name)
            .cloned()
            .collect();
        self.view = View::new(self.view.id + 1, members);
        self.install_view();
    }

    fn install_view(&mut self) {
        let members = self.view.members.clone();
        for member in members {
            let view = self.view.clone();
            if let Some(node) = self.nodes.get_mut(&member) {
                let effects = node.handle_view(view);
                self.route(member, effects);
            }
        }
    }

    pub fn intent(&mut self, name: &str, intent: Intent) {
        let effects = self.nodes.get_mut(&id(name)).unwrap().handle_intent(intent);
        self.route(id(name), effects);
    }

    pub fn tick(&mut self) {
        let names: Vec<NodeId> = self.nodes.keys().cloned().collect();
        for name in names {
            let effects = self.nodes.get_mut(&name).unwrap().tick();
            self.route(name, effects);
        }
    }

    fn record(&mut self, at: &NodeId, effects: &[GameEffect]) {
        for effect in effects {
            if let GameEffect::Emit(event) = effect {
                self.events.push((at.clone(), event.clone()));
            }
        }
    }

    /// Deliver effects until the network is quiet.
    fn route(&mut self, origin: NodeId, effects: Vec<GameEffect>) {
        let mut queue: VecDeque<(NodeId, Vec<GameEffect>)> = VecDeque::new();
        queue.push_back((origin, effects));

        while let Some((from, effects)) = queue.pop_front() {
            self.record(&from, &effects);
            for effect in effects {
                let (to, message) = match effect {
                    GameEffect::Broadcast(m) => (Destination::Broadcast, m),
                    GameEffect::SendTo { target, message } => (Destination::Member(target), message),
                    GameEffect::Emit(_) => continue,
                };
                let payload = message.to_bytes().unwrap();
                self.wire.push(Wire {
                    from: from.clone(),
                    to: to.clone(),
                    payload: payload.clone(),
                });

                let recipients: Vec<NodeId> = self
                    .view
                    .members
                    .iter()
                    .filter(|m| **m != from && to.includes(m))
                    .cloned()
                    .collect();
                for recipient in recipients {
                    let Some(node) = self.nodes.get_mut(&recipient) else {
                        continue;
                    };
                    let produced = node.handle_message(Delivery {
                        from: from.clone(),
                        to: to.clone(),
                        payload: payload.clone(),
                    });
                    queue.push_back((recipient, produced));
                }
            }
        }
    }

    pub fn messages_of_kind(&self, kind: &str) -> usize {
        self.wire.iter().filter(|w| w.message().kind() == kind).count()
    }

    pub fn events_at(&self, name: &str) -> Vec<&GameEvent> {
        self.events
            .iter()
            .filter(|(at, _)| at.as_str() == name)
            .map(|(_, e)| e)
            .collect()
    }
}
