/// In-process group bus.
///
/// Every member gets its own bounded event channel. Membership changes are
/// serialized through a join lock so views are installed one at a time and
/// view ids only grow.
///
/// A joiner is registered before its snapshot is requested. Messages sent to
/// it meanwhile are held and released after the snapshot, then its first
/// view follows, so nothing sent after the export is lost.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{mpsc, oneshot};

use crate::{
    Delivery, Destination, GroupConfig, GroupTransport, NodeId, TransportError, TransportEvent,
    View,
};

/// A named group that members connect to.
///
/// Cheap to clone; clones share the same membership.
#[derive(Clone)]
pub struct LocalGroup {
    inner: Arc<GroupInner>,
}

struct GroupInner {
    name: String,
    config: GroupConfig,
    membership: Mutex<Membership>,
    /// Serializes connects so state transfer and view installation don't interleave.
    join_lock: tokio::sync::Mutex<()>,
}

#[derive(Default)]
struct Membership {
    view_id: u64,
    members: Vec<MemberSlot>,
}

struct MemberSlot {
    id: NodeId,
    events: mpsc::Sender<TransportEvent>,
    /// Some while state transfer is in progress.
    held: Option<Vec<TransportEvent>>,
}

impl MemberSlot {
    fn is_joined(&self) -> bool {
        self.held.is_none()
    }
}

impl Membership {
    /// Joined members only; a joiner shows up once its transfer is done.
    fn view(&self) -> View {
        View::new(
            self.view_id,
            self.members
                .iter()
                .filter(|m| m.is_joined())
                .map(|m| m.id.clone())
                .collect(),
        )
    }

    fn senders(&self) -> Vec<(NodeId, mpsc::Sender<TransportEvent>)> {
        self.members
            .iter()
            .filter(|m| m.is_joined())
            .map(|m| (m.id.clone(), m.events.clone()))
            .collect()
    }

    /// Pop the messages held for a joiner. With nothing left, the joiner is
    /// installed in the next view, returned together with its recipients.
    fn release(&mut self, id: &NodeId) -> Release {
        let Some(slot) = self.members.iter_mut().find(|m| m.id == *id) else {
            return Release::Gone;
        };
        match slot.held.as_mut() {
            Some(held) if !held.is_empty() => Release::Held(std::mem::take(held)),
            _ => {
                slot.held = None;
                self.view_id += 1;
                Release::Installed(self.view(), self.senders())
            }
        }
    }

    /// Remove a member and install the next view. None if it wasn't a member.
    fn remove(&mut self, id: &NodeId) -> Option<View> {
        let before = self.members.len();
        self.members.retain(|m| m.id != *id);
        if self.members.len() == before {
            return None;
        }
        self.view_id += 1;
        Some(self.view())
    }
}

enum Release {
    Held(Vec<TransportEvent>),
    Installed(View, Vec<(NodeId, mpsc::Sender<TransportEvent>)>),
    Gone,
}

impl GroupInner {
    fn membership(&self) -> MutexGuard<'_, Membership> {
        self.membership.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn request_snapshot(
        &self,
        provider: &NodeId,
        events: &mpsc::Sender<TransportEvent>,
    ) -> Result<Vec<u8>, TransportError> {
        let (reply, response) = oneshot::channel();
        let request = async {
            events
                .send(TransportEvent::SnapshotRequested { reply })
                .await
                .map_err(|_| TransportError::ChannelClosed(provider.clone()))?;
            response.await.map_err(|_| {
                TransportError::StateTransfer(format!("{provider} dropped the snapshot request"))
            })
        };

        match tokio::time::timeout(self.config.state_transfer_timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::StateTransfer(format!(
                "{provider} did not answer within {:?}",
                self.config.state_transfer_timeout
            ))),
        }
    }

    async fn deliver_view(&self, view: View, targets: Vec<(NodeId, mpsc::Sender<TransportEvent>)>) {
        for (id, tx) in targets {
            if tx.send(TransportEvent::ViewChanged(view.clone())).await.is_err() {
                tracing::debug!(group = %self.name, member = %id, "view not delivered: receiver gone");
            }
        }
    }
}

impl LocalGroup {
    /// Create an empty group with default configuration.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(name, GroupConfig::new())
    }

    pub fn with_config(name: impl Into<String>, config: GroupConfig) -> Self {
        Self {
            inner: Arc::new(GroupInner {
                name: name.into(),
                config,
                membership: Mutex::new(Membership::default()),
                join_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The currently installed view.
    pub fn members(&self) -> View {
        self.inner.membership().view()
    }

    /// Join the group as `id`.
    ///
    /// If the group already has members, the oldest one is asked for a
    /// snapshot first; the joiner receives it as `SnapshotReceived`, then
    /// whatever was sent to it during the transfer, then its first
    /// `ViewChanged`. A failed transfer is logged and the joiner starts
    /// without one.
    pub async fn connect(
        &self,
        id: NodeId,
    ) -> Result<(LocalMember, mpsc::Receiver<TransportEvent>), TransportError> {
        let _join = self.inner.join_lock.lock().await;

        let (tx, rx) = mpsc::channel(self.inner.config.event_buffer);

        let provider = {
            let mut membership = self.inner.membership();
            if membership.members.iter().any(|m| m.id == id) {
                return Err(TransportError::DuplicateIdentity(id));
            }
            let provider = membership
                .members
                .iter()
                .find(|m| m.is_joined())
                .map(|m| (m.id.clone(), m.events.clone()));
            membership.members.push(MemberSlot {
                id: id.clone(),
                events: tx.clone(),
                held: Some(Vec::new()),
            });
            provider
        };
        let pending = PendingJoin {
            group: &self.inner,
            id: &id,
            armed: true,
        };

        if let Some((provider_id, provider_tx)) = provider {
            match self.inner.request_snapshot(&provider_id, &provider_tx).await {
                Ok(snapshot) => {
                    tracing::debug!(
                        group = %self.inner.name,
                        joiner = %id,
                        provider = %provider_id,
                        bytes = snapshot.len(),
                        "state transfer complete"
                    );
                    tx.send(TransportEvent::SnapshotReceived(snapshot))
                        .await
                        .map_err(|_| TransportError::ChannelClosed(id.clone()))?;
                }
                Err(e) => {
                    tracing::warn!(group = %self.inner.name, joiner = %id, "{e}");
                }
            }
        }

        let (view, targets) = loop {
            let release = self.inner.membership().release(&id);
            match release {
                Release::Held(events) => {
                    for event in events {
                        tx.send(event)
                            .await
                            .map_err(|_| TransportError::ChannelClosed(id.clone()))?;
                    }
                }
                Release::Installed(view, targets) => break (view, targets),
                Release::Gone => return Err(TransportError::ChannelClosed(id.clone())),
            }
        };
        pending.disarm();

        tracing::info!(group = %self.inner.name, member = %id, view = view.id, "member joined");
        self.inner.deliver_view(view, targets).await;

        Ok((
            LocalMember {
                id,
                group: self.inner.clone(),
                connected: AtomicBool::new(true),
            },
            rx,
        ))
    }
}

/// Drops a half-joined slot if `connect` fails or is cancelled.
struct PendingJoin<'a> {
    group: &'a GroupInner,
    id: &'a NodeId,
    armed: bool,
}

impl PendingJoin<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for PendingJoin<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        self.group.membership().members.retain(|m| m.id != *self.id);
        tracing::debug!(group = %self.group.name, member = %self.id, "join abandoned");
    }
}

/// One member's handle on a [`LocalGroup`].
pub struct LocalMember {
    id: NodeId,
    group: Arc<GroupInner>,
    connected: AtomicBool,
}

impl LocalMember {
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
}

#[async_trait::async_trait]
impl GroupTransport for LocalMember {
    fn local_id(&self) -> &NodeId {
        &self.id
    }

    fn view(&self) -> View {
        self.group.membership().view()
    }

    async fn send(&self, to: Destination, payload: Vec<u8>) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::Disconnected);
        }

        let delivery = || {
            TransportEvent::Message(Delivery {
                from: self.id.clone(),
                to: to.clone(),
                payload: payload.clone(),
            })
        };

        let targets: Vec<(NodeId, mpsc::Sender<TransportEvent>)> = {
            let mut membership = self.group.membership();
            let mut targets = Vec::new();
            match &to {
                Destination::Broadcast => {
                    for slot in membership.members.iter_mut().filter(|m| m.id != self.id) {
                        match slot.held.as_mut() {
                            Some(held) => held.push(delivery()),
                            None => targets.push((slot.id.clone(), slot.events.clone())),
                        }
                    }
                }
                Destination::Member(target) => {
                    let Some(slot) = membership.members.iter_mut().find(|m| m.id == *target)
                    else {
                        return Err(TransportError::UnknownMember(target.clone()));
                    };
                    // Own messages are discarded.
                    if slot.id == self.id {
                        return Ok(());
                    }
                    match slot.held.as_mut() {
                        Some(held) => held.push(delivery()),
                        None => targets.push((slot.id.clone(), slot.events.clone())),
                    }
                }
            }
            targets
        };

        for (target, tx) in targets {
            if tx.send(delivery()).await.is_err() {
                if matches!(to, Destination::Member(_)) {
                    return Err(TransportError::ChannelClosed(target));
                }
                tracing::debug!(from = %self.id, to = %target, "broadcast not delivered: receiver gone");
            }
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        if !self.connected.swap(false, Ordering::AcqRel) {
            return Ok(());
        }
        let left = {
            let mut membership = self.group.membership();
            membership.remove(&self.id).map(|view| (view, membership.senders()))
        };
        if let Some((view, targets)) = left {
            tracing::info!(group = %self.group.name, member = %self.id, view = view.id, "member left");
            self.group.deliver_view(view, targets).await;
        }
        Ok(())
    }
}

impl Drop for LocalMember {
    fn drop(&mut self) {
        if !self.connected.swap(false, Ordering::AcqRel) {
            return;
        }
        let mut membership = self.group.membership();
        if let Some(view) = membership.remove(&self.id) {
            for (id, tx) in membership.senders() {
                if tx.try_send(TransportEvent::ViewChanged(view.clone())).is_err() {
                    tracing::debug!(member = %id, "view not delivered on drop");
                }
            }
        }
    }
}
