/// The game runtime event loop.
///
/// A single async task that owns the coordinator and multiplexes over
/// transport events, local intents and the scheduling tick.
use std::time::Duration;

use tokio::sync::mpsc;

use guess_transport::{GroupTransport, TransportEvent};

use crate::coordinator::GameCoordinator;

use super::effect::GameEffect;
use super::executor::execute_effects;
use super::{GameEvent, Intent, Prompt, RuntimeConfig};

/// Main event loop: owns all game state.
pub(super) async fn game_loop<T: GroupTransport>(
    transport: T,
    config: RuntimeConfig,
    mut transport_rx: mpsc::Receiver<TransportEvent>,
    mut intent_rx: mpsc::Receiver<Intent>,
    prompt_tx: mpsc::Sender<Prompt>,
    event_tx: mpsc::Sender<GameEvent>,
) {
    let local_id = transport.local_id().clone();
    let mut coordinator = GameCoordinator::new(local_id.clone(), config.game.clone());
    let mut last_prompt: Option<Prompt> = None;

    let mut tick = tokio::time::interval(config.tick_interval.max(Duration::from_millis(1)));
    // Skip the immediate first tick
    tick.tick().await;

    tracing::info!(
        local = %local_id,
        members = transport.view().len(),
        "game loop started"
    );

    publish_prompt(&coordinator, &mut last_prompt, &prompt_tx);

    while coordinator.is_running() {
        let effects: Vec<GameEffect> = tokio::select! {
            // ── 1. Group events ─────────────────────────────────
            event = transport_rx.recv() => match event {
                Some(TransportEvent::ViewChanged(view)) => coordinator.handle_view(view),
                Some(TransportEvent::Message(delivery)) => coordinator.handle_message(delivery),
                Some(TransportEvent::SnapshotRequested { reply }) => {
                    match coordinator.export_snapshot() {
                        Ok(bytes) => {
                            if reply.send(bytes).is_err() {
                                tracing::debug!(local = %local_id, "snapshot requester went away");
                            }
                        }
                        Err(e) => tracing::warn!(local = %local_id, "snapshot export failed: {e}"),
                    }
                    Vec::new()
                }
                Some(TransportEvent::SnapshotReceived(bytes)) => coordinator.import_snapshot(&bytes),
                None => {
                    coordinator.stop("group connection closed");
                    Vec::new()
                }
            },

            // ── 2. Local player ─────────────────────────────────
            intent = intent_rx.recv() => match intent {
                Some(intent) => {
                    tracing::debug!(local = %local_id, ?intent, "intent");
                    // Re-ask even if the prompt didn't change (e.g. rejected input).
                    last_prompt = None;
                    coordinator.handle_intent(intent)
                }
                None => {
                    coordinator.stop("all game handles dropped");
                    Vec::new()
                }
            },

            // ── 3. Scheduling ───────────────────────────────────
            _ = tick.tick() => coordinator.tick(),
        };

        if let Err((to, error)) = execute_effects(effects, &transport, &event_tx).await {
            let failure = coordinator.handle_send_failure(to, &error);
            // Only events here; nothing more goes out on a failing transport.
            let _ = execute_effects(failure, &transport, &event_tx).await;
        }

        publish_prompt(&coordinator, &mut last_prompt, &prompt_tx);
    }

    let reason = coordinator
        .stop_reason()
        .unwrap_or("stopped")
        .to_string();
    tracing::info!(local = %local_id, "game loop stopped: {reason}");
    let _ = event_tx.try_send(GameEvent::Stopped { reason });

    if let Err(e) = transport.disconnect().await {
        tracing::debug!(local = %local_id, "disconnect: {e}");
    }
}

/// Push the current prompt to the front end if it changed.
fn publish_prompt(
    coordinator: &GameCoordinator,
    last_prompt: &mut Option<Prompt>,
    prompt_tx: &mpsc::Sender<Prompt>,
) {
    let Some(prompt) = coordinator.next_prompt() else {
        return;
    };
    if *last_prompt == Some(prompt) {
        return;
    }
    if prompt_tx.try_send(prompt).is_ok() {
        *last_prompt = Some(prompt);
    }
}
