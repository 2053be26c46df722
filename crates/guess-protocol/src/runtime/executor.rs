//! Effect executor: the only place that touches I/O.
//!
//! Takes a list of GameEffect and executes them concretely:
//! - Broadcast / SendTo -> transport.send()
//! - Emit -> event_tx.try_send()
//!
//! Stops at the first failed send and hands the failure back to the loop,
//! which turns it into a local stop.

use tokio::sync::mpsc;

use guess_transport::{GroupTransport, TransportError};

use crate::message::GameMessage;
use crate::types::Destination;

use super::effect::GameEffect;
use super::GameEvent;

/// Execute a list of effects using the given transport and event channel.
pub(super) async fn execute_effects<T: GroupTransport>(
    effects: Vec<GameEffect>,
    transport: &T,
    event_tx: &mpsc::Sender<GameEvent>,
) -> Result<(), (Destination, TransportError)> {
    for effect in effects {
        match effect {
            GameEffect::Broadcast(message) => {
                send_message(transport, Destination::Broadcast, &message).await?;
            }
            GameEffect::SendTo { target, message } => {
                send_message(transport, Destination::Member(target), &message).await?;
            }
            GameEffect::Emit(event) => {
                // never block the loop on a slow front end
                if let Err(e) = event_tx.try_send(event) {
                    match e {
                        mpsc::error::TrySendError::Full(event) => {
                            tracing::debug!(
                                local = %transport.local_id(),
                                "event channel full, dropped {event}"
                            );
                        }
                        mpsc::error::TrySendError::Closed(_) => {
                            tracing::debug!(local = %transport.local_id(), "event receiver gone");
                        }
                    }
                }
            }
        }
    }
    Ok(())
}

async fn send_message<T: GroupTransport>(
    transport: &T,
    to: Destination,
    message: &GameMessage,
) -> Result<(), (Destination, TransportError)> {
    let bytes = match message.to_bytes() {
        Ok(b) => b,
        Err(e) => {
            // Encoding our own types can't fail in practice; drop rather than stop.
            tracing::warn!("failed to encode {}: {e}", message.kind());
            return Ok(());
        }
    };

    tracing::debug!(
        local = %transport.local_id(),
        kind = message.kind(),
        "sending {message} to {to}"
    );
    transport
        .send(to.clone(), bytes)
        .await
        .map_err(|e| (to, e))
}
