//! WebSocket connection state machine.
//!
//! Handles the read/write loop for a single WebSocket connection,
//! dispatching incoming commands and forwarding filtered events.

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::broadcast;

use super::messages::{WsCommand, WsMessage, WsMessageType};
use super::subscription::SubscriptionManager;
use crate::api::dto::{SimulationResponse, TemplateSnapshotResponse};
use crate::app_state::AppState;
use crate::domain::{DeskEvent, TemplateType};

/// Runs the read/write loop for a single WebSocket connection.
///
/// - Reads commands from the client and dispatches them.
/// - Forwards events whose topic the client subscribed to.
pub async fn run_connection(
    socket: WebSocket,
    mut event_rx: broadcast::Receiver<DeskEvent>,
    state: AppState,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut subs = SubscriptionManager::new();

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let reply = handle_text_message(&text, &mut subs, &state).await;
                        if let Some(json) = encode(&reply)
                            && ws_tx.send(Message::text(json)).await.is_err()
                        {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }
            event = event_rx.recv() => {
                match event {
                    Ok(desk_event) => {
                        if !subs.matches(desk_event.topic()) {
                            continue;
                        }
                        let msg = WsMessage::new(
                            uuid::Uuid::new_v4().to_string(),
                            WsMessageType::Event,
                            serde_json::to_value(&desk_event).unwrap_or_default(),
                        );
                        if let Some(json) = encode(&msg)
                            && ws_tx.send(Message::text(json)).await.is_err()
                        {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(lagged = n, "ws client lagged behind event bus");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    tracing::debug!("ws connection closed");
}

fn encode(msg: &WsMessage) -> Option<String> {
    serde_json::to_string(msg).ok()
}

/// Handles a text frame from the client and builds the reply.
async fn handle_text_message(
    text: &str,
    subs: &mut SubscriptionManager,
    state: &AppState,
) -> WsMessage {
    let Ok(msg) = serde_json::from_str::<WsMessage>(text) else {
        return WsMessage::error("", 400, "malformed JSON");
    };
    if msg.msg_type != WsMessageType::Command {
        return WsMessage::error(msg.id, 400, "expected a command message");
    }
    let Ok(command) = serde_json::from_value::<WsCommand>(msg.payload) else {
        return WsMessage::error(msg.id, 404, "unknown command");
    };

    match command {
        WsCommand::Subscribe { topics } => {
            let unknown = subs.subscribe(&topics);
            WsMessage::new(
                msg.id,
                WsMessageType::Response,
                json!({
                    "subscribed": topics.iter().filter(|t| !unknown.contains(*t)).collect::<Vec<_>>(),
                    "unknown": unknown,
                    "count": subs.count(),
                    "wildcard": subs.is_subscribed_all(),
                }),
            )
        }
        WsCommand::Unsubscribe { topics } => {
            subs.unsubscribe(&topics);
            WsMessage::new(
                msg.id,
                WsMessageType::Response,
                json!({
                    "unsubscribed": topics,
                    "remaining_count": subs.count(),
                    "wildcard": subs.is_subscribed_all(),
                }),
            )
        }
        WsCommand::GetSimulation => match state.simulation.view().await {
            Some(view) => WsMessage::new(
                msg.id,
                WsMessageType::Response,
                serde_json::to_value(SimulationResponse::from(view)).unwrap_or_default(),
            ),
            None => WsMessage::error(msg.id, 404, "no simulation is open"),
        },
        WsCommand::GetTemplate { template_type } => {
            let Ok(template_type) = TemplateType::parse(&template_type) else {
                return WsMessage::error(msg.id, 400, "invalid template type");
            };
            let snapshot = state.templates.snapshot(&template_type).await;
            WsMessage::new(
                msg.id,
                WsMessageType::Response,
                serde_json::to_value(TemplateSnapshotResponse::new(&template_type, snapshot))
                    .unwrap_or_default(),
            )
        }
    }
}
