pub mod events;
pub mod heartbeat;
pub mod session;
pub mod transport;

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::mpsc;

use crate::models::connection::ConnId;
use crate::models::event::OutboundEvent;
use crate::state::AppState;
use events::{error_code, event_name, ClientCommand, HandshakeParams};
use transport::Transport;

pub async fn ws_upgrade(
    ws: WebSocketUpgrade,
    Query(params): Query<HandshakeParams>,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, params, state))
}

async fn handle_socket(socket: WebSocket, params: HandshakeParams, state: AppState) {
    let (mut ws_sink, mut ws_stream) = socket.split();

    // Everything bound for this client goes through one queue, so frames
    // leave in the order they were produced.
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let connection = state.transport.handshake(&params, Arc::new(tx));
    let conn_id = connection.id;

    let connected = OutboundEvent::new(
        event_name::CONNECTED,
        json!({
            "connectionId": conn_id,
            "userId": connection.user_id,
            "heartbeatInterval": state.heartbeat.interval.as_millis() as u64
        }),
    );
    // Written straight to the socket so it precedes anything already queued.
    let sent = match connected.to_frame() {
        Ok(frame) => ws_sink.send(Message::Text(frame.into())).await.is_ok(),
        Err(e) => {
            tracing::warn!(conn_id = %conn_id, "could not encode connected frame: {e}");
            false
        }
    };
    if !sent {
        state.transport.on_disconnect(&conn_id);
        return;
    }

    let mut last_activity = tokio::time::Instant::now();
    let mut heartbeat_interval = tokio::time::interval(state.heartbeat.interval);

    loop {
        tokio::select! {
            Some(frame) = rx.recv() => {
                if ws_sink.send(Message::Text(frame.into())).await.is_err() {
                    break;
                }
            }
            _ = heartbeat_interval.tick() => {
                if last_activity.elapsed() > state.heartbeat.timeout {
                    tracing::debug!(conn_id = %conn_id, "heartbeat timed out");
                    break;
                }
            }
            msg = ws_stream.next() => {
                let msg = match msg {
                    Some(Ok(msg)) => msg,
                    Some(Err(e)) => {
                        tracing::debug!(conn_id = %conn_id, "receive error: {e}");
                        break;
                    }
                    None => break,
                };

                // Every inbound frame is activity.
                last_activity = tokio::time::Instant::now();
                state.transport.touch(&conn_id);

                let reply = match msg {
                    Message::Text(text) => handle_command(&state.transport, conn_id, text.as_str()),
                    Message::Binary(_) => {
                        tracing::warn!(conn_id = %conn_id, "received unsupported binary frame");
                        error_frame(error_code::UNSUPPORTED_FRAME, "binary frames are not supported")
                    }
                    Message::Ping(_) | Message::Pong(_) => continue,
                    Message::Close(_) => break,
                };
                if let Err(e) = state.transport.send_to(&conn_id, &reply) {
                    tracing::debug!(conn_id = %conn_id, "reply dropped: {e}");
                }
            }
        }
    }

    state.transport.on_disconnect(&conn_id);
}

/// Apply one inbound client frame and build the reply.
pub fn handle_command(transport: &Transport, conn_id: ConnId, text: &str) -> OutboundEvent {
    let command = match serde_json::from_str::<ClientCommand>(text) {
        Ok(command) => command,
        Err(e) => {
            tracing::debug!(conn_id = %conn_id, "undecodable client frame: {e}");
            return error_frame(error_code::DECODE_ERROR, &e.to_string());
        }
    };

    match command {
        ClientCommand::Subscribe { channel } => match transport.subscribe(conn_id, &channel) {
            Ok(()) => OutboundEvent::new(event_name::SUBSCRIBED, json!({ "channel": channel.trim() })),
            Err(e) => error_frame(e.code(), &e.to_string()),
        },
        ClientCommand::Unsubscribe { channel } => {
            match transport.unsubscribe(&conn_id, &channel) {
                Ok(()) => OutboundEvent::new(
                    event_name::UNSUBSCRIBED,
                    json!({ "channel": channel.trim() }),
                ),
                Err(e) => error_frame(e.code(), &e.to_string()),
            }
        }
        ClientCommand::Ping => OutboundEvent::new(event_name::PONG, serde_json::Value::Null),
    }
}

fn error_frame(code: &str, message: &str) -> OutboundEvent {
    OutboundEvent::new(
        event_name::ERROR,
        json!({ "code": code, "message": message }),
    )
}
