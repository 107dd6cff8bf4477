use crate::pipeline::CompiledGateway;
use crate::websocket::{WsConnection, WsEvent, WsMessage};
use axum::extract::ws::{Message, WebSocket};
use std::sync::Arc;
use tokio::sync::mpsc;

enum SocketEvent {
    Incoming(Option<Result<Message, axum::Error>>),
    Outgoing(Option<WsMessage>),
}

/// Drive one upgraded connection until either side closes it.
///
/// Handlers run inline, so messages from one client are handled in the order
/// they arrive. `drain` fires once a backlog of queued frames (more than one
/// pending at a time) has been flushed; a single frame sent on an idle queue
/// does not fire it.
pub(super) async fn serve_socket(mut socket: WebSocket, gateway: Arc<CompiledGateway>) {
    let (sender, mut outbound) = mpsc::unbounded_channel();
    let connection = WsConnection::new(sender);
    let mut backlogged = false;
    tracing::debug!(gateway = gateway.controller, connection = %connection.id(), "WebSocket opened");

    fire(&gateway, &connection, WsEvent::Open, None).await;

    loop {
        let event = tokio::select! {
            incoming = socket.recv() => SocketEvent::Incoming(incoming),
            outgoing = outbound.recv() => SocketEvent::Outgoing(outgoing),
        };

        match event {
            SocketEvent::Incoming(Some(Ok(message))) => {
                let message = match message {
                    Message::Text(text) => WsMessage::Text(text.to_string()),
                    Message::Binary(bytes) => WsMessage::Binary(bytes.to_vec()),
                    Message::Close(_) => break,
                    Message::Ping(_) | Message::Pong(_) => continue,
                };
                fire(&gateway, &connection, WsEvent::Message, Some(message)).await;
            }
            SocketEvent::Incoming(Some(Err(e))) => {
                tracing::debug!(connection = %connection.id(), "WebSocket receive failed: {}", e);
                break;
            }
            SocketEvent::Incoming(None) | SocketEvent::Outgoing(None) => break,
            SocketEvent::Outgoing(Some(message)) => {
                let closing = message == WsMessage::Close;
                backlogged |= !outbound.is_empty();
                if let Err(e) = socket.send(to_frame(message)).await {
                    tracing::debug!(connection = %connection.id(), "WebSocket send failed: {}", e);
                    break;
                }
                if closing {
                    break;
                }
                if backlogged && outbound.is_empty() {
                    backlogged = false;
                    fire(&gateway, &connection, WsEvent::Drain, None).await;
                }
            }
        }
    }

    fire(&gateway, &connection, WsEvent::Close, None).await;
    tracing::debug!(gateway = gateway.controller, connection = %connection.id(), "WebSocket closed");
}

async fn fire(gateway: &CompiledGateway, connection: &WsConnection, event: WsEvent, message: Option<WsMessage>) {
    if let Some(handler) = gateway.handlers.get(event) {
        handler(Arc::clone(&gateway.instance), connection.clone(), message).await;
    }
}

fn to_frame(message: WsMessage) -> Message {
    match message {
        WsMessage::Text(text) => Message::Text(text.into()),
        WsMessage::Binary(bytes) => Message::Binary(bytes.into()),
        WsMessage::Close => Message::Close(None),
    }
}
