//! WebSocket gateway types shared by controllers and the transport.

use crate::BoxFuture;
use crate::di::Instance;
use serde::Serialize;
use strum_macros::Display;
use tokio::sync::mpsc;
use uuid::Uuid;

/// A frame sent to or received from a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsMessage {
    Text(String),
    Binary(Vec<u8>),
    Close,
}

impl WsMessage {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// Handle to one connected client.
///
/// Cloning is cheap; all clones feed the same outbound queue.
#[derive(Debug, Clone)]
pub struct WsConnection {
    id: Uuid,
    sender: mpsc::UnboundedSender<WsMessage>,
}

impl WsConnection {
    pub fn new(sender: mpsc::UnboundedSender<WsMessage>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Queue a frame; returns false once the connection is gone
    pub fn send(&self, message: WsMessage) -> bool {
        self.sender.send(message).is_ok()
    }

    pub fn send_text(&self, text: impl Into<String>) -> bool {
        self.send(WsMessage::Text(text.into()))
    }

    pub fn send_json<T: Serialize>(&self, value: &T) -> bool {
        match serde_json::to_string(value) {
            Ok(text) => self.send_text(text),
            Err(e) => {
                tracing::warn!(connection = %self.id, "Failed to serialize message: {}", e);
                false
            }
        }
    }

    pub fn close(&self) -> bool {
        self.send(WsMessage::Close)
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Connection lifecycle points a controller can bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum WsEvent {
    Open,
    Message,
    Close,
    /// A backlog of queued frames has been flushed
    Drain,
}

/// A websocket method with its controller type erased. The message is only
/// present for [`WsEvent::Message`].
pub type ErasedWsHandler =
    std::sync::Arc<dyn Fn(Instance, WsConnection, Option<WsMessage>) -> BoxFuture<'static, ()> + Send + Sync>;

/// One declared lifecycle binding
#[derive(Clone)]
pub struct WsHandlerBinding {
    pub event: WsEvent,
    pub handler_name: &'static str,
    pub handler: ErasedWsHandler,
}

/// The bound lifecycle methods of one gateway. A later binding for the same
/// event replaces an earlier one.
#[derive(Clone, Default)]
pub struct WebSocketHandlers {
    pub open: Option<ErasedWsHandler>,
    pub message: Option<ErasedWsHandler>,
    pub close: Option<ErasedWsHandler>,
    pub drain: Option<ErasedWsHandler>,
}

impl WebSocketHandlers {
    pub fn from_bindings(bindings: &[WsHandlerBinding]) -> Self {
        let mut handlers = Self::default();
        for binding in bindings {
            let slot = match binding.event {
                WsEvent::Open => &mut handlers.open,
                WsEvent::Message => &mut handlers.message,
                WsEvent::Close => &mut handlers.close,
                WsEvent::Drain => &mut handlers.drain,
            };
            *slot = Some(binding.handler.clone());
        }
        handlers
    }

    pub fn get(&self, event: WsEvent) -> Option<&ErasedWsHandler> {
        match event {
            WsEvent::Open => self.open.as_ref(),
            WsEvent::Message => self.message.as_ref(),
            WsEvent::Close => self.close.as_ref(),
            WsEvent::Drain => self.drain.as_ref(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_none() && self.message.is_none() && self.close.is_none() && self.drain.is_none()
    }
}
