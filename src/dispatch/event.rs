//! Inbound events and outbound responses
//!
//! The two shapes the transport can deliver (a text message and a button
//! callback) normalize into one view before resolution, so the rest of the
//! engine never branches on the transport's types.

/// The pair access control and conversation state are scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Identity {
    pub user_id: i64,
    pub chat_id: i64,
}

/// The message an inbound message replies to, if any. Analyzers use this
/// to target the replied-to author (karma).
#[derive(Debug, Clone)]
pub struct RepliedMessage {
    pub message_id: i32,
    pub user_id: i64,
    pub text: Option<String>,
}

/// An event as the transport delivers it.
#[derive(Debug, Clone)]
pub enum InboundEvent {
    TextMessage {
        chat_id: i64,
        user_id: i64,
        message_id: i32,
        text: String,
        reply_to: Option<RepliedMessage>,
    },
    /// A button press. The `data` payload already encodes the full
    /// invocation; callback events never participate in waiting-state
    /// continuations.
    CallbackQuery {
        chat_id: i64,
        user_id: i64,
        message_id: i32,
        data: String,
    },
}

impl InboundEvent {
    /// Builds the synthetic text event used for alias expansion and
    /// analyzer-triggered re-dispatch. Reply context is deliberately not
    /// carried over: a macro cannot retarget another message.
    pub fn synthetic_text(identity: Identity, message_id: i32, text: String) -> Self {
        InboundEvent::TextMessage {
            chat_id: identity.chat_id,
            user_id: identity.user_id,
            message_id,
            text,
            reply_to: None,
        }
    }

    /// Normalizes both shapes into the single view the engine resolves on.
    pub fn normalized(&self) -> NormalizedEvent {
        match self {
            InboundEvent::TextMessage {
                chat_id,
                user_id,
                message_id,
                text,
                reply_to,
            } => NormalizedEvent {
                identity: Identity {
                    user_id: *user_id,
                    chat_id: *chat_id,
                },
                message_id: *message_id,
                raw_text: text.clone(),
                is_callback: false,
                reply_to: reply_to.clone(),
            },
            InboundEvent::CallbackQuery {
                chat_id,
                user_id,
                message_id,
                data,
            } => NormalizedEvent {
                identity: Identity {
                    user_id: *user_id,
                    chat_id: *chat_id,
                },
                message_id: *message_id,
                raw_text: data.clone(),
                is_callback: true,
                reply_to: None,
            },
        }
    }
}

/// The transport-neutral view resolution works on.
#[derive(Debug, Clone)]
pub struct NormalizedEvent {
    pub identity: Identity,
    pub message_id: i32,
    pub raw_text: String,
    pub is_callback: bool,
    pub reply_to: Option<RepliedMessage>,
}

/// One button of an inline keyboard attached to a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyboardButton {
    pub text: String,
    pub callback_data: String,
}

/// What the engine hands back to the transport for delivery.
#[derive(Debug, Clone)]
pub struct OutboundResponse {
    pub chat_id: i64,
    pub reply_to_message_id: Option<i32>,
    pub text: String,
    pub keyboard: Option<Vec<Vec<KeyboardButton>>>,
}

impl OutboundResponse {
    pub fn text(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            reply_to_message_id: None,
            text: text.into(),
            keyboard: None,
        }
    }

    pub fn reply_to(mut self, message_id: i32) -> Self {
        self.reply_to_message_id = Some(message_id);
        self
    }

    pub fn with_keyboard(mut self, keyboard: Vec<Vec<KeyboardButton>>) -> Self {
        self.keyboard = Some(keyboard);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_message_normalizes() {
        let event = InboundEvent::TextMessage {
            chat_id: 1,
            user_id: 2,
            message_id: 3,
            text: "погода Берлин".to_string(),
            reply_to: None,
        };
        let ev = event.normalized();
        assert_eq!(ev.identity, Identity { user_id: 2, chat_id: 1 });
        assert_eq!(ev.raw_text, "погода Берлин");
        assert!(!ev.is_callback);
    }

    #[test]
    fn test_callback_normalizes_with_payload_as_text() {
        let event = InboundEvent::CallbackQuery {
            chat_id: 1,
            user_id: 2,
            message_id: 3,
            data: "help weather".to_string(),
        };
        let ev = event.normalized();
        assert!(ev.is_callback);
        assert_eq!(ev.raw_text, "help weather");
        assert!(ev.reply_to.is_none());
    }

    #[test]
    fn test_synthetic_event_drops_reply_context() {
        let identity = Identity { user_id: 2, chat_id: 1 };
        let event = InboundEvent::synthetic_text(identity, 3, "эхо привет".to_string());
        let ev = event.normalized();
        assert!(ev.reply_to.is_none());
        assert_eq!(ev.identity, identity);
    }
}
