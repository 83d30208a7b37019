//! Telegram bot handler tree configuration
//!
//! This module provides the main dispatcher schema for the Telegram bot.
//! Updates are converted to the engine's transport-neutral events here;
//! everything after that happens in `crate::dispatch`. teloxide runs each
//! update's handler on its own task, which is exactly the one-task-per-event
//! scheduling the engine assumes.

use std::sync::Arc;

use async_trait::async_trait;
use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::{
    InlineKeyboardButton, InlineKeyboardMarkup, Message, MessageId, ReplyParameters,
};

use crate::core::AppResult;
use crate::dispatch::event::{KeyboardButton, RepliedMessage};
use crate::dispatch::{Dispatcher, InboundEvent, OutboundResponse, ResponseSink};
use crate::i18n;
use crate::storage::db::{self, create_user, create_user_with_language, get_user};
use crate::storage::get_connection;
use crate::telegram::Bot;

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub db_pool: Arc<db::DbPool>,
    pub engine: Arc<Dispatcher>,
}

impl HandlerDeps {
    pub fn new(db_pool: Arc<db::DbPool>, engine: Arc<Dispatcher>) -> Self {
        Self { db_pool, engine }
    }
}

/// User info extracted from a Telegram message
#[derive(Clone)]
pub struct UserInfo {
    pub chat_id: i64,
    pub user_id: i64,
    pub username: Option<String>,
    pub language_code: Option<String>,
}

impl UserInfo {
    /// Extract user info from a Telegram message
    pub fn from_message(msg: &Message) -> Option<Self> {
        let from = msg.from.as_ref()?;
        Some(Self {
            chat_id: msg.chat.id.0,
            user_id: from.id.0 as i64,
            username: from.username.clone(),
            language_code: from.language_code.clone(),
        })
    }
}

/// Ensures the user and chat rows exist before dispatch touches them.
/// Failures are logged, not fatal: the engine treats missing rows as guest.
pub fn ensure_user_exists(db_pool: &Arc<db::DbPool>, user: &UserInfo, chat_title: Option<&str>) {
    let conn = match get_connection(db_pool) {
        Ok(conn) => conn,
        Err(err) => {
            log::warn!("Failed to get database connection: {}", err);
            return;
        }
    };

    if let Ok(None) = get_user(&conn, user.user_id) {
        let created = match user.language_code.as_deref().and_then(i18n::is_language_supported) {
            Some(lang) => create_user_with_language(&conn, user.user_id, user.username.clone(), lang),
            None => create_user(&conn, user.user_id, user.username.clone()),
        };
        match created {
            Ok(()) => log::info!("Registered new user {} ({:?})", user.user_id, user.username),
            Err(err) => log::warn!("Failed to create user {}: {}", user.user_id, err),
        }
    }

    if let Err(err) = db::upsert_chat(&conn, user.chat_id, chat_title) {
        log::warn!("Failed to register chat {}: {}", user.chat_id, err);
    }
}

/// Sink that delivers analyzer-triggered responses through the bot.
pub struct TelegramSink {
    bot: Bot,
}

impl TelegramSink {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl ResponseSink for TelegramSink {
    async fn deliver(&self, response: OutboundResponse) -> AppResult<()> {
        send_response(&self.bot, response).await
    }
}

/// Sends one engine response through the Telegram API.
pub async fn send_response(bot: &Bot, response: OutboundResponse) -> AppResult<()> {
    let mut request = bot.send_message(ChatId(response.chat_id), response.text);
    if let Some(message_id) = response.reply_to_message_id {
        request = request.reply_parameters(ReplyParameters::new(MessageId(message_id)));
    }
    if let Some(keyboard) = response.keyboard {
        request = request.reply_markup(to_inline_keyboard(keyboard));
    }
    request.await?;
    Ok(())
}

fn to_inline_keyboard(rows: Vec<Vec<KeyboardButton>>) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(
        rows.into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|button| InlineKeyboardButton::callback(button.text, button.callback_data))
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>(),
    )
}

/// Creates the main dispatcher schema for the Telegram bot.
///
/// The same handler tree is used in production and in integration tests.
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let deps_messages = deps.clone();
    let deps_callback = deps;

    dptree::entry()
        .branch(message_handler(deps_messages))
        .branch(callback_handler(deps_callback))
}

/// Handler for plain text messages
fn message_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message().endpoint(move |bot: Bot, msg: Message| {
        let deps = deps.clone();
        async move {
            let Some(text) = msg.text() else { return Ok(()) };
            let Some(user) = UserInfo::from_message(&msg) else { return Ok(()) };

            ensure_user_exists(&deps.db_pool, &user, msg.chat.title());

            let reply_to = msg.reply_to_message().and_then(|replied| {
                replied.from.as_ref().map(|author| RepliedMessage {
                    message_id: replied.id.0,
                    user_id: author.id.0 as i64,
                    text: replied.text().map(str::to_string),
                })
            });

            let event = InboundEvent::TextMessage {
                chat_id: user.chat_id,
                user_id: user.user_id,
                message_id: msg.id.0,
                text: text.to_string(),
                reply_to,
            };

            dispatch_and_reply(&bot, &deps, &event, user.user_id).await;
            Ok(())
        }
    })
}

/// Handler for callback queries (inline keyboard buttons)
fn callback_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
        let deps = deps.clone();
        async move {
            // Stop the client's loading spinner whatever happens next.
            if let Err(err) = bot.answer_callback_query(q.id.clone()).await {
                log::warn!("Failed to answer callback query: {}", err);
            }

            let Some(data) = q.data.clone() else { return Ok(()) };
            let Some(message) = q.message.as_ref() else { return Ok(()) };

            let event = InboundEvent::CallbackQuery {
                chat_id: message.chat().id.0,
                user_id: q.from.id.0 as i64,
                message_id: message.id().0,
                data,
            };

            dispatch_and_reply(&bot, &deps, &event, q.from.id.0 as i64).await;
            Ok(())
        }
    })
}

/// Runs one event through the engine and delivers the primary response.
/// Engine errors surface to the user as a generic failure; the rest of the
/// system keeps running.
async fn dispatch_and_reply(bot: &Bot, deps: &HandlerDeps, event: &InboundEvent, user_id: i64) {
    match deps.engine.dispatch(event, 0).await {
        Ok(Some(response)) => {
            if let Err(err) = send_response(bot, response).await {
                log::warn!("Failed to send response: {}", err);
            }
        }
        Ok(None) => {}
        Err(err) => {
            let ev = event.normalized();
            log::error!(
                "Dispatch failed for chat {} user {}: {}",
                ev.identity.chat_id,
                user_id,
                err
            );
            let lang = i18n::user_lang_from_pool(&deps.db_pool, user_id);
            let notice = OutboundResponse::text(ev.identity.chat_id, i18n::t(&lang, "dispatch.internal-error"));
            if let Err(send_err) = send_response(bot, notice).await {
                log::warn!("Failed to send error notice: {}", send_err);
            }
        }
    }
}
