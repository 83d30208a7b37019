//! Bot initialization
//!
//! Creates the teloxide bot instance and publishes the command menu.
//! The menu only advertises the Latin spellings — Telegram's slash-command
//! UI cannot carry Cyrillic names, but the dispatcher resolves them all
//! the same.

use teloxide::prelude::*;
use teloxide::types::BotCommand;
use strum::IntoEnumIterator;

use crate::core::config;
use crate::dispatch::CommandId;
use crate::i18n;

pub type Bot = teloxide::Bot;

/// Creates a Bot instance from the configured token
///
/// # Returns
/// * `Ok(Bot)` - Successfully created bot instance
/// * `Err(anyhow::Error)` - BOT_TOKEN is not configured
pub fn create_bot() -> anyhow::Result<Bot> {
    let token = config::BOT_TOKEN.clone();
    if token.is_empty() {
        return Err(anyhow::anyhow!("BOT_TOKEN environment variable not set"));
    }
    Ok(Bot::new(token))
}

/// Sets up bot commands in Telegram UI
///
/// One entry per canonical command, described in the default locale.
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    let ru = i18n::lang_from_code("ru");
    let commands: Vec<BotCommand> = CommandId::iter()
        .map(|id| BotCommand::new(id.key(), i18n::command_help(&ru, id.key())))
        .collect();

    bot.set_my_commands(commands).await?;
    Ok(())
}
