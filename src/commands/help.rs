//! Help: localized command list, or one entry for a given token
//!
//! The list is filtered to what the invoker's effective level can actually
//! run. Buttons carry the localized command name as their callback data,
//! so pressing one dispatches that command through the callback path.

use async_trait::async_trait;

use crate::core::AppResult;
use crate::dispatch::access;
use crate::dispatch::event::KeyboardButton;
use crate::dispatch::{CommandHandler, HandlerContext, Identity, Outcome, OutboundResponse};
use crate::i18n;
use crate::storage::db;

pub struct HelpCommand;

#[async_trait]
impl CommandHandler for HelpCommand {
    async fn handle(&self, ctx: &HandlerContext, identity: Identity, arg_text: &str) -> AppResult<Outcome> {
        let lang = i18n::user_lang_from_pool(&ctx.db_pool, identity.user_id);

        // "help <token>" shows a single entry for any spelling of a command.
        let token = arg_text.trim();
        if !token.is_empty() {
            let text = ctx
                .registry
                .help_for(&lang, token)
                .unwrap_or_else(|| i18n::t(&lang, "help.unknown"));
            return Ok(Outcome::Completed(OutboundResponse::text(identity.chat_id, text)));
        }

        let effective = {
            let conn = db::get_connection(&ctx.db_pool)?;
            access::effective_level(
                db::get_user_level(&conn, identity.user_id)?,
                db::get_chat_level(&conn, identity.chat_id)?,
            )
        };

        let mut lines = vec![i18n::t(&lang, "help.header")];
        let mut buttons = Vec::new();
        for spec in ctx.registry.commands() {
            if !access::is_permitted(effective, spec.required_level.as_i64()) {
                continue;
            }
            let display = i18n::command_display(&lang, spec.id.key());
            lines.push(format!("{} — {}", display, i18n::command_help(&lang, spec.id.key())));
            buttons.push(KeyboardButton {
                text: display.clone(),
                callback_data: display,
            });
        }

        let keyboard: Vec<Vec<KeyboardButton>> = buttons.chunks(2).map(|row| row.to_vec()).collect();

        Ok(Outcome::Completed(
            OutboundResponse::text(identity.chat_id, lines.join("\n")).with_keyboard(keyboard),
        ))
    }
}
