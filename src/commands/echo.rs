//! Echo: repeat the argument back
//!
//! Doubles as the talker analyzer's mouthpiece — generated phrases are
//! dispatched as echo invocations so they travel the same path as
//! everything else.

use async_trait::async_trait;

use crate::core::AppResult;
use crate::dispatch::{CommandHandler, HandlerContext, Identity, Outcome, OutboundResponse};
use crate::i18n;

pub struct EchoCommand;

#[async_trait]
impl CommandHandler for EchoCommand {
    async fn handle(&self, ctx: &HandlerContext, identity: Identity, arg_text: &str) -> AppResult<Outcome> {
        let text = arg_text.trim();
        if text.is_empty() {
            let lang = i18n::user_lang_from_pool(&ctx.db_pool, identity.user_id);
            return Ok(Outcome::NeedsMoreInput(i18n::t(&lang, "echo.ask-text")));
        }

        Ok(Outcome::Completed(OutboundResponse::text(identity.chat_id, text)))
    }
}
