//! Weather: the canonical multi-turn command
//!
//! With no city the handler asks for one and the engine parks a waiting
//! record; the next plain message from the same identity completes the
//! invocation. The report itself is canned — this bot carries no weather
//! upstream.

use async_trait::async_trait;
use fluent_templates::fluent_bundle::FluentArgs;

use crate::core::AppResult;
use crate::dispatch::{CommandHandler, HandlerContext, Identity, Outcome, OutboundResponse};
use crate::i18n;

pub struct WeatherCommand;

#[async_trait]
impl CommandHandler for WeatherCommand {
    async fn handle(&self, ctx: &HandlerContext, identity: Identity, arg_text: &str) -> AppResult<Outcome> {
        let lang = i18n::user_lang_from_pool(&ctx.db_pool, identity.user_id);

        let city = arg_text.trim();
        if city.is_empty() {
            return Ok(Outcome::NeedsMoreInput(i18n::t(&lang, "weather.ask-city")));
        }

        let mut args = FluentArgs::new();
        args.set("city", city);
        Ok(Outcome::Completed(OutboundResponse::text(
            identity.chat_id,
            i18n::t_args(&lang, "weather.report", &args),
        )))
    }
}
