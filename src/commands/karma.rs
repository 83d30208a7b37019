//! Karma: show or adjust per-chat reputation
//!
//! Bare invocation shows the sender's own score. The adjust form
//! `+ <user_id>` / `- <user_id>` is normally synthesized by the karma
//! analyzer from a "+"/"-" reply, but typing it works the same way.

use async_trait::async_trait;
use fluent_templates::fluent_bundle::FluentArgs;

use crate::core::{AppError, AppResult};
use crate::dispatch::{CommandHandler, HandlerContext, Identity, Outcome, OutboundResponse};
use crate::i18n;
use crate::storage::db;

pub struct KarmaCommand;

#[async_trait]
impl CommandHandler for KarmaCommand {
    async fn handle(&self, ctx: &HandlerContext, identity: Identity, arg_text: &str) -> AppResult<Outcome> {
        let lang = i18n::user_lang_from_pool(&ctx.db_pool, identity.user_id);
        let conn = db::get_connection(&ctx.db_pool)?;

        let mut parts = arg_text.split_whitespace();
        let Some(sign) = parts.next() else {
            // Bare invocation: own score.
            let score = db::get_karma(&conn, identity.chat_id, identity.user_id)?;
            let mut args = FluentArgs::new();
            args.set("score", score);
            return Ok(Outcome::Completed(OutboundResponse::text(
                identity.chat_id,
                i18n::t_args(&lang, "karma.own-score", &args),
            )));
        };

        let delta = match sign {
            "+" => 1,
            "-" => -1,
            _ => return Err(AppError::InvalidInput(i18n::t(&lang, "karma.bad-target"))),
        };
        let target: i64 = parts
            .next()
            .and_then(|raw| raw.parse().ok())
            .ok_or_else(|| AppError::InvalidInput(i18n::t(&lang, "karma.bad-target")))?;

        if target == identity.user_id {
            return Err(AppError::InvalidInput(i18n::t(&lang, "karma.self-vote")));
        }

        let score = db::adjust_karma(&conn, identity.chat_id, target, delta)?;
        log::info!(
            "Karma of user {} in chat {} adjusted by {} (now {})",
            target,
            identity.chat_id,
            delta,
            score
        );

        let mut args = FluentArgs::new();
        args.set("target", target);
        args.set("score", score);
        Ok(Outcome::Completed(OutboundResponse::text(
            identity.chat_id,
            i18n::t_args(&lang, "karma.changed", &args),
        )))
    }
}
