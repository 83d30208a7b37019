//! Privilege grant: `level <user_id> <level name>`
//!
//! The only way a level changes after the first-admin bootstrap. The
//! dispatcher's gate already guarantees the invoker is an admin.

use std::str::FromStr;

use async_trait::async_trait;
use fluent_templates::fluent_bundle::FluentArgs;

use crate::core::{AppError, AppResult};
use crate::dispatch::access::AccessLevel;
use crate::dispatch::{CommandHandler, HandlerContext, Identity, Outcome, OutboundResponse};
use crate::i18n;
use crate::storage::db;

pub struct LevelCommand;

#[async_trait]
impl CommandHandler for LevelCommand {
    async fn handle(&self, ctx: &HandlerContext, identity: Identity, arg_text: &str) -> AppResult<Outcome> {
        let lang = i18n::user_lang_from_pool(&ctx.db_pool, identity.user_id);

        let mut parts = arg_text.split_whitespace();
        let (Some(target_raw), Some(level_raw)) = (parts.next(), parts.next()) else {
            return Err(AppError::InvalidInput(i18n::t(&lang, "level.usage")));
        };

        let target: i64 = target_raw
            .parse()
            .map_err(|_| AppError::InvalidInput(i18n::t(&lang, "level.usage")))?;

        let level = AccessLevel::from_str(&level_raw.to_lowercase()).map_err(|_| {
            let mut args = FluentArgs::new();
            args.set("name", level_raw.to_string());
            AppError::InvalidInput(i18n::t_args(&lang, "level.unknown-level", &args))
        })?;

        let conn = db::get_connection(&ctx.db_pool)?;
        db::set_user_level(&conn, target, level.as_i64())?;
        log::info!(
            "User {} granted level {} to user {} in chat {}",
            identity.user_id,
            level,
            target,
            identity.chat_id
        );

        let mut args = FluentArgs::new();
        args.set("target", target);
        args.set("level", level.to_string());
        Ok(Outcome::Completed(OutboundResponse::text(
            identity.chat_id,
            i18n::t_args(&lang, "level.granted", &args),
        )))
    }
}
