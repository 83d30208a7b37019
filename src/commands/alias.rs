//! Alias management: personal text macros
//!
//! `alias <name> <text…>` saves, `alias del <name>` deletes, bare `alias`
//! lists. Names are stored lowercased because resolution lowercases the
//! inbound text. Deletion is owner-only; that check lives here, in the
//! dispatch layer, not in the store.

use async_trait::async_trait;
use fluent_templates::fluent_bundle::FluentArgs;

use crate::core::{AppError, AppResult};
use crate::dispatch::{CommandHandler, HandlerContext, Identity, Outcome, OutboundResponse};
use crate::i18n;
use crate::storage::db;

pub struct AliasCommand;

#[async_trait]
impl CommandHandler for AliasCommand {
    async fn handle(&self, ctx: &HandlerContext, identity: Identity, arg_text: &str) -> AppResult<Outcome> {
        let lang = i18n::user_lang_from_pool(&ctx.db_pool, identity.user_id);
        let conn = db::get_connection(&ctx.db_pool)?;

        let trimmed = arg_text.trim();

        // Bare invocation: list the caller's macros.
        if trimmed.is_empty() {
            let aliases = db::list_aliases(&conn, identity.chat_id, identity.user_id)?;
            if aliases.is_empty() {
                return Ok(Outcome::Completed(OutboundResponse::text(
                    identity.chat_id,
                    i18n::t(&lang, "alias.empty"),
                )));
            }
            let mut lines = vec![i18n::t(&lang, "alias.list-header")];
            for alias in aliases {
                lines.push(format!("{} → {}", alias.name, alias.value));
            }
            return Ok(Outcome::Completed(OutboundResponse::text(
                identity.chat_id,
                lines.join("\n"),
            )));
        }

        let mut parts = trimmed.splitn(2, char::is_whitespace);
        let first = parts.next().unwrap_or_default().to_lowercase();
        let rest = parts.next().unwrap_or_default().trim();

        if first == "del" {
            let name = rest.to_lowercase();
            if name.is_empty() {
                return Err(AppError::InvalidInput(i18n::t(&lang, "alias.usage")));
            }
            let mut args = FluentArgs::new();
            args.set("name", name.clone());

            let found = db::get_alias(&conn, identity.chat_id, identity.user_id, &name)?;
            return match found {
                None => Err(AppError::InvalidInput(i18n::t_args(&lang, "alias.not-found", &args))),
                Some(alias) if alias.user_id != identity.user_id => {
                    // Only the creating user may delete their macro.
                    Err(AppError::InvalidInput(i18n::t(&lang, "alias.not-owner")))
                }
                Some(alias) => {
                    db::remove_alias(&conn, alias.id)?;
                    Ok(Outcome::Completed(OutboundResponse::text(
                        identity.chat_id,
                        i18n::t_args(&lang, "alias.removed", &args),
                    )))
                }
            };
        }

        // Save form: first token is the name, the rest is the macro text.
        if rest.is_empty() {
            return Err(AppError::InvalidInput(i18n::t(&lang, "alias.usage")));
        }
        db::save_alias(&conn, identity.chat_id, identity.user_id, &first, rest)?;
        log::debug!(
            "Saved alias '{}' for chat {} user {}",
            first,
            identity.chat_id,
            identity.user_id
        );

        let mut args = FluentArgs::new();
        args.set("name", first);
        args.set("value", rest.to_string());
        Ok(Outcome::Completed(OutboundResponse::text(
            identity.chat_id,
            i18n::t_args(&lang, "alias.saved", &args),
        )))
    }
}
