//! Greeting, and the one-time first-admin bootstrap
//!
//! The first user to talk to a fresh deployment becomes its administrator;
//! after that, levels change only through the grant command.

use async_trait::async_trait;

use crate::core::AppResult;
use crate::dispatch::access::AccessLevel;
use crate::dispatch::{CommandHandler, HandlerContext, Identity, Outcome, OutboundResponse};
use crate::i18n;
use crate::storage::db;

pub struct StartCommand;

#[async_trait]
impl CommandHandler for StartCommand {
    async fn handle(&self, ctx: &HandlerContext, identity: Identity, _arg_text: &str) -> AppResult<Outcome> {
        let lang = i18n::user_lang_from_pool(&ctx.db_pool, identity.user_id);
        let mut text = i18n::t(&lang, "start.greeting");

        let conn = db::get_connection(&ctx.db_pool)?;
        let admin_level = AccessLevel::Admin.as_i64();
        if db::count_admins(&conn, admin_level)? == 0 {
            db::set_user_level(&conn, identity.user_id, admin_level)?;
            log::info!("Bootstrapped user {} as the first admin", identity.user_id);
            text.push('\n');
            text.push_str(&i18n::t(&lang, "start.bootstrap"));
        }

        Ok(Outcome::Completed(OutboundResponse::text(identity.chat_id, text)))
    }
}
