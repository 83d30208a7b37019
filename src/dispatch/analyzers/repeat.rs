//! Repeat analyzer
//!
//! A message that is exactly "." re-runs the chat's last command. The
//! synthesized invocation carries the *current* sender's identity, so the
//! access gate judges the repeater, not whoever ran the command first.

use async_trait::async_trait;

use crate::core::AppResult;
use crate::dispatch::analyzer::{Analyzer, SyntheticInvocation};
use crate::dispatch::event::NormalizedEvent;
use crate::dispatch::handler::HandlerContext;
use crate::dispatch::registry::CommandId;
use crate::storage::db;

use std::str::FromStr;

pub struct RepeatAnalyzer;

#[async_trait]
impl Analyzer for RepeatAnalyzer {
    fn name(&self) -> &'static str {
        "repeat"
    }

    async fn observe(
        &self,
        ctx: &HandlerContext,
        event: &NormalizedEvent,
        _matched: Option<CommandId>,
    ) -> AppResult<Option<SyntheticInvocation>> {
        if event.is_callback || event.raw_text.trim() != "." {
            return Ok(None);
        }

        let conn = db::get_connection(&ctx.db_pool)?;
        let Some(stored) = db::get_last_command(&conn, event.identity.chat_id)? else {
            return Ok(None);
        };

        // A command renamed since it was recorded simply has nothing to
        // repeat.
        let Ok(command) = CommandId::from_str(&stored) else {
            log::warn!(
                "Last command '{}' of chat {} no longer resolves",
                stored,
                event.identity.chat_id
            );
            return Ok(None);
        };

        Ok(Some(SyntheticInvocation {
            command,
            arg_text: String::new(),
        }))
    }
}
