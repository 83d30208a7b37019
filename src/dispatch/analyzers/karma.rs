//! Karma analyzer
//!
//! A reply whose text starts with a recognized "+"/"-" token is a karma
//! vote for the replied-to author. The analyzer only recognizes the
//! gesture; the karma command itself validates the target and applies the
//! change under its own access requirement.

use async_trait::async_trait;
use lazy_regex::regex;

use crate::core::AppResult;
use crate::dispatch::analyzer::{Analyzer, SyntheticInvocation};
use crate::dispatch::event::NormalizedEvent;
use crate::dispatch::handler::HandlerContext;
use crate::dispatch::registry::CommandId;

pub struct KarmaAnalyzer;

/// Recognized vote tokens at the start of a reply: +, ++, +1, -, --, -1.
fn vote_direction(text: &str) -> Option<i64> {
    let captures = regex!(r"^(\+\+|\+1|\+|--|-1|-)(\s|$)").captures(text.trim())?;
    let token = captures.get(1)?.as_str();
    Some(if token.starts_with('+') { 1 } else { -1 })
}

#[async_trait]
impl Analyzer for KarmaAnalyzer {
    fn name(&self) -> &'static str {
        "karma"
    }

    async fn observe(
        &self,
        _ctx: &HandlerContext,
        event: &NormalizedEvent,
        _matched: Option<CommandId>,
    ) -> AppResult<Option<SyntheticInvocation>> {
        if event.is_callback {
            return Ok(None);
        }
        let Some(reply) = &event.reply_to else {
            return Ok(None);
        };
        let Some(direction) = vote_direction(&event.raw_text) else {
            return Ok(None);
        };

        let sign = if direction > 0 { "+" } else { "-" };
        Ok(Some(SyntheticInvocation {
            command: CommandId::Karma,
            arg_text: format!("{} {}", sign, reply.user_id),
        }))
    }
}
