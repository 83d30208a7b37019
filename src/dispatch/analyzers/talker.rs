//! Talker analyzer
//!
//! Listens to plain chat messages and accumulates a word→next-word table
//! per chat. With a small per-chat probability it volunteers a reply:
//! a phrase chained from the table, sent through the echo command so the
//! reply goes through the same dispatch path as everything else.

use async_trait::async_trait;
use rand::RngExt;

use crate::core::config;
use crate::core::AppResult;
use crate::dispatch::analyzer::{Analyzer, SyntheticInvocation};
use crate::dispatch::event::NormalizedEvent;
use crate::dispatch::handler::HandlerContext;
use crate::dispatch::registry::CommandId;
use crate::storage::db;

pub struct TalkerAnalyzer {
    /// Trigger probability used when the chat has not configured its own.
    default_probability: f64,
}

impl TalkerAnalyzer {
    pub fn new() -> Self {
        Self {
            default_probability: config::talker::DEFAULT_TRIGGER_PROBABILITY,
        }
    }

    /// Probability override for tests: 1.0 always replies, 0.0 never does.
    pub fn with_probability(probability: f64) -> Self {
        Self {
            default_probability: probability,
        }
    }

    /// Chains a phrase from the association table, starting at a word of
    /// the inbound message. Returns None while the chat's table is still
    /// too thin to continue even one word.
    fn generate_reply(
        &self,
        conn: &db::DbConnection,
        chat_id: i64,
        seed_words: &[&str],
    ) -> AppResult<Option<String>> {
        let mut rng = rand::rng();
        let start = seed_words[rng.random_range(0..seed_words.len())];

        let mut phrase: Vec<String> = vec![start.to_string()];
        let mut current = start.to_string();

        while phrase.len() < config::talker::MAX_REPLY_WORDS {
            let continuations = db::get_next_words(conn, chat_id, &current)?;
            if continuations.is_empty() {
                break;
            }
            current = continuations[rng.random_range(0..continuations.len())].clone();
            phrase.push(current.clone());
        }

        if phrase.len() < 2 {
            return Ok(None);
        }
        Ok(Some(phrase.join(" ")))
    }
}

impl Default for TalkerAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Splits a message into the lowercase words the table is keyed by.
fn words_of(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|w| !w.is_empty())
        .collect()
}

#[async_trait]
impl Analyzer for TalkerAnalyzer {
    fn name(&self) -> &'static str {
        "talker"
    }

    async fn observe(
        &self,
        ctx: &HandlerContext,
        event: &NormalizedEvent,
        matched: Option<CommandId>,
    ) -> AppResult<Option<SyntheticInvocation>> {
        // Commands and button presses are not conversation; nothing to learn.
        if event.is_callback || matched.is_some() {
            return Ok(None);
        }

        let words = words_of(&event.raw_text);
        if words.len() < config::talker::MIN_LEARN_WORDS {
            return Ok(None);
        }

        let chat_id = event.identity.chat_id;
        let conn = db::get_connection(&ctx.db_pool)?;

        for pair in words.windows(2) {
            db::add_talker_pair(&conn, chat_id, &pair[0], &pair[1])?;
        }

        let probability = db::get_talker_probability(&conn, chat_id)?.unwrap_or(self.default_probability);
        if rand::rng().random::<f64>() >= probability {
            return Ok(None);
        }

        let seeds: Vec<&str> = words.iter().map(String::as_str).collect();
        let Some(reply) = self.generate_reply(&conn, chat_id, &seeds)? else {
            return Ok(None);
        };

        Ok(Some(SyntheticInvocation {
            command: CommandId::Echo,
            arg_text: reply,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_words_of_strips_punctuation_and_case() {
        assert_eq!(words_of("Привет, Кот!"), vec!["привет", "кот"]);
        assert_eq!(words_of("  a  B,, c. "), vec!["a", "b", "c"]);
        assert!(words_of("...").is_empty());
    }

    #[test]
    fn test_words_keep_inner_hyphens() {
        // Only leading/trailing punctuation is trimmed.
        assert_eq!(words_of("кот-баюн спит"), vec!["кот-баюн", "спит"]);
    }
}
