//! Wrong-keyboard-layout analyzer
//!
//! "Ghbdtn" is "Привет" typed with the keyboard still in the Latin layout.
//! The heuristic looks for text that is entirely ASCII yet reads like
//! noise — almost no Latin vowels plus a layout-signature character or a
//! long consonant run — and synthesizes the layout-correction command with
//! the same text.

use async_trait::async_trait;
use lazy_regex::regex;

use crate::core::config;
use crate::core::AppResult;
use crate::dispatch::analyzer::{Analyzer, SyntheticInvocation};
use crate::dispatch::event::NormalizedEvent;
use crate::dispatch::handler::HandlerContext;
use crate::dispatch::registry::CommandId;

pub struct TurnAnalyzer;

/// True when `text` looks like Russian typed in the Latin layout.
pub fn looks_mistyped(text: &str) -> bool {
    let text = text.trim();
    if text.chars().count() < config::turn::MIN_TEXT_LEN {
        return false;
    }
    // Any real Cyrillic means the layout was right after all.
    if text.chars().any(|c| c.is_alphabetic() && !c.is_ascii_alphabetic()) {
        return false;
    }

    let letters = text.chars().filter(|c| c.is_ascii_alphabetic()).count();
    if letters == 0 {
        return false;
    }
    let vowels = text.chars().filter(|c| "aeiouyAEIOUY".contains(*c)).count();
    let vowel_ratio = vowels as f64 / letters as f64;

    let has_signature = text.contains(';')
        || text.contains('[')
        || text.contains(']')
        || text.contains('\'')
        || regex!(r"(?i)[bcdfghjklmnpqrstvwxz]{4,}").is_match(text);

    vowel_ratio < 0.3 && has_signature
}

#[async_trait]
impl Analyzer for TurnAnalyzer {
    fn name(&self) -> &'static str {
        "turn"
    }

    async fn observe(
        &self,
        _ctx: &HandlerContext,
        event: &NormalizedEvent,
        matched: Option<CommandId>,
    ) -> AppResult<Option<SyntheticInvocation>> {
        if event.is_callback || matched.is_some() {
            return Ok(None);
        }
        if !looks_mistyped(&event.raw_text) {
            return Ok(None);
        }

        Ok(Some(SyntheticInvocation {
            command: CommandId::Turn,
            arg_text: event.raw_text.trim().to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_mistyped_russian() {
        // "Привет, как дела?" on a Latin layout
        assert!(looks_mistyped("Ghbdtn? rfr ltkf&"));
        assert!(looks_mistyped("ghbdtn"));
        // "Жду тебя" → ";le nt,z"
        assert!(looks_mistyped(";le nt,z  "));
    }

    #[test]
    fn test_leaves_english_alone() {
        assert!(!looks_mistyped("hello there"));
        assert!(!looks_mistyped("see you tomorrow"));
    }

    #[test]
    fn test_leaves_cyrillic_and_short_text_alone() {
        assert!(!looks_mistyped("привет"));
        assert!(!looks_mistyped("ok"));
        assert!(!looks_mistyped("lol"));
        assert!(!looks_mistyped("12345 67890"));
    }
}
