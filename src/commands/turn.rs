//! Keyboard-layout correction
//!
//! Maps text typed on the wrong layout to the one the author meant:
//! QWERTY → ЙЦУКЕН when the text is Latin, the reverse otherwise.

use async_trait::async_trait;

use crate::core::AppResult;
use crate::dispatch::{CommandHandler, HandlerContext, Identity, Outcome, OutboundResponse};
use crate::i18n;

/// Character pairs of the two layouts on the same physical keys.
const LAYOUT_PAIRS: &[(char, char)] = &[
    ('q', 'й'),
    ('w', 'ц'),
    ('e', 'у'),
    ('r', 'к'),
    ('t', 'е'),
    ('y', 'н'),
    ('u', 'г'),
    ('i', 'ш'),
    ('o', 'щ'),
    ('p', 'з'),
    ('[', 'х'),
    (']', 'ъ'),
    ('a', 'ф'),
    ('s', 'ы'),
    ('d', 'в'),
    ('f', 'а'),
    ('g', 'п'),
    ('h', 'р'),
    ('j', 'о'),
    ('k', 'л'),
    ('l', 'д'),
    (';', 'ж'),
    ('\'', 'э'),
    ('z', 'я'),
    ('x', 'ч'),
    ('c', 'с'),
    ('v', 'м'),
    ('b', 'и'),
    ('n', 'т'),
    ('m', 'ь'),
    (',', 'б'),
    ('.', 'ю'),
    ('`', 'ё'),
    ('&', '?'),
    ('?', ','),
    ('/', '.'),
];

/// Converts one character between layouts, preserving case.
fn swap_char(c: char, latin_to_cyrillic: bool) -> char {
    let lower = c.to_lowercase().next().unwrap_or(c);
    let mapped = LAYOUT_PAIRS.iter().find_map(|&(latin, cyrillic)| {
        if latin_to_cyrillic && lower == latin {
            Some(cyrillic)
        } else if !latin_to_cyrillic && lower == cyrillic {
            Some(latin)
        } else {
            None
        }
    });

    match mapped {
        Some(m) if c.is_uppercase() => m.to_uppercase().next().unwrap_or(m),
        Some(m) => m,
        None => c,
    }
}

/// Converts whole text, choosing the direction by which script dominates.
pub fn swap_layout(text: &str) -> String {
    let latin = text.chars().filter(|c| c.is_ascii_alphabetic()).count();
    let cyrillic = text.chars().filter(|c| c.is_alphabetic() && !c.is_ascii_alphabetic()).count();
    let latin_to_cyrillic = latin >= cyrillic;

    text.chars().map(|c| swap_char(c, latin_to_cyrillic)).collect()
}

pub struct TurnCommand;

#[async_trait]
impl CommandHandler for TurnCommand {
    async fn handle(&self, ctx: &HandlerContext, identity: Identity, arg_text: &str) -> AppResult<Outcome> {
        let text = arg_text.trim();
        if text.is_empty() {
            let lang = i18n::user_lang_from_pool(&ctx.db_pool, identity.user_id);
            return Ok(Outcome::NeedsMoreInput(i18n::t(&lang, "turn.ask-text")));
        }

        Ok(Outcome::Completed(OutboundResponse::text(
            identity.chat_id,
            swap_layout(text),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_latin_to_cyrillic() {
        assert_eq!(swap_layout("ghbdtn"), "привет");
        assert_eq!(swap_layout("rfr ltkf"), "как дела");
    }

    #[test]
    fn test_preserves_case() {
        assert_eq!(swap_layout("Ghbdtn"), "Привет");
    }

    #[test]
    fn test_cyrillic_back_to_latin() {
        assert_eq!(swap_layout("руддщ"), "hello");
    }

    #[test]
    fn test_digits_and_spaces_pass_through() {
        assert_eq!(swap_layout("ghbdtn 123"), "привет 123");
    }
}
