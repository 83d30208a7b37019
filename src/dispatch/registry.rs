//! Command registry
//!
//! Built once at startup: every localized spelling of every command (Latin
//! and Cyrillic) maps to a canonical [`CommandId`], which is the key used
//! everywhere else — waiting records, last-command records, metrics. The
//! localized strings never leave this module's lookup tables.

use std::collections::HashMap;
use std::sync::Arc;

use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use unic_langid::LanguageIdentifier;

use crate::dispatch::access::AccessLevel;
use crate::dispatch::handler::CommandHandler;
use crate::i18n;

/// Canonical command identities. Stable across locales and releases;
/// stored in the database as their lowercase names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum CommandId {
    Start,
    Help,
    Weather,
    Echo,
    Turn,
    Karma,
    Alias,
    Level,
}

impl CommandId {
    /// Lowercase key used for i18n lookups, persistence and metric labels.
    pub fn key(self) -> &'static str {
        match self {
            CommandId::Start => "start",
            CommandId::Help => "help",
            CommandId::Weather => "weather",
            CommandId::Echo => "echo",
            CommandId::Turn => "turn",
            CommandId::Karma => "karma",
            CommandId::Alias => "alias",
            CommandId::Level => "level",
        }
    }

    /// Minimum access level the command requires.
    pub fn required_level(self) -> AccessLevel {
        match self {
            CommandId::Start | CommandId::Help | CommandId::Weather | CommandId::Echo | CommandId::Turn => {
                AccessLevel::Guest
            }
            CommandId::Karma | CommandId::Alias => AccessLevel::Trusted,
            CommandId::Level => AccessLevel::Admin,
        }
    }
}

/// Everything the engine knows about one command. Immutable after startup.
pub struct CommandSpec {
    pub id: CommandId,
    pub required_level: AccessLevel,
    /// Every spelling across every locale, lowercased.
    pub spellings: Vec<String>,
}

/// Name→identity and identity→handler lookups, built once.
pub struct CommandRegistry {
    by_name: HashMap<String, CommandId>,
    specs: HashMap<CommandId, CommandSpec>,
    handlers: HashMap<CommandId, Arc<dyn CommandHandler>>,
    /// Longest spelling measured in whitespace tokens; bounds how many
    /// leading tokens resolution has to try.
    max_name_tokens: usize,
}

impl CommandRegistry {
    /// Builds the registry from the handler map, pulling every spelling of
    /// every command out of the locale files.
    pub fn build(handlers: HashMap<CommandId, Arc<dyn CommandHandler>>) -> Self {
        let mut by_name = HashMap::new();
        let mut specs = HashMap::new();
        let mut max_name_tokens = 1;

        for id in CommandId::iter() {
            let spellings = i18n::command_spellings(id.key());
            if spellings.is_empty() {
                log::warn!("Command {} has no spellings in any locale", id.key());
            }

            for name in &spellings {
                max_name_tokens = max_name_tokens.max(name.split_whitespace().count());
                if let Some(previous) = by_name.insert(name.clone(), id) {
                    if previous != id {
                        log::error!("Spelling '{}' is claimed by both {} and {}", name, previous, id);
                    }
                }
            }

            specs.insert(
                id,
                CommandSpec {
                    id,
                    required_level: id.required_level(),
                    spellings,
                },
            );
        }

        Self {
            by_name,
            specs,
            handlers,
            max_name_tokens,
        }
    }

    /// Resolves the longest leading token run of `raw` to a command.
    ///
    /// Matching is case-insensitive; a leading slash and a `@botname`
    /// suffix on the first token are ignored, so "/weather@bayun_bot
    /// Berlin", "Weather Berlin" and "погода Берлин" all resolve. The
    /// remainder becomes the argument string. An unknown token is not an
    /// error — the caller falls through to alias and analyzer handling.
    pub fn resolve(&self, raw: &str) -> Option<(CommandId, String)> {
        let original: Vec<&str> = raw.split_whitespace().collect();
        let mut lowered: Vec<String> = original.iter().map(|t| t.to_lowercase()).collect();
        let first = lowered.first_mut()?;
        *first = strip_command_decorations(first);

        let mut best: Option<(CommandId, usize)> = None;
        for take in 1..=lowered.len().min(self.max_name_tokens) {
            let candidate = lowered[..take].join(" ");
            if let Some(&id) = self.by_name.get(candidate.as_str()) {
                best = Some((id, take));
            }
        }

        // Matching is case-insensitive, but the argument keeps its
        // original casing.
        best.map(|(id, take)| (id, original[take..].join(" ")))
    }

    pub fn spec(&self, id: CommandId) -> Option<&CommandSpec> {
        self.specs.get(&id)
    }

    pub fn handler(&self, id: CommandId) -> Option<Arc<dyn CommandHandler>> {
        self.handlers.get(&id).cloned()
    }

    /// Localized help line for a command token, if the token resolves.
    pub fn help_for(&self, lang: &LanguageIdentifier, token: &str) -> Option<String> {
        let (id, _) = self.resolve(token)?;
        Some(format!(
            "{} — {}",
            i18n::command_display(lang, id.key()),
            i18n::command_help(lang, id.key())
        ))
    }

    /// All command specs, in registration order of [`CommandId`].
    pub fn commands(&self) -> impl Iterator<Item = &CommandSpec> {
        CommandId::iter().filter_map(|id| self.specs.get(&id))
    }
}

/// Strips the Telegram command decorations off the first token:
/// a leading '/' and a trailing '@botname'.
fn strip_command_decorations(token: &str) -> String {
    let token = token.strip_prefix('/').unwrap_or(token);
    match token.split_once('@') {
        Some((name, _)) => name.to_string(),
        None => token.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn registry() -> CommandRegistry {
        CommandRegistry::build(HashMap::new())
    }

    #[test]
    fn test_resolves_latin_and_cyrillic_to_same_id() {
        let reg = registry();
        let (latin, _) = reg.resolve("weather Berlin").unwrap();
        let (cyrillic, _) = reg.resolve("погода Берлин").unwrap();
        assert_eq!(latin, CommandId::Weather);
        assert_eq!(cyrillic, CommandId::Weather);
    }

    #[test]
    fn test_resolution_is_case_insensitive() {
        let reg = registry();
        let (id, arg) = reg.resolve("WeAtHeR Berlin").unwrap();
        assert_eq!(id, CommandId::Weather);
        assert_eq!(arg, "Berlin");
    }

    #[test]
    fn test_longest_leading_token_wins() {
        let reg = registry();
        // "какая погода" is a two-token spelling of weather; the longer
        // match must win over any one-token prefix.
        let (id, arg) = reg.resolve("какая погода в Берлине").unwrap();
        assert_eq!(id, CommandId::Weather);
        assert_eq!(arg, "в Берлине");
    }

    #[test]
    fn test_slash_and_mention_are_stripped() {
        let reg = registry();
        let (id, arg) = reg.resolve("/weather@bayun_bot Berlin").unwrap();
        assert_eq!(id, CommandId::Weather);
        assert_eq!(arg, "Berlin");
    }

    #[test]
    fn test_unknown_token_is_not_a_command() {
        let reg = registry();
        assert!(reg.resolve("just chatting here").is_none());
        assert!(reg.resolve("").is_none());
        assert!(reg.resolve("   ").is_none());
    }

    #[test]
    fn test_every_command_has_spellings() {
        let reg = registry();
        for spec in reg.commands() {
            assert!(!spec.spellings.is_empty(), "{} has no spellings", spec.id);
        }
    }

    #[test]
    fn test_help_for_resolves_any_spelling() {
        let reg = registry();
        let ru = i18n::lang_from_code("ru");
        let help = reg.help_for(&ru, "погода").unwrap();
        assert!(help.contains("погода"));
        assert!(reg.help_for(&ru, "nonsense").is_none());
    }

    #[test]
    fn test_required_levels() {
        assert_eq!(CommandId::Help.required_level(), AccessLevel::Guest);
        assert_eq!(CommandId::Karma.required_level(), AccessLevel::Trusted);
        assert_eq!(CommandId::Level.required_level(), AccessLevel::Admin);
    }
}
