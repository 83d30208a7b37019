use std::collections::HashMap;
use std::sync::Arc;

use fluent_templates::{
    fluent_bundle::{FluentArgs, FluentValue},
    static_loader, Loader,
};
use once_cell::sync::Lazy;
use unic_langid::LanguageIdentifier;

use crate::storage::db;

static_loader! {
    static LOCALES = {
        locales: "./locales",
        fallback_language: "ru",
        // Telegram renders the bidi isolation marks as visible garbage,
        // so interpolation happens without them.
        customise: |bundle| bundle.set_use_isolating(false),
    };
}

/// Supported languages (code, human-readable name).
pub static SUPPORTED_LANGS: &[(&str, &str)] = &[("en", "English"), ("ru", "Русский")];

/// Default language identifier used as a fallback.
static DEFAULT_LANG: Lazy<LanguageIdentifier> = Lazy::new(|| "ru".parse().unwrap());

/// Normalizes a language code into a LanguageIdentifier (falls back to default).
pub fn lang_from_code(code: &str) -> LanguageIdentifier {
    let code_normalized = code.to_lowercase();
    let normalized = match code_normalized.as_str() {
        "en" | "en-us" => "en-US",
        "ru" | "ru-ru" => "ru",
        other => other,
    };

    normalized.parse().unwrap_or_else(|_| DEFAULT_LANG.clone())
}

/// Resolves the language for a user from the database using an existing connection.
pub fn user_lang(conn: &db::DbConnection, telegram_id: i64) -> LanguageIdentifier {
    match db::get_user_language(conn, telegram_id) {
        Ok(lang_code) => lang_from_code(&lang_code),
        Err(_) => DEFAULT_LANG.clone(),
    }
}

/// Resolves the language for a user using a connection pool.
pub fn user_lang_from_pool(db_pool: &Arc<db::DbPool>, telegram_id: i64) -> LanguageIdentifier {
    if let Ok(conn) = db::get_connection(db_pool) {
        return user_lang(&conn, telegram_id);
    }
    DEFAULT_LANG.clone()
}

/// Returns a localized string for the given key.
/// Converts literal `\n` sequences to actual newlines for proper Telegram formatting.
pub fn t(lang: &LanguageIdentifier, key: &str) -> String {
    let text = LOCALES
        .lookup(lang, key)
        .unwrap_or_else(|| LOCALES.lookup(&DEFAULT_LANG, key).unwrap_or_else(|| key.to_string()));
    text.replace("\\n", "\n")
}

/// Returns a localized string with arguments for interpolation.
pub fn t_args(lang: &LanguageIdentifier, key: &str, args: &FluentArgs) -> String {
    let args_map: HashMap<String, FluentValue> = args.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();

    let text = LOCALES.lookup_with_args(lang, key, &args_map).unwrap_or_else(|| {
        LOCALES
            .lookup_with_args(&DEFAULT_LANG, key, &args_map)
            .unwrap_or_else(|| key.to_string())
    });
    text.replace("\\n", "\n")
}

/// Collects every spelling of a command across all supported locales.
///
/// Spellings live in the locale files as the `cmd-<id>.names` attribute,
/// comma-separated, so adding a language (or another way to write a command)
/// never touches the registry code. Used once at registry build time.
pub fn command_spellings(command_key: &str) -> Vec<String> {
    let key = format!("cmd-{}.names", command_key);
    let mut names = Vec::new();

    for (code, _) in SUPPORTED_LANGS {
        let lang = lang_from_code(code);
        if let Some(raw) = LOCALES.lookup(&lang, &key) {
            for name in raw.split(',') {
                let name = name.trim().to_lowercase();
                if !name.is_empty() && !names.contains(&name) {
                    names.push(name);
                }
            }
        }
    }

    names
}

/// Primary localized display name of a command for the given language.
pub fn command_display(lang: &LanguageIdentifier, command_key: &str) -> String {
    t(lang, &format!("cmd-{}", command_key))
}

/// Localized one-line help for a command.
pub fn command_help(lang: &LanguageIdentifier, command_key: &str) -> String {
    t(lang, &format!("cmd-{}.help", command_key))
}

/// Checks if a language code is supported by the bot.
/// Returns the normalized language code if supported, None otherwise.
pub fn is_language_supported(code: &str) -> Option<&'static str> {
    let normalized = code.split('-').next().unwrap_or(code).to_lowercase();

    SUPPORTED_LANGS
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(&normalized))
        .map(|(c, _)| *c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_known_translation() {
        let ru = lang_from_code("ru");
        let en = lang_from_code("en");

        assert_eq!(t(&ru, "weather.ask-city"), "Для какого города? Пришли название.");
        assert_eq!(t(&en, "weather.ask-city"), "Which city? Send me a name.");
    }

    #[test]
    fn falls_back_to_default_language() {
        let de = lang_from_code("de");
        // German is not supported; the lookup must come back in Russian.
        assert_eq!(t(&de, "help.header"), "Я умею:");
    }

    #[test]
    fn collects_spellings_across_locales() {
        let names = command_spellings("weather");
        assert!(names.contains(&"weather".to_string()));
        assert!(names.contains(&"погода".to_string()));
        assert!(names.contains(&"какая погода".to_string()));
    }

    #[test]
    fn spellings_are_deduplicated_and_lowercase(){
        let names = command_spellings("karma");
        let mut sorted = names.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(names.len(), sorted.len());
        assert!(names.iter().all(|n| *n == n.to_lowercase()));
    }

    #[test]
    fn test_is_language_supported() {
        assert_eq!(is_language_supported("en"), Some("en"));
        assert_eq!(is_language_supported("ru"), Some("ru"));
        assert_eq!(is_language_supported("en-US"), Some("en"));
        assert_eq!(is_language_supported("RU"), Some("ru"));
        assert_eq!(is_language_supported("es"), None);
        assert_eq!(is_language_supported("unknown"), None);
    }
}
