use once_cell::sync::Lazy;
use std::env;

/// Configuration constants for the bot

/// Telegram bot token
/// Read once at startup from the BOT_TOKEN environment variable
pub static BOT_TOKEN: Lazy<String> = Lazy::new(|| env::var("BOT_TOKEN").unwrap_or_default());

/// SQLite database path
/// Read from the DATABASE_PATH environment variable, defaults to bayun.sqlite
pub static DATABASE_PATH: Lazy<String> =
    Lazy::new(|| env::var("DATABASE_PATH").unwrap_or_else(|_| "bayun.sqlite".to_string()));

/// Log file path
/// Read from the LOG_FILE_PATH environment variable, defaults to bayun.log
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| env::var("LOG_FILE_PATH").unwrap_or_else(|_| "bayun.log".to_string()));

/// Dispatch engine configuration
pub mod dispatch {
    /// Ceiling for recursive re-dispatch (alias expansion, analyzer-triggered
    /// commands). An event chain deeper than this is dropped with an error.
    pub const MAX_DEPTH: u8 = 5;
}

/// Talker (markov chat) configuration
pub mod talker {
    /// Chance that the talker volunteers a reply in a chat that has not
    /// configured its own probability.
    pub const DEFAULT_TRIGGER_PROBABILITY: f64 = 0.04;

    /// Minimum words a message must have before it is used for training.
    pub const MIN_LEARN_WORDS: usize = 3;

    /// Longest reply the talker will chain together.
    pub const MAX_REPLY_WORDS: usize = 12;
}

/// Keyboard-layout correction configuration
pub mod turn {
    /// Shortest text the wrong-layout heuristic will consider. Anything
    /// shorter produces too many false positives ("ok", "lol").
    pub const MIN_TEXT_LEN: usize = 6;
}
