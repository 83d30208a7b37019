//! Leaf command handlers
//!
//! Every command plugs into the engine through the uniform
//! [`CommandHandler`](crate::dispatch::CommandHandler) contract and is
//! reachable only through the dispatcher. Handlers stay thin
//! request/response glue; the dispatch semantics live in `crate::dispatch`.

pub mod alias;
pub mod echo;
pub mod help;
pub mod karma;
pub mod level;
pub mod start;
pub mod turn;
pub mod weather;

use std::collections::HashMap;
use std::sync::Arc;

use crate::dispatch::{CommandHandler, CommandId};

/// The canonicalId → handler map the registry is built from. Constructed
/// once at startup; no runtime lookup by name ever happens.
pub fn built_in_handlers() -> HashMap<CommandId, Arc<dyn CommandHandler>> {
    let mut handlers: HashMap<CommandId, Arc<dyn CommandHandler>> = HashMap::new();
    handlers.insert(CommandId::Start, Arc::new(start::StartCommand));
    handlers.insert(CommandId::Help, Arc::new(help::HelpCommand));
    handlers.insert(CommandId::Weather, Arc::new(weather::WeatherCommand));
    handlers.insert(CommandId::Echo, Arc::new(echo::EchoCommand));
    handlers.insert(CommandId::Turn, Arc::new(turn::TurnCommand));
    handlers.insert(CommandId::Karma, Arc::new(karma::KarmaCommand));
    handlers.insert(CommandId::Alias, Arc::new(alias::AliasCommand));
    handlers.insert(CommandId::Level, Arc::new(level::LevelCommand));
    handlers
}
