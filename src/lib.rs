//! Bayun - conversational Telegram bot with localized command dispatch
//!
//! This library provides the command dispatch and conversation-state engine
//! behind the bot: name/alias resolution, access gating, multi-turn
//! continuations and passive per-message analyzers.
//!
//! # Module Structure
//!
//! - `core`: configuration, errors, logging and metrics
//! - `storage`: SQLite persistence behind an r2d2 pool
//! - `dispatch`: the command dispatch and conversation-state engine
//! - `commands`: leaf command handlers behind the uniform handler contract
//! - `telegram`: Telegram transport integration

pub mod cli;
pub mod commands;
pub mod core;
pub mod dispatch;
pub mod i18n;
pub mod storage;
pub mod telegram;

// Re-export commonly used types for convenience
pub use crate::core::{config, AppError, AppResult};
pub use dispatch::{Dispatcher, InboundEvent, OutboundResponse};
pub use storage::{create_pool, get_connection, DbConnection, DbPool};
