//! The uniform leaf handler contract
//!
//! Every command, from greeting to karma, plugs into the engine through this
//! one seam. Handlers are stateless per call; whatever they need (database,
//! registry) arrives through the [`HandlerContext`].

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::AppResult;
use crate::dispatch::event::{Identity, OutboundResponse};
use crate::dispatch::registry::CommandRegistry;
use crate::storage::db::DbPool;

/// What a handler call produced.
pub enum Outcome {
    /// The command is done; deliver this response.
    Completed(OutboundResponse),
    /// The command needs one more piece of free-text input. The engine
    /// stores a waiting record and delivers the prompt.
    NeedsMoreInput(String),
}

/// Shared dependencies handed to every handler and analyzer call.
#[derive(Clone)]
pub struct HandlerContext {
    pub db_pool: Arc<DbPool>,
    pub registry: Arc<CommandRegistry>,
}

/// Contract every leaf command implements.
///
/// `arg_text` is whatever followed the command's name (or the reconstructed
/// text of a continuation). Handlers report domain problems through
/// `AppError::InvalidInput` / `AppError::Upstream`; the engine converts
/// those to user-visible responses at its boundary.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, ctx: &HandlerContext, identity: Identity, arg_text: &str) -> AppResult<Outcome>;
}
