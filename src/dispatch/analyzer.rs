//! Passive per-message analyzers
//!
//! Analyzers see every inbound event, whether or not it matched a command,
//! and may ask the engine to run a command as if the sender had typed it.
//! They are independent and order-insensitive; each produces at most one
//! synthetic invocation per event.

use async_trait::async_trait;

use crate::core::AppResult;
use crate::dispatch::event::NormalizedEvent;
use crate::dispatch::handler::HandlerContext;
use crate::dispatch::registry::CommandId;

/// A request to run `command` with `arg_text` on behalf of the event's own
/// identity. Access is checked against the invoking identity, never the
/// identity that originally set up whatever state the analyzer read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticInvocation {
    pub command: CommandId,
    pub arg_text: String,
}

#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Stable name for logs and metrics.
    fn name(&self) -> &'static str;

    /// Inspects one event. `matched` carries the command the primary
    /// resolution found, if any. Errors are logged and never fail the
    /// event's dispatch.
    async fn observe(
        &self,
        ctx: &HandlerContext,
        event: &NormalizedEvent,
        matched: Option<CommandId>,
    ) -> AppResult<Option<SyntheticInvocation>>;
}
