//! Command dispatch and conversation-state engine
//!
//! Everything between an inbound chat event and a leaf command handler lives
//! here: name/alias resolution, access gating, multi-turn continuations,
//! passive analyzers and the bounded recursive re-dispatch they trigger.

pub mod access;
pub mod analyzer;
pub mod analyzers;
pub mod dispatcher;
pub mod event;
pub mod handler;
pub mod registry;
pub mod state;

pub use access::AccessLevel;
pub use analyzer::{Analyzer, SyntheticInvocation};
pub use dispatcher::{Dispatcher, ResponseSink};
pub use event::{Identity, InboundEvent, NormalizedEvent, OutboundResponse};
pub use handler::{CommandHandler, HandlerContext, Outcome};
pub use registry::{CommandId, CommandRegistry, CommandSpec};
