//! The dispatcher: resolution, gating, continuations, analyzers
//!
//! One entry point, `dispatch(event, depth)`. Resolution order, first match
//! wins: pending continuation, registry lookup, alias expansion. Whatever
//! resolves is access-gated and invoked; every event is then offered to the
//! analyzer set, whose synthetic invocations re-enter the dispatcher at
//! `depth + 1` under a hard ceiling. Handler-reported errors are converted
//! to responses here and never reach the event source.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;

use crate::core::{config, metrics, AppError, AppResult};
use crate::dispatch::access;
use crate::dispatch::analyzer::{Analyzer, SyntheticInvocation};
use crate::dispatch::event::{InboundEvent, NormalizedEvent, OutboundResponse};
use crate::dispatch::handler::{HandlerContext, Outcome};
use crate::dispatch::registry::{CommandId, CommandRegistry};
use crate::dispatch::state::StateStore;
use crate::i18n;
use crate::storage::db::{self, DbPool};
use crate::storage::get_connection;

/// Where responses of analyzer-triggered invocations go. They originate
/// from background analysis rather than the request/response pair, so they
/// are sent, not returned.
#[async_trait]
pub trait ResponseSink: Send + Sync {
    async fn deliver(&self, response: OutboundResponse) -> AppResult<()>;
}

/// How an invocation entered the dispatcher. Analyzer-synthesized runs do
/// not touch the last-command record: "." should repeat what the user last
/// asked for, not what an analyzer volunteered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    User,
    Alias,
    Analyzer,
}

pub struct Dispatcher {
    db_pool: Arc<DbPool>,
    registry: Arc<CommandRegistry>,
    states: StateStore,
    analyzers: Vec<Arc<dyn Analyzer>>,
    sink: Arc<dyn ResponseSink>,
    ctx: HandlerContext,
}

impl Dispatcher {
    pub fn new(
        db_pool: Arc<DbPool>,
        registry: Arc<CommandRegistry>,
        analyzers: Vec<Arc<dyn Analyzer>>,
        sink: Arc<dyn ResponseSink>,
    ) -> Self {
        let ctx = HandlerContext {
            db_pool: Arc::clone(&db_pool),
            registry: Arc::clone(&registry),
        };
        let states = StateStore::new(Arc::clone(&db_pool));
        Self {
            db_pool,
            registry,
            states,
            analyzers,
            sink,
            ctx,
        }
    }

    /// Dispatches one inbound event. `depth` is 0 for events arriving from
    /// the transport; recursive re-dispatch increments it.
    ///
    /// Returns the primary response, `None` when nothing matched (most
    /// plain chat messages are not commands). Responses of synthetic
    /// invocations are delivered through the sink as side effects.
    pub async fn dispatch(&self, event: &InboundEvent, depth: u8) -> AppResult<Option<OutboundResponse>> {
        match self.dispatch_core(event, depth, Origin::User, None).await {
            Ok(response) => Ok(response),
            Err(err) => {
                metrics::record_dispatch_error(err.kind());
                Err(err)
            }
        }
    }

    /// The six-step resolution algorithm. `forced` carries an
    /// analyzer-synthesized invocation, which skips name resolution and
    /// goes straight to the access gate with the event's own identity.
    fn dispatch_core<'a>(
        &'a self,
        event: &'a InboundEvent,
        depth: u8,
        origin: Origin,
        forced: Option<SyntheticInvocation>,
    ) -> Pin<Box<dyn Future<Output = AppResult<Option<OutboundResponse>>> + Send + 'a>> {
        Box::pin(async move {
            if depth > config::dispatch::MAX_DEPTH {
                return Err(AppError::DepthExceeded { depth });
            }

            let ev = event.normalized();
            metrics::record_update(match origin {
                Origin::User if ev.is_callback => "callback",
                Origin::User => "message",
                Origin::Alias | Origin::Analyzer => "synthetic",
            });

            let mut continuation = false;
            let mut invocation: Option<(CommandId, String)> = forced.map(|s| (s.command, s.arg_text));

            if invocation.is_none() {
                let resolved = self.registry.resolve(&ev.raw_text);

                // Step 2: continuation. Only text messages participate; a
                // callback's payload already encodes its full invocation.
                // The read-and-consume decision happens under the
                // identity's lock so two near-simultaneous events cannot
                // both consume one wait.
                if !ev.is_callback {
                    let guard = self.states.lock(ev.identity).await;
                    if resolved.is_some() {
                        // A new top-level command discards any pending wait.
                        self.states.remove_waiting(ev.identity)?;
                    } else if !ev.raw_text.trim().is_empty() {
                        if let Some(wait) = self.states.get_waiting(ev.identity)? {
                            self.states.remove_waiting(ev.identity)?;
                            let addition = ev.raw_text.trim();
                            let full = if wait.partial_text.is_empty() {
                                addition.to_string()
                            } else {
                                format!("{} {}", wait.partial_text, addition)
                            };
                            invocation = Some((wait.command, full));
                            continuation = true;
                            metrics::record_continuation();
                        }
                    }
                    drop(guard);
                }

                // Step 3: direct command.
                if invocation.is_none() {
                    invocation = resolved;
                }

                // Step 4: alias expansion. The synthetic event keeps the
                // original identity, so an alias can never borrow its
                // owner's privileges.
                if invocation.is_none() {
                    let name = ev.raw_text.trim().to_lowercase();
                    if !name.is_empty() {
                        let alias = {
                            let conn = get_connection(&self.db_pool)?;
                            db::get_alias(&conn, ev.identity.chat_id, ev.identity.user_id, &name)?
                        };
                        if let Some(alias) = alias {
                            log::debug!(
                                "Expanding alias '{}' for chat {} user {}",
                                alias.name,
                                ev.identity.chat_id,
                                ev.identity.user_id
                            );
                            let synthetic = InboundEvent::synthetic_text(ev.identity, ev.message_id, alias.value);
                            return self.dispatch_core(&synthetic, depth + 1, Origin::Alias, None).await;
                        }
                    }
                }
            }

            // Step 5: gate and invoke. Handler errors become responses
            // here; they never propagate to the event source.
            let matched = invocation.as_ref().map(|(id, _)| *id);
            let mut denied = false;
            let response = match &invocation {
                None => None,
                Some((id, arg_text)) => match self.run_command(*id, arg_text, &ev, origin, continuation).await {
                    Ok(response) => response,
                    Err(err) => {
                        denied = matches!(err, AppError::AccessDenied { .. });
                        Some(self.error_response(err, &ev))
                    }
                },
            };

            // Step 6: analyzers. Denial is terminal — a sender the gate
            // just rejected does not get analyzer side effects either.
            if !denied {
                self.run_analyzers(&ev, matched, depth).await;
            }

            Ok(response)
        })
    }

    /// Access gate, handler invocation and state bookkeeping for one
    /// resolved command.
    async fn run_command(
        &self,
        id: CommandId,
        arg_text: &str,
        ev: &NormalizedEvent,
        origin: Origin,
        continuation: bool,
    ) -> AppResult<Option<OutboundResponse>> {
        let spec = self
            .registry
            .spec(id)
            .ok_or_else(|| AppError::Internal(format!("command {} has no registered spec", id)))?;

        let (user_level, chat_level) = {
            let conn = get_connection(&self.db_pool)?;
            (
                db::get_user_level(&conn, ev.identity.user_id)?,
                db::get_chat_level(&conn, ev.identity.chat_id)?,
            )
        };
        let effective = access::effective_level(user_level, chat_level);
        let required = spec.required_level.as_i64();

        if !access::is_permitted(effective, required) {
            metrics::record_access_denied(id.key());
            log::info!(
                "Access denied: {} needs level {}, user {} in chat {} has {}",
                id,
                required,
                ev.identity.user_id,
                ev.identity.chat_id,
                effective
            );
            return Err(AppError::AccessDenied { required, effective });
        }

        let handler = self
            .registry
            .handler(id)
            .ok_or_else(|| AppError::Internal(format!("command {} has no registered handler", id)))?;

        metrics::record_command(id.key());
        if continuation {
            log::debug!("Re-invoking {} as continuation for chat {}", id, ev.identity.chat_id);
        }

        match handler.handle(&self.ctx, ev.identity, arg_text).await? {
            Outcome::Completed(response) => {
                if origin != Origin::Analyzer {
                    self.states.set_last_command(ev.identity.chat_id, id)?;
                }
                Ok(Some(response))
            }
            Outcome::NeedsMoreInput(prompt) => {
                let guard = self.states.lock(ev.identity).await;
                self.states.put_waiting(ev.identity, id, arg_text)?;
                drop(guard);
                Ok(Some(
                    OutboundResponse::text(ev.identity.chat_id, prompt).reply_to(ev.message_id),
                ))
            }
        }
    }

    /// Offers the event to every analyzer and feeds their synthetic
    /// invocations back through the dispatcher. Analyzer failures are
    /// logged and never fail the event.
    async fn run_analyzers(&self, ev: &NormalizedEvent, matched: Option<CommandId>, depth: u8) {
        for analyzer in &self.analyzers {
            let synth = match analyzer.observe(&self.ctx, ev, matched).await {
                Ok(synth) => synth,
                Err(err) => {
                    log::warn!("Analyzer {} failed on chat {}: {}", analyzer.name(), ev.identity.chat_id, err);
                    continue;
                }
            };
            let Some(synth) = synth else { continue };

            metrics::record_analyzer_synth(analyzer.name());
            log::debug!(
                "Analyzer {} synthesized {} for chat {} user {}",
                analyzer.name(),
                synth.command,
                ev.identity.chat_id,
                ev.identity.user_id
            );

            let synthetic = InboundEvent::synthetic_text(ev.identity, ev.message_id, synth.arg_text.clone());
            match self
                .dispatch_core(&synthetic, depth + 1, Origin::Analyzer, Some(synth))
                .await
            {
                Ok(Some(response)) => {
                    if let Err(err) = self.sink.deliver(response).await {
                        log::warn!("Failed to deliver synthetic response: {}", err);
                    }
                }
                Ok(None) => {}
                Err(err) => {
                    metrics::record_dispatch_error(err.kind());
                    log::error!(
                        "Synthetic invocation from analyzer {} failed for chat {} user {}: {}",
                        analyzer.name(),
                        ev.identity.chat_id,
                        ev.identity.user_id,
                        err
                    );
                }
            }
        }
    }

    /// Converts a caught error into the user-visible response for it.
    fn error_response(&self, err: AppError, ev: &NormalizedEvent) -> OutboundResponse {
        let lang = i18n::user_lang_from_pool(&self.db_pool, ev.identity.user_id);
        let text = match &err {
            AppError::AccessDenied { .. } => i18n::t(&lang, "dispatch.no-access"),
            AppError::InvalidInput(message) => message.clone(),
            AppError::Upstream(_) => i18n::t(&lang, "dispatch.no-answer"),
            other => {
                log::error!(
                    "Dispatch error for chat {} user {}: {}",
                    ev.identity.chat_id,
                    ev.identity.user_id,
                    other
                );
                i18n::t(&lang, "dispatch.internal-error")
            }
        };
        metrics::record_dispatch_error(err.kind());
        OutboundResponse::text(ev.identity.chat_id, text).reply_to(ev.message_id)
    }
}

// Full engine flows (continuations, alias cycles, analyzer re-dispatch,
// privilege boundaries) are covered in tests/dispatch_flows_test.rs.
