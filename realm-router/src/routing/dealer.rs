/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! RPC routing state owned by the dealer action queue.
//!
//! Every method here runs as an action on the dealer queue. Methods that need to
//! run a sync interception stage spawn the stage as a task and resubmit the
//! follow-up routing step once the stage completes.

use crate::control_plane::decorator::{Component, DecoratorKind};
use crate::control_plane::decorator_table::DecoratorTable;
use crate::data_plane::local_peer::LossySender;
use crate::data_plane::pipeline::{run_stage, HandlerInvoker, HandlerReply, StageOutcome};
use crate::data_plane::session_listener::SessionContext;
use crate::error::RouterError;
use crate::message::{
    global_id, Args, Call, CallResult, Dict, ErrorMessage, Id, Invocation, Message, RequestType,
    Yield,
};
use crate::observability::events;
use crate::routing::uri::Uri;
use crate::runtime::action_queue::ActionQueue;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

const COMPONENT: &str = "dealer";

type HandlerReplySender = oneshot::Sender<Result<HandlerReply, RouterError>>;

struct Registration {
    id: Id,
    callee: Id,
    peer: LossySender,
}

/// Who is waiting for an invocation's outcome.
enum Awaiting {
    /// A session's `CALL`. The result goes through the postcall stage of `procedure`.
    Call {
        caller: Id,
        caller_peer: LossySender,
        caller_request: Id,
        procedure: Uri,
    },
    /// A sync decorator stage.
    Handler(HandlerReplySender),
    /// Nobody; the outcome is discarded.
    Detached,
}

struct PendingInvocation {
    callee: Id,
    awaiting: Awaiting,
}

pub(crate) struct Dealer {
    registrations: HashMap<Uri, Registration>,
    registration_procedures: HashMap<Id, Uri>,
    pending: HashMap<Id, PendingInvocation>,
    decorators: DecoratorTable,
}

impl Default for Dealer {
    fn default() -> Self {
        Self::new()
    }
}

fn call_error(request: Id, err: RouterError) -> Message {
    err.into_error_message(RequestType::Call, request)
}

impl Dealer {
    pub(crate) fn new() -> Self {
        Self {
            registrations: HashMap::new(),
            registration_procedures: HashMap::new(),
            pending: HashMap::new(),
            decorators: DecoratorTable::new(Component::Dealer),
        }
    }

    pub(crate) fn decorators(&self) -> &DecoratorTable {
        &self.decorators
    }

    pub(crate) fn decorators_mut(&mut self) -> &mut DecoratorTable {
        &mut self.decorators
    }

    pub(crate) fn has_registration(&self, procedure: &Uri) -> bool {
        self.registrations.contains_key(procedure)
    }

    pub(crate) fn register(&mut self, ctx: &SessionContext, request: Id, procedure: Uri) {
        if !procedure.is_valid(false) {
            ctx.peer.send(
                RouterError::InvalidArgument(format!("invalid procedure uri `{procedure}`"))
                    .into_error_message(RequestType::Register, request),
            );
            return;
        }
        if self.registrations.contains_key(&procedure) {
            warn!(
                event = events::REGISTER_FAILED,
                component = COMPONENT,
                session = ctx.session,
                uri = %procedure,
                "procedure already registered"
            );
            ctx.peer.send(
                RouterError::ProcedureAlreadyExists(procedure)
                    .into_error_message(RequestType::Register, request),
            );
            return;
        }

        let registration = global_id();
        info!(
            event = events::REGISTER_OK,
            component = COMPONENT,
            session = ctx.session,
            uri = %procedure,
            registration,
            "registered procedure"
        );
        self.registration_procedures
            .insert(registration, procedure.clone());
        self.registrations.insert(
            procedure,
            Registration {
                id: registration,
                callee: ctx.session,
                peer: ctx.peer.clone(),
            },
        );
        ctx.peer.send(Message::Registered {
            request,
            registration,
        });
    }

    pub(crate) fn unregister(&mut self, ctx: &SessionContext, request: Id, registration: Id) {
        let owned = self
            .registration_procedures
            .get(&registration)
            .and_then(|procedure| self.registrations.get(procedure))
            .is_some_and(|entry| entry.callee == ctx.session);
        if !owned {
            ctx.peer.send(
                RouterError::NoSuchRegistration(registration)
                    .into_error_message(RequestType::Unregister, request),
            );
            return;
        }

        if let Some(procedure) = self.registration_procedures.remove(&registration) {
            self.registrations.remove(&procedure);
            info!(
                event = events::UNREGISTER_OK,
                component = COMPONENT,
                session = ctx.session,
                uri = %procedure,
                "unregistered procedure"
            );
        }
        ctx.peer.send(Message::Unregistered { request });
    }

    /// Entry point for a session's `CALL`: preprocess stage, then routing.
    pub(crate) fn handle_call(&mut self, ctx: SessionContext, call: Call) {
        let decorators = self
            .decorators
            .match_decorators(DecoratorKind::Preprocess, &call.procedure);
        if decorators.is_empty() {
            self.route_call(ctx, call);
            return;
        }

        tokio::spawn(async move {
            let dealer = ctx.components.dealer.clone();
            let caller_peer = ctx.peer.clone();
            let request = call.request;
            match run_stage(&dealer, DecoratorKind::Preprocess, decorators, call).await {
                StageOutcome::Continue(call) => {
                    resubmit(&dealer, &caller_peer, request, move |d| d.route_call(ctx, call))
                }
                StageOutcome::Abort(err) => {
                    caller_peer.send(call_error(request, err));
                }
            }
        });
    }

    /// Resolves the callee, then runs the precall stage.
    fn route_call(&mut self, ctx: SessionContext, call: Call) {
        if !self.registrations.contains_key(&call.procedure) {
            self.reject_unknown_procedure(&ctx, call);
            return;
        }

        let decorators = self
            .decorators
            .match_decorators(DecoratorKind::Precall, &call.procedure);
        if decorators.is_empty() {
            self.invoke_callee(ctx, call);
            return;
        }

        tokio::spawn(async move {
            let dealer = ctx.components.dealer.clone();
            let caller_peer = ctx.peer.clone();
            let request = call.request;
            match run_stage(&dealer, DecoratorKind::Precall, decorators, call).await {
                StageOutcome::Continue(call) => {
                    resubmit(&dealer, &caller_peer, request, move |d| d.invoke_callee(ctx, call))
                }
                StageOutcome::Abort(err) => {
                    caller_peer.send(call_error(request, err));
                }
            }
        });
    }

    fn reject_unknown_procedure(&self, ctx: &SessionContext, call: Call) {
        debug!(
            event = events::CALL_NO_SUCH_PROCEDURE,
            component = COMPONENT,
            session = ctx.session,
            uri = %call.procedure,
            "call to unregistered procedure"
        );
        ctx.peer.send(call_error(
            call.request,
            RouterError::NoSuchProcedure(call.procedure),
        ));
    }

    /// Sends the `INVOCATION` to the callee currently registered for the procedure.
    ///
    /// The procedure is resolved again here; a precall replacement may have named a
    /// different target, and the registration may have gone away meanwhile.
    fn invoke_callee(&mut self, ctx: SessionContext, call: Call) {
        let Some(registration) = self.registrations.get(&call.procedure) else {
            self.reject_unknown_procedure(&ctx, call);
            return;
        };

        let request = global_id();
        let mut details = Dict::new();
        details.insert("caller".into(), ctx.session.into());
        details.insert("procedure".into(), call.procedure.as_str().into());

        self.pending.insert(
            request,
            PendingInvocation {
                callee: registration.callee,
                awaiting: Awaiting::Call {
                    caller: ctx.session,
                    caller_peer: ctx.peer.clone(),
                    caller_request: call.request,
                    procedure: call.procedure,
                },
            },
        );
        registration.peer.send(Message::Invocation(Invocation {
            request,
            registration: registration.id,
            details,
            args: call.args,
            kwargs: call.kwargs,
        }));
    }

    /// Invokes a decorator handler on behalf of an interception stage.
    ///
    /// `reply` receives the handler's outcome; without one the outcome is discarded.
    pub(crate) fn invoke_handler(
        &mut self,
        procedure: Uri,
        args: Args,
        reply: Option<HandlerReplySender>,
    ) {
        let Some(registration) = self.registrations.get(&procedure) else {
            match reply {
                Some(reply) => {
                    let _ = reply.send(Err(RouterError::NoSuchProcedure(procedure)));
                }
                None => warn!(
                    event = events::PIPELINE_ASYNC_HANDLER_FAILED,
                    component = COMPONENT,
                    handler = %procedure,
                    "async decorator handler is not registered"
                ),
            }
            return;
        };

        let request = global_id();
        let mut details = Dict::new();
        details.insert("procedure".into(), procedure.as_str().into());

        self.pending.insert(
            request,
            PendingInvocation {
                callee: registration.callee,
                awaiting: reply.map_or(Awaiting::Detached, Awaiting::Handler),
            },
        );
        registration.peer.send(Message::Invocation(Invocation {
            request,
            registration: registration.id,
            details,
            args,
            kwargs: Dict::new(),
        }));
    }

    /// Removes the pending invocation `request` if `callee` is the session serving it.
    fn take_pending(&mut self, callee: Id, request: Id) -> Option<Awaiting> {
        let Some(pending) = self.pending.get(&request) else {
            debug!(
                event = events::YIELD_UNKNOWN_REQUEST,
                component = COMPONENT,
                session = callee,
                request,
                "answer to unknown invocation"
            );
            return None;
        };
        if pending.callee != callee {
            warn!(
                event = events::YIELD_WRONG_CALLEE,
                component = COMPONENT,
                session = callee,
                request,
                "answer from a session that does not own the invocation"
            );
            return None;
        }
        self.pending.remove(&request).map(|pending| pending.awaiting)
    }

    pub(crate) fn handle_yield(&mut self, ctx: SessionContext, answer: Yield) {
        let Some(awaiting) = self.take_pending(ctx.session, answer.request) else {
            return;
        };

        match awaiting {
            Awaiting::Call {
                caller_peer,
                caller_request,
                procedure,
                ..
            } => {
                let result = CallResult {
                    request: caller_request,
                    details: Dict::new(),
                    args: answer.args,
                    kwargs: answer.kwargs,
                };
                self.return_result(ctx, caller_peer, &procedure, result);
            }
            Awaiting::Handler(reply) => {
                let _ = reply.send(Ok(HandlerReply {
                    args: answer.args,
                    kwargs: answer.kwargs,
                }));
            }
            Awaiting::Detached => {}
        }
    }

    /// Runs the postcall stage of `procedure` over `result`, then hands it to the caller.
    fn return_result(
        &self,
        ctx: SessionContext,
        caller_peer: LossySender,
        procedure: &Uri,
        result: CallResult,
    ) {
        let decorators = self
            .decorators
            .match_decorators(DecoratorKind::Postcall, procedure);
        if decorators.is_empty() {
            caller_peer.send(Message::Result(result));
            return;
        }

        tokio::spawn(async move {
            let dealer = ctx.components.dealer.clone();
            let request = result.request;
            match run_stage(&dealer, DecoratorKind::Postcall, decorators, result).await {
                StageOutcome::Continue(result) => caller_peer.send(Message::Result(result)),
                StageOutcome::Abort(err) => caller_peer.send(call_error(request, err)),
            };
        });
    }

    pub(crate) fn handle_error(&mut self, ctx: SessionContext, answer: ErrorMessage) {
        if answer.request_type != RequestType::Invocation {
            debug!(
                event = events::SESSION_UNEXPECTED_MESSAGE,
                component = COMPONENT,
                session = ctx.session,
                "error message does not answer an invocation"
            );
            return;
        }
        let Some(awaiting) = self.take_pending(ctx.session, answer.request) else {
            return;
        };

        let err = RouterError::Invocation {
            error: answer.error,
            args: answer.args,
            kwargs: answer.kwargs,
        };
        match awaiting {
            Awaiting::Call {
                caller_peer,
                caller_request,
                ..
            } => {
                caller_peer.send(call_error(caller_request, err));
            }
            Awaiting::Handler(reply) => {
                let _ = reply.send(Err(err));
            }
            Awaiting::Detached => {}
        }
    }

    /// Forgets everything `session` was doing: its registrations are removed,
    /// invocations it was serving fail with `canceled`, and results owed to it are
    /// discarded.
    pub(crate) fn detach_session(&mut self, session: Id) {
        let procedures: Vec<Uri> = self
            .registrations
            .iter()
            .filter(|(_, registration)| registration.callee == session)
            .map(|(procedure, _)| procedure.clone())
            .collect();
        for procedure in procedures {
            if let Some(registration) = self.registrations.remove(&procedure) {
                self.registration_procedures.remove(&registration.id);
            }
        }

        let served: Vec<Id> = self
            .pending
            .iter()
            .filter(|(_, pending)| pending.callee == session)
            .map(|(request, _)| *request)
            .collect();
        for request in served {
            let Some(pending) = self.pending.remove(&request) else {
                continue;
            };
            debug!(
                event = events::INVOCATION_CANCELED,
                component = COMPONENT,
                session,
                request,
                "callee left with invocation in flight"
            );
            match pending.awaiting {
                Awaiting::Call {
                    caller_peer,
                    caller_request,
                    ..
                } => {
                    caller_peer.send(call_error(caller_request, RouterError::Canceled));
                }
                Awaiting::Handler(reply) => {
                    let _ = reply.send(Err(RouterError::Canceled));
                }
                Awaiting::Detached => {}
            }
        }

        for pending in self.pending.values_mut() {
            if matches!(pending.awaiting, Awaiting::Call { caller, .. } if caller == session) {
                pending.awaiting = Awaiting::Detached;
            }
        }
    }

    pub(crate) fn registration_count(&self) -> usize {
        self.registrations.len()
    }

    pub(crate) fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

/// Queues the next routing step, failing the call when the dealer is gone.
fn resubmit<F>(dealer: &ActionQueue<Dealer>, caller_peer: &LossySender, request: Id, step: F)
where
    F: FnOnce(&mut Dealer) + Send + 'static,
{
    if let Err(err) = dealer.submit(step) {
        caller_peer.send(call_error(request, err));
    }
}

#[async_trait]
impl HandlerInvoker for ActionQueue<Dealer> {
    async fn invoke(&self, procedure: &Uri, args: Args) -> Result<HandlerReply, RouterError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let procedure = procedure.clone();
        self.submit(move |dealer| dealer.invoke_handler(procedure, args, Some(reply_tx)))?;
        reply_rx.await.unwrap_or(Err(RouterError::Canceled))
    }

    fn invoke_detached(&self, procedure: &Uri, args: Args) {
        let procedure = procedure.clone();
        if let Err(err) = self.submit(move |dealer| dealer.invoke_handler(procedure, args, None)) {
            warn!(
                event = events::PIPELINE_ASYNC_HANDLER_FAILED,
                component = COMPONENT,
                err = %err,
                "unable to dispatch async decorator handler"
            );
        }
    }
}
