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

//! Per-session reader task.
//!
//! Each attached session gets one task that drains its session → router queue and
//! hands every message to the dealer or broker action queue. Decorator management
//! calls are served by the task itself.

use crate::control_plane::decorator_registry::{is_management_procedure, DecoratorRegistry};
use crate::data_plane::local_peer::LossySender;
use crate::error::RouterError;
use crate::message::{Call, CallResult, Dict, Id, Message, RequestType};
use crate::metrics::MessageMetrics;
use crate::observability::events;
use crate::realm::RealmComponents;
use crate::runtime::action_queue::ActionQueue;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const COMPONENT: &str = "session_listener";

/// Everything a routing action needs to answer the session it acts for.
#[derive(Clone)]
pub(crate) struct SessionContext {
    pub(crate) session: Id,
    pub(crate) peer: LossySender,
    pub(crate) components: RealmComponents,
}

/// Spawns the reader task for `ctx.session` on the current tokio runtime.
pub(crate) fn spawn_session_listener(
    ctx: SessionContext,
    incoming: mpsc::Receiver<Message>,
    metrics: Option<Arc<dyn MessageMetrics>>,
) -> JoinHandle<()> {
    tokio::spawn(run_session(ctx, incoming, metrics))
}

async fn run_session(
    ctx: SessionContext,
    mut incoming: mpsc::Receiver<Message>,
    metrics: Option<Arc<dyn MessageMetrics>>,
) {
    info!(
        event = events::SESSION_ATTACH,
        component = COMPONENT,
        session = ctx.session,
        "session attached"
    );

    while let Some(msg) = incoming.recv().await {
        if let Some(metrics) = metrics.as_ref() {
            metrics.record_received(msg.encoded_len());
        }
        debug!(
            event = events::SESSION_RECEIVE,
            component = COMPONENT,
            session = ctx.session,
            msg_type = msg.message_type(),
            "received message"
        );
        if !dispatch(&ctx, msg).await {
            break;
        }
    }

    detach(&ctx);
}

/// Routes one inbound message. Returns `false` when the session is done.
async fn dispatch(ctx: &SessionContext, msg: Message) -> bool {
    let action_ctx = ctx.clone();
    match msg {
        Message::Register { request, procedure } => submit(&ctx.components.dealer, move |d| {
            d.register(&action_ctx, request, procedure)
        }),
        Message::Unregister {
            request,
            registration,
        } => submit(&ctx.components.dealer, move |d| {
            d.unregister(&action_ctx, request, registration)
        }),
        Message::Call(call) if is_management_procedure(&call.procedure) => {
            serve_management(ctx, call).await;
            true
        }
        Message::Call(call) => submit(&ctx.components.dealer, move |d| {
            d.handle_call(action_ctx, call)
        }),
        Message::Yield(answer) => submit(&ctx.components.dealer, move |d| {
            d.handle_yield(action_ctx, answer)
        }),
        Message::Error(answer) => submit(&ctx.components.dealer, move |d| {
            d.handle_error(action_ctx, answer)
        }),
        Message::Subscribe { request, topic } => submit(&ctx.components.broker, move |b| {
            b.subscribe(&action_ctx, request, topic)
        }),
        Message::Unsubscribe {
            request,
            subscription,
        } => submit(&ctx.components.broker, move |b| {
            b.unsubscribe(&action_ctx, request, subscription)
        }),
        Message::Publish(publish) => submit(&ctx.components.broker, move |b| {
            b.handle_publish(action_ctx, publish)
        }),
        Message::Goodbye { reason } => {
            debug!(
                event = events::SESSION_DETACH,
                component = COMPONENT,
                session = ctx.session,
                reason = %reason,
                "session said goodbye"
            );
            false
        }
        other => {
            warn!(
                event = events::SESSION_UNEXPECTED_MESSAGE,
                component = COMPONENT,
                session = ctx.session,
                msg_type = other.message_type(),
                "router does not accept this message from a session"
            );
            true
        }
    }
}

fn submit<S, F>(queue: &ActionQueue<S>, action: F) -> bool
where
    S: Send + 'static,
    F: FnOnce(&mut S) + Send + 'static,
{
    match queue.submit(action) {
        Ok(()) => true,
        Err(err) => {
            warn!(
                event = events::SESSION_DETACH,
                component = COMPONENT,
                queue = queue.component(),
                err = %err,
                "realm component stopped; closing session"
            );
            false
        }
    }
}

async fn serve_management(ctx: &SessionContext, call: Call) {
    let registry = DecoratorRegistry::new(&ctx.components);
    let reply = match registry
        .serve(ctx.session, &call.procedure, &call.args)
        .await
    {
        Ok(args) => Message::Result(CallResult {
            request: call.request,
            details: Dict::new(),
            args,
            kwargs: Dict::new(),
        }),
        Err(err) => err.into_error_message(RequestType::Call, call.request),
    };
    ctx.peer.send(reply);
}

/// Removes the session from both components and closes its inbound stream.
///
/// Decorators the session created stay installed.
fn detach(ctx: &SessionContext) {
    let session = ctx.session;
    let detached: Result<(), RouterError> = ctx
        .components
        .dealer
        .submit(move |d| d.detach_session(session))
        .and_then(|()| {
            ctx.components
                .broker
                .submit(move |b| b.detach_session(session))
        });
    if let Err(err) = detached {
        warn!(
            event = events::SESSION_DETACH,
            component = COMPONENT,
            session,
            err = %err,
            "unable to detach session from realm components"
        );
    }

    ctx.peer.close();
    info!(
        event = events::SESSION_DETACH,
        component = COMPONENT,
        session,
        "session detached"
    );
}
