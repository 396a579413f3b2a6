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

//! In-process session client.
//!
//! A `LocalClient` talks to its realm over a linked peer pair, exactly like a
//! remote session would after its transport handshake. A background task reads
//! router messages, completes pending requests, runs procedure handlers, and
//! delivers events to subscription callbacks.

use crate::control_plane::decorator::{CallType, DecoratorKind, MatchPolicy};
use crate::control_plane::decorator_registry::{DECORATOR_ADD, DECORATOR_REMOVE};
use crate::data_plane::local_peer::{BlockingSender, SessionPeer};
use crate::error::RouterError;
use crate::message::{
    Args, Call, CallResult, Dict, ErrorMessage, Event, Id, Invocation, Message, Publish,
    RequestType, Yield,
};
use crate::routing::uri::Uri;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

const COMPONENT: &str = "local_client";
const GOODBYE_REASON: &str = "wamp.close.normal";

/// Outcome of a procedure handler: a yield, or an error when `error` is set.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InvokeResult {
    pub args: Args,
    pub kwargs: Dict,
    pub error: Option<Uri>,
}

impl InvokeResult {
    /// Empty yield. As a sync decorator reply this lets the message continue unchanged.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_args(args: Args) -> Self {
        Self {
            args,
            ..Self::default()
        }
    }

    pub fn error(error: impl Into<Uri>, args: Args) -> Self {
        Self {
            args,
            kwargs: Dict::new(),
            error: Some(error.into()),
        }
    }
}

type ProcedureHandler = Arc<dyn Fn(Invocation) -> BoxFuture<'static, InvokeResult> + Send + Sync>;
type EventHandler = Arc<dyn Fn(Event) + Send + Sync>;

/// Handler to install once the router acknowledges the request.
enum Install {
    Procedure(ProcedureHandler),
    Subscription(EventHandler),
}

struct PendingRequest {
    reply: oneshot::Sender<Message>,
    install: Option<Install>,
}

#[derive(Default)]
struct ClientState {
    next_request: Id,
    pending: HashMap<Id, PendingRequest>,
    procedures: HashMap<Id, ProcedureHandler>,
    subscriptions: HashMap<Id, EventHandler>,
}

type SharedState = Arc<Mutex<ClientState>>;

fn lock(state: &SharedState) -> MutexGuard<'_, ClientState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn response_request(msg: &Message) -> Option<Id> {
    match msg {
        Message::Registered { request, .. }
        | Message::Unregistered { request }
        | Message::Subscribed { request, .. }
        | Message::Unsubscribed { request }
        | Message::Published { request, .. } => Some(*request),
        Message::Result(result) => Some(result.request),
        Message::Error(error) if error.request_type != RequestType::Invocation => {
            Some(error.request)
        }
        _ => None,
    }
}

pub struct LocalClient {
    session: Id,
    outgoing: BlockingSender,
    state: SharedState,
    reader: JoinHandle<()>,
}

impl LocalClient {
    pub(crate) fn new(session: Id, peer: SessionPeer) -> Self {
        let (outgoing, incoming) = peer.into_parts();
        let state = SharedState::default();
        let reader = tokio::spawn(read_router_messages(
            session,
            incoming,
            outgoing.clone(),
            state.clone(),
        ));
        Self {
            session,
            outgoing,
            state,
            reader,
        }
    }

    pub fn session_id(&self) -> Id {
        self.session
    }

    async fn request(
        &self,
        build: impl FnOnce(Id) -> Message,
        install: Option<Install>,
    ) -> Result<Message, RouterError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let request = {
            let mut state = lock(&self.state);
            state.next_request += 1;
            let request = state.next_request;
            state.pending.insert(
                request,
                PendingRequest {
                    reply: reply_tx,
                    install,
                },
            );
            request
        };

        if !self.outgoing.send(build(request)).await {
            lock(&self.state).pending.remove(&request);
            return Err(RouterError::ComponentClosed(COMPONENT));
        }

        match reply_rx.await.map_err(|_| RouterError::Canceled)? {
            Message::Error(ErrorMessage {
                error,
                args,
                kwargs,
                ..
            }) => Err(RouterError::Invocation {
                error,
                args,
                kwargs,
            }),
            reply => Ok(reply),
        }
    }

    /// Registers `procedure`, served by `handler` for as long as this client lives.
    pub async fn register<F, Fut>(
        &self,
        procedure: impl Into<Uri>,
        handler: F,
    ) -> Result<Id, RouterError>
    where
        F: Fn(Invocation) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = InvokeResult> + Send + 'static,
    {
        let procedure = procedure.into();
        let handler: ProcedureHandler = Arc::new(move |invocation| handler(invocation).boxed());
        let reply = self
            .request(
                |request| Message::Register { request, procedure },
                Some(Install::Procedure(handler)),
            )
            .await?;
        match reply {
            Message::Registered { registration, .. } => Ok(registration),
            other => Err(unexpected_reply(&other)),
        }
    }

    pub async fn unregister(&self, registration: Id) -> Result<(), RouterError> {
        self.request(
            |request| Message::Unregister {
                request,
                registration,
            },
            None,
        )
        .await?;
        lock(&self.state).procedures.remove(&registration);
        Ok(())
    }

    pub async fn call(
        &self,
        procedure: impl Into<Uri>,
        args: Args,
        kwargs: Dict,
    ) -> Result<CallResult, RouterError> {
        let procedure = procedure.into();
        let reply = self
            .request(
                |request| {
                    Message::Call(Call {
                        request,
                        options: Dict::new(),
                        procedure,
                        args,
                        kwargs,
                    })
                },
                None,
            )
            .await?;
        match reply {
            Message::Result(result) => Ok(result),
            other => Err(unexpected_reply(&other)),
        }
    }

    /// Subscribes to `topic`; `handler` runs on the client's reader task for each event.
    pub async fn subscribe<F>(&self, topic: impl Into<Uri>, handler: F) -> Result<Id, RouterError>
    where
        F: Fn(Event) + Send + Sync + 'static,
    {
        let topic = topic.into();
        let reply = self
            .request(
                |request| Message::Subscribe { request, topic },
                Some(Install::Subscription(Arc::new(handler))),
            )
            .await?;
        match reply {
            Message::Subscribed { subscription, .. } => Ok(subscription),
            other => Err(unexpected_reply(&other)),
        }
    }

    pub async fn unsubscribe(&self, subscription: Id) -> Result<(), RouterError> {
        self.request(
            |request| Message::Unsubscribe {
                request,
                subscription,
            },
            None,
        )
        .await?;
        lock(&self.state).subscriptions.remove(&subscription);
        Ok(())
    }

    /// Publishes to `topic`.
    ///
    /// With `acknowledge: true` in `options` this waits for the router and returns the
    /// publication id; otherwise it returns `None` once the message is handed over.
    pub async fn publish(
        &self,
        topic: impl Into<Uri>,
        args: Args,
        options: Dict,
    ) -> Result<Option<Id>, RouterError> {
        let topic = topic.into();
        let acknowledge = options
            .get("acknowledge")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let build = |request| {
            Message::Publish(Publish {
                request,
                options,
                topic,
                args,
                kwargs: Dict::new(),
            })
        };

        if !acknowledge {
            let request = {
                let mut state = lock(&self.state);
                state.next_request += 1;
                state.next_request
            };
            return if self.outgoing.send(build(request)).await {
                Ok(None)
            } else {
                Err(RouterError::ComponentClosed(COMPONENT))
            };
        }

        match self.request(build, None).await? {
            Message::Published { publication, .. } => Ok(Some(publication)),
            other => Err(unexpected_reply(&other)),
        }
    }

    /// Calls `wamp.decorator.add` and returns the new decorator's id.
    pub async fn add_decorator(
        &self,
        kind: DecoratorKind,
        policy: MatchPolicy,
        pattern: impl Into<Uri>,
        handler: impl Into<Uri>,
        order: i64,
        call_type: CallType,
    ) -> Result<Id, RouterError> {
        let pattern: Uri = pattern.into();
        let handler: Uri = handler.into();
        let args: Args = vec![
            kind.as_str().into(),
            policy.as_str().into(),
            pattern.as_str().into(),
            handler.as_str().into(),
            order.into(),
            call_type.as_str().into(),
        ];
        let result = self.call(DECORATOR_ADD, args, Dict::new()).await?;
        result
            .args
            .first()
            .and_then(Value::as_u64)
            .ok_or_else(|| {
                RouterError::ProtocolViolation("decorator id missing from reply".into())
            })
    }

    /// Calls `wamp.decorator.remove`.
    pub async fn remove_decorator(&self, decorator: Id) -> Result<(), RouterError> {
        self.call(DECORATOR_REMOVE, vec![decorator.into()], Dict::new())
            .await
            .map(|_| ())
    }

    /// Says goodbye and closes the session.
    pub async fn leave(self) {
        self.outgoing
            .send(Message::Goodbye {
                reason: GOODBYE_REASON.into(),
            })
            .await;
    }
}

impl Drop for LocalClient {
    fn drop(&mut self) {
        self.outgoing.close();
        self.reader.abort();
    }
}

fn unexpected_reply(msg: &Message) -> RouterError {
    RouterError::ProtocolViolation(format!("unexpected {} reply", msg.message_type()))
}

async fn read_router_messages(
    session: Id,
    mut incoming: mpsc::Receiver<Message>,
    outgoing: BlockingSender,
    state: SharedState,
) {
    while let Some(msg) = incoming.recv().await {
        match msg {
            Message::Invocation(invocation) => run_procedure(&state, &outgoing, invocation),
            Message::Event(event) => {
                let handler = lock(&state).subscriptions.get(&event.subscription).cloned();
                if let Some(handler) = handler {
                    handler(event);
                }
            }
            Message::Goodbye { .. } => break,
            msg => complete_request(session, &state, msg),
        }
    }

    // Waiters observe the dropped senders as cancellation.
    lock(&state).pending.clear();
}

fn complete_request(session: Id, state: &SharedState, msg: Message) {
    let Some(request) = response_request(&msg) else {
        return;
    };
    let mut state = lock(state);
    let Some(pending) = state.pending.remove(&request) else {
        debug!(
            component = COMPONENT,
            session,
            request,
            msg_type = msg.message_type(),
            "reply to unknown request"
        );
        return;
    };

    match (&msg, pending.install) {
        (Message::Registered { registration, .. }, Some(Install::Procedure(handler))) => {
            state.procedures.insert(*registration, handler);
        }
        (Message::Subscribed { subscription, .. }, Some(Install::Subscription(handler))) => {
            state.subscriptions.insert(*subscription, handler);
        }
        _ => {}
    }
    let _ = pending.reply.send(msg);
}

fn run_procedure(state: &SharedState, outgoing: &BlockingSender, invocation: Invocation) {
    let handler = lock(state).procedures.get(&invocation.registration).cloned();
    let outgoing = outgoing.clone();
    tokio::spawn(async move {
        let request = invocation.request;
        let reply = match handler {
            Some(handler) => match handler(invocation).await {
                InvokeResult {
                    args,
                    kwargs,
                    error: None,
                } => Message::Yield(Yield {
                    request,
                    args,
                    kwargs,
                }),
                InvokeResult {
                    args,
                    kwargs,
                    error: Some(error),
                } => Message::Error(ErrorMessage {
                    request_type: RequestType::Invocation,
                    request,
                    error,
                    args,
                    kwargs,
                }),
            },
            None => RouterError::NoSuchRegistration(invocation.registration)
                .into_error_message(RequestType::Invocation, request),
        };
        outgoing.send(reply).await;
    });
}

#[cfg(test)]
mod tests {
    use super::{unexpected_reply, GOODBYE_REASON};
    use crate::error::{RouterError, ERR_PROTOCOL_VIOLATION};
    use crate::message::Message;
    use crate::routing::uri::Uri;

    #[test]
    fn mismatched_reply_is_a_protocol_violation() {
        let error = unexpected_reply(&Message::Goodbye {
            reason: GOODBYE_REASON.into(),
        });

        assert_eq!(
            error,
            RouterError::ProtocolViolation("unexpected GOODBYE reply".into())
        );
        assert_eq!(error.error_uri(), Uri::from(ERR_PROTOCOL_VIOLATION));
    }
}
