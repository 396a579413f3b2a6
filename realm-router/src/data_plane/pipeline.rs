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

//! Interception stage execution.
//!
//! A stage runs the decorators matched for one kind against one message. Each
//! stage runs inside its own task, so a sync handler suspends only the message it
//! intercepts; the owning action queue keeps processing other work meanwhile.

use crate::control_plane::decorator::{CallType, Decorator, DecoratorKind};
use crate::error::RouterError;
use crate::message::{
    Args, Call, CallDescriptor, CallResult, Dict, Publish, PublishDescriptor, ResultDescriptor,
};
use crate::observability::{events, fields};
use crate::routing::uri::Uri;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

const COMPONENT: &str = "pipeline";

/// Arguments returned by a decorator handler.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct HandlerReply {
    pub(crate) args: Args,
    pub(crate) kwargs: Dict,
}

/// Invokes decorator handlers as ordinary procedure calls.
#[async_trait]
pub(crate) trait HandlerInvoker: Send + Sync {
    /// Invokes `procedure` and waits for its result.
    async fn invoke(&self, procedure: &Uri, args: Args) -> Result<HandlerReply, RouterError>;

    /// Invokes `procedure` and discards whatever it returns.
    fn invoke_detached(&self, procedure: &Uri, args: Args);
}

/// A message that can pass through a stage and be replaced by a handler.
pub(crate) trait Intercepted: Serialize + Send + Sized {
    /// Builds the replacement described by `descriptor`.
    fn redirect(self, descriptor: Value) -> Result<Self, serde_json::Error>;
}

impl Intercepted for Call {
    fn redirect(self, descriptor: Value) -> Result<Self, serde_json::Error> {
        let descriptor: CallDescriptor = serde_json::from_value(descriptor)?;
        Ok(Call {
            procedure: descriptor.procedure,
            args: descriptor.args,
            kwargs: descriptor.kwargs,
            ..self
        })
    }
}

impl Intercepted for CallResult {
    fn redirect(self, descriptor: Value) -> Result<Self, serde_json::Error> {
        let descriptor: ResultDescriptor = serde_json::from_value(descriptor)?;
        Ok(CallResult {
            args: descriptor.args,
            kwargs: descriptor.kwargs,
            ..self
        })
    }
}

impl Intercepted for Publish {
    fn redirect(self, descriptor: Value) -> Result<Self, serde_json::Error> {
        let descriptor: PublishDescriptor = serde_json::from_value(descriptor)?;
        Ok(Publish {
            topic: descriptor.topic,
            args: descriptor.args,
            kwargs: descriptor.kwargs,
            ..self
        })
    }
}

#[derive(Debug, PartialEq)]
pub(crate) enum StageOutcome<M> {
    /// Deliver `M`, either the original message or a handler's replacement.
    Continue(M),
    /// Stop routing and report the error to the originator.
    Abort(RouterError),
}

/// Runs `decorators` (already in execution order) against `message`.
///
/// Async handlers are dispatched without waiting and treated as empty results.
/// A sync handler's error aborts the stage, an empty result moves to the next
/// decorator, and a non-empty result replaces the message and ends the stage.
pub(crate) async fn run_stage<M, I>(
    invoker: &I,
    kind: DecoratorKind,
    decorators: Vec<Decorator>,
    message: M,
) -> StageOutcome<M>
where
    M: Intercepted,
    I: HandlerInvoker + ?Sized,
{
    debug!(
        event = events::PIPELINE_STAGE_START,
        component = COMPONENT,
        kind = kind.as_str(),
        decorators = decorators.len(),
        "running interception stage"
    );

    for decorator in decorators {
        let argument = match serde_json::to_value(&message) {
            Ok(argument) => argument,
            Err(err) => return StageOutcome::Abort(RouterError::InvalidArgument(err.to_string())),
        };

        if decorator.call_type() == CallType::Async {
            invoker.invoke_detached(decorator.handler(), vec![argument]);
            continue;
        }

        let reply = match invoker.invoke(decorator.handler(), vec![argument]).await {
            Ok(reply) => reply,
            Err(err) => {
                debug!(
                    event = events::PIPELINE_STAGE_ABORT,
                    component = COMPONENT,
                    kind = kind.as_str(),
                    decorator = fields::format_decorator(&decorator),
                    err = %err,
                    "decorator aborted message"
                );
                return StageOutcome::Abort(err);
            }
        };

        let Some(descriptor) = reply.args.into_iter().next() else {
            continue;
        };
        return match message.redirect(descriptor) {
            Ok(replacement) => {
                debug!(
                    event = events::PIPELINE_STAGE_REDIRECT,
                    component = COMPONENT,
                    kind = kind.as_str(),
                    decorator = fields::format_decorator(&decorator),
                    "decorator replaced message"
                );
                StageOutcome::Continue(replacement)
            }
            Err(err) => {
                warn!(
                    event = events::PIPELINE_STAGE_ABORT,
                    component = COMPONENT,
                    kind = kind.as_str(),
                    decorator = fields::format_decorator(&decorator),
                    err = %err,
                    "decorator returned a malformed replacement"
                );
                StageOutcome::Abort(RouterError::InvalidArgument(format!(
                    "malformed replacement from {}: {err}",
                    decorator.handler()
                )))
            }
        };
    }

    StageOutcome::Continue(message)
}
