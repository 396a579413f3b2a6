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

use crate::control_plane::decorator::{CallType, Component, Decorator, DecoratorKind, MatchPolicy};
use crate::error::RouterError;
use crate::message::{Args, Id};
use crate::observability::events;
use crate::realm::RealmComponents;
use crate::routing::uri::Uri;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Installs a decorator: `[kind, matchPolicy, pattern, handlerURI, order, callType]`,
/// returns `[decoratorID]`.
pub const DECORATOR_ADD: &str = "wamp.decorator.add";
/// Removes a decorator owned by the caller: `[decoratorID]`, returns nothing.
pub const DECORATOR_REMOVE: &str = "wamp.decorator.remove";

const COMPONENT: &str = "decorator_registry";

pub(crate) fn is_management_procedure(procedure: &Uri) -> bool {
    matches!(procedure.as_str(), DECORATOR_ADD | DECORATOR_REMOVE)
}

/// Parsed arguments of a decorator add request.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct DecoratorRequest {
    pub(crate) kind: DecoratorKind,
    pub(crate) policy: MatchPolicy,
    pub(crate) pattern: Uri,
    pub(crate) handler: Uri,
    pub(crate) order: i64,
    pub(crate) call_type: CallType,
}

fn string_arg<'a>(args: &'a [Value], index: usize, name: &str) -> Result<&'a str, RouterError> {
    args.get(index)
        .and_then(Value::as_str)
        .ok_or_else(|| RouterError::InvalidArgument(format!("`{name}` must be a string")))
}

impl DecoratorRequest {
    pub(crate) fn from_args(args: &[Value]) -> Result<Self, RouterError> {
        let kind = string_arg(args, 0, "kind")?.parse::<DecoratorKind>()?;
        let policy = string_arg(args, 1, "matchPolicy")?.parse::<MatchPolicy>()?;
        let pattern = Uri::from(string_arg(args, 2, "pattern")?);
        let handler = Uri::from(string_arg(args, 3, "handlerURI")?);
        let order = args
            .get(4)
            .and_then(Value::as_i64)
            .ok_or_else(|| RouterError::InvalidArgument("`order` must be an integer".into()))?;
        let call_type = string_arg(args, 5, "callType")?.parse::<CallType>()?;

        if !pattern.is_valid(policy == MatchPolicy::Wildcard) {
            return Err(RouterError::InvalidArgument(format!(
                "invalid {policy} pattern `{pattern}`"
            )));
        }
        if !handler.is_valid(false) {
            return Err(RouterError::InvalidArgument(format!(
                "invalid handler uri `{handler}`"
            )));
        }

        Ok(Self {
            kind,
            policy,
            pattern,
            handler,
            order,
            call_type,
        })
    }
}

fn decorator_id_arg(args: &[Value]) -> Result<Id, RouterError> {
    args.first()
        .and_then(Value::as_u64)
        .ok_or_else(|| RouterError::InvalidArgument("`decoratorID` must be an integer".into()))
}

/// Creates, inserts and removes decorators across the realm's dealer and broker.
///
/// Every table mutation is a queued action on the owning component and is awaited
/// before the registry returns.
pub(crate) struct DecoratorRegistry<'a> {
    components: &'a RealmComponents,
}

impl<'a> DecoratorRegistry<'a> {
    pub(crate) fn new(components: &'a RealmComponents) -> Self {
        Self { components }
    }

    /// Whether `handler` is currently registered with the dealer.
    pub(crate) async fn validate(&self, handler: &Uri) -> Result<bool, RouterError> {
        let handler = handler.clone();
        self.components
            .dealer
            .call(move |dealer| dealer.has_registration(&handler))
            .await
    }

    /// Builds a decorator for a registered handler. Tables are left untouched.
    pub(crate) async fn create(
        &self,
        handler: Uri,
        order: i64,
        call_type: CallType,
        owner: Id,
    ) -> Result<Decorator, RouterError> {
        if !self.validate(&handler).await? {
            return Err(RouterError::NoSuchProcedure(handler));
        }
        Ok(Decorator::new(handler, order, call_type, owner))
    }

    pub(crate) async fn insert(
        &self,
        kind: DecoratorKind,
        policy: MatchPolicy,
        pattern: Uri,
        decorator: Decorator,
    ) -> Result<(), RouterError> {
        match kind.component() {
            Component::Dealer => {
                self.components
                    .dealer
                    .call(move |dealer| {
                        dealer
                            .decorators_mut()
                            .insert(kind, policy, pattern, decorator)
                    })
                    .await?
            }
            Component::Broker => {
                self.components
                    .broker
                    .call(move |broker| {
                        broker
                            .decorators_mut()
                            .insert(kind, policy, pattern, decorator)
                    })
                    .await?
            }
        }
    }

    /// Validates, creates and inserts the decorator described by `request`.
    pub(crate) async fn add(&self, owner: Id, request: DecoratorRequest) -> Result<Id, RouterError> {
        let decorator = self
            .create(request.handler, request.order, request.call_type, owner)
            .await?;
        let id = decorator.id();
        self.insert(request.kind, request.policy, request.pattern, decorator)
            .await?;
        Ok(id)
    }

    /// Removes decorator `id` on behalf of `requester` from whichever component holds it.
    ///
    /// Each table indexes only its own ids, so the dealer is asked first and the
    /// broker only when the dealer reports no such decorator.
    pub(crate) async fn remove(&self, id: Id, requester: Id) -> Result<(), RouterError> {
        let from_dealer = self
            .components
            .dealer
            .call(move |dealer| dealer.decorators_mut().remove(id, requester))
            .await?;
        match from_dealer {
            Err(RouterError::NoSuchDecorator(_)) => {}
            other => return other.map(|_| ()),
        }

        self.components
            .broker
            .call(move |broker| broker.decorators_mut().remove(id, requester))
            .await?
            .map(|_| ())
    }

    /// Serves a management procedure call from `session`, returning the result arguments.
    pub(crate) async fn serve(
        &self,
        session: Id,
        procedure: &Uri,
        args: &[Value],
    ) -> Result<Args, RouterError> {
        if procedure.as_str() == DECORATOR_ADD {
            debug!(
                event = events::DECORATOR_ADD_START,
                component = COMPONENT,
                session,
                "adding decorator"
            );
            let outcome = match DecoratorRequest::from_args(args) {
                Ok(request) => {
                    let summary = format!(
                        "{} {} {} -> {}",
                        request.kind, request.policy, request.pattern, request.handler
                    );
                    self.add(session, request).await.map(|id| (id, summary))
                }
                Err(err) => Err(err),
            };
            return match outcome {
                Ok((id, summary)) => {
                    info!(
                        event = events::DECORATOR_ADD_OK,
                        component = COMPONENT,
                        session,
                        decorator_id = id,
                        decorator = summary.as_str(),
                        "decorator added"
                    );
                    Ok(vec![Value::from(id)])
                }
                Err(err) => {
                    warn!(
                        event = events::DECORATOR_ADD_FAILED,
                        component = COMPONENT,
                        session,
                        err = %err,
                        "unable to add decorator"
                    );
                    Err(err)
                }
            };
        }

        debug!(
            event = events::DECORATOR_REMOVE_START,
            component = COMPONENT,
            session,
            "removing decorator"
        );
        let id = decorator_id_arg(args)?;
        match self.remove(id, session).await {
            Ok(()) => {
                info!(
                    event = events::DECORATOR_REMOVE_OK,
                    component = COMPONENT,
                    session,
                    decorator_id = id,
                    "decorator removed"
                );
                Ok(Vec::new())
            }
            Err(err) => {
                warn!(
                    event = events::DECORATOR_REMOVE_FAILED,
                    component = COMPONENT,
                    session,
                    decorator_id = id,
                    err = %err,
                    "unable to remove decorator"
                );
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{decorator_id_arg, is_management_procedure, DecoratorRequest};
    use crate::control_plane::decorator::{CallType, DecoratorKind, MatchPolicy};
    use crate::error::RouterError;
    use crate::routing::uri::Uri;
    use serde_json::json;

    #[test]
    fn parses_a_complete_add_request() {
        let args = vec![
            json!("precall"),
            json!("wildcard"),
            json!("com..add"),
            json!("h.audit"),
            json!(-5),
            json!("async"),
        ];

        let request = DecoratorRequest::from_args(&args).expect("request should parse");

        assert_eq!(request.kind, DecoratorKind::Precall);
        assert_eq!(request.policy, MatchPolicy::Wildcard);
        assert_eq!(request.pattern, Uri::from("com..add"));
        assert_eq!(request.handler, Uri::from("h.audit"));
        assert_eq!(request.order, -5);
        assert_eq!(request.call_type, CallType::Async);
    }

    #[test]
    fn malformed_add_requests_are_invalid_arguments() {
        let cases = vec![
            vec![],
            vec![json!("precall"), json!("exact"), json!("a.b"), json!("h.x")],
            vec![
                json!("unknown"),
                json!("exact"),
                json!("a.b"),
                json!("h.x"),
                json!(0),
                json!("sync"),
            ],
            vec![
                json!("precall"),
                json!("exact"),
                json!("a..b"),
                json!("h.x"),
                json!(0),
                json!("sync"),
            ],
            vec![
                json!("precall"),
                json!("exact"),
                json!("a.b"),
                json!("h.x"),
                json!("first"),
                json!("sync"),
            ],
        ];

        for args in cases {
            assert!(
                matches!(
                    DecoratorRequest::from_args(&args),
                    Err(RouterError::InvalidArgument(_))
                ),
                "{args:?} should be rejected"
            );
        }
    }

    #[test]
    fn remove_requires_a_numeric_id() {
        assert_eq!(decorator_id_arg(&[json!(42)]), Ok(42));
        assert!(matches!(
            decorator_id_arg(&[json!("42")]),
            Err(RouterError::InvalidArgument(_))
        ));
    }

    #[test]
    fn recognizes_management_procedures() {
        assert!(is_management_procedure(&Uri::from("wamp.decorator.add")));
        assert!(is_management_procedure(&Uri::from("wamp.decorator.remove")));
        assert!(!is_management_procedure(&Uri::from("wamp.decorator.list")));
    }
}
