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

//! Decorator value type and the closed tag sets it is described with.

use crate::error::RouterError;
use crate::message::{global_id, Id};
use crate::routing::uri::Uri;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

static CREATION_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Routing phase a decorator attaches to.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum DecoratorKind {
    /// RPC, on receipt of a `CALL` before the callee is resolved.
    Preprocess,
    /// RPC, after the callee is resolved and before it is invoked.
    Precall,
    /// RPC, on the callee's result before it is returned to the caller.
    Postcall,
    /// Pub/sub, on receipt of a `PUBLISH`.
    Publish,
    /// Pub/sub, before `EVENT`s are dispatched to subscribers.
    Event,
}

/// Realm component whose action queue owns a decorator kind's tables.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Component {
    Dealer,
    Broker,
}

impl DecoratorKind {
    pub const ALL: [DecoratorKind; 5] = [
        DecoratorKind::Preprocess,
        DecoratorKind::Precall,
        DecoratorKind::Postcall,
        DecoratorKind::Publish,
        DecoratorKind::Event,
    ];

    pub fn component(self) -> Component {
        match self {
            DecoratorKind::Preprocess | DecoratorKind::Precall | DecoratorKind::Postcall => {
                Component::Dealer
            }
            DecoratorKind::Publish | DecoratorKind::Event => Component::Broker,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DecoratorKind::Preprocess => "preprocess",
            DecoratorKind::Precall => "precall",
            DecoratorKind::Postcall => "postcall",
            DecoratorKind::Publish => "publish",
            DecoratorKind::Event => "event",
        }
    }
}

impl FromStr for DecoratorKind {
    type Err = RouterError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "preprocess" => Ok(DecoratorKind::Preprocess),
            "precall" => Ok(DecoratorKind::Precall),
            "postcall" => Ok(DecoratorKind::Postcall),
            "publish" => Ok(DecoratorKind::Publish),
            "event" => Ok(DecoratorKind::Event),
            other => Err(RouterError::InvalidArgument(format!(
                "unknown decorator kind `{other}`"
            ))),
        }
    }
}

impl Display for DecoratorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum MatchPolicy {
    Exact,
    Prefix,
    Wildcard,
}

impl MatchPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchPolicy::Exact => "exact",
            MatchPolicy::Prefix => "prefix",
            MatchPolicy::Wildcard => "wildcard",
        }
    }
}

impl FromStr for MatchPolicy {
    type Err = RouterError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "exact" => Ok(MatchPolicy::Exact),
            "prefix" => Ok(MatchPolicy::Prefix),
            "wildcard" => Ok(MatchPolicy::Wildcard),
            other => Err(RouterError::InvalidArgument(format!(
                "unknown match policy `{other}`"
            ))),
        }
    }
}

impl Display for MatchPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether routing waits for a decorator handler's result.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum CallType {
    Sync,
    Async,
}

impl CallType {
    pub fn as_str(self) -> &'static str {
        match self {
            CallType::Sync => "sync",
            CallType::Async => "async",
        }
    }
}

impl FromStr for CallType {
    type Err = RouterError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "sync" => Ok(CallType::Sync),
            "async" => Ok(CallType::Async),
            other => Err(RouterError::InvalidArgument(format!(
                "unknown call type `{other}`"
            ))),
        }
    }
}

impl Display for CallType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered interception rule. Immutable once created.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Decorator {
    id: Id,
    handler: Uri,
    order: i64,
    call_type: CallType,
    owner: Id,
    sequence: u64,
}

impl Decorator {
    /// Builds a decorator with a fresh identity. Does not touch any table and does
    /// not check that `handler` is registered.
    pub(crate) fn new(handler: Uri, order: i64, call_type: CallType, owner: Id) -> Self {
        Self {
            id: global_id(),
            handler,
            order,
            call_type,
            owner,
            sequence: CREATION_SEQUENCE.fetch_add(1, Ordering::Relaxed),
        }
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn handler(&self) -> &Uri {
        &self.handler
    }

    pub fn order(&self) -> i64 {
        self.order
    }

    pub fn call_type(&self) -> CallType {
        self.call_type
    }

    pub fn owner(&self) -> Id {
        self.owner
    }

    /// Sort key: ascending order, ties broken by creation sequence.
    pub(crate) fn priority(&self) -> (i64, u64) {
        (self.order, self.sequence)
    }
}
