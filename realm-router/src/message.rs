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

//! In-process router message set.
//!
//! Messages are plain data. They derive `serde` so that a message under
//! interception can be handed to a decorator handler as a JSON argument, and so
//! that byte totals can be accounted for metrics.

use crate::routing::uri::Uri;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Session, request, registration, subscription, publication and decorator ids.
pub type Id = u64;

/// Positional arguments.
pub type Args = Vec<Value>;

/// Keyword arguments, options and details.
pub type Dict = Map<String, Value>;

const MAX_GLOBAL_ID: u64 = 1 << 53;

/// Generates a random id in the global scope, `[1, 2^53]`.
pub fn global_id() -> Id {
    let random = Uuid::new_v4().as_u128() as u64;
    (random % MAX_GLOBAL_ID) + 1
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Call {
    pub request: Id,
    #[serde(default)]
    pub options: Dict,
    pub procedure: Uri,
    #[serde(default)]
    pub args: Args,
    #[serde(default)]
    pub kwargs: Dict,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Invocation {
    pub request: Id,
    pub registration: Id,
    #[serde(default)]
    pub details: Dict,
    #[serde(default)]
    pub args: Args,
    #[serde(default)]
    pub kwargs: Dict,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Yield {
    pub request: Id,
    #[serde(default)]
    pub args: Args,
    #[serde(default)]
    pub kwargs: Dict,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CallResult {
    pub request: Id,
    #[serde(default)]
    pub details: Dict,
    #[serde(default)]
    pub args: Args,
    #[serde(default)]
    pub kwargs: Dict,
}

/// Message type a WAMP `ERROR` answers.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestType {
    Register,
    Unregister,
    Call,
    Invocation,
    Subscribe,
    Unsubscribe,
    Publish,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub request_type: RequestType,
    pub request: Id,
    pub error: Uri,
    #[serde(default)]
    pub args: Args,
    #[serde(default)]
    pub kwargs: Dict,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Publish {
    pub request: Id,
    #[serde(default)]
    pub options: Dict,
    pub topic: Uri,
    #[serde(default)]
    pub args: Args,
    #[serde(default)]
    pub kwargs: Dict,
}

impl Publish {
    pub(crate) fn acknowledge(&self) -> bool {
        self.options
            .get("acknowledge")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub(crate) fn exclude_me(&self) -> bool {
        self.options
            .get("exclude_me")
            .and_then(Value::as_bool)
            .unwrap_or(true)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub subscription: Id,
    pub publication: Id,
    #[serde(default)]
    pub details: Dict,
    #[serde(default)]
    pub args: Args,
    #[serde(default)]
    pub kwargs: Dict,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    Register { request: Id, procedure: Uri },
    Registered { request: Id, registration: Id },
    Unregister { request: Id, registration: Id },
    Unregistered { request: Id },
    Call(Call),
    Invocation(Invocation),
    Yield(Yield),
    Result(CallResult),
    Error(ErrorMessage),
    Subscribe { request: Id, topic: Uri },
    Subscribed { request: Id, subscription: Id },
    Unsubscribe { request: Id, subscription: Id },
    Unsubscribed { request: Id },
    Publish(Publish),
    Published { request: Id, publication: Id },
    Event(Event),
    Goodbye { reason: Uri },
}

impl Message {
    pub fn message_type(&self) -> &'static str {
        match self {
            Message::Register { .. } => "REGISTER",
            Message::Registered { .. } => "REGISTERED",
            Message::Unregister { .. } => "UNREGISTER",
            Message::Unregistered { .. } => "UNREGISTERED",
            Message::Call(_) => "CALL",
            Message::Invocation(_) => "INVOCATION",
            Message::Yield(_) => "YIELD",
            Message::Result(_) => "RESULT",
            Message::Error(_) => "ERROR",
            Message::Subscribe { .. } => "SUBSCRIBE",
            Message::Subscribed { .. } => "SUBSCRIBED",
            Message::Unsubscribe { .. } => "UNSUBSCRIBE",
            Message::Unsubscribed { .. } => "UNSUBSCRIBED",
            Message::Publish(_) => "PUBLISH",
            Message::Published { .. } => "PUBLISHED",
            Message::Event(_) => "EVENT",
            Message::Goodbye { .. } => "GOODBYE",
        }
    }

    /// JSON-encoded length of the message, used for traffic byte totals.
    pub fn encoded_len(&self) -> usize {
        serde_json::to_vec(self).map(|bytes| bytes.len()).unwrap_or(0)
    }
}

/// Replacement for an intercepted `CALL` returned by a preprocess or precall handler.
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct CallDescriptor {
    pub(crate) procedure: Uri,
    #[serde(default)]
    pub(crate) args: Args,
    #[serde(default)]
    pub(crate) kwargs: Dict,
}

/// Replacement for an intercepted `RESULT` returned by a postcall handler.
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct ResultDescriptor {
    #[serde(default)]
    pub(crate) args: Args,
    #[serde(default)]
    pub(crate) kwargs: Dict,
}

/// Replacement for an intercepted `PUBLISH` returned by a publish or event handler.
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct PublishDescriptor {
    pub(crate) topic: Uri,
    #[serde(default)]
    pub(crate) args: Args,
    #[serde(default)]
    pub(crate) kwargs: Dict,
}
