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

//! Router error taxonomy and the WAMP error URIs each failure is reported with.

use crate::message::{Args, Dict, ErrorMessage, Id, Message, RequestType};
use crate::routing::uri::Uri;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const ERR_INVALID_ARGUMENT: &str = "wamp.error.invalid_argument";
pub const ERR_NO_SUCH_PROCEDURE: &str = "wamp.error.no_such_procedure";
pub const ERR_NO_SUCH_DECORATOR: &str = "wamp.error.no_such_decorator";
pub const ERR_NOT_AUTHORIZED: &str = "wamp.error.not_authorized";
pub const ERR_PROCEDURE_ALREADY_EXISTS: &str = "wamp.error.procedure_already_exists";
pub const ERR_NO_SUCH_REGISTRATION: &str = "wamp.error.no_such_registration";
pub const ERR_NO_SUCH_SUBSCRIPTION: &str = "wamp.error.no_such_subscription";
pub const ERR_NO_SUCH_REALM: &str = "wamp.error.no_such_realm";
pub const ERR_CANCELED: &str = "wamp.error.canceled";
pub const ERR_INTERNAL: &str = "wamp.error.internal_error";
pub const ERR_PROTOCOL_VIOLATION: &str = "wamp.error.protocol_violation";

#[derive(Clone, Debug, PartialEq)]
pub enum RouterError {
    /// A management request carried a missing or malformed field.
    InvalidArgument(String),
    /// The procedure is not registered.
    NoSuchProcedure(Uri),
    NoSuchDecorator(Id),
    /// The requester does not own the decorator it tried to remove.
    NotAuthorized,
    ProcedureAlreadyExists(Uri),
    NoSuchRegistration(Id),
    NoSuchSubscription(Id),
    NoSuchRealm(Uri),
    DuplicateRealm(Uri),
    /// The request was abandoned because the peer serving it went away.
    Canceled,
    /// An error result produced by a procedure or a decorator handler.
    Invocation {
        error: Uri,
        args: Args,
        kwargs: Dict,
    },
    /// The named component stopped processing its action queue.
    ComponentClosed(&'static str),
    /// The router answered with a message that does not fit the request.
    ProtocolViolation(String),
}

impl RouterError {
    /// WAMP error URI reported to the peer that issued the failing request.
    pub fn error_uri(&self) -> Uri {
        let uri = match self {
            RouterError::InvalidArgument(_) => ERR_INVALID_ARGUMENT,
            RouterError::NoSuchProcedure(_) => ERR_NO_SUCH_PROCEDURE,
            RouterError::NoSuchDecorator(_) => ERR_NO_SUCH_DECORATOR,
            RouterError::NotAuthorized => ERR_NOT_AUTHORIZED,
            RouterError::ProcedureAlreadyExists(_) => ERR_PROCEDURE_ALREADY_EXISTS,
            RouterError::NoSuchRegistration(_) => ERR_NO_SUCH_REGISTRATION,
            RouterError::NoSuchSubscription(_) => ERR_NO_SUCH_SUBSCRIPTION,
            RouterError::NoSuchRealm(_) => ERR_NO_SUCH_REALM,
            RouterError::DuplicateRealm(_) => ERR_INVALID_ARGUMENT,
            RouterError::Canceled => ERR_CANCELED,
            RouterError::Invocation { error, .. } => return error.clone(),
            RouterError::ComponentClosed(_) => ERR_INTERNAL,
            RouterError::ProtocolViolation(_) => ERR_PROTOCOL_VIOLATION,
        };
        Uri::from(uri)
    }

    /// Positional and keyword payload attached to the reported error.
    pub(crate) fn into_payload(self) -> (Uri, Args, Dict) {
        match self {
            RouterError::Invocation {
                error,
                args,
                kwargs,
            } => (error, args, kwargs),
            other => {
                let uri = other.error_uri();
                (uri, vec![other.to_string().into()], Dict::new())
            }
        }
    }

    /// `ERROR` answering `request` of `request_type`.
    pub(crate) fn into_error_message(self, request_type: RequestType, request: Id) -> Message {
        let (error, args, kwargs) = self.into_payload();
        Message::Error(ErrorMessage {
            request_type,
            request,
            error,
            args,
            kwargs,
        })
    }
}

impl Display for RouterError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RouterError::InvalidArgument(reason) => write!(f, "invalid argument: {reason}"),
            RouterError::NoSuchProcedure(uri) => write!(f, "no such procedure: {uri}"),
            RouterError::NoSuchDecorator(id) => write!(f, "no such decorator: {id}"),
            RouterError::NotAuthorized => write!(f, "session does not own the decorator"),
            RouterError::ProcedureAlreadyExists(uri) => {
                write!(f, "procedure already registered: {uri}")
            }
            RouterError::NoSuchRegistration(id) => write!(f, "no such registration: {id}"),
            RouterError::NoSuchSubscription(id) => write!(f, "no such subscription: {id}"),
            RouterError::NoSuchRealm(uri) => write!(f, "no such realm: {uri}"),
            RouterError::DuplicateRealm(uri) => write!(f, "realm configured twice: {uri}"),
            RouterError::Canceled => write!(f, "request canceled"),
            RouterError::Invocation { error, .. } => write!(f, "invocation failed: {error}"),
            RouterError::ComponentClosed(component) => {
                write!(f, "{component} action queue is closed")
            }
            RouterError::ProtocolViolation(reason) => write!(f, "protocol violation: {reason}"),
        }
    }
}

impl Error for RouterError {}
