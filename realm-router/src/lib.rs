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

//! # realm-router
//!
//! `realm-router` is a session-based publish/subscribe and RPC router with an
//! interception pipeline. Sessions install *decorators*: procedures the router calls
//! before or after routing a message, which may observe it, reject it, or replace
//! it with a different target and payload.
//!
//! Typical usage is centered on [`Realm`] and the in-process [`LocalClient`].
//!
//! ## Calls and decorators
//!
//! ```
//! use realm_router::{CallType, DecoratorKind, InvokeResult, MatchPolicy, Realm, RealmConfig};
//! use serde_json::{json, Map};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let realm = Realm::new(RealmConfig::new("realm1")).unwrap();
//!
//! let callee = realm.connect_local();
//! callee
//!     .register("com.example.add", |invocation| async move {
//!         let sum: i64 = invocation.args.iter().filter_map(|arg| arg.as_i64()).sum();
//!         InvokeResult::with_args(vec![json!(sum)])
//!     })
//!     .await
//!     .unwrap();
//! callee
//!     .register("com.example.guard", |_| async {
//!         InvokeResult::error("com.example.denied", vec![])
//!     })
//!     .await
//!     .unwrap();
//!
//! let caller = realm.connect_local();
//! let result = caller
//!     .call("com.example.add", vec![json!(2), json!(3)], Map::new())
//!     .await
//!     .unwrap();
//! assert_eq!(result.args, vec![json!(5)]);
//!
//! // A sync precall decorator that answers with an error stops the call.
//! let decorator = caller
//!     .add_decorator(
//!         DecoratorKind::Precall,
//!         MatchPolicy::Prefix,
//!         "com.example.add",
//!         "com.example.guard",
//!         0,
//!         CallType::Sync,
//!     )
//!     .await
//!     .unwrap();
//! let err = caller
//!     .call("com.example.add", vec![json!(2), json!(3)], Map::new())
//!     .await
//!     .unwrap_err();
//! assert_eq!(err.error_uri().as_str(), "com.example.denied");
//!
//! caller.remove_decorator(decorator).await.unwrap();
//! # });
//! ```
//!
//! ## Internal architecture map
//!
//! - API facade: [`Router`], [`Realm`], [`LocalClient`] and configuration
//! - Control plane: decorator values, per-component decorator tables, management procedures
//! - Routing: URI matching, dealer (RPC) and broker (pub/sub) state
//! - Data plane: linked peers, per-session reader tasks, interception stages
//! - Runtime: per-component action queues on dedicated threads
//!
//! ## Observability model
//!
//! The workspace uses `tracing` for logs/events.
//! Library code emits events/spans and does not unconditionally initialize a global
//! subscriber. Binaries/tests are responsible for one-time `tracing_subscriber`
//! initialization at process boundaries.

mod client;
pub use client::{InvokeResult, LocalClient};

mod config;
pub use config::{ConfigError, RealmConfig, RouterConfig};

mod control_plane;
pub use control_plane::decorator::{CallType, Decorator, DecoratorKind, MatchPolicy};
pub use control_plane::decorator_registry::{DECORATOR_ADD, DECORATOR_REMOVE};

mod data_plane;
pub use data_plane::local_peer::{
    linked_peers, BlockingSender, LossySender, RouterPeer, SessionPeer, DEFAULT_OUT_QUEUE_SIZE,
};

pub mod error;
pub use error::RouterError;

pub mod message;

mod metrics;
pub use metrics::{CounterMetrics, MessageMetrics, MetricsSnapshot};

#[doc(hidden)]
pub mod observability;

mod realm;
pub use realm::Realm;

mod router;
pub use router::Router;

mod routing;
pub use routing::uri::Uri;

mod runtime;

#[doc(hidden)]
pub mod benchmark_support;
