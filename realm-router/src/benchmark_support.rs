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

//! Deterministic benchmark fixtures for the Criterion harness.

use crate::client::{InvokeResult, LocalClient};
use crate::config::RealmConfig;
use crate::control_plane::decorator::{CallType, Decorator, DecoratorKind, MatchPolicy};
use crate::error::RouterError;
use crate::message::Dict;
use crate::realm::Realm;
use crate::routing::decorator_map::DecoratorMap;
use crate::routing::uri::Uri;
use serde_json::Value;

const BENCH_OWNER: u64 = 1;
const TARGET_PROCEDURE: &str = "bench.service.target";

/// Decorator tables with `buckets` prefix and `buckets` wildcard patterns, of which
/// only a handful match the lookup URI.
pub struct DecoratorMatchFixture {
    map: DecoratorMap,
    lookup: Uri,
}

impl DecoratorMatchFixture {
    pub fn new(buckets: usize) -> Self {
        let mut map = DecoratorMap::new();
        for index in 0..buckets {
            let order = (index % 17) as i64 - 8;
            map.insert(
                MatchPolicy::Prefix,
                Uri::from(format!("bench.prefix{index}")),
                Decorator::new(
                    Uri::from("bench.handler"),
                    order,
                    CallType::Sync,
                    BENCH_OWNER,
                ),
            );
            map.insert(
                MatchPolicy::Wildcard,
                Uri::from(format!("bench..op{index}")),
                Decorator::new(
                    Uri::from("bench.handler"),
                    order,
                    CallType::Sync,
                    BENCH_OWNER,
                ),
            );
        }
        map.insert(
            MatchPolicy::Exact,
            Uri::from("bench.service.op0"),
            Decorator::new(Uri::from("bench.handler"), 0, CallType::Sync, BENCH_OWNER),
        );
        map.insert(
            MatchPolicy::Prefix,
            Uri::from("bench.service"),
            Decorator::new(Uri::from("bench.handler"), 1, CallType::Sync, BENCH_OWNER),
        );

        Self {
            map,
            lookup: Uri::from("bench.service.op0"),
        }
    }

    /// Number of decorators matched for the lookup URI.
    pub fn match_count(&self) -> usize {
        self.map.match_decorators(&self.lookup).len()
    }
}

/// A realm with one echo procedure guarded by `decorators` sync pass-through
/// precall decorators.
pub struct DecoratedCallFixture {
    _realm: Realm,
    _callee: LocalClient,
    caller: LocalClient,
}

impl DecoratedCallFixture {
    /// Must be awaited inside a tokio runtime.
    pub async fn new(decorators: usize) -> Result<Self, RouterError> {
        let realm = Realm::new(RealmConfig::new("bench.realm"))?;
        let callee = realm.connect_local();
        let caller = realm.connect_local();

        callee
            .register(TARGET_PROCEDURE, |invocation| async move {
                InvokeResult::with_args(invocation.args)
            })
            .await?;
        callee
            .register("bench.decorator.pass", |_| async { InvokeResult::empty() })
            .await?;
        for order in 0..decorators {
            callee
                .add_decorator(
                    DecoratorKind::Precall,
                    MatchPolicy::Exact,
                    TARGET_PROCEDURE,
                    "bench.decorator.pass",
                    order as i64,
                    CallType::Sync,
                )
                .await?;
        }

        Ok(Self {
            _realm: realm,
            _callee: callee,
            caller,
        })
    }

    /// Performs one decorated call and returns the number of echoed arguments.
    pub async fn call_once(&self) -> Result<usize, RouterError> {
        let result = self
            .caller
            .call(TARGET_PROCEDURE, vec![Value::from(1)], Dict::new())
            .await?;
        Ok(result.args.len())
    }
}
