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

use integration_test_utils::Recorder;
use realm_router::message::{Dict, Id};
use realm_router::{InvokeResult, LocalClient, Realm, RealmConfig};
use serde_json::{json, Value};
use std::time::Duration;

#[allow(dead_code)]
pub(crate) const WAIT: Duration = Duration::from_secs(5);
#[allow(dead_code)]
pub(crate) const SETTLE: Duration = Duration::from_millis(100);

#[allow(dead_code)]
pub(crate) fn make_realm(uri: &str) -> Realm {
    Realm::new(RealmConfig::new(uri)).expect("realm creation should succeed")
}

#[allow(dead_code)]
pub(crate) fn no_kwargs() -> Dict {
    Dict::new()
}

#[allow(dead_code)]
pub(crate) fn acknowledged() -> Dict {
    let mut options = Dict::new();
    options.insert("acknowledge".into(), json!(true));
    options
}

/// Registers `procedure` on `client`; every invocation is recorded and answered with `reply`.
#[allow(dead_code)]
pub(crate) async fn register_recording(
    client: &LocalClient,
    procedure: &str,
    recorder: &Recorder,
    reply: InvokeResult,
) -> Id {
    let recorder = recorder.clone();
    client
        .register(procedure, move |invocation| {
            recorder.record(&invocation.args);
            let reply = reply.clone();
            async move { reply }
        })
        .await
        .expect("procedure registration should succeed")
}

/// Registers `procedure` on `client` answering with its positional arguments.
#[allow(dead_code)]
pub(crate) async fn register_echo(client: &LocalClient, procedure: &str, recorder: &Recorder) -> Id {
    let recorder = recorder.clone();
    client
        .register(procedure, move |invocation| {
            recorder.record(&invocation.args);
            async move { InvokeResult::with_args(invocation.args) }
        })
        .await
        .expect("procedure registration should succeed")
}

/// The message a decorator handler was given: its single positional argument.
#[allow(dead_code)]
pub(crate) fn intercepted(entry: &[Value]) -> &Value {
    assert_eq!(entry.len(), 1, "decorator handlers receive one argument");
    &entry[0]
}
