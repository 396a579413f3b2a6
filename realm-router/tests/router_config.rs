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

mod support;

use integration_test_utils::{init_logging, Recorder};
use realm_router::{CounterMetrics, RouterConfig, Router, Uri};
use serde_json::json;
use std::sync::Arc;
use support::{no_kwargs, register_echo};

const CONFIG: &str = r#"
{
    // one realm with a tight outbound queue, one with the default
    realms: [
        { uri: "realm.config.tight", outbound_queue_size: 4 },
        { uri: "realm.config.default" },
    ],
}
"#;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn configured_realms_route_independently() {
    init_logging();
    let config = RouterConfig::from_json5(CONFIG).expect("config should parse");
    let router = Router::from_config(&config).expect("router should start");

    let tight = router
        .realm(&Uri::from("realm.config.tight"))
        .expect("realm is configured");
    let default = router
        .realm(&Uri::from("realm.config.default"))
        .expect("realm is configured");
    assert_eq!(tight.config().outbound_queue_size, 4);
    assert_eq!(default.config().outbound_queue_size, 16);

    let target = Recorder::new("target");
    let callee = tight.connect_local();
    register_echo(&callee, "com.example.echo", &target).await;

    let local_caller = tight.connect_local();
    let result = local_caller
        .call("com.example.echo", vec![json!("ping")], no_kwargs())
        .await
        .expect("same-realm call should succeed");
    assert_eq!(result.args, vec![json!("ping")]);

    let foreign_caller = default.connect_local();
    assert!(foreign_caller
        .call("com.example.echo", vec![], no_kwargs())
        .await
        .is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn metrics_count_router_traffic() {
    init_logging();
    let config = RouterConfig::from_json5(CONFIG).expect("config should parse");
    let metrics = Arc::new(CounterMetrics::new());
    let router =
        Router::from_config_with_metrics(&config, metrics.clone()).expect("router should start");
    let realm = router
        .realm(&Uri::from("realm.config.default"))
        .expect("realm is configured");

    let target = Recorder::new("target");
    let callee = realm.connect_local();
    let caller = realm.connect_local();
    register_echo(&callee, "com.example.echo", &target).await;
    caller
        .call("com.example.echo", vec![json!(1)], no_kwargs())
        .await
        .expect("call should succeed");

    // REGISTER, CALL and YIELD in; REGISTERED, INVOCATION and RESULT out.
    let snapshot = metrics.snapshot();
    assert!(snapshot.recv_message_count >= 3);
    assert!(snapshot.send_message_count >= 3);
    assert!(snapshot.recv_bytes_total > 0);
    assert!(snapshot.send_bytes_total > 0);
}
