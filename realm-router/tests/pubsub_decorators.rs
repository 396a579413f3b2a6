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
use realm_router::message::Event;
use realm_router::{CallType, DecoratorKind, InvokeResult, LocalClient, MatchPolicy};
use serde_json::json;
use support::{acknowledged, intercepted, make_realm, register_recording, SETTLE, WAIT};

async fn subscribe_recording(client: &LocalClient, topic: &str, recorder: &Recorder) {
    let recorder = recorder.clone();
    client
        .subscribe(topic, move |event: Event| recorder.record(&event.args))
        .await
        .expect("subscription should succeed");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn acknowledged_publish_reaches_subscribers() {
    init_logging();
    let realm = make_realm("realm.pubsub.plain");
    let publisher = realm.connect_local();
    let subscriber = realm.connect_local();
    let received = Recorder::new("received");

    let sink = received.clone();
    subscriber
        .subscribe("com.example.news", move |event: Event| {
            let mut entry = vec![event.details["topic"].clone()];
            entry.extend(event.args);
            sink.record(&entry);
        })
        .await
        .expect("subscription should succeed");

    let publication = publisher
        .publish("com.example.news", vec![json!("hello")], acknowledged())
        .await
        .expect("publish should succeed");

    assert!(publication.is_some());
    assert!(received.wait_for_count(1, WAIT).await);
    assert_eq!(
        received.entries_snapshot(),
        vec![vec![json!("com.example.news"), json!("hello")]]
    );
    assert_eq!(realm.topic_count().await.expect("broker is running"), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn publisher_is_excluded_unless_asked_otherwise() {
    init_logging();
    let realm = make_realm("realm.pubsub.exclude");
    let client = realm.connect_local();
    let received = Recorder::new("received");

    subscribe_recording(&client, "com.example.loop", &received).await;

    client
        .publish("com.example.loop", vec![json!(1)], acknowledged())
        .await
        .expect("publish should succeed");
    let mut options = acknowledged();
    options.insert("exclude_me".into(), json!(false));
    client
        .publish("com.example.loop", vec![json!(2)], options)
        .await
        .expect("publish should succeed");

    assert!(received.wait_for_count(1, WAIT).await);
    tokio::time::sleep(SETTLE).await;
    assert_eq!(received.entries_snapshot(), vec![vec![json!(2)]]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn publish_decorator_error_drops_the_publication() {
    init_logging();
    let realm = make_realm("realm.pubsub.abort");
    let publisher = realm.connect_local();
    let subscriber = realm.connect_local();
    let received = Recorder::new("received");
    let censor = Recorder::new("censor");

    register_recording(
        &subscriber,
        "com.example.censor",
        &censor,
        InvokeResult::error("com.example.forbidden", vec![]),
    )
    .await;
    subscriber
        .add_decorator(
            DecoratorKind::Publish,
            MatchPolicy::Exact,
            "com.example.secret",
            "com.example.censor",
            0,
            CallType::Sync,
        )
        .await
        .expect("decorator should be added");
    subscribe_recording(&subscriber, "com.example.secret", &received).await;
    subscribe_recording(&subscriber, "com.example.open", &received).await;

    let err = publisher
        .publish("com.example.secret", vec![json!("leak")], acknowledged())
        .await
        .expect_err("the censor rejects the publication");
    assert_eq!(err.error_uri().as_str(), "com.example.forbidden");

    publisher
        .publish("com.example.open", vec![json!("fine")], acknowledged())
        .await
        .expect("undecorated topic should publish");
    assert!(received.wait_for_count(1, WAIT).await);
    tokio::time::sleep(SETTLE).await;
    assert_eq!(received.entries_snapshot(), vec![vec![json!("fine")]]);
    assert_eq!(censor.count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn publish_replacement_moves_the_publication_to_another_topic() {
    init_logging();
    let realm = make_realm("realm.pubsub.redirect");
    let publisher = realm.connect_local();
    let subscriber = realm.connect_local();
    let legacy = Recorder::new("legacy");
    let current = Recorder::new("current");
    let router = Recorder::new("router");

    register_recording(
        &subscriber,
        "com.example.retopic",
        &router,
        InvokeResult::with_args(vec![json!({
            "topic": "com.example.v2.alerts",
            "args": ["moved"],
        })]),
    )
    .await;
    subscriber
        .add_decorator(
            DecoratorKind::Publish,
            MatchPolicy::Prefix,
            "com.example.v1",
            "com.example.retopic",
            0,
            CallType::Sync,
        )
        .await
        .expect("decorator should be added");
    subscribe_recording(&subscriber, "com.example.v1.alerts", &legacy).await;
    subscribe_recording(&subscriber, "com.example.v2.alerts", &current).await;

    publisher
        .publish("com.example.v1.alerts", vec![json!("original")], acknowledged())
        .await
        .expect("publish should succeed");

    assert!(current.wait_for_count(1, WAIT).await);
    assert_eq!(current.entries_snapshot(), vec![vec![json!("moved")]]);
    assert_eq!(legacy.count(), 0);
    let seen = router.entries_snapshot();
    assert_eq!(intercepted(&seen[0])["topic"], json!("com.example.v1.alerts"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn event_decorator_sees_the_publication_before_delivery() {
    init_logging();
    let realm = make_realm("realm.pubsub.event");
    let publisher = realm.connect_local();
    let subscriber = realm.connect_local();
    let received = Recorder::new("received");
    let inspector = Recorder::new("inspector");

    register_recording(&subscriber, "com.example.inspect", &inspector, InvokeResult::empty()).await;
    subscriber
        .add_decorator(
            DecoratorKind::Event,
            MatchPolicy::Wildcard,
            "com.example..temperature",
            "com.example.inspect",
            0,
            CallType::Sync,
        )
        .await
        .expect("decorator should be added");
    subscribe_recording(&subscriber, "com.example.kitchen.temperature", &received).await;

    publisher
        .publish(
            "com.example.kitchen.temperature",
            vec![json!(21.5)],
            acknowledged(),
        )
        .await
        .expect("publish should succeed");

    assert!(received.wait_for_count(1, WAIT).await);
    assert_eq!(received.entries_snapshot(), vec![vec![json!(21.5)]]);
    let seen = inspector.entries_snapshot();
    assert_eq!(seen.len(), 1);
    assert_eq!(intercepted(&seen[0])["args"], json!([21.5]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn event_decorator_error_suppresses_delivery() {
    init_logging();
    let realm = make_realm("realm.pubsub.event.abort");
    let publisher = realm.connect_local();
    let subscriber = realm.connect_local();
    let received = Recorder::new("received");
    let gate = Recorder::new("gate");

    register_recording(
        &subscriber,
        "com.example.gate",
        &gate,
        InvokeResult::error("com.example.quiet_hours", vec![]),
    )
    .await;
    subscriber
        .add_decorator(
            DecoratorKind::Event,
            MatchPolicy::Exact,
            "com.example.doorbell",
            "com.example.gate",
            0,
            CallType::Sync,
        )
        .await
        .expect("decorator should be added");
    subscribe_recording(&subscriber, "com.example.doorbell", &received).await;
    subscribe_recording(&subscriber, "com.example.mail", &received).await;

    let err = publisher
        .publish("com.example.doorbell", vec![json!("ring")], acknowledged())
        .await
        .expect_err("the gate rejects the event");
    assert_eq!(err.error_uri().as_str(), "com.example.quiet_hours");

    publisher
        .publish("com.example.mail", vec![json!("letter")], acknowledged())
        .await
        .expect("undecorated topic should publish");
    assert!(received.wait_for_count(1, WAIT).await);
    tokio::time::sleep(SETTLE).await;

    assert_eq!(received.entries_snapshot(), vec![vec![json!("letter")]]);
    assert_eq!(gate.count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn event_replacement_delivers_to_the_new_topic() {
    init_logging();
    let realm = make_realm("realm.pubsub.event.redirect");
    let publisher = realm.connect_local();
    let subscriber = realm.connect_local();
    let raw = Recorder::new("raw");
    let converted = Recorder::new("converted");
    let converter = Recorder::new("converter");

    register_recording(
        &subscriber,
        "com.example.to_celsius",
        &converter,
        InvokeResult::with_args(vec![json!({
            "topic": "com.example.celsius",
            "args": [20.0],
        })]),
    )
    .await;
    subscriber
        .add_decorator(
            DecoratorKind::Event,
            MatchPolicy::Exact,
            "com.example.fahrenheit",
            "com.example.to_celsius",
            0,
            CallType::Sync,
        )
        .await
        .expect("decorator should be added");
    subscribe_recording(&subscriber, "com.example.fahrenheit", &raw).await;
    subscribe_recording(&subscriber, "com.example.celsius", &converted).await;

    publisher
        .publish("com.example.fahrenheit", vec![json!(68.0)], acknowledged())
        .await
        .expect("publish should succeed");

    assert!(converted.wait_for_count(1, WAIT).await);
    tokio::time::sleep(SETTLE).await;
    assert_eq!(converted.entries_snapshot(), vec![vec![json!(20.0)]]);
    assert_eq!(raw.count(), 0);
    let seen = converter.entries_snapshot();
    assert_eq!(seen.len(), 1);
    assert_eq!(intercepted(&seen[0])["topic"], json!("com.example.fahrenheit"));
    assert_eq!(intercepted(&seen[0])["args"], json!([68.0]));
}
