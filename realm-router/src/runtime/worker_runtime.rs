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

//! Runtime helper for spawning component action loops on dedicated threads.

use crate::observability::events;
use std::future::Future;
use std::io;
use std::thread;
use tokio::runtime::Builder;
use tracing::{debug, warn};

pub(crate) const DEFAULT_ACTION_LOOP_THREAD_NAME: &str = "realm-actions";
const ACTION_LOOP_THREAD_NAME_MAX_LEN: usize = 15;
const COMPONENT: &str = "worker_runtime";

/// Linux caps thread names at 15 bytes; longer or non-ascii labels fall back to the default.
pub(crate) fn action_loop_thread_name(label: &str) -> String {
    if label.is_empty() || label.len() > ACTION_LOOP_THREAD_NAME_MAX_LEN || !label.is_ascii() {
        debug!(
            event = events::RUNTIME_THREAD_NAME_FALLBACK,
            component = COMPONENT,
            label,
            "using default action loop thread name"
        );
        return DEFAULT_ACTION_LOOP_THREAD_NAME.to_string();
    }
    label.to_string()
}

/// Runs `run_loop` to completion on a new named thread hosting a current-thread runtime.
///
/// Tasks spawned from inside the loop run on the same runtime and thread.
pub(crate) fn spawn_action_loop<F, Fut>(
    thread_name: String,
    run_loop: F,
) -> io::Result<thread::JoinHandle<()>>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + 'static,
{
    debug!(
        event = events::RUNTIME_SPAWN_START,
        component = COMPONENT,
        worker_thread = thread_name.as_str(),
        "spawning action loop thread"
    );

    let runtime = Builder::new_current_thread().enable_all().build()?;
    let spawned = thread::Builder::new()
        .name(thread_name.clone())
        .spawn(move || runtime.block_on(run_loop()));

    match &spawned {
        Ok(_) => debug!(
            event = events::RUNTIME_SPAWN_OK,
            component = COMPONENT,
            worker_thread = thread_name.as_str(),
            "action loop thread started"
        ),
        Err(err) => warn!(
            event = events::RUNTIME_SPAWN_FAILED,
            component = COMPONENT,
            worker_thread = thread_name.as_str(),
            err = %err,
            "unable to spawn action loop thread"
        ),
    }
    spawned
}
