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

//! Single-threaded action queue owning one realm component's state.
//!
//! Every read or write of dealer/broker state, routing and decorator changes alike,
//! is an action closure executed by the component's loop in arrival order. No two
//! actions of the same component ever overlap, so state needs no locks.

use crate::error::RouterError;
use crate::observability::events;
use crate::runtime::worker_runtime::{action_loop_thread_name, spawn_action_loop};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

type Action<S> = Box<dyn FnOnce(&mut S) + Send>;

/// Handle to a component action loop. Cloning shares the same queue.
///
/// The loop stops once every handle has been dropped and the queue is drained.
pub(crate) struct ActionQueue<S> {
    component: &'static str,
    sender: mpsc::UnboundedSender<Action<S>>,
}

impl<S> Clone for ActionQueue<S> {
    fn clone(&self) -> Self {
        Self {
            component: self.component,
            sender: self.sender.clone(),
        }
    }
}

impl<S: Send + 'static> ActionQueue<S> {
    /// Moves `state` onto a dedicated thread and starts consuming actions.
    pub(crate) fn start(
        component: &'static str,
        thread_label: &str,
        state: S,
    ) -> Result<Self, RouterError> {
        let (sender, receiver) = mpsc::unbounded_channel();
        spawn_action_loop(action_loop_thread_name(thread_label), move || {
            run_action_loop(component, state, receiver)
        })
        .map_err(|_| RouterError::ComponentClosed(component))?;

        Ok(Self { component, sender })
    }

    pub(crate) fn component(&self) -> &'static str {
        self.component
    }

    /// Enqueues `action` without waiting for it to run.
    pub(crate) fn submit<F>(&self, action: F) -> Result<(), RouterError>
    where
        F: FnOnce(&mut S) + Send + 'static,
    {
        self.sender
            .send(Box::new(action))
            .map_err(|_| RouterError::ComponentClosed(self.component))
    }

    /// Enqueues `action` and waits until it has run, returning its result.
    ///
    /// Everything the action changed is visible to the caller once this resolves.
    pub(crate) async fn call<F, R>(&self, action: F) -> Result<R, RouterError>
    where
        F: FnOnce(&mut S) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (done_tx, done_rx) = oneshot::channel();
        self.submit(move |state| {
            let _ = done_tx.send(action(state));
        })?;
        done_rx
            .await
            .map_err(|_| RouterError::ComponentClosed(self.component))
    }
}

async fn run_action_loop<S>(
    component: &'static str,
    mut state: S,
    mut receiver: mpsc::UnboundedReceiver<Action<S>>,
) {
    debug!(
        event = events::ACTION_LOOP_START,
        component,
        "action loop started"
    );
    while let Some(action) = receiver.recv().await {
        action(&mut state);
    }
    info!(
        event = events::ACTION_LOOP_STOP,
        component,
        "all handles dropped; stopping action loop"
    );
}
