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

use serde_json::Value;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Shared log of the argument lists a handler or subscriber saw, in arrival order.
///
/// Cloning shares the same log, so a clone can move into a handler closure while the
/// test keeps another to assert on.
#[derive(Clone, Default)]
pub struct Recorder {
    name: String,
    entries: Arc<Mutex<Vec<Vec<Value>>>>,
    changed: Arc<Notify>,
}

impl Recorder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    fn entries(&self) -> MutexGuard<'_, Vec<Vec<Value>>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn record(&self, args: &[Value]) {
        self.entries().push(args.to_vec());
        debug!(recorder = %self.name, "recorded entry");
        self.changed.notify_waiters();
    }

    pub fn count(&self) -> usize {
        self.entries().len()
    }

    pub fn entries_snapshot(&self) -> Vec<Vec<Value>> {
        self.entries().clone()
    }

    /// Waits until at least `expected` entries were recorded. Returns `false` on timeout.
    pub async fn wait_for_count(&self, expected: usize, timeout: Duration) -> bool {
        let reached = async {
            loop {
                let notified = self.changed.notified();
                if self.count() >= expected {
                    return;
                }
                let _ = tokio::time::timeout(POLL_INTERVAL, notified).await;
            }
        };
        tokio::time::timeout(timeout, reached).await.is_ok()
    }
}

/// Polls `condition` until it yields `true` or `timeout` elapses.
pub async fn wait_until<F, Fut>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let polled = async {
        while !condition().await {
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    };
    tokio::time::timeout(timeout, polled).await.is_ok()
}

#[cfg(test)]
mod tests {
    use super::{wait_until, Recorder};
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test]
    async fn clones_share_one_log() {
        let recorder = Recorder::new("shared");
        let writer = recorder.clone();

        let handle = tokio::spawn(async move {
            writer.record(&[json!(1)]);
            writer.record(&[json!(2)]);
        });

        assert!(recorder.wait_for_count(2, Duration::from_secs(1)).await);
        handle.await.expect("writer should finish");
        assert_eq!(
            recorder.entries_snapshot(),
            vec![vec![json!(1)], vec![json!(2)]]
        );
    }

    #[tokio::test]
    async fn wait_for_count_times_out() {
        let recorder = Recorder::new("idle");

        assert!(!recorder.wait_for_count(1, Duration::from_millis(20)).await);
    }

    #[tokio::test]
    async fn wait_until_observes_condition() {
        let recorder = Recorder::new("condition");
        recorder.record(&[]);
        let watched = &recorder;

        assert!(
            wait_until(Duration::from_millis(100), || async move {
                watched.count() == 1
            })
            .await
        );
    }
}
