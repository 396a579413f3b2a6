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

//! Fire-and-forget traffic counters. Never consulted for routing decisions.
//!
//! [`CounterMetrics`] keeps its own snapshot and also forwards every update to
//! the `metrics` facade, so an installed exporter sees the same totals.

use metrics::counter;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

pub const MESSAGES_RECEIVED: &str = "realm_router_messages_received_total";
pub const MESSAGES_SENT: &str = "realm_router_messages_sent_total";
pub const BYTES_RECEIVED: &str = "realm_router_bytes_received_total";
pub const BYTES_SENT: &str = "realm_router_bytes_sent_total";

/// Receiver of per-message traffic notifications.
pub trait MessageMetrics: Send + Sync {
    /// A message of `len` bytes arrived from a session.
    fn record_received(&self, len: usize);

    /// A message of `len` bytes was handed to a session's inbound queue.
    fn record_sent(&self, len: usize);
}

/// Atomic message and byte counters.
#[derive(Debug, Default)]
pub struct CounterMetrics {
    recv_message_count: AtomicU64,
    send_message_count: AtomicU64,
    recv_bytes_total: AtomicU64,
    send_bytes_total: AtomicU64,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub recv_message_count: u64,
    pub send_message_count: u64,
    pub recv_bytes_total: u64,
    pub send_bytes_total: u64,
}

impl CounterMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            recv_message_count: self.recv_message_count.load(Ordering::Relaxed),
            send_message_count: self.send_message_count.load(Ordering::Relaxed),
            recv_bytes_total: self.recv_bytes_total.load(Ordering::Relaxed),
            send_bytes_total: self.send_bytes_total.load(Ordering::Relaxed),
        }
    }
}

impl MessageMetrics for CounterMetrics {
    fn record_received(&self, len: usize) {
        self.recv_message_count.fetch_add(1, Ordering::Relaxed);
        self.recv_bytes_total
            .fetch_add(len as u64, Ordering::Relaxed);
        counter!(MESSAGES_RECEIVED).increment(1);
        counter!(BYTES_RECEIVED).increment(len as u64);
    }

    fn record_sent(&self, len: usize) {
        self.send_message_count.fetch_add(1, Ordering::Relaxed);
        self.send_bytes_total
            .fetch_add(len as u64, Ordering::Relaxed);
        counter!(MESSAGES_SENT).increment(1);
        counter!(BYTES_SENT).increment(len as u64);
    }
}
