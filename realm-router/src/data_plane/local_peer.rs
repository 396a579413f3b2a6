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

//! In-process duplex link between a session and the router.
//!
//! The two directions deliberately behave differently:
//!
//! - router → session is bounded and lossy. A session that stops reading must not
//!   stall the router, so a full queue drops the message with a warning.
//! - session → router holds a single message and blocks the sender. The router
//!   drains it promptly because routing never waits on I/O.

use crate::message::{Id, Message};
use crate::metrics::MessageMetrics;
use crate::observability::events;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

pub const DEFAULT_OUT_QUEUE_SIZE: usize = 16;
const SESSION_TO_ROUTER_QUEUE_SIZE: usize = 1;
const COMPONENT: &str = "local_peer";

type SharedSender = Arc<Mutex<Option<mpsc::Sender<Message>>>>;

fn lock(sender: &SharedSender) -> MutexGuard<'_, Option<mpsc::Sender<Message>>> {
    sender.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Creates a connected `(session, router)` peer pair.
///
/// `out_queue_size` bounds the router → session direction; values below one fall
/// back to [`DEFAULT_OUT_QUEUE_SIZE`].
pub fn linked_peers(out_queue_size: usize) -> (SessionPeer, RouterPeer) {
    let out_queue_size = if out_queue_size < 1 {
        DEFAULT_OUT_QUEUE_SIZE
    } else {
        out_queue_size
    };

    let (r_to_s_tx, r_to_s_rx) = mpsc::channel(out_queue_size);
    let (s_to_r_tx, s_to_r_rx) = mpsc::channel(SESSION_TO_ROUTER_QUEUE_SIZE);

    let session = SessionPeer {
        outgoing: BlockingSender {
            sender: Arc::new(Mutex::new(Some(s_to_r_tx))),
        },
        incoming: r_to_s_rx,
    };
    let router = RouterPeer {
        outgoing: LossySender {
            sender: Arc::new(Mutex::new(Some(r_to_s_tx))),
            session: 0,
            metrics: None,
        },
        incoming: s_to_r_rx,
    };
    (session, router)
}

/// Session → router direction. Sending waits for queue capacity.
#[derive(Clone)]
pub struct BlockingSender {
    sender: SharedSender,
}

impl BlockingSender {
    /// Sends `msg`, waiting while the router has not yet taken the previous one.
    /// Returns `false` when the link is closed.
    pub async fn send(&self, msg: Message) -> bool {
        let sender = lock(&self.sender).clone();
        match sender {
            Some(sender) => sender.send(msg).await.is_ok(),
            None => false,
        }
    }

    /// Closes the outgoing stream; the router's reader observes end-of-stream.
    pub fn close(&self) {
        lock(&self.sender).take();
    }
}

/// Router → session direction. Sending never waits.
#[derive(Clone)]
pub struct LossySender {
    sender: SharedSender,
    session: Id,
    metrics: Option<Arc<dyn MessageMetrics>>,
}

impl LossySender {
    /// Returns a handle that tags its log records with `session` and reports delivered
    /// messages to `metrics`, when given.
    pub(crate) fn instrument(
        &self,
        session: Id,
        metrics: Option<Arc<dyn MessageMetrics>>,
    ) -> Self {
        Self {
            sender: self.sender.clone(),
            session,
            metrics,
        }
    }

    /// Hands `msg` to the session's inbound queue. A full queue drops the message and
    /// logs a warning. Returns `true` when the message was queued.
    pub fn send(&self, msg: Message) -> bool {
        let guard = lock(&self.sender);
        let Some(sender) = guard.as_ref() else {
            debug!(
                event = events::PEER_SEND_CLOSED,
                component = COMPONENT,
                session = self.session,
                msg_type = msg.message_type(),
                "peer closed; discarding message"
            );
            return false;
        };

        let len = self
            .metrics
            .as_ref()
            .map(|_| msg.encoded_len())
            .unwrap_or_default();
        match sender.try_send(msg) {
            Ok(()) => {
                if let Some(metrics) = self.metrics.as_ref() {
                    metrics.record_sent(len);
                }
                true
            }
            Err(TrySendError::Full(msg)) => {
                warn!(
                    event = events::PEER_SEND_DROPPED,
                    component = COMPONENT,
                    session = self.session,
                    msg_type = msg.message_type(),
                    "client blocked router; dropped message"
                );
                false
            }
            Err(TrySendError::Closed(msg)) => {
                debug!(
                    event = events::PEER_SEND_CLOSED,
                    component = COMPONENT,
                    session = self.session,
                    msg_type = msg.message_type(),
                    "session stopped reading; discarding message"
                );
                false
            }
        }
    }

    /// Closes the outgoing stream; the session's reader observes end-of-stream.
    pub fn close(&self) {
        lock(&self.sender).take();
    }
}

/// Session end of a linked pair.
pub struct SessionPeer {
    outgoing: BlockingSender,
    incoming: mpsc::Receiver<Message>,
}

impl SessionPeer {
    pub async fn send(&self, msg: Message) -> bool {
        self.outgoing.send(msg).await
    }

    /// Next message from the router, `None` once the router closed its side.
    pub async fn recv(&mut self) -> Option<Message> {
        self.incoming.recv().await
    }

    pub fn close(&self) {
        self.outgoing.close();
    }

    pub fn into_parts(self) -> (BlockingSender, mpsc::Receiver<Message>) {
        (self.outgoing, self.incoming)
    }
}

/// Router end of a linked pair.
pub struct RouterPeer {
    outgoing: LossySender,
    incoming: mpsc::Receiver<Message>,
}

impl RouterPeer {
    pub fn send(&self, msg: Message) -> bool {
        self.outgoing.send(msg)
    }

    /// Next message from the session, `None` once the session closed its side.
    pub async fn recv(&mut self) -> Option<Message> {
        self.incoming.recv().await
    }

    pub fn close(&self) {
        self.outgoing.close();
    }

    pub fn into_parts(self) -> (LossySender, mpsc::Receiver<Message>) {
        (self.outgoing, self.incoming)
    }
}

#[cfg(test)]
mod tests {
    use super::{linked_peers, DEFAULT_OUT_QUEUE_SIZE};
    use crate::message::Message;
    use crate::metrics::{CounterMetrics, MessageMetrics};
    use std::sync::Arc;
    use std::time::Duration;

    fn goodbye() -> Message {
        Message::Goodbye {
            reason: "wamp.close.normal".into(),
        }
    }

    #[tokio::test]
    async fn router_to_session_drops_when_full_without_blocking() {
        let (mut session, router) = linked_peers(4);

        let delivered = (0..10).filter(|_| router.send(goodbye())).count();
        assert_eq!(delivered, 4);

        router.close();
        let mut received = 0;
        while session.recv().await.is_some() {
            received += 1;
        }
        assert_eq!(received, 4);
    }

    #[tokio::test]
    async fn session_to_router_blocks_instead_of_dropping() {
        let (session, mut router) = linked_peers(4);

        assert!(session.send(goodbye()).await);
        let second = tokio::time::timeout(Duration::from_millis(50), session.send(goodbye())).await;
        assert!(second.is_err(), "second send should wait for the router");

        assert!(router.recv().await.is_some());
        assert!(session.send(goodbye()).await);
        assert!(router.recv().await.is_some());
    }

    #[tokio::test]
    async fn closing_wakes_the_reader_on_the_other_side() {
        let (session, mut router) = linked_peers(0);
        let reader = tokio::spawn(async move { router.recv().await });

        session.close();

        let next = reader.await.expect("reader task should finish");
        assert!(next.is_none());
        assert!(!session.send(goodbye()).await);
    }

    #[tokio::test]
    async fn zero_queue_size_uses_default_bound() {
        let (_session, router) = linked_peers(0);

        let delivered = (0..DEFAULT_OUT_QUEUE_SIZE + 5)
            .filter(|_| router.send(goodbye()))
            .count();
        assert_eq!(delivered, DEFAULT_OUT_QUEUE_SIZE);
    }

    #[tokio::test]
    async fn instrumented_sender_counts_only_delivered_messages() {
        let (_session, router) = linked_peers(1);
        let metrics = Arc::new(CounterMetrics::new());
        let (sender, _incoming) = router.into_parts();
        let shared: Arc<dyn MessageMetrics> = metrics.clone();
        let sender = sender.instrument(7, Some(shared));

        assert!(sender.send(goodbye()));
        assert!(!sender.send(goodbye()));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.send_message_count, 1);
        assert_eq!(snapshot.send_bytes_total, goodbye().encoded_len() as u64);
    }
}
