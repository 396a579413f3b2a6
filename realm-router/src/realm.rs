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

use crate::client::LocalClient;
use crate::config::RealmConfig;
use crate::data_plane::local_peer::{linked_peers, RouterPeer};
use crate::data_plane::session_listener::{spawn_session_listener, SessionContext};
use crate::error::RouterError;
use crate::message::{global_id, Id};
use crate::metrics::MessageMetrics;
use crate::observability::events;
use crate::routing::broker::Broker;
use crate::routing::dealer::Dealer;
use crate::routing::uri::Uri;
use crate::runtime::action_queue::ActionQueue;
use std::sync::Arc;
use tracing::info;

const COMPONENT: &str = "realm";
const DEALER_THREAD_LABEL: &str = "rr-dealer";
const BROKER_THREAD_LABEL: &str = "rr-broker";

/// Action queues of a realm's two routing components.
#[derive(Clone)]
pub(crate) struct RealmComponents {
    pub(crate) dealer: ActionQueue<Dealer>,
    pub(crate) broker: ActionQueue<Broker>,
}

/// A routing domain: one dealer, one broker, and the sessions attached to them.
///
/// Both components run their own action loop on a dedicated thread. Decorator
/// tables live inside the components and go away with the realm.
pub struct Realm {
    config: RealmConfig,
    components: RealmComponents,
    metrics: Option<Arc<dyn MessageMetrics>>,
}

impl Realm {
    pub fn new(config: RealmConfig) -> Result<Self, RouterError> {
        Self::build(config, None)
    }

    /// Creates a realm reporting per-message traffic to `metrics`.
    pub fn with_metrics(
        config: RealmConfig,
        metrics: Arc<dyn MessageMetrics>,
    ) -> Result<Self, RouterError> {
        Self::build(config, Some(metrics))
    }

    fn build(
        config: RealmConfig,
        metrics: Option<Arc<dyn MessageMetrics>>,
    ) -> Result<Self, RouterError> {
        let dealer = ActionQueue::start("dealer", DEALER_THREAD_LABEL, Dealer::new())?;
        let broker = ActionQueue::start("broker", BROKER_THREAD_LABEL, Broker::new())?;
        info!(
            event = events::REALM_START,
            component = COMPONENT,
            uri = %config.uri,
            outbound_queue_size = config.outbound_queue_size,
            "realm started"
        );

        Ok(Self {
            config,
            components: RealmComponents { dealer, broker },
            metrics,
        })
    }

    pub fn uri(&self) -> &Uri {
        &self.config.uri
    }

    pub fn config(&self) -> &RealmConfig {
        &self.config
    }

    /// Attaches a session whose router end is `peer` and starts reading from it.
    ///
    /// Must be called from within a tokio runtime; the reader task runs there.
    pub fn attach(&self, peer: RouterPeer) -> Id {
        let session = global_id();
        let (outgoing, incoming) = peer.into_parts();
        let outgoing = outgoing.instrument(session, self.metrics.clone());

        let ctx = SessionContext {
            session,
            peer: outgoing,
            components: self.components.clone(),
        };
        spawn_session_listener(ctx, incoming, self.metrics.clone());
        session
    }

    /// Opens an in-process session on this realm.
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect_local(&self) -> LocalClient {
        let (session_peer, router_peer) = linked_peers(self.config.outbound_queue_size);
        let session = self.attach(router_peer);
        LocalClient::new(session, session_peer)
    }

    /// Number of decorators installed across the dealer and broker.
    pub async fn decorator_count(&self) -> Result<usize, RouterError> {
        let dealer = self
            .components
            .dealer
            .call(|dealer| dealer.decorators().len())
            .await?;
        let broker = self
            .components
            .broker
            .call(|broker| broker.decorators().len())
            .await?;
        Ok(dealer + broker)
    }

    /// Number of registered procedures.
    pub async fn registration_count(&self) -> Result<usize, RouterError> {
        self.components
            .dealer
            .call(|dealer| dealer.registration_count())
            .await
    }

    /// Number of invocations awaiting a callee's answer.
    pub async fn pending_invocation_count(&self) -> Result<usize, RouterError> {
        self.components
            .dealer
            .call(|dealer| dealer.pending_count())
            .await
    }

    /// Number of topics with at least one subscriber.
    pub async fn topic_count(&self) -> Result<usize, RouterError> {
        self.components
            .broker
            .call(|broker| broker.topic_count())
            .await
    }
}
