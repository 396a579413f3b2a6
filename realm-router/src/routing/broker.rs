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

//! Pub/sub routing state owned by the broker action queue.

use crate::control_plane::decorator::{Component, DecoratorKind};
use crate::control_plane::decorator_table::DecoratorTable;
use crate::data_plane::local_peer::LossySender;
use crate::data_plane::pipeline::{run_stage, StageOutcome};
use crate::data_plane::session_listener::SessionContext;
use crate::error::RouterError;
use crate::message::{global_id, Dict, Event, Id, Message, Publish, RequestType};
use crate::observability::events;
use crate::routing::uri::Uri;
use std::collections::HashMap;
use tracing::{debug, info};

const COMPONENT: &str = "broker";

/// All sessions subscribed to one topic share a subscription id.
struct TopicSubscription {
    id: Id,
    subscribers: HashMap<Id, LossySender>,
}

pub(crate) struct Broker {
    topics: HashMap<Uri, TopicSubscription>,
    subscription_topics: HashMap<Id, Uri>,
    decorators: DecoratorTable,
}

impl Default for Broker {
    fn default() -> Self {
        Self::new()
    }
}

impl Broker {
    pub(crate) fn new() -> Self {
        Self {
            topics: HashMap::new(),
            subscription_topics: HashMap::new(),
            decorators: DecoratorTable::new(Component::Broker),
        }
    }

    pub(crate) fn decorators(&self) -> &DecoratorTable {
        &self.decorators
    }

    pub(crate) fn decorators_mut(&mut self) -> &mut DecoratorTable {
        &mut self.decorators
    }

    pub(crate) fn subscribe(&mut self, ctx: &SessionContext, request: Id, topic: Uri) {
        if !topic.is_valid(false) {
            ctx.peer.send(
                RouterError::InvalidArgument(format!("invalid topic uri `{topic}`"))
                    .into_error_message(RequestType::Subscribe, request),
            );
            return;
        }

        let subscription = self.topics.entry(topic.clone()).or_insert_with(|| {
            let id = global_id();
            TopicSubscription {
                id,
                subscribers: HashMap::new(),
            }
        });
        subscription
            .subscribers
            .insert(ctx.session, ctx.peer.clone());
        let id = subscription.id;
        self.subscription_topics.insert(id, topic.clone());

        info!(
            event = events::SUBSCRIBE_OK,
            component = COMPONENT,
            session = ctx.session,
            uri = %topic,
            subscription = id,
            "subscribed to topic"
        );
        ctx.peer.send(Message::Subscribed {
            request,
            subscription: id,
        });
    }

    pub(crate) fn unsubscribe(&mut self, ctx: &SessionContext, request: Id, subscription: Id) {
        let removed = self
            .subscription_topics
            .get(&subscription)
            .cloned()
            .is_some_and(|topic| self.remove_subscriber(&topic, ctx.session));
        if !removed {
            ctx.peer.send(
                RouterError::NoSuchSubscription(subscription)
                    .into_error_message(RequestType::Unsubscribe, request),
            );
            return;
        }

        info!(
            event = events::UNSUBSCRIBE_OK,
            component = COMPONENT,
            session = ctx.session,
            subscription,
            "unsubscribed from topic"
        );
        ctx.peer.send(Message::Unsubscribed { request });
    }

    /// Drops `session` from `topic`, pruning the topic when nobody is left.
    fn remove_subscriber(&mut self, topic: &Uri, session: Id) -> bool {
        let Some(subscription) = self.topics.get_mut(topic) else {
            return false;
        };
        let removed = subscription.subscribers.remove(&session).is_some();
        if subscription.subscribers.is_empty() {
            self.subscription_topics.remove(&subscription.id);
            self.topics.remove(topic);
        }
        removed
    }

    /// Entry point for a session's `PUBLISH`: publish stage, then dispatch.
    pub(crate) fn handle_publish(&mut self, ctx: SessionContext, publish: Publish) {
        let decorators = self
            .decorators
            .match_decorators(DecoratorKind::Publish, &publish.topic);
        if decorators.is_empty() {
            self.dispatch_publication(ctx, publish);
            return;
        }

        tokio::spawn(async move {
            let dealer = ctx.components.dealer.clone();
            let broker = ctx.components.broker.clone();
            let publisher_peer = ctx.peer.clone();
            let request = publish.request;
            match run_stage(&dealer, DecoratorKind::Publish, decorators, publish).await {
                StageOutcome::Continue(publish) => {
                    if let Err(err) = broker.submit(move |b| b.dispatch_publication(ctx, publish)) {
                        publisher_peer
                            .send(err.into_error_message(RequestType::Publish, request));
                    }
                }
                StageOutcome::Abort(err) => {
                    publisher_peer.send(err.into_error_message(RequestType::Publish, request));
                }
            }
        });
    }

    /// Runs the event stage of the (possibly replaced) topic, then delivers.
    fn dispatch_publication(&mut self, ctx: SessionContext, publish: Publish) {
        let decorators = self
            .decorators
            .match_decorators(DecoratorKind::Event, &publish.topic);
        if decorators.is_empty() {
            self.deliver_events(&ctx, publish);
            return;
        }

        tokio::spawn(async move {
            let dealer = ctx.components.dealer.clone();
            let broker = ctx.components.broker.clone();
            let publisher_peer = ctx.peer.clone();
            let request = publish.request;
            match run_stage(&dealer, DecoratorKind::Event, decorators, publish).await {
                StageOutcome::Continue(publish) => {
                    if let Err(err) = broker.submit(move |b| b.deliver_events(&ctx, publish)) {
                        publisher_peer
                            .send(err.into_error_message(RequestType::Publish, request));
                    }
                }
                StageOutcome::Abort(err) => {
                    publisher_peer.send(err.into_error_message(RequestType::Publish, request));
                }
            }
        });
    }

    fn deliver_events(&self, ctx: &SessionContext, publish: Publish) {
        let publication = global_id();
        let exclude_me = publish.exclude_me();
        let mut delivered = 0usize;

        if let Some(subscription) = self.topics.get(&publish.topic) {
            let mut details = Dict::new();
            details.insert("topic".into(), publish.topic.as_str().into());
            for (session, peer) in &subscription.subscribers {
                if exclude_me && *session == ctx.session {
                    continue;
                }
                let event = Event {
                    subscription: subscription.id,
                    publication,
                    details: details.clone(),
                    args: publish.args.clone(),
                    kwargs: publish.kwargs.clone(),
                };
                if peer.send(Message::Event(event)) {
                    delivered += 1;
                }
            }
        }

        debug!(
            event = events::PUBLISH_DELIVERED,
            component = COMPONENT,
            session = ctx.session,
            uri = %publish.topic,
            publication,
            delivered,
            "publication dispatched"
        );
        if publish.acknowledge() {
            ctx.peer.send(Message::Published {
                request: publish.request,
                publication,
            });
        }
    }

    pub(crate) fn detach_session(&mut self, session: Id) {
        let topics: Vec<Uri> = self
            .topics
            .iter()
            .filter(|(_, subscription)| subscription.subscribers.contains_key(&session))
            .map(|(topic, _)| topic.clone())
            .collect();
        for topic in topics {
            self.remove_subscriber(&topic, session);
        }
    }

    pub(crate) fn topic_count(&self) -> usize {
        self.topics.len()
    }
}
