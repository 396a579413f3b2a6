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

//! Decorator storage owner for one realm component.
//!
//! A `DecoratorTable` lives inside the dealer or broker state and is therefore only
//! ever touched from that component's action queue. Bucket lists and the identity
//! index are updated together in each method, so a single queued action always
//! leaves both consistent.

use crate::control_plane::decorator::{Component, Decorator, DecoratorKind, MatchPolicy};
use crate::error::RouterError;
use crate::message::Id;
use crate::routing::decorator_map::DecoratorMap;
use crate::routing::uri::Uri;
use std::collections::HashMap;

/// Location of a decorator inside the tables, keyed by its id.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct DecoratorBucket {
    pub(crate) owner: Id,
    pub(crate) kind: DecoratorKind,
    pub(crate) policy: MatchPolicy,
    pub(crate) pattern: Uri,
}

pub(crate) struct DecoratorTable {
    component: Component,
    maps: HashMap<DecoratorKind, DecoratorMap>,
    index: HashMap<Id, DecoratorBucket>,
}

impl DecoratorTable {
    pub(crate) fn new(component: Component) -> Self {
        Self {
            component,
            maps: HashMap::new(),
            index: HashMap::new(),
        }
    }

    /// Inserts `decorator` into the `(kind, policy, pattern)` bucket and records its
    /// location. Kinds owned by the other component are rejected.
    pub(crate) fn insert(
        &mut self,
        kind: DecoratorKind,
        policy: MatchPolicy,
        pattern: Uri,
        decorator: Decorator,
    ) -> Result<(), RouterError> {
        if kind.component() != self.component {
            return Err(RouterError::InvalidArgument(format!(
                "{kind} decorators are not handled by the {:?}",
                self.component
            )));
        }

        self.index.insert(
            decorator.id(),
            DecoratorBucket {
                owner: decorator.owner(),
                kind,
                policy,
                pattern: pattern.clone(),
            },
        );
        self.maps
            .entry(kind)
            .or_default()
            .insert(policy, pattern, decorator);
        Ok(())
    }

    /// Removes decorator `id` on behalf of `requester`.
    ///
    /// Fails with `NoSuchDecorator` when the id is unknown to this table and with
    /// `NotAuthorized` when `requester` is not the owner; nothing changes on failure.
    pub(crate) fn remove(&mut self, id: Id, requester: Id) -> Result<DecoratorBucket, RouterError> {
        let Some(bucket) = self.index.get(&id) else {
            return Err(RouterError::NoSuchDecorator(id));
        };
        if bucket.owner != requester {
            return Err(RouterError::NotAuthorized);
        }

        let Some(bucket) = self.index.remove(&id) else {
            return Err(RouterError::NoSuchDecorator(id));
        };
        if let Some(map) = self.maps.get_mut(&bucket.kind) {
            map.remove(bucket.policy, &bucket.pattern, id);
            if map.is_empty() {
                self.maps.remove(&bucket.kind);
            }
        }
        Ok(bucket)
    }

    pub(crate) fn contains(&self, id: Id) -> bool {
        self.index.contains_key(&id)
    }

    /// Decorators of `kind` matching `uri`, in execution order.
    pub(crate) fn match_decorators(&self, kind: DecoratorKind, uri: &Uri) -> Vec<Decorator> {
        self.maps
            .get(&kind)
            .map(|map| map.match_decorators(uri))
            .unwrap_or_default()
    }

    pub(crate) fn len(&self) -> usize {
        self.index.len()
    }
}

#[cfg(test)]
mod tests {
    use super::DecoratorTable;
    use crate::control_plane::decorator::{
        CallType, Component, Decorator, DecoratorKind, MatchPolicy,
    };
    use crate::error::RouterError;
    use crate::routing::uri::Uri;

    const OWNER: u64 = 11;
    const INTRUDER: u64 = 12;

    fn precall(handler: &str, order: i64) -> Decorator {
        Decorator::new(Uri::from(handler), order, CallType::Sync, OWNER)
    }

    #[test]
    fn insert_and_remove_keep_index_and_buckets_consistent() {
        let mut table = DecoratorTable::new(Component::Dealer);
        let decorator = precall("h.audit", 0);
        let id = decorator.id();

        table
            .insert(
                DecoratorKind::Precall,
                MatchPolicy::Prefix,
                "com.example".into(),
                decorator,
            )
            .expect("dealer accepts precall decorators");
        assert!(table.contains(id));
        assert_eq!(
            table
                .match_decorators(DecoratorKind::Precall, &Uri::from("com.example.add"))
                .len(),
            1
        );
        assert!(table
            .match_decorators(DecoratorKind::Postcall, &Uri::from("com.example.add"))
            .is_empty());

        let bucket = table.remove(id, OWNER).expect("owner may remove");
        assert_eq!(bucket.kind, DecoratorKind::Precall);
        assert_eq!(bucket.policy, MatchPolicy::Prefix);
        assert!(!table.contains(id));
        assert_eq!(table.len(), 0);
        assert!(table
            .match_decorators(DecoratorKind::Precall, &Uri::from("com.example.add"))
            .is_empty());
    }

    #[test]
    fn removal_by_another_session_is_refused_and_leaves_the_decorator_active() {
        let mut table = DecoratorTable::new(Component::Dealer);
        let decorator = precall("h.audit", 0);
        let id = decorator.id();
        table
            .insert(
                DecoratorKind::Precall,
                MatchPolicy::Exact,
                "foo.bar".into(),
                decorator,
            )
            .expect("dealer accepts precall decorators");

        assert_eq!(table.remove(id, INTRUDER), Err(RouterError::NotAuthorized));
        assert!(table.contains(id));
        assert_eq!(
            table
                .match_decorators(DecoratorKind::Precall, &Uri::from("foo.bar"))
                .len(),
            1
        );
    }

    #[test]
    fn unknown_ids_report_no_such_decorator() {
        let mut table = DecoratorTable::new(Component::Broker);

        assert_eq!(table.remove(99, OWNER), Err(RouterError::NoSuchDecorator(99)));
    }

    #[test]
    fn kinds_of_the_other_component_are_rejected() {
        let mut table = DecoratorTable::new(Component::Broker);

        let result = table.insert(
            DecoratorKind::Precall,
            MatchPolicy::Exact,
            "foo.bar".into(),
            precall("h.audit", 0),
        );

        assert!(matches!(result, Err(RouterError::InvalidArgument(_))));
        assert_eq!(table.len(), 0);
    }
}
