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

//! Pattern tables for one decorator kind and the URI matching over them.

use crate::control_plane::decorator::{Decorator, MatchPolicy};
use crate::message::Id;
use crate::routing::uri::Uri;
use std::collections::HashMap;

type Buckets = HashMap<Uri, Vec<Decorator>>;

/// Exact, prefix and wildcard buckets of one decorator kind.
///
/// Lists keep insertion order; priority ordering is applied at match time.
#[derive(Debug, Default)]
pub(crate) struct DecoratorMap {
    exact: Buckets,
    prefix: Buckets,
    wildcard: Buckets,
}

impl DecoratorMap {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn buckets_mut(&mut self, policy: MatchPolicy) -> &mut Buckets {
        match policy {
            MatchPolicy::Exact => &mut self.exact,
            MatchPolicy::Prefix => &mut self.prefix,
            MatchPolicy::Wildcard => &mut self.wildcard,
        }
    }

    /// Appends `decorator` to the tail of the `(policy, pattern)` bucket.
    pub(crate) fn insert(&mut self, policy: MatchPolicy, pattern: Uri, decorator: Decorator) {
        self.buckets_mut(policy)
            .entry(pattern)
            .or_default()
            .push(decorator);
    }

    /// Removes decorator `id` from the `(policy, pattern)` bucket, pruning the bucket
    /// when it becomes empty. Returns `true` when an entry was removed.
    pub(crate) fn remove(&mut self, policy: MatchPolicy, pattern: &Uri, id: Id) -> bool {
        let buckets = self.buckets_mut(policy);
        let Some(list) = buckets.get_mut(pattern) else {
            return false;
        };

        let before = list.len();
        list.retain(|decorator| decorator.id() != id);
        let removed = list.len() != before;

        if list.is_empty() {
            buckets.remove(pattern);
        }
        removed
    }

    /// Every decorator whose pattern matches `uri`, sorted ascending by order with
    /// ties broken by creation sequence.
    ///
    /// Each prefix and wildcard bucket is tested against `uri`, so the cost grows with
    /// the number of buckets, not with the number of matches.
    pub(crate) fn match_decorators(&self, uri: &Uri) -> Vec<Decorator> {
        let mut decorators: Vec<Decorator> = Vec::new();

        if let Some(exact) = self.exact.get(uri) {
            decorators.extend(exact.iter().cloned());
        }
        for (pattern, list) in &self.prefix {
            if uri.prefix_match(pattern) {
                decorators.extend(list.iter().cloned());
            }
        }
        for (pattern, list) in &self.wildcard {
            if uri.wildcard_match(pattern) {
                decorators.extend(list.iter().cloned());
            }
        }

        decorators.sort_by_key(Decorator::priority);
        decorators
    }

    pub(crate) fn bucket_count(&self) -> usize {
        self.exact.len() + self.prefix.len() + self.wildcard.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.bucket_count() == 0
    }
}
