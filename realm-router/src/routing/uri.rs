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

//! Hierarchical dot-separated URIs and the segment rules used to match them.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

const SEGMENT_SEPARATOR: char = '.';

/// A hierarchical, dot-separated resource identifier (`com.example.procedure`).
///
/// URIs are compared as opaque strings for exact matching. Prefix and wildcard
/// matching operate on segments.
#[derive(Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uri(String);

impl Uri {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(SEGMENT_SEPARATOR)
    }

    /// Returns `true` when every segment of `prefix` equals the segment at the same
    /// position of `self`, i.e. `prefix` is a leading subsequence of `self`'s segments.
    ///
    /// `a.b` matches `a.b` and `a.b.c`, but neither `a.bc` nor `a.x`.
    pub fn prefix_match(&self, prefix: &Uri) -> bool {
        let mut segments = self.segments();
        prefix
            .segments()
            .all(|prefix_segment| segments.next() == Some(prefix_segment))
    }

    /// Returns `true` when `self` and `pattern` have the same number of segments and
    /// every non-empty pattern segment equals the segment at the same position.
    ///
    /// An empty pattern segment matches any single segment: `a..c` matches `a.b.c`.
    pub fn wildcard_match(&self, pattern: &Uri) -> bool {
        let mut segments = self.segments();
        let mut pattern_segments = pattern.segments();
        loop {
            match (segments.next(), pattern_segments.next()) {
                (None, None) => return true,
                (Some(segment), Some(pattern_segment)) => {
                    if !pattern_segment.is_empty() && pattern_segment != segment {
                        return false;
                    }
                }
                _ => return false,
            }
        }
    }

    /// Checks the URI is usable as a procedure/topic: non-empty, no whitespace or
    /// `#`, and no empty segments unless `allow_empty_segments` is set (wildcard patterns).
    pub fn is_valid(&self, allow_empty_segments: bool) -> bool {
        if self.0.is_empty() || self.0.chars().any(|ch| ch.is_whitespace() || ch == '#') {
            return false;
        }
        allow_empty_segments || self.segments().all(|segment| !segment.is_empty())
    }
}

impl Display for Uri {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Uri {
    fn from(uri: &str) -> Self {
        Self(uri.to_string())
    }
}

impl From<String> for Uri {
    fn from(uri: String) -> Self {
        Self(uri)
    }
}

impl AsRef<str> for Uri {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::Uri;

    #[test]
    fn prefix_match_follows_segment_boundaries() {
        let pattern = Uri::from("a.b");

        assert!(Uri::from("a.b.c").prefix_match(&pattern));
        assert!(Uri::from("a.b").prefix_match(&pattern));
        assert!(!Uri::from("a.x").prefix_match(&pattern));
        assert!(!Uri::from("a.bc").prefix_match(&pattern));
        assert!(!Uri::from("a").prefix_match(&pattern));
    }

    #[test]
    fn wildcard_match_requires_equal_segment_count() {
        let pattern = Uri::from("a..c");

        assert!(Uri::from("a.b.c").wildcard_match(&pattern));
        assert!(Uri::from("a.z.c").wildcard_match(&pattern));
        assert!(!Uri::from("a.b.c.d").wildcard_match(&pattern));
        assert!(!Uri::from("a.b").wildcard_match(&pattern));
        assert!(!Uri::from("x.b.c").wildcard_match(&pattern));
    }

    #[test]
    fn wildcard_pattern_without_empty_segments_is_exact() {
        let pattern = Uri::from("a.b.c");

        assert!(Uri::from("a.b.c").wildcard_match(&pattern));
        assert!(!Uri::from("a.b.d").wildcard_match(&pattern));
    }

    #[test]
    fn validity_rejects_empty_segments_outside_wildcards() {
        assert!(Uri::from("com.example.proc").is_valid(false));
        assert!(!Uri::from("com..proc").is_valid(false));
        assert!(Uri::from("com..proc").is_valid(true));
        assert!(!Uri::from("").is_valid(true));
        assert!(!Uri::from("com.ex ample").is_valid(false));
    }
}
