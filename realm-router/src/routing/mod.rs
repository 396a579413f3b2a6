//! Routing layer.
//!
//! Segment-based URI matching, the decorator pattern buckets searched with it, and
//! the dealer and broker state that route calls and publications.

pub(crate) mod broker;
pub(crate) mod dealer;
pub(crate) mod decorator_map;
pub(crate) mod uri;
