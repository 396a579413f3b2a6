//! Data-plane layer.
//!
//! Carries messages between sessions and the realm: the linked peer pair with its
//! asymmetric backpressure, one reader task per session, and interception stage
//! execution for messages in flight.

pub(crate) mod local_peer;
pub(crate) mod pipeline;
pub(crate) mod session_listener;
