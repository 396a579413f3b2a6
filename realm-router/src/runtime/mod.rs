//! Runtime integration layer.
//!
//! Isolates the dedicated-thread action loops that serialize dealer and broker work,
//! so threading behavior stays localized for the rest of the crate.

pub(crate) mod action_queue;
pub(crate) mod worker_runtime;
