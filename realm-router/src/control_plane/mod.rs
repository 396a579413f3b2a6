//! Control-plane layer.
//!
//! Owns decorator identity, the per-component decorator tables, and the management
//! procedures sessions use to add and remove decorators. Table mutations are always
//! queued on the owning component's action queue and awaited before replying.

pub(crate) mod decorator;
pub(crate) mod decorator_registry;
pub(crate) mod decorator_table;
