//! Events Module
//!
//! Synchronous, in-process notification of store and cache mutations.
//!
//! Callbacks are registered per [`EventKind`], either globally or scoped to a
//! single cache name. Every mutation builds an [`EventContext`] and hands it to
//! [`EventBus::publish`], which runs the matching callbacks in the calling
//! thread before the mutation returns.

mod bus;
mod context;

pub use bus::{CallbackFailure, EventBus, EventCallback};
pub use context::{EventContext, EventKind};
