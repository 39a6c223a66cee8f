//! Event Bus Module
//!
//! Registry of callbacks keyed by (event kind, optional cache name) with
//! synchronous fan-out.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;
use tracing::{debug, warn};

use super::{EventContext, EventKind};

type CallbackFn = dyn Fn(&EventContext) -> anyhow::Result<()> + Send + Sync;

// == Event Callback ==
/// Shared handle to a registered callback.
///
/// Registrations are matched by identity: clones of one handle are the same
/// callback, two handles built from identical closures are not.
#[derive(Clone)]
pub struct EventCallback(Arc<CallbackFn>);

impl EventCallback {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&EventContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Returns true if both handles point at the same callback.
    pub fn same_as(&self, other: &EventCallback) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for EventCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EventCallback")
            .field(&Arc::as_ptr(&self.0).cast::<()>())
            .finish()
    }
}

// == Callback Failure ==
/// A callback invocation that did not complete normally.
#[derive(Error, Debug)]
pub enum CallbackFailure {
    #[error("callback returned an error: {0}")]
    Error(anyhow::Error),

    #[error("callback panicked: {0}")]
    Panic(String),
}

#[derive(Default)]
struct Subscribers {
    global: Vec<EventCallback>,
    scoped: HashMap<String, Vec<EventCallback>>,
}

impl Subscribers {
    fn slot_mut(&mut self, cache_name: Option<&str>) -> &mut Vec<EventCallback> {
        match cache_name {
            Some(name) => self.scoped.entry(name.to_string()).or_default(),
            None => &mut self.global,
        }
    }

    fn len(&self) -> usize {
        self.global.len() + self.scoped.values().map(Vec::len).sum::<usize>()
    }
}

// == Event Bus ==
/// Callback registry with synchronous, in-thread delivery.
#[derive(Default)]
pub struct EventBus {
    subscriptions: RwLock<HashMap<EventKind, Subscribers>>,
    failures: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    // == Subscribe ==
    /// Registers `f` for future events of `kind` and returns its handle.
    ///
    /// With `cache_name` set the callback only fires for events whose context
    /// carries that cache name.
    pub fn subscribe<F>(&self, kind: EventKind, cache_name: Option<&str>, f: F) -> EventCallback
    where
        F: Fn(&EventContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let callback = EventCallback::new(f);
        self.subscribe_callback(kind, &callback, cache_name);
        callback
    }

    /// Registers an existing handle, e.g. to add a cache-scoped registration
    /// for a callback that is already registered globally.
    pub fn subscribe_callback(
        &self,
        kind: EventKind,
        callback: &EventCallback,
        cache_name: Option<&str>,
    ) {
        let mut subscriptions = self.subscriptions.write();
        subscriptions
            .entry(kind)
            .or_default()
            .slot_mut(cache_name)
            .push(callback.clone());
        debug!(%kind, cache = ?cache_name, "Registered event callback");
    }

    // == Unsubscribe ==
    /// Removes the `(kind, callback, cache_name)` registration.
    ///
    /// Returns false if no such registration existed. Other registrations of
    /// the same callback (other kinds or scopes) are left alone.
    pub fn unsubscribe(
        &self,
        kind: EventKind,
        callback: &EventCallback,
        cache_name: Option<&str>,
    ) -> bool {
        let mut subscriptions = self.subscriptions.write();
        let Some(subscribers) = subscriptions.get_mut(&kind) else {
            return false;
        };

        let slot = match cache_name {
            Some(name) => match subscribers.scoped.get_mut(name) {
                Some(slot) => slot,
                None => return false,
            },
            None => &mut subscribers.global,
        };

        let Some(position) = slot.iter().position(|cb| cb.same_as(callback)) else {
            return false;
        };
        slot.remove(position);

        if let Some(name) = cache_name {
            if subscribers.scoped.get(name).is_some_and(Vec::is_empty) {
                subscribers.scoped.remove(name);
            }
        }
        debug!(%kind, cache = ?cache_name, "Removed event callback");
        true
    }

    // == Publish ==
    /// Delivers `ctx` to every matching callback in the calling thread.
    ///
    /// Cache-scoped callbacks for `ctx.cache_name` run first, then global
    /// ones, each group in registration order. Failures are logged and
    /// counted; they never stop the remaining callbacks.
    pub fn publish(&self, ctx: &EventContext) {
        // Snapshot so callbacks may (un)subscribe without deadlocking.
        let callbacks: Vec<EventCallback> = {
            let subscriptions = self.subscriptions.read();
            let Some(subscribers) = subscriptions.get(&ctx.kind) else {
                return;
            };
            subscribers
                .scoped
                .get(&ctx.cache_name)
                .into_iter()
                .flatten()
                .chain(subscribers.global.iter())
                .cloned()
                .collect()
        };

        for callback in &callbacks {
            if let Err(failure) = invoke_guarded(callback, ctx) {
                self.failures.fetch_add(1, Ordering::Relaxed);
                warn!(
                    kind = %ctx.kind,
                    cache = %ctx.cache_name,
                    key = ?ctx.key,
                    "Event callback failed: {}",
                    failure
                );
            }
        }
    }

    /// Number of callback invocations that errored or panicked so far.
    pub fn callback_failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Total number of registrations across all kinds and scopes.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().values().map(Subscribers::len).sum()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriptions", &self.subscription_count())
            .field("failures", &self.callback_failures())
            .finish()
    }
}

/// Runs one callback, turning both error returns and panics into a
/// `CallbackFailure`.
fn invoke_guarded(callback: &EventCallback, ctx: &EventContext) -> Result<(), CallbackFailure> {
    match panic::catch_unwind(AssertUnwindSafe(|| (callback.0)(ctx))) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(CallbackFailure::Error(err)),
        Err(payload) => Err(CallbackFailure::Panic(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
