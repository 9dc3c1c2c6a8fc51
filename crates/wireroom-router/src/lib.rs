//! Listener routing for Wireroom.
//!
//! A [`Router`] maps message-type IDs to ordered lists of async
//! listeners. Both ends of the wire use one: the server routes incoming
//! client messages, the client routes messages from the server. The
//! argument type `A` is whatever the host wants its listeners to see —
//! the server passes `(handle, payload)` pairs, the client passes bare
//! payloads.
//!
//! Dispatch is deliberately dumb: listeners run in registration order,
//! one at a time, and an ID with no listeners is silently ignored. The
//! router never interprets payloads.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

/// An async callback registered for one message-type ID.
///
/// Stored and compared by pointer identity: the same `Listener` value
/// (the same `Arc`) can be registered, cloned around, and later removed
/// with [`Router::off`].
pub type Listener<A> =
    Arc<dyn Fn(A) -> BoxFuture<'static, ()> + Send + Sync>;

/// Wraps an async closure as a [`Listener`].
///
/// Keeps call sites free of the boxing ceremony:
///
/// ```
/// use wireroom_router::{listener, Router};
///
/// # async fn demo() {
/// let mut router: Router<String> = Router::new();
/// router.on("GREET", listener(|name: String| async move {
///     println!("hello, {name}");
/// }));
/// # }
/// ```
pub fn listener<A, F, Fut>(f: F) -> Listener<A>
where
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |arg| f(arg).boxed())
}

/// Maps message-type IDs to their registered listeners.
///
/// Not internally synchronized; hosts that share one across tasks wrap
/// it in their own lock and use [`snapshot`](Router::snapshot) so the
/// lock is never held while listeners run.
pub struct Router<A> {
    routes: HashMap<String, Vec<Listener<A>>>,
}

impl<A: Clone> Router<A> {
    /// Creates an empty router.
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
        }
    }

    /// Appends a listener for `id`.
    ///
    /// Registering the same listener twice is allowed and means it fires
    /// twice per message, in registration order.
    pub fn on(&mut self, id: &str, listener: Listener<A>) {
        self.routes
            .entry(id.to_string())
            .or_default()
            .push(listener);
    }

    /// Removes every registration of `listener` under `id`, matching by
    /// pointer identity. Unknown IDs and unregistered listeners are
    /// no-ops.
    pub fn off(&mut self, id: &str, listener: &Listener<A>) {
        if let Some(listeners) = self.routes.get_mut(id) {
            listeners.retain(|l| !Arc::ptr_eq(l, listener));
            if listeners.is_empty() {
                self.routes.remove(id);
            }
        }
    }

    /// The current listeners for `id`, in registration order.
    ///
    /// The returned clones stay valid after any lock guarding this
    /// router is released; later `on`/`off` calls do not affect an
    /// already-taken snapshot.
    pub fn snapshot(&self, id: &str) -> Vec<Listener<A>> {
        self.routes.get(id).cloned().unwrap_or_default()
    }

    /// Runs every listener registered for `id`, in order, awaiting each
    /// before starting the next.
    pub async fn dispatch(&self, id: &str, arg: A) {
        let listeners = self.snapshot(id);
        if listeners.is_empty() {
            tracing::trace!(message_id = id, "no listeners registered");
            return;
        }
        for listener in listeners {
            listener(arg.clone()).await;
        }
    }

    /// Number of IDs with at least one listener.
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }
}

impl<A: Clone> Default for Router<A> {
    fn default() -> Self {
        Self::new()
    }
}

// =========================================================================
// Tests
// =========================================================================
