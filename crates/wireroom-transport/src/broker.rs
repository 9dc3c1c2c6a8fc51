//! Topic bookkeeping behind native publish/subscribe.
//!
//! The broker only tracks who subscribes to what; it never touches the
//! network. A transport implementation asks for the subscriber snapshot
//! and performs the sends itself, outside the broker lock.
//!
//! Subscribers are held as `Weak` references to each connection's write
//! half: a closed connection drops its write half, its weak entries stop
//! upgrading, and the broker prunes them on the next snapshot. No explicit
//! unsubscribe is required on disconnect.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use crate::ConnectionId;

/// Maps topic names to the write halves of subscribed connections.
///
/// One broker is shared by every connection of a transport. The inner
/// mutex is a plain `std::sync::Mutex`: it only guards map operations,
/// never held across an await.
pub struct TopicBroker<S> {
    topics: Mutex<HashMap<String, HashMap<ConnectionId, Weak<S>>>>,
}

impl<S> TopicBroker<S> {
    /// Creates an empty broker.
    pub fn new() -> Self {
        Self {
            topics: Mutex::new(HashMap::new()),
        }
    }

    /// Adds a connection's write half to a topic. Idempotent.
    pub fn subscribe(&self, topic: &str, id: ConnectionId, sink: &Arc<S>) {
        let mut topics = self.topics.lock().expect("broker lock poisoned");
        topics
            .entry(topic.to_string())
            .or_default()
            .insert(id, Arc::downgrade(sink));
    }

    /// Removes a connection from a topic. Drops the topic entry once it
    /// has no subscribers left.
    pub fn unsubscribe(&self, topic: &str, id: ConnectionId) {
        let mut topics = self.topics.lock().expect("broker lock poisoned");
        if let Some(members) = topics.get_mut(topic) {
            members.remove(&id);
            if members.is_empty() {
                topics.remove(topic);
            }
        }
    }

    /// Returns the live write halves of every subscriber of `topic`
    /// except `publisher`, pruning entries whose connection is gone.
    pub fn subscribers_except(
        &self,
        topic: &str,
        publisher: ConnectionId,
    ) -> Vec<Arc<S>> {
        let mut topics = self.topics.lock().expect("broker lock poisoned");
        let Some(members) = topics.get_mut(topic) else {
            return Vec::new();
        };
        let mut live = Vec::with_capacity(members.len());
        members.retain(|id, weak| match weak.upgrade() {
            Some(sink) => {
                if *id != publisher {
                    live.push(sink);
                }
                true
            }
            None => false,
        });
        if members.is_empty() {
            topics.remove(topic);
        }
        live
    }

    /// Number of topics with at least one (possibly stale) subscriber.
    pub fn topic_count(&self) -> usize {
        self.topics.lock().expect("broker lock poisoned").len()
    }
}

impl<S> Default for TopicBroker<S> {
    fn default() -> Self {
        Self::new()
    }
}

// =========================================================================
// Tests
// =========================================================================
