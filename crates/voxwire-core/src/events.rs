//! Multi-subscriber notifications for request completion.

use crate::sound_wave::SinkHandle;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Fired when a text-ask request produced a playable wave
#[derive(Debug, Clone)]
pub struct TextAskDone {
    /// Buffer ready for playback
    pub wave: SinkHandle,
    /// HTTP status of the response (200)
    pub status_code: u16,
}

/// Fired on any request, HTTP or decode failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyError {
    /// Human-readable description or raw JSON error body
    pub message: String,
    /// HTTP status or local classification code, 0 if nothing was sent or received
    pub status_code: u16,
}

/// Identifies one registered callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Ordered list of callbacks that all receive each broadcast event
pub struct Delegate<E> {
    subscribers: RwLock<Vec<(SubscriptionId, Callback<E>)>>,
    next_id: AtomicU64,
}

impl<E> Delegate<E> {
    /// Create a delegate with no subscribers
    #[must_use]
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Register a callback; it runs after all previously registered ones
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers.write().push((id, Arc::new(callback)));
        id
    }

    /// Remove a callback, returning whether it was registered
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|(sub, _)| *sub != id);
        subscribers.len() != before
    }

    /// Remove every callback
    pub fn clear(&self) {
        self.subscribers.write().clear();
    }

    /// Number of registered callbacks
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Whether no callbacks are registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscribers.read().is_empty()
    }

    /// Invoke every callback in registration order
    ///
    /// The subscriber list is snapshotted first, so callbacks may subscribe
    /// or unsubscribe without deadlocking; such changes apply to the next
    /// broadcast.
    pub fn broadcast(&self, event: &E) {
        let snapshot: Vec<Callback<E>> = self
            .subscribers
            .read()
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();

        for callback in snapshot {
            callback(event);
        }
    }
}

impl<E> Default for Delegate<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for Delegate<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Delegate")
            .field("subscribers", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn error(message: &str, status_code: u16) -> ProxyError {
        ProxyError {
            message: message.to_string(),
            status_code,
        }
    }

    #[test]
    fn test_broadcast_without_subscribers() {
        let delegate: Delegate<ProxyError> = Delegate::new();
        assert!(delegate.is_empty());
        delegate.broadcast(&error("nobody listens", 0));
    }

    #[test]
    fn test_registration_order() {
        let delegate = Delegate::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let seen = Arc::clone(&seen);
            delegate.subscribe(move |e: &ProxyError| {
                seen.lock().push(format!("{tag}:{}", e.status_code));
            });
        }

        delegate.broadcast(&error("HTTP 404 (non-OK)", 404));
        assert_eq!(
            *seen.lock(),
            vec!["first:404", "second:404", "third:404"]
        );
    }

    #[test]
    fn test_unsubscribe() {
        let delegate = Delegate::new();
        let count = Arc::new(AtomicU64::new(0));

        let counter = Arc::clone(&count);
        let id = delegate.subscribe(move |_: &ProxyError| {
            counter.fetch_add(1, Ordering::Relaxed);
        });
        assert_eq!(delegate.len(), 1);

        delegate.broadcast(&error("once", 500));
        assert!(delegate.unsubscribe(id));
        assert!(!delegate.unsubscribe(id));
        delegate.broadcast(&error("twice", 500));

        assert_eq!(count.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_callback_may_subscribe_during_broadcast() {
        let delegate = Arc::new(Delegate::new());
        let inner = Arc::clone(&delegate);
        delegate.subscribe(move |_: &ProxyError| {
            inner.subscribe(|_: &ProxyError| {});
        });

        delegate.broadcast(&error("grow", 0));
        assert_eq!(delegate.len(), 2);

        delegate.clear();
        assert!(delegate.is_empty());
    }
}
