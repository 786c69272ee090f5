//! Seams between the sign-in core and the hosted identity provider.
//!
//! `IdentityBackend` issues links and completes them; `SessionSource` reports the
//! current session and every later change. Both are object safe so the CLI can
//! hold an `Arc<dyn ...>` and tests can substitute scripted doubles.
//!
//! `SessionHub` is the registry backends use to implement `SessionSource`. New
//! subscribers get the current state replayed before `subscribe` returns, and
//! `publish` delivers to subscribers in registration order, one change at a time.

use crate::auth::{
    error::RequestFailed,
    types::{LinkSettings, Session},
};
use std::{
    future::Future,
    pin::Pin,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};
use tracing::debug;

pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, RequestFailed>> + Send + 'a>>;

/// Callback invoked with the current session (`None` when signed out).
pub type SessionCallback = Arc<dyn Fn(Option<Session>) + Send + Sync>;

pub trait IdentityBackend: Send + Sync {
    /// Ask the provider to email a sign-in link for `email`.
    fn issue_link<'a>(
        &'a self,
        email: &'a str,
        settings: &'a LinkSettings,
    ) -> BackendFuture<'a, ()>;

    /// Exchange the one-time code from an opened link for a session.
    fn sign_in_with_link<'a>(
        &'a self,
        email: &'a str,
        oob_code: &'a str,
    ) -> BackendFuture<'a, Session>;
}

pub trait SessionSource: Send + Sync {
    /// Register `callback`; it fires right away with the current state.
    fn subscribe(&self, callback: SessionCallback) -> SubscriptionId;

    /// Remove a registration. Unknown ids are ignored.
    fn unsubscribe(&self, id: SubscriptionId);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Registered callback plus the newest state version it has been given.
#[derive(Clone)]
struct Subscriber {
    id: SubscriptionId,
    callback: SessionCallback,
    delivered: Arc<AtomicU64>,
}

impl Subscriber {
    fn new(id: SubscriptionId, callback: SessionCallback) -> Self {
        Self {
            id,
            callback,
            delivered: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Call back with the state recorded as `version`, unless a newer state
    /// already reached this subscriber.
    fn deliver(&self, version: u64, session: Option<Session>) -> bool {
        if self.delivered.fetch_max(version, Ordering::AcqRel) > version {
            debug!(id = ?self.id, version, "dropping stale session state");
            return false;
        }
        (self.callback)(session);
        true
    }
}

#[derive(Default)]
struct HubState {
    current: Option<Session>,
    // Bumped on every publish; replays carry the version they read.
    version: u64,
    next_id: u64,
    subscribers: Vec<Subscriber>,
}

#[derive(Default)]
pub struct SessionHub {
    state: Mutex<HubState>,
}

impl SessionHub {
    #[must_use]
    pub fn new(initial: Option<Session>) -> Self {
        Self {
            state: Mutex::new(HubState {
                current: initial,
                ..HubState::default()
            }),
        }
    }

    #[must_use]
    pub fn current(&self) -> Option<Session> {
        self.lock().current.clone()
    }

    /// Record a new session state and notify every subscriber.
    pub fn publish(&self, session: Option<Session>) {
        let (version, subscribers) = {
            let mut state = self.lock();
            state.current.clone_from(&session);
            state.version += 1;
            (state.version, state.subscribers.clone())
        };

        debug!(
            subscribers = subscribers.len(),
            version,
            signed_in = session.is_some(),
            "publishing session change"
        );

        // Callbacks run without the lock held so they may unsubscribe.
        for subscriber in subscribers {
            if self.is_subscribed(subscriber.id) {
                subscriber.deliver(version, session.clone());
            }
        }
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    fn is_subscribed(&self, id: SubscriptionId) -> bool {
        self.lock().subscribers.iter().any(|sub| sub.id == id)
    }

    fn lock(&self) -> MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SessionSource for SessionHub {
    fn subscribe(&self, callback: SessionCallback) -> SubscriptionId {
        let (subscriber, version, current) = {
            let mut state = self.lock();
            let id = SubscriptionId(state.next_id);
            state.next_id += 1;
            let subscriber = Subscriber::new(id, callback);
            state.subscribers.push(subscriber.clone());
            (subscriber, state.version, state.current.clone())
        };

        // A publish racing this replay may already have delivered newer state.
        subscriber.deliver(version, current);
        subscriber.id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.lock().subscribers.retain(|sub| sub.id != id);
    }
}
