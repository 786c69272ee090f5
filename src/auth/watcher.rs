//! Session observation. The watcher registers one callback with a
//! `SessionSource`, caches the last reported session and forwards every change
//! to its owner in the order the source emits them. It never changes the
//! session itself.
//!
//! The registration is released by `stop()` or when the watcher is dropped, so
//! a torn-down owner is never called back.

use crate::auth::{
    backend::{SessionCallback, SessionSource, SubscriptionId},
    error::WatcherError,
    types::Session,
};
use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError,
    atomic::{AtomicBool, Ordering},
};
use tracing::{debug, info};

/// Registration lifecycle. `subscribe` replays into the callback, so the
/// lock is never held across it; `Starting` covers that window.
#[derive(Default)]
enum Registration {
    #[default]
    Idle,
    Starting {
        active: Arc<AtomicBool>,
    },
    Running {
        source: Arc<dyn SessionSource>,
        id: SubscriptionId,
        active: Arc<AtomicBool>,
    },
}

#[derive(Default)]
pub struct SessionWatcher {
    current: Arc<Mutex<Option<Session>>>,
    registration: Mutex<Registration>,
}

impl SessionWatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to `source`. `on_change` is called right away with the current
    /// session and again after every change until [`Self::stop`]. The callback
    /// may stop the watcher, including during that first call.
    ///
    /// # Errors
    /// Returns [`WatcherError::AlreadyStarted`] if this watcher is already
    /// subscribed.
    pub fn start<F>(&self, source: Arc<dyn SessionSource>, on_change: F) -> Result<(), WatcherError>
    where
        F: Fn(Option<Session>) + Send + Sync + 'static,
    {
        let active = Arc::new(AtomicBool::new(true));
        {
            let mut registration = self.lock_registration();
            if !matches!(*registration, Registration::Idle) {
                return Err(WatcherError::AlreadyStarted);
            }
            *registration = Registration::Starting {
                active: Arc::clone(&active),
            };
        }

        let current = Arc::clone(&self.current);
        let gate = Arc::clone(&active);
        let callback: SessionCallback = Arc::new(move |session: Option<Session>| {
            if !gate.load(Ordering::Acquire) {
                return;
            }
            {
                let mut cached = current.lock().unwrap_or_else(PoisonError::into_inner);
                if cached.is_some() != session.is_some() {
                    info!(signed_in = session.is_some(), "session state changed");
                }
                cached.clone_from(&session);
            }
            on_change(session);
        });

        let id = source.subscribe(callback);

        let mut registration = self.lock_registration();
        let still_ours = matches!(
            &*registration,
            Registration::Starting { active: pending } if Arc::ptr_eq(pending, &active)
        );
        if still_ours {
            *registration = Registration::Running {
                source,
                id,
                active,
            };
            debug!(?id, "session watcher started");
        } else {
            // Stopped from inside the replay.
            drop(registration);
            source.unsubscribe(id);
            debug!(?id, "session watcher stopped during start");
        }
        Ok(())
    }

    /// Release the subscription. Safe to call more than once, and from inside
    /// the callback. The callback is not invoked again once this returns.
    pub fn stop(&self) {
        let registration = std::mem::take(&mut *self.lock_registration());
        match registration {
            Registration::Idle => {}
            Registration::Starting { active } => active.store(false, Ordering::Release),
            Registration::Running { source, id, active } => {
                active.store(false, Ordering::Release);
                source.unsubscribe(id);
                debug!(?id, "session watcher stopped");
            }
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        !matches!(*self.lock_registration(), Registration::Idle)
    }

    /// Last session reported by the source.
    #[must_use]
    pub fn current(&self) -> Option<Session> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn lock_registration(&self) -> MutexGuard<'_, Registration> {
        self.registration
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for SessionWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::backend::SessionHub;

    type Seen = Arc<Mutex<Vec<Option<String>>>>;

    fn recorder() -> (Seen, impl Fn(Option<Session>) + Send + Sync + 'static) {
        let seen: Seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let on_change = move |session: Option<Session>| {
            sink.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(session.map(|s| s.uid));
        };
        (seen, on_change)
    }

    fn values(seen: &Seen) -> Vec<Option<String>> {
        seen.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    #[test]
    fn start_replays_existing_session() -> anyhow::Result<()> {
        let hub = Arc::new(SessionHub::new(Some(Session::new("uid-x", None))));
        let watcher = SessionWatcher::new();
        let (seen, on_change) = recorder();

        watcher.start(hub.clone(), on_change)?;

        assert_eq!(values(&seen), vec![Some("uid-x".to_string())]);
        assert_eq!(watcher.current().map(|s| s.uid), Some("uid-x".to_string()));
        Ok(())
    }

    #[test]
    fn follows_session_cycle() -> anyhow::Result<()> {
        let hub = Arc::new(SessionHub::default());
        let watcher = SessionWatcher::new();
        let (seen, on_change) = recorder();

        watcher.start(hub.clone(), on_change)?;
        hub.publish(Some(Session::new("uid-1", None)));
        hub.publish(None);
        hub.publish(Some(Session::new("uid-1", None)));

        assert_eq!(
            values(&seen),
            vec![
                None,
                Some("uid-1".to_string()),
                None,
                Some("uid-1".to_string())
            ]
        );
        Ok(())
    }

    #[test]
    fn stop_silences_callback() -> anyhow::Result<()> {
        let hub = Arc::new(SessionHub::default());
        let watcher = SessionWatcher::new();
        let (seen, on_change) = recorder();

        watcher.start(hub.clone(), on_change)?;
        watcher.stop();
        hub.publish(Some(Session::new("uid-1", None)));

        assert_eq!(values(&seen), vec![None]);
        assert!(!watcher.is_running());
        assert_eq!(hub.subscriber_count(), 0);
        Ok(())
    }

    #[test]
    fn stop_is_idempotent_and_safe_before_start() {
        let watcher = SessionWatcher::new();
        watcher.stop();
        watcher.stop();
        assert!(!watcher.is_running());
    }

    #[test]
    fn drop_releases_subscription() -> anyhow::Result<()> {
        let hub = Arc::new(SessionHub::default());
        let (seen, on_change) = recorder();
        {
            let watcher = SessionWatcher::new();
            watcher.start(hub.clone(), on_change)?;
            assert_eq!(hub.subscriber_count(), 1);
        }

        hub.publish(Some(Session::new("uid-1", None)));

        assert_eq!(hub.subscriber_count(), 0);
        assert_eq!(values(&seen), vec![None]);
        Ok(())
    }

    #[test]
    fn second_start_is_rejected() -> anyhow::Result<()> {
        let hub = Arc::new(SessionHub::default());
        let watcher = SessionWatcher::new();

        watcher.start(hub.clone(), |_| {})?;
        assert_eq!(
            watcher.start(hub.clone(), |_| {}),
            Err(WatcherError::AlreadyStarted)
        );
        assert_eq!(hub.subscriber_count(), 1);
        Ok(())
    }

    #[test]
    fn restart_after_stop_replays_again() -> anyhow::Result<()> {
        let hub = Arc::new(SessionHub::new(Some(Session::new("uid-1", None))));
        let watcher = SessionWatcher::new();
        let (seen, on_change) = recorder();

        watcher.start(hub.clone(), |_| {})?;
        watcher.stop();
        watcher.start(hub.clone(), on_change)?;

        assert_eq!(values(&seen), vec![Some("uid-1".to_string())]);
        Ok(())
    }

    #[test]
    fn stop_during_replay_releases_subscription() -> anyhow::Result<()> {
        let hub = Arc::new(SessionHub::new(Some(Session::new("uid-1", None))));
        let watcher = Arc::new(SessionWatcher::new());
        let (seen, record) = recorder();

        let weak = Arc::downgrade(&watcher);
        let (done_tx, done_rx) = std::sync::mpsc::channel();
        let source: Arc<dyn SessionSource> = hub.clone();
        let starter = Arc::clone(&watcher);
        std::thread::spawn(move || {
            let result = starter.start(source, move |session: Option<Session>| {
                let signed_in = session.is_some();
                record(session);
                if signed_in && let Some(watcher) = weak.upgrade() {
                    watcher.stop();
                    assert!(!watcher.is_running());
                }
            });
            let _ = done_tx.send(result);
        });

        let result = done_rx
            .recv_timeout(std::time::Duration::from_secs(3))
            .map_err(|_| anyhow::anyhow!("start did not return after stop during replay"))?;
        result?;

        assert!(!watcher.is_running());
        assert_eq!(hub.subscriber_count(), 0);

        hub.publish(None);
        hub.publish(Some(Session::new("uid-2", None)));
        assert_eq!(values(&seen), vec![Some("uid-1".to_string())]);
        Ok(())
    }

    #[test]
    fn restart_from_replay_keeps_new_registration() -> anyhow::Result<()> {
        let hub = Arc::new(SessionHub::new(Some(Session::new("uid-1", None))));
        let watcher = Arc::new(SessionWatcher::new());
        let (seen, on_change) = recorder();
        let on_change = Arc::new(Mutex::new(Some(on_change)));

        let weak = Arc::downgrade(&watcher);
        let restart_hub = Arc::clone(&hub);
        watcher.start(hub.clone(), move |_| {
            let Some(watcher) = weak.upgrade() else {
                return;
            };
            let next = on_change
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
            if let Some(next) = next {
                watcher.stop();
                let source: Arc<dyn SessionSource> = restart_hub.clone();
                assert!(watcher.start(source, next).is_ok());
            }
        })?;

        assert!(watcher.is_running());
        assert_eq!(hub.subscriber_count(), 1);

        hub.publish(None);
        assert_eq!(values(&seen), vec![Some("uid-1".to_string()), None]);
        Ok(())
    }
}
