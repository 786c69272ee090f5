//! Magic-link request flow. Owns the form state (entered email and the
//! in-progress flag), asks the backend to send the link, remembers the email on
//! the device, and tells the user how it went.
//!
//! Only one request per flow may be outstanding. The in-progress flag is held
//! by a guard that is released on every exit path: success, failure, a panic in
//! the backend, or the caller dropping the future mid-request. A dropped request
//! simply discards its result. Failed requests are never retried; the user has
//! to submit again.

use crate::auth::{
    backend::IdentityBackend,
    error::RequestFailed,
    storage::DeviceStorage,
    types::{EMAIL_FOR_SIGN_IN_KEY, LinkSettings},
};
use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicBool, Ordering},
};
use tracing::{Instrument, debug, info, info_span, warn};

pub const LINK_SENT_MESSAGE: &str = "Check your email for the login link!";

/// Blocking notification shown once a request settles.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    LinkSent,
    Error(String),
}

impl Notice {
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::LinkSent => LINK_SENT_MESSAGE,
            Self::Error(message) => message,
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

/// User-facing surface for notices.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: &Notice);
}

/// Snapshot of the form.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FormState {
    pub email: String,
    pub in_progress: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The link was sent and the email remembered on this device.
    Sent { email: String },
    /// The backend rejected the request; nothing was stored.
    Failed(RequestFailed),
    /// Another request from this flow is still outstanding.
    Busy,
}

pub struct SignInRequestFlow {
    backend: Arc<dyn IdentityBackend>,
    storage: Arc<dyn DeviceStorage>,
    notifier: Arc<dyn Notifier>,
    settings: LinkSettings,
    email: Mutex<String>,
    in_progress: AtomicBool,
}

impl SignInRequestFlow {
    #[must_use]
    pub fn new(
        backend: Arc<dyn IdentityBackend>,
        storage: Arc<dyn DeviceStorage>,
        notifier: Arc<dyn Notifier>,
        settings: LinkSettings,
    ) -> Self {
        Self {
            backend,
            storage,
            notifier,
            settings,
            email: Mutex::new(String::new()),
            in_progress: AtomicBool::new(false),
        }
    }

    /// Replace the entered email. Format checks are left to the backend.
    pub fn update_email(&self, new_value: impl Into<String>) {
        *self.email.lock().unwrap_or_else(PoisonError::into_inner) = new_value.into();
    }

    #[must_use]
    pub fn email(&self) -> String {
        self.email
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn in_progress(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn state(&self) -> FormState {
        FormState {
            email: self.email(),
            in_progress: self.in_progress(),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &LinkSettings {
        &self.settings
    }

    /// Request a sign-in link for the entered email.
    ///
    /// Returns [`SubmitOutcome::Busy`] without contacting the backend while an
    /// earlier request is outstanding.
    pub async fn submit(&self) -> SubmitOutcome {
        let Some(_guard) = InProgressGuard::acquire(&self.in_progress) else {
            debug!("sign-in request already in progress; ignoring submit");
            return SubmitOutcome::Busy;
        };

        let email = self.email();
        debug!(email = %email, redirect_url = %self.settings.redirect_url, "requesting sign-in link");

        let span = info_span!("signin.issue_link");
        let result = async {
            self.backend.issue_link(&email, &self.settings).await?;
            self.remember(&email)
        }
        .instrument(span)
        .await;

        match result {
            Ok(()) => {
                info!("sign-in link sent");
                self.notifier.notify(&Notice::LinkSent);
                SubmitOutcome::Sent { email }
            }
            Err(err) => {
                warn!(error = %err.message, "sign-in link request failed");
                self.notifier
                    .notify(&Notice::Error(err.user_message().to_string()));
                SubmitOutcome::Failed(err)
            }
        }
    }

    fn remember(&self, email: &str) -> Result<(), RequestFailed> {
        self.storage
            .set(EMAIL_FOR_SIGN_IN_KEY, email)
            .map_err(|err| RequestFailed::new(format!("Failed to remember sign-in email: {err}")))
    }
}

/// Holds the in-progress flag; clearing it on drop covers every exit path.
struct InProgressGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InProgressGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        if flag.swap(true, Ordering::AcqRel) {
            None
        } else {
            Some(Self { flag })
        }
    }
}

impl Drop for InProgressGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
