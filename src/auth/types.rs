//! Shared auth types. `Session` carries provider tokens, so its `Debug` output
//! redacts them and callers must never log the exposed values.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Device storage key holding the email of the last successful link request.
pub const EMAIL_FOR_SIGN_IN_KEY: &str = "emailForSignIn";

/// Device storage key holding the cached provider session.
pub const AUTH_USER_KEY: &str = "authUser";

/// Where the provider sends the user after they open the emailed link.
pub const DEFAULT_REDIRECT_URL: &str = "http://localhost:3000/finishSignUp";

/// Link parameters sent with every sign-in request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkSettings {
    /// Fully-qualified URL the provider appends the verification code to.
    pub redirect_url: String,
    /// Email link sign-in only works when the code is handled in the app.
    pub handle_code_in_app: bool,
}

impl LinkSettings {
    #[must_use]
    pub fn new(redirect_url: impl Into<String>) -> Self {
        Self {
            redirect_url: redirect_url.into(),
            handle_code_in_app: true,
        }
    }
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self::new(DEFAULT_REDIRECT_URL)
    }
}

/// An authenticated identity as reported by the provider.
#[derive(Clone, Debug)]
pub struct Session {
    pub uid: String,
    pub email: Option<String>,
    pub id_token: SecretString,
    pub refresh_token: SecretString,
}

impl Session {
    #[must_use]
    pub fn new(uid: impl Into<String>, email: Option<String>) -> Self {
        Self {
            uid: uid.into(),
            email,
            id_token: SecretString::default(),
            refresh_token: SecretString::default(),
        }
    }

    #[must_use]
    pub fn with_tokens(mut self, id_token: SecretString, refresh_token: SecretString) -> Self {
        self.id_token = id_token;
        self.refresh_token = refresh_token;
        self
    }
}

// Two sessions are the same identity when the provider reference matches;
// token refreshes do not change who is signed in.
impl PartialEq for Session {
    fn eq(&self, other: &Self) -> bool {
        self.uid == other.uid && self.email == other.email
    }
}

impl Eq for Session {}

/// On-disk form of [`Session`]. Only used for the device cache.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct StoredSession {
    pub uid: String,
    pub email: Option<String>,
    pub id_token: String,
    pub refresh_token: String,
}

impl From<&Session> for StoredSession {
    fn from(session: &Session) -> Self {
        Self {
            uid: session.uid.clone(),
            email: session.email.clone(),
            id_token: session.id_token.expose_secret().to_string(),
            refresh_token: session.refresh_token.expose_secret().to_string(),
        }
    }
}

impl From<StoredSession> for Session {
    fn from(stored: StoredSession) -> Self {
        Self::new(stored.uid, stored.email).with_tokens(
            SecretString::from(stored.id_token),
            SecretString::from(stored.refresh_token),
        )
    }
}
