//! Screen selection. Presentation only: the screen follows the watcher's
//! session and the form view follows the flow's in-progress flag.

use crate::auth::{flow::FormState, types::Session};
use std::fmt;

pub const LOADING_MESSAGE: &str = "Sending magic link...";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Screen {
    SignIn,
    Account(Session),
}

/// Pick the screen for the current session. There is no intermediate state.
#[must_use]
pub fn select(session: Option<&Session>) -> Screen {
    session.map_or(Screen::SignIn, |session| Screen::Account(session.clone()))
}

impl fmt::Display for Screen {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SignIn => write!(formatter, "Sign in via magic link with your email"),
            Self::Account(session) => match session.email.as_deref() {
                Some(email) => write!(formatter, "Signed in as {email} ({})", session.uid),
                None => write!(formatter, "Signed in ({})", session.uid),
            },
        }
    }
}

/// What the sign-in screen shows: the form, or a loading line while a request
/// is outstanding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FormView {
    Form { email: String },
    Loading,
}

impl FormView {
    #[must_use]
    pub fn from_state(state: &FormState) -> Self {
        if state.in_progress {
            Self::Loading
        } else {
            Self::Form {
                email: state.email.clone(),
            }
        }
    }
}
