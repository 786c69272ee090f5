//! # magiclink (Passwordless Sign-in Client)
//!
//! `magiclink` drives the client side of an email "magic link" sign-in against a
//! hosted identity provider. The provider issues links, validates them and owns
//! user records; this crate only arranges the calls and reacts to the provider's
//! session notifications.
//!
//! ## Sign-in Lifecycle
//!
//! 1. **Request:** [`auth::flow::SignInRequestFlow`] submits the entered email to
//!    the provider. While the request is outstanding the form is replaced by a
//!    loading view and further submissions are ignored.
//! 2. **Remember:** On success the email is stored on the device under
//!    `emailForSignIn` so the completion step does not have to ask for it again.
//! 3. **Complete:** The user opens the emailed link; [`auth::completion`] trades
//!    the link's `oobCode` for a session.
//! 4. **Observe:** [`auth::watcher::SessionWatcher`] republishes every session
//!    change and [`auth::view::select`] switches between the sign-in form and the
//!    account view.
//!
//! The backend client is always passed in explicitly; nothing in the crate
//! reaches for a global provider instance.

pub mod auth;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with("magiclink/"));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
