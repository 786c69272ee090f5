//! Second half of the sign-in: the user opened the emailed link. The email is
//! taken from the pending attempt stored on this device unless the caller
//! supplies one (the link may have been opened elsewhere). The one-time code
//! is never logged.

use crate::auth::{
    backend::IdentityBackend,
    error::CompletionError,
    storage::DeviceStorage,
    types::{EMAIL_FOR_SIGN_IN_KEY, Session},
};
use tracing::{debug, info};
use url::Url;

const MODE_PARAM: &str = "mode";
const SIGN_IN_MODE: &str = "signIn";
const OOB_CODE_PARAM: &str = "oobCode";

/// True when `link` is an email sign-in link carrying a one-time code.
#[must_use]
pub fn is_sign_in_link(link: &str) -> bool {
    oob_code(link).is_some()
}

fn oob_code(link: &str) -> Option<String> {
    let url = Url::parse(link.trim()).ok()?;
    let mut mode = None;
    let mut code = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            MODE_PARAM => mode = Some(value.into_owned()),
            OOB_CODE_PARAM => code = Some(value.into_owned()),
            _ => {}
        }
    }

    if mode.as_deref() != Some(SIGN_IN_MODE) {
        return None;
    }
    code.filter(|code| !code.is_empty())
}

/// Email to complete the sign-in with: the override when given, otherwise the
/// pending attempt on this device.
///
/// # Errors
/// Returns an error if storage cannot be read or no email is available.
pub fn resolve_email(
    storage: &dyn DeviceStorage,
    email_override: Option<&str>,
) -> Result<String, CompletionError> {
    if let Some(email) = email_override.map(str::trim).filter(|e| !e.is_empty()) {
        return Ok(email.to_string());
    }

    storage
        .get(EMAIL_FOR_SIGN_IN_KEY)?
        .filter(|email| !email.is_empty())
        .ok_or(CompletionError::MissingEmail)
}

/// Exchange a sign-in link for a session and forget the pending attempt.
///
/// # Errors
/// Returns an error if the link is not a sign-in link, no email is known, the
/// backend rejects the code, or storage fails.
pub async fn complete_sign_in(
    backend: &dyn IdentityBackend,
    storage: &dyn DeviceStorage,
    link: &str,
    email_override: Option<&str>,
) -> Result<Session, CompletionError> {
    let code = oob_code(link).ok_or_else(|| CompletionError::InvalidLink(link.to_string()))?;
    let email = resolve_email(storage, email_override)?;

    debug!(email = %email, "completing sign-in");
    let session = backend.sign_in_with_link(&email, &code).await?;

    storage.remove(EMAIL_FOR_SIGN_IN_KEY)?;
    info!("sign-in completed");

    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{
        backend::BackendFuture, error::RequestFailed, storage::MemoryStorage,
        types::LinkSettings,
    };
    use anyhow::{Result, anyhow};
    use std::sync::{Mutex, PoisonError};

    const LINK: &str = "http://localhost:3000/finishSignUp?apiKey=key&oobCode=code-123&mode=signIn&lang=en";

    #[derive(Default)]
    struct TestBackend {
        reject: bool,
        seen: Mutex<Option<(String, String)>>,
    }

    impl IdentityBackend for TestBackend {
        fn issue_link<'a>(
            &'a self,
            _email: &'a str,
            _settings: &'a LinkSettings,
        ) -> BackendFuture<'a, ()> {
            Box::pin(async { Ok(()) })
        }

        fn sign_in_with_link<'a>(
            &'a self,
            email: &'a str,
            oob_code: &'a str,
        ) -> BackendFuture<'a, Session> {
            Box::pin(async move {
                *self.seen.lock().unwrap_or_else(PoisonError::into_inner) =
                    Some((email.to_string(), oob_code.to_string()));
                if self.reject {
                    Err(RequestFailed::new("INVALID_OOB_CODE"))
                } else {
                    Ok(Session::new("uid-1", Some(email.to_string())))
                }
            })
        }
    }

    #[test]
    fn recognizes_sign_in_links() {
        assert!(is_sign_in_link(LINK));
        assert!(!is_sign_in_link("http://localhost:3000/finishSignUp"));
        assert!(!is_sign_in_link(
            "http://localhost:3000/finishSignUp?oobCode=abc&mode=resetPassword"
        ));
        assert!(!is_sign_in_link(
            "http://localhost:3000/finishSignUp?oobCode=&mode=signIn"
        ));
        assert!(!is_sign_in_link("not a url"));
    }

    #[test]
    fn override_wins_over_stored_email() -> Result<()> {
        let storage = MemoryStorage::new();
        storage.set(EMAIL_FOR_SIGN_IN_KEY, "stored@b.com")?;

        assert_eq!(resolve_email(&storage, Some(" typed@b.com "))?, "typed@b.com");
        assert_eq!(resolve_email(&storage, Some(""))?, "stored@b.com");
        assert_eq!(resolve_email(&storage, None)?, "stored@b.com");
        Ok(())
    }

    #[tokio::test]
    async fn completes_with_stored_email_and_clears_it() -> Result<()> {
        let backend = TestBackend::default();
        let storage = MemoryStorage::new();
        storage.set(EMAIL_FOR_SIGN_IN_KEY, "a@b.com")?;

        let session = complete_sign_in(&backend, &storage, LINK, None).await?;

        assert_eq!(session.email.as_deref(), Some("a@b.com"));
        let seen = backend
            .seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        assert_eq!(
            seen,
            Some(("a@b.com".to_string(), "code-123".to_string()))
        );
        assert_eq!(storage.get(EMAIL_FOR_SIGN_IN_KEY)?, None);
        Ok(())
    }

    #[tokio::test]
    async fn missing_email_is_reported() -> Result<()> {
        let backend = TestBackend::default();
        let storage = MemoryStorage::new();

        let err = complete_sign_in(&backend, &storage, LINK, None)
            .await
            .err()
            .ok_or_else(|| anyhow!("expected error"))?;

        assert!(matches!(err, CompletionError::MissingEmail));
        Ok(())
    }

    #[tokio::test]
    async fn rejected_code_keeps_pending_email() -> Result<()> {
        let backend = TestBackend {
            reject: true,
            ..TestBackend::default()
        };
        let storage = MemoryStorage::new();
        storage.set(EMAIL_FOR_SIGN_IN_KEY, "a@b.com")?;

        let err = complete_sign_in(&backend, &storage, LINK, None)
            .await
            .err()
            .ok_or_else(|| anyhow!("expected error"))?;

        assert!(matches!(err, CompletionError::Request(_)));
        assert_eq!(
            storage.get(EMAIL_FOR_SIGN_IN_KEY)?,
            Some("a@b.com".to_string())
        );
        Ok(())
    }

    #[tokio::test]
    async fn invalid_link_is_rejected_before_backend_call() -> Result<()> {
        let backend = TestBackend::default();
        let storage = MemoryStorage::new();
        storage.set(EMAIL_FOR_SIGN_IN_KEY, "a@b.com")?;

        let err = complete_sign_in(&backend, &storage, "https://example.com", None)
            .await
            .err()
            .ok_or_else(|| anyhow!("expected error"))?;

        assert!(matches!(err, CompletionError::InvalidLink(_)));
        assert!(
            backend
                .seen
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .is_none()
        );
        Ok(())
    }
}
