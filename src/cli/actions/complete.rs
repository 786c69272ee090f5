use crate::auth::{SessionSource, SessionWatcher, completion, view};
use crate::cli::globals::GlobalArgs;
use anyhow::{Context, Result};
use std::sync::Arc;

#[derive(Debug)]
pub struct Args {
    pub globals: GlobalArgs,
    pub link: String,
    pub email: Option<String>,
}

/// Execute the complete action.
/// # Errors
/// Returns an error if the link is not a sign-in link, no email is known for
/// it, or the identity provider rejects the code.
pub async fn execute(args: Args) -> Result<()> {
    let storage = args.globals.storage()?;
    let client = args.globals.client(Arc::clone(&storage))?;

    let watcher = SessionWatcher::new();
    let source: Arc<dyn SessionSource> = client.clone();
    watcher.start(source, |_| {})?;

    completion::complete_sign_in(
        client.as_ref(),
        storage.as_ref(),
        &args.link,
        args.email.as_deref(),
    )
    .await
    .context("failed to complete sign-in")?;

    println!("{}", view::select(watcher.current().as_ref()));
    watcher.stop();

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::auth::{
        DeviceStorage, FileStorage,
        types::{AUTH_USER_KEY, EMAIL_FOR_SIGN_IN_KEY},
    };
    use secrecy::SecretString;
    use serde_json::json;
    use std::net::TcpListener;
    use uuid::Uuid;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const LINK: &str = "http://localhost:3000/finishSignUp?apiKey=test-key&oobCode=code-1&mode=signIn&lang=en";

    fn can_bind_localhost() -> bool {
        TcpListener::bind("127.0.0.1:0").is_ok()
    }

    fn globals(uri: &str) -> GlobalArgs {
        let dir = std::env::temp_dir().join(format!("magiclink-complete-{}", Uuid::new_v4()));
        let mut globals = GlobalArgs::new(SecretString::from("test-key"), dir);
        globals.auth_url = uri.to_string();
        globals
    }

    #[tokio::test]
    async fn complete_uses_remembered_email() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/accounts:signInWithEmailLink"))
            .and(body_json(json!({"email": "alice@example.com", "oobCode": "code-1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "localId": "uid-1",
                "email": "alice@example.com",
                "idToken": "id-token",
                "refreshToken": "refresh-token",
                "expiresIn": "3600"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let globals = globals(&server.uri());
        let state_dir = globals.state_dir.clone();
        let storage = FileStorage::in_dir(&state_dir);
        std::fs::create_dir_all(&state_dir)?;
        storage.set(EMAIL_FOR_SIGN_IN_KEY, "alice@example.com")?;

        execute(Args {
            globals,
            link: LINK.to_string(),
            email: None,
        })
        .await?;

        assert_eq!(storage.get(EMAIL_FOR_SIGN_IN_KEY)?, None);
        assert!(storage.get(AUTH_USER_KEY)?.is_some());
        let _ = std::fs::remove_dir_all(state_dir);
        Ok(())
    }

    #[tokio::test]
    async fn complete_without_email_fails() {
        let globals = globals("http://127.0.0.1:9");
        let state_dir = globals.state_dir.clone();

        let result = execute(Args {
            globals,
            link: LINK.to_string(),
            email: None,
        })
        .await;

        assert!(result.is_err());
        let _ = std::fs::remove_dir_all(state_dir);
    }
}
