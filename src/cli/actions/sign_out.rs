use crate::cli::globals::GlobalArgs;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub globals: GlobalArgs,
}

/// Execute the sign-out action.
/// # Errors
/// Returns an error if the cached session cannot be removed.
pub fn execute(args: &Args) -> Result<()> {
    let storage = args.globals.storage()?;
    let client = args.globals.client(Arc::clone(&storage))?;

    let was_signed_in = client.current_session().is_some();
    client.sign_out().context("failed to sign out")?;
    info!(was_signed_in, "signed out");

    println!("Signed out");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::auth::{
        DeviceStorage, FileStorage, Session,
        types::{AUTH_USER_KEY, StoredSession},
    };
    use secrecy::SecretString;
    use uuid::Uuid;

    #[test]
    fn sign_out_removes_cached_session() {
        let dir = std::env::temp_dir().join(format!("magiclink-sign-out-{}", Uuid::new_v4()));
        let args = Args {
            globals: GlobalArgs::new(SecretString::from("test-key"), dir.clone()),
        };
        std::fs::create_dir_all(&dir).unwrap();
        let storage = FileStorage::in_dir(&dir);
        let session = Session::new("uid-1", Some("alice@example.com".to_string()));
        storage
            .set(
                AUTH_USER_KEY,
                &serde_json::to_string(&StoredSession::from(&session)).unwrap(),
            )
            .unwrap();

        execute(&args).unwrap();

        assert_eq!(storage.get(AUTH_USER_KEY).unwrap(), None);
        let _ = std::fs::remove_dir_all(dir);
    }
}
