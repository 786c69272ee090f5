use crate::auth::{
    DeviceStorage, FileStorage, IdentityClient, IdentityClientConfig, LinkSettings,
    client::DEFAULT_AUTH_URL,
};
use crate::cli::commands::identity::Options;
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::{fs, path::PathBuf, sync::Arc};

/// Settings every action needs to reach the identity provider and the
/// device-local state.
#[derive(Clone)]
pub struct GlobalArgs {
    pub auth_url: String,
    pub api_key: SecretString,
    pub redirect_url: String,
    pub state_dir: PathBuf,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(api_key: SecretString, state_dir: PathBuf) -> Self {
        Self {
            auth_url: DEFAULT_AUTH_URL.to_string(),
            api_key,
            redirect_url: crate::auth::types::DEFAULT_REDIRECT_URL.to_string(),
            state_dir,
        }
    }

    #[must_use]
    pub fn link_settings(&self) -> LinkSettings {
        LinkSettings::new(self.redirect_url.clone())
    }

    /// Open the device storage, creating the state directory if needed.
    ///
    /// # Errors
    /// Returns an error if the state directory cannot be created.
    pub fn storage(&self) -> Result<Arc<dyn DeviceStorage>> {
        fs::create_dir_all(&self.state_dir).with_context(|| {
            format!(
                "failed to create state directory: {}",
                self.state_dir.display()
            )
        })?;
        Ok(Arc::new(FileStorage::in_dir(&self.state_dir)))
    }

    /// Build the identity provider client over `storage`.
    ///
    /// # Errors
    /// Returns an error if the provider URL is invalid or the HTTP client
    /// cannot be built.
    pub fn client(&self, storage: Arc<dyn DeviceStorage>) -> Result<Arc<IdentityClient>> {
        let config = IdentityClientConfig::new(self.auth_url.clone(), self.api_key.clone());
        Ok(Arc::new(IdentityClient::new(config, storage)?))
    }
}

impl From<Options> for GlobalArgs {
    fn from(options: Options) -> Self {
        Self {
            auth_url: options.auth_url,
            api_key: options.api_key,
            redirect_url: options.redirect_url,
            state_dir: options.state_dir,
        }
    }
}

impl std::fmt::Debug for GlobalArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalArgs")
            .field("auth_url", &self.auth_url)
            .field("api_key", &"***")
            .field("redirect_url", &self.redirect_url)
            .field("state_dir", &self.state_dir)
            .finish()
    }
}
