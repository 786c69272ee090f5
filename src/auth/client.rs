//! HTTP client for the hosted identity provider (Identity Toolkit REST API).
//! It implements both backend seams: link requests go to
//! `accounts:sendOobCode`, link completion to `accounts:signInWithEmailLink`,
//! and the resulting session is cached on the device and republished through a
//! `SessionHub`.
//!
//! The API key travels as a query parameter, so request URLs are never logged;
//! spans only carry the API method name.

use crate::auth::{
    backend::{
        BackendFuture, IdentityBackend, SessionCallback, SessionHub, SessionSource, SubscriptionId,
    },
    error::{RequestFailed, StorageError},
    storage::DeviceStorage,
    types::{AUTH_USER_KEY, LinkSettings, Session, StoredSession},
};
use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::{sync::Arc, time::Duration};
use tracing::{Instrument, debug, info_span, warn};
use url::Url;

pub const DEFAULT_AUTH_URL: &str = "https://identitytoolkit.googleapis.com";

/// Default request timeout applied to every provider call.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const EMAIL_SIGNIN_REQUEST_TYPE: &str = "EMAIL_SIGNIN";

#[derive(Clone, Debug)]
pub struct IdentityClientConfig {
    pub base_url: String,
    pub api_key: SecretString,
    pub timeout: Duration,
}

impl IdentityClientConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: SecretString) -> Self {
        Self {
            base_url: base_url.into(),
            api_key,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendOobCodeRequest<'a> {
    request_type: &'a str,
    email: &'a str,
    continue_url: &'a str,
    can_handle_code_in_app: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInWithEmailLinkRequest<'a> {
    email: &'a str,
    oob_code: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInWithEmailLinkResponse {
    local_id: String,
    email: Option<String>,
    #[serde(default)]
    id_token: String,
    #[serde(default)]
    refresh_token: String,
}

pub struct IdentityClient {
    http: Client,
    base_url: Url,
    api_key: SecretString,
    storage: Arc<dyn DeviceStorage>,
    sessions: SessionHub,
}

impl IdentityClient {
    /// Build a client and restore the session cached on this device.
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid or the HTTP client cannot be
    /// built.
    pub fn new(config: IdentityClientConfig, storage: Arc<dyn DeviceStorage>) -> Result<Self> {
        let base_url = Url::parse(config.base_url.trim())
            .with_context(|| format!("invalid identity provider URL: {}", config.base_url))?;

        let http = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(config.timeout)
            .build()
            .context("failed to build HTTP client")?;

        let cached = load_cached_session(storage.as_ref());
        debug!(signed_in = cached.is_some(), "restored cached session");

        Ok(Self {
            http,
            base_url,
            api_key: config.api_key,
            storage,
            sessions: SessionHub::new(cached),
        })
    }

    #[must_use]
    pub fn current_session(&self) -> Option<Session> {
        self.sessions.current()
    }

    /// Forget the current session on this device and notify subscribers.
    ///
    /// # Errors
    /// Returns an error if the cached session cannot be removed.
    pub fn sign_out(&self) -> Result<(), StorageError> {
        self.storage.remove(AUTH_USER_KEY)?;
        self.sessions.publish(None);
        Ok(())
    }

    fn endpoint(&self, method: &str) -> Result<Url, RequestFailed> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let mut url = Url::parse(&format!("{base}/v1/accounts:{method}"))
            .map_err(|err| RequestFailed::new(format!("invalid endpoint URL: {err}")))?;
        url.query_pairs_mut()
            .append_pair("key", self.api_key.expose_secret());
        Ok(url)
    }

    async fn post<B, T>(&self, method: &str, body: &B) -> Result<T, RequestFailed>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self.endpoint(method)?;

        let span = info_span!("identity.request", http.method = "POST", api.method = %method);
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .instrument(span)
            .await
            .map_err(|err| RequestFailed::new(transport_message(err)))?;

        let status = response.status();
        if !status.is_success() {
            let body: Value = response.json().await.unwrap_or(Value::Null);
            let err = provider_error(status, &body);
            debug!(%status, error = %err.message, "identity provider rejected request");
            return Err(err);
        }

        response
            .json::<T>()
            .await
            .map_err(|err| RequestFailed::new(format!("Response error: {err}")))
    }

    async fn send_sign_in_link(
        &self,
        email: &str,
        settings: &LinkSettings,
    ) -> Result<(), RequestFailed> {
        let request = SendOobCodeRequest {
            request_type: EMAIL_SIGNIN_REQUEST_TYPE,
            email,
            continue_url: &settings.redirect_url,
            can_handle_code_in_app: settings.handle_code_in_app,
        };
        let _: Value = self.post("sendOobCode", &request).await?;
        Ok(())
    }

    async fn exchange_link(&self, email: &str, oob_code: &str) -> Result<Session, RequestFailed> {
        let request = SignInWithEmailLinkRequest { email, oob_code };
        let response: SignInWithEmailLinkResponse =
            self.post("signInWithEmailLink", &request).await?;

        let email = response.email.unwrap_or_else(|| email.to_string());
        let session = Session::new(response.local_id, Some(email)).with_tokens(
            SecretString::from(response.id_token),
            SecretString::from(response.refresh_token),
        );

        if let Err(err) = self.cache_session(&session) {
            warn!("failed to cache session on this device: {err}");
        }
        self.sessions.publish(Some(session.clone()));

        Ok(session)
    }

    fn cache_session(&self, session: &Session) -> Result<(), StorageError> {
        let json = serde_json::to_string(&StoredSession::from(session))?;
        self.storage.set(AUTH_USER_KEY, &json)
    }
}

impl IdentityBackend for IdentityClient {
    fn issue_link<'a>(
        &'a self,
        email: &'a str,
        settings: &'a LinkSettings,
    ) -> BackendFuture<'a, ()> {
        Box::pin(self.send_sign_in_link(email, settings))
    }

    fn sign_in_with_link<'a>(
        &'a self,
        email: &'a str,
        oob_code: &'a str,
    ) -> BackendFuture<'a, Session> {
        Box::pin(self.exchange_link(email, oob_code))
    }
}

impl SessionSource for IdentityClient {
    fn subscribe(&self, callback: SessionCallback) -> SubscriptionId {
        self.sessions.subscribe(callback)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.sessions.unsubscribe(id);
    }
}

fn load_cached_session(storage: &dyn DeviceStorage) -> Option<Session> {
    let raw = match storage.get(AUTH_USER_KEY) {
        Ok(raw) => raw?,
        Err(err) => {
            warn!("failed to read cached session: {err}");
            return None;
        }
    };

    match serde_json::from_str::<StoredSession>(&raw) {
        Ok(stored) => Some(Session::from(stored)),
        Err(err) => {
            warn!("ignoring unreadable cached session: {err}");
            None
        }
    }
}

/// Map a provider error body to `RequestFailed`. Handles the REST shape
/// `{"error":{"message":..}}` and the OAuth shape `{"error":..,"error_description":..}`.
fn provider_error(status: StatusCode, body: &Value) -> RequestFailed {
    let error = body.get("error");
    let message = error
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .or_else(|| error.and_then(Value::as_str))
        .map_or_else(|| format!("Request failed ({status})"), ToString::to_string);

    let failed = RequestFailed::new(message);
    match body.get("error_description").and_then(Value::as_str) {
        Some(description) => failed.with_description(description),
        None => failed,
    }
}

fn transport_message(err: reqwest::Error) -> String {
    if err.is_timeout() {
        "Timeout: the identity provider did not respond".to_string()
    } else if err.is_connect() {
        "Network error: could not reach the identity provider".to_string()
    } else {
        // Strip the URL, it carries the API key.
        format!("Network error: {}", err.without_url())
    }
}
