//! Auth module covering the magic-link request, the pending sign-in attempt kept
//! on the device, and session observation. It keeps provider plumbing out of the
//! CLI and must never log tokens; email addresses are only logged at debug level.
//!
//! Flow Overview: `flow` asks the backend to email a link and stores the address.
//! `completion` exchanges the link for a session. `watcher` republishes session
//! changes and `view` maps the current session to a screen.

pub mod backend;
pub mod client;
pub mod completion;
pub mod error;
pub mod flow;
pub mod storage;
pub mod types;
pub mod view;
pub mod watcher;

pub use backend::{IdentityBackend, SessionHub, SessionSource, SubscriptionId};
pub use client::{IdentityClient, IdentityClientConfig};
pub use error::{CompletionError, RequestFailed, StorageError, WatcherError};
pub use flow::{FormState, Notice, Notifier, SignInRequestFlow, SubmitOutcome};
pub use storage::{DeviceStorage, FileStorage, MemoryStorage};
pub use types::{LinkSettings, Session};
pub use view::{FormView, Screen};
pub use watcher::SessionWatcher;
