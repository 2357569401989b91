//! User-facing side of the engine callbacks: notifications and
//! credential lookup.

use std::sync::Arc;

use sandgit_types::{AuthRecord, Settings, WILDCARD_HOST};
use tracing::{error, info, warn};
use url::Url;

use super::engine::{AuthFailureAction, EngineHooks, ProgressEvent};

/// Where user-visible messages go.
pub trait Notifier: Send + Sync {
    fn print(&self, message: &str);
    fn warning(&self, message: &str);
    fn error(&self, message: &str);
    fn success(&self, message: &str);
    /// Short-lived popup.
    fn toast(&self, message: &str);
}

/// Notifier that writes everything to the tracing subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn print(&self, message: &str) {
        info!(target: "sandgit::notify", "{message}");
    }

    fn warning(&self, message: &str) {
        warn!(target: "sandgit::notify", "{message}");
    }

    fn error(&self, message: &str) {
        error!(target: "sandgit::notify", "{message}");
    }

    fn success(&self, message: &str) {
        info!(target: "sandgit::notify", success = true, "{message}");
    }

    fn toast(&self, message: &str) {
        warn!(target: "sandgit::notify", toast = true, "{message}");
    }
}

/// Hostname of a remote URL.
///
/// Unparsable URLs and URLs without a host give `"*"`.
pub fn host_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| WILDCARD_HOST.to_string())
}

/// Looks up stored credentials.
pub trait CredentialResolver: Send + Sync {
    /// Record stored under `host`, or under `"*"` when the host has none.
    fn lookup(&self, host: &str) -> Option<AuthRecord>;

    /// Record for the host of a remote URL.
    fn resolve(&self, url: &str) -> Option<AuthRecord> {
        self.lookup(&host_of(url))
    }
}

impl CredentialResolver for Settings {
    fn lookup(&self, host: &str) -> Option<AuthRecord> {
        self.auth_for_host(host).cloned()
    }
}

/// [`EngineHooks`] that report through a [`Notifier`] and answer auth
/// requests from a [`CredentialResolver`].
#[derive(Clone)]
pub struct NotifyingHooks {
    credentials: Arc<dyn CredentialResolver>,
    notifier: Arc<dyn Notifier>,
}

impl NotifyingHooks {
    pub fn new(credentials: Arc<dyn CredentialResolver>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            credentials,
            notifier,
        }
    }
}

impl EngineHooks for NotifyingHooks {
    fn on_progress(&self, event: &ProgressEvent) {
        self.notifier.print(&event.to_string());
    }

    fn on_message(&self, message: &str) {
        self.notifier.print(message);
    }

    fn on_auth(&self, url: &str) -> Option<AuthRecord> {
        self.notifier.warning("Git 403 Try login...");
        self.credentials.resolve(url)
    }

    fn on_auth_failure(&self, _url: &str) -> AuthFailureAction {
        self.notifier.error("Access was denied Login failure!");
        self.notifier.toast("Login GIT failure");
        AuthFailureAction::Cancel
    }

    fn on_auth_success(&self, _url: &str) {
        self.notifier.success("Login success!");
    }
}
