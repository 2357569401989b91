//! [`Vcs`]: the git operations the app exposes, on top of any
//! [`VcsEngine`].
//!
//! The façade fills in what callers should not have to know: clone
//! options from settings, the commit author from the remote's host record,
//! and `HEAD` as the default log ref.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use sandgit_types::CloneSettings;
use tracing::debug;

use super::engine::{
    Author, CloneRequest, CommitInfo, CommitRequest, EngineHooks, FetchRequest, FetchResult,
    FileStatus, InitRequest, LogRequest, Remote, StatusRequest, VcsEngine, VcsError,
};
use super::hooks::{CredentialResolver, Notifier, NotifyingHooks, host_of};
use crate::config::DEFAULT_CORS_PROXY;
use crate::vfs::Filesystem;

/// Git operations bound to one filesystem, one engine and the user's
/// settings.
///
/// Every remote operation reports through the injected [`Notifier`] and
/// answers credential prompts from the injected [`CredentialResolver`].
pub struct Vcs {
    engine: Arc<dyn VcsEngine>,
    fs: Arc<dyn Filesystem>,
    credentials: Arc<dyn CredentialResolver>,
    notifier: Arc<dyn Notifier>,
    hooks: Arc<dyn EngineHooks>,
    clone_settings: CloneSettings,
    cors_proxy: Option<String>,
}

impl std::fmt::Debug for Vcs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vcs")
            .field("clone_settings", &self.clone_settings)
            .field("cors_proxy", &self.cors_proxy)
            .finish_non_exhaustive()
    }
}

impl Vcs {
    pub fn new(
        engine: Arc<dyn VcsEngine>,
        fs: Arc<dyn Filesystem>,
        credentials: Arc<dyn CredentialResolver>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let hooks = Arc::new(NotifyingHooks::new(credentials.clone(), notifier.clone()));
        Self {
            engine,
            fs,
            credentials,
            notifier,
            hooks,
            clone_settings: CloneSettings::default(),
            cors_proxy: Some(DEFAULT_CORS_PROXY.to_string()),
        }
    }

    pub fn with_clone_settings(mut self, settings: CloneSettings) -> Self {
        self.clone_settings = settings;
        self
    }

    /// Proxy for remotes without CORS headers. `None` disables it.
    pub fn with_cors_proxy(mut self, proxy: Option<String>) -> Self {
        self.cors_proxy = proxy;
        self
    }

    pub fn filesystem(&self) -> &Arc<dyn Filesystem> {
        &self.fs
    }

    pub async fn init(&self, dir: &Path) -> Result<(), VcsError> {
        self.engine
            .init(self.fs.clone(), InitRequest { dir: dir.to_path_buf() })
            .await
    }

    /// Clone `url` into `dir`, checking out `reference` when given.
    pub async fn clone(
        &self,
        dir: &Path,
        url: &str,
        reference: Option<&str>,
    ) -> Result<(), VcsError> {
        self.notifier.print(&format!("Cloning repo {url}"));
        let settings = &self.clone_settings;
        let request = CloneRequest {
            dir: dir.to_path_buf(),
            url: url.to_string(),
            reference: reference.map(str::to_string),
            cors_proxy: self.cors_proxy.clone(),
            single_branch: settings.single_branch,
            no_checkout: settings.no_checkout,
            no_tags: settings.no_tags,
            depth: settings.depth(),
            since: settings.since().map(str::to_string),
            exclude: settings.exclude_list(),
        };
        debug!(?request, "clone");
        self.engine
            .clone_repo(self.fs.clone(), request, self.hooks.clone())
            .await
    }

    /// Commit the index with the author stored for the first remote's host.
    pub async fn commit(&self, dir: &Path, message: &str) -> Result<String, VcsError> {
        let remotes = self.list_remotes(dir).await?;
        let remote_url = remotes.into_iter().next().map(|r| r.url).unwrap_or_default();
        let author = self
            .credentials
            .resolve(&remote_url)
            .map(|auth| Author {
                name: Some(auth.name).filter(|n| !n.is_empty()),
                email: Some(auth.email).filter(|e| !e.is_empty()),
            })
            .unwrap_or_default();
        debug!(host = %host_of(&remote_url), ?author, "commit");

        let request = CommitRequest {
            dir: dir.to_path_buf(),
            message: message.to_string(),
            author,
            remote_url,
        };
        self.engine
            .commit(self.fs.clone(), request, self.hooks.clone())
            .await
    }

    pub async fn list_remotes(&self, dir: &Path) -> Result<Vec<Remote>, VcsError> {
        self.engine
            .list_remotes(self.fs.clone(), dir.to_path_buf())
            .await
    }

    /// History from `reference`, `HEAD` by default.
    pub async fn log(
        &self,
        dir: &Path,
        reference: Option<&str>,
        force: bool,
    ) -> Result<Vec<CommitInfo>, VcsError> {
        let request = LogRequest {
            dir: dir.to_path_buf(),
            reference: reference.unwrap_or("HEAD").to_string(),
            depth: self.clone_settings.depth(),
            since: self.clone_settings.since().map(str::to_string),
            force,
        };
        self.engine.log(self.fs.clone(), request).await
    }

    pub async fn fetch(
        &self,
        dir: &Path,
        url: &str,
        reference: Option<&str>,
        remote_ref: Option<&str>,
    ) -> Result<FetchResult, VcsError> {
        let settings = &self.clone_settings;
        let request = FetchRequest {
            dir: dir.to_path_buf(),
            url: url.to_string(),
            reference: reference.map(str::to_string),
            remote_ref: remote_ref.map(str::to_string),
            cors_proxy: self.cors_proxy.clone(),
            single_branch: settings.single_branch,
            depth: settings.depth(),
            since: settings.since().map(str::to_string),
            exclude: settings.exclude_list(),
        };
        debug!(?request, "fetch");
        self.engine
            .fetch(self.fs.clone(), request, self.hooks.clone())
            .await
    }

    pub async fn status(&self, dir: &Path, filepath: &str) -> Result<FileStatus, VcsError> {
        let request = StatusRequest {
            dir: PathBuf::from(dir),
            filepath: filepath.to_string(),
        };
        self.engine.status(self.fs.clone(), request).await
    }
}
