//! The git engine boundary.
//!
//! A [`VcsEngine`] performs git operations against whatever [`Filesystem`]
//! it is handed, and calls back into [`EngineHooks`] for progress,
//! credentials and auth outcomes.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use sandgit_types::{AuthRecord, NotFound, WriteFailed};

use crate::vfs::Filesystem;

/// Errors from git operations.
#[derive(Debug, thiserror::Error)]
pub enum VcsError {
    #[error(transparent)]
    NotFound(#[from] NotFound),
    #[error(transparent)]
    Write(#[from] WriteFailed),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("unsupported: {0}")]
    Unsupported(String),
    #[error("cancelled: {0}")]
    Cancelled(String),
    #[error("{0}")]
    Engine(String),
    #[cfg(feature = "native")]
    #[error("git2: {0}")]
    Git2(#[from] git2::Error),
}

/// Transfer progress reported by an engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub phase: String,
    pub loaded: u64,
    pub total: Option<u64>,
}

impl fmt::Display for ProgressEvent {
    /// `"<phase> (<pct>%)"` when the total is known, else `"<phase> (<loaded>)"`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.total {
            Some(total) if total > 0 => {
                let pct = (self.loaded as f64 / total as f64 * 100.0).round() as u64;
                write!(f, "{} ({}%)", self.phase, pct)
            }
            _ => write!(f, "{} ({})", self.phase, self.loaded),
        }
    }
}

/// What the engine should do after rejected credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailureAction {
    /// Abort the operation.
    Cancel,
}

/// Callbacks an engine invokes while it works.
///
/// Sync on purpose: libgit2 calls back from inside blocking code.
pub trait EngineHooks: Send + Sync {
    fn on_progress(&self, event: &ProgressEvent);

    /// Free-form text from the remote.
    fn on_message(&self, message: &str);

    /// The remote asked for credentials.
    fn on_auth(&self, url: &str) -> Option<AuthRecord>;

    /// The remote rejected the credentials from `on_auth`.
    fn on_auth_failure(&self, url: &str) -> AuthFailureAction;

    fn on_auth_success(&self, url: &str);

    /// Credentials for signing a commit.
    fn on_sign(&self, url: &str) -> Option<AuthRecord> {
        self.on_auth(url)
    }
}

/// Commit author. Missing fields fall back to the repository's config.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Author {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitRequest {
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloneRequest {
    pub dir: PathBuf,
    pub url: String,
    pub reference: Option<String>,
    pub cors_proxy: Option<String>,
    pub single_branch: bool,
    pub no_checkout: bool,
    pub no_tags: bool,
    pub depth: Option<u32>,
    pub since: Option<String>,
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRequest {
    pub dir: PathBuf,
    pub message: String,
    pub author: Author,
    /// Remote URL the author was resolved from, passed to `on_sign`.
    pub remote_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRequest {
    pub dir: PathBuf,
    pub reference: String,
    pub depth: Option<u32>,
    pub since: Option<String>,
    pub force: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchRequest {
    pub dir: PathBuf,
    pub url: String,
    pub reference: Option<String>,
    pub remote_ref: Option<String>,
    pub cors_proxy: Option<String>,
    pub single_branch: bool,
    pub depth: Option<u32>,
    pub since: Option<String>,
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRequest {
    pub dir: PathBuf,
    pub filepath: String,
}

/// A configured remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remote {
    pub remote: String,
    pub url: String,
}

/// A commit as returned by `log`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    pub oid: String,
    pub message: String,
    pub author: String,
    pub email: String,
    /// Unix seconds.
    pub time: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchResult {
    pub default_branch: Option<String>,
    pub fetch_head: Option<String>,
}

/// Working-tree status of one file, in isomorphic-git's vocabulary.
///
/// A leading `*` means the change is not staged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Unmodified,
    ModifiedUnstaged,
    Modified,
    AddedUnstaged,
    Added,
    DeletedUnstaged,
    Deleted,
    Undeleted,
    Absent,
    Ignored,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unmodified => "unmodified",
            Self::ModifiedUnstaged => "*modified",
            Self::Modified => "modified",
            Self::AddedUnstaged => "*added",
            Self::Added => "added",
            Self::DeletedUnstaged => "*deleted",
            Self::Deleted => "deleted",
            Self::Undeleted => "*undeleted",
            Self::Absent => "absent",
            Self::Ignored => "ignored",
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A storage-agnostic git engine.
#[async_trait]
pub trait VcsEngine: Send + Sync {
    async fn init(&self, fs: Arc<dyn Filesystem>, request: InitRequest) -> Result<(), VcsError>;

    async fn clone_repo(
        &self,
        fs: Arc<dyn Filesystem>,
        request: CloneRequest,
        hooks: Arc<dyn EngineHooks>,
    ) -> Result<(), VcsError>;

    /// Commit the index. Returns the new commit id.
    async fn commit(
        &self,
        fs: Arc<dyn Filesystem>,
        request: CommitRequest,
        hooks: Arc<dyn EngineHooks>,
    ) -> Result<String, VcsError>;

    async fn list_remotes(
        &self,
        fs: Arc<dyn Filesystem>,
        dir: PathBuf,
    ) -> Result<Vec<Remote>, VcsError>;

    async fn log(
        &self,
        fs: Arc<dyn Filesystem>,
        request: LogRequest,
    ) -> Result<Vec<CommitInfo>, VcsError>;

    async fn fetch(
        &self,
        fs: Arc<dyn Filesystem>,
        request: FetchRequest,
        hooks: Arc<dyn EngineHooks>,
    ) -> Result<FetchResult, VcsError>;

    async fn status(
        &self,
        fs: Arc<dyn Filesystem>,
        request: StatusRequest,
    ) -> Result<FileStatus, VcsError>;
}
