//! [`VcsEngine`] on libgit2.
//!
//! libgit2 works on real directories, so this engine only serves
//! filesystems whose [`Filesystem::real_path`] answers. Every operation
//! runs on the blocking pool.

use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{
    AutotagOption, Commit, Cred, CredentialType, ErrorCode, FetchOptions, RemoteCallbacks,
    Repository, Signature, Sort, Status,
};
use sandgit_types::AuthRecord;
use tracing::debug;

use super::engine::{
    AuthFailureAction, Author, CloneRequest, CommitInfo, CommitRequest, EngineHooks,
    FetchRequest, FetchResult, FileStatus, InitRequest, LogRequest, ProgressEvent, Remote,
    StatusRequest, VcsEngine, VcsError,
};
use crate::vfs::Filesystem;

/// libgit2-backed engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct Git2Engine;

impl Git2Engine {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl VcsEngine for Git2Engine {
    async fn init(&self, fs: Arc<dyn Filesystem>, request: InitRequest) -> Result<(), VcsError> {
        let path = repo_dir(fs.as_ref(), &request.dir)?;
        blocking(move || {
            Repository::init(&path)?;
            debug!(path = %path.display(), "initialized repository");
            Ok(())
        })
        .await
    }

    async fn clone_repo(
        &self,
        fs: Arc<dyn Filesystem>,
        request: CloneRequest,
        hooks: Arc<dyn EngineHooks>,
    ) -> Result<(), VcsError> {
        let path = repo_dir(fs.as_ref(), &request.dir)?;
        blocking(move || clone_blocking(&path, &request, hooks.as_ref())).await
    }

    async fn commit(
        &self,
        fs: Arc<dyn Filesystem>,
        request: CommitRequest,
        _hooks: Arc<dyn EngineHooks>,
    ) -> Result<String, VcsError> {
        // libgit2 commits are unsigned, so on_sign is never asked.
        let path = repo_dir(fs.as_ref(), &request.dir)?;
        blocking(move || commit_blocking(&path, &request)).await
    }

    async fn list_remotes(
        &self,
        fs: Arc<dyn Filesystem>,
        dir: PathBuf,
    ) -> Result<Vec<Remote>, VcsError> {
        let path = repo_dir(fs.as_ref(), &dir)?;
        blocking(move || {
            let repo = Repository::open(&path)?;
            let names = repo.remotes()?;
            let mut remotes = Vec::with_capacity(names.len());
            for name in names.iter().flatten() {
                let remote = repo.find_remote(name)?;
                remotes.push(Remote {
                    remote: name.to_string(),
                    url: remote.url().unwrap_or_default().to_string(),
                });
            }
            Ok(remotes)
        })
        .await
    }

    async fn log(
        &self,
        fs: Arc<dyn Filesystem>,
        request: LogRequest,
    ) -> Result<Vec<CommitInfo>, VcsError> {
        let path = repo_dir(fs.as_ref(), &request.dir)?;
        blocking(move || log_blocking(&path, &request)).await
    }

    async fn fetch(
        &self,
        fs: Arc<dyn Filesystem>,
        request: FetchRequest,
        hooks: Arc<dyn EngineHooks>,
    ) -> Result<FetchResult, VcsError> {
        let path = repo_dir(fs.as_ref(), &request.dir)?;
        blocking(move || fetch_blocking(&path, &request, hooks.as_ref())).await
    }

    async fn status(
        &self,
        fs: Arc<dyn Filesystem>,
        request: StatusRequest,
    ) -> Result<FileStatus, VcsError> {
        let path = repo_dir(fs.as_ref(), &request.dir)?;
        blocking(move || {
            let repo = Repository::open(&path)?;
            match repo.status_file(Path::new(&request.filepath)) {
                Ok(status) => Ok(file_status(status)),
                Err(e) if e.code() == ErrorCode::NotFound => Ok(FileStatus::Absent),
                Err(e) => Err(e.into()),
            }
        })
        .await
    }
}

fn repo_dir(fs: &dyn Filesystem, dir: &Path) -> Result<PathBuf, VcsError> {
    fs.real_path(dir).ok_or_else(|| {
        VcsError::Unsupported(format!(
            "{} has no on-disk path; libgit2 needs local storage",
            dir.display()
        ))
    })
}

async fn blocking<T, F>(op: F) -> Result<T, VcsError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, VcsError> + Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| VcsError::Engine(format!("git task failed: {e}")))?
}

// ============================================================================
// Remote plumbing
// ============================================================================

/// Credential bookkeeping for one remote operation.
#[derive(Default)]
struct AuthState {
    asked: Cell<u32>,
    last_allowed: Cell<Option<CredentialType>>,
    cancelled: Cell<bool>,
}

/// Answers one libgit2 credential request. SSH walks through several
/// credential types (username, then key); only a repeat request for the
/// type we just answered means the server rejected it.
fn request_credentials(
    url: &str,
    username_from_url: Option<&str>,
    allowed: CredentialType,
    hooks: &dyn EngineHooks,
    state: &AuthState,
) -> Result<Cred, git2::Error> {
    if state.last_allowed.get() == Some(allowed) {
        match hooks.on_auth_failure(url) {
            AuthFailureAction::Cancel => {
                state.cancelled.set(true);
                return Err(git2::Error::from_str("authentication cancelled"));
            }
        }
    }
    state.last_allowed.set(Some(allowed));
    state.asked.set(state.asked.get() + 1);
    credentials_for(hooks.on_auth(url), username_from_url, allowed)
}

fn remote_callbacks<'a>(
    url: &'a str,
    hooks: &'a dyn EngineHooks,
    state: &'a AuthState,
) -> RemoteCallbacks<'a> {
    let mut callbacks = RemoteCallbacks::new();

    callbacks.credentials(move |_url, username_from_url, allowed| {
        request_credentials(url, username_from_url, allowed, hooks, state)
    });

    let mut last: Option<(&'static str, u64)> = None;
    callbacks.transfer_progress(move |stats| {
        let (phase, loaded, total) = if stats.received_objects() < stats.total_objects() {
            ("Receiving objects", stats.received_objects(), stats.total_objects())
        } else {
            ("Resolving deltas", stats.indexed_deltas(), stats.total_deltas())
        };
        let (loaded, total) = (loaded as u64, total as u64);
        let pct = if total > 0 { loaded * 100 / total } else { loaded };
        if last != Some((phase, pct)) {
            last = Some((phase, pct));
            hooks.on_progress(&ProgressEvent {
                phase: phase.to_string(),
                loaded,
                total: (total > 0).then_some(total),
            });
        }
        true
    });

    callbacks.sideband_progress(move |data| {
        let text = String::from_utf8_lossy(data);
        let text = text.trim();
        if !text.is_empty() {
            hooks.on_message(text);
        }
        true
    });

    callbacks
}

fn credentials_for(
    auth: Option<AuthRecord>,
    username_from_url: Option<&str>,
    allowed: CredentialType,
) -> Result<Cred, git2::Error> {
    if allowed.contains(CredentialType::USER_PASS_PLAINTEXT)
        && let Some(auth) = &auth
    {
        let user = auth.login().or(username_from_url).unwrap_or("git");
        return Cred::userpass_plaintext(user, auth.secret().unwrap_or_default());
    }
    if allowed.contains(CredentialType::USERNAME) {
        let user = auth.as_ref().and_then(AuthRecord::login);
        return Cred::username(user.or(username_from_url).unwrap_or("git"));
    }
    if allowed.contains(CredentialType::SSH_KEY)
        && let Some(user) = username_from_url
    {
        return Cred::ssh_key_from_agent(user);
    }
    if allowed.contains(CredentialType::DEFAULT) {
        return Cred::default();
    }
    Err(git2::Error::from_str("no stored credentials for this remote"))
}

fn finish<T>(
    result: Result<T, git2::Error>,
    url: &str,
    hooks: &dyn EngineHooks,
    state: &AuthState,
) -> Result<T, VcsError> {
    match result {
        Ok(value) => {
            if state.asked.get() > 0 {
                hooks.on_auth_success(url);
            }
            Ok(value)
        }
        Err(_) if state.cancelled.get() => Err(VcsError::Cancelled(format!(
            "credentials for {url} were rejected"
        ))),
        Err(e) => Err(e.into()),
    }
}

fn branch_refspec(branch: &str) -> String {
    let branch = branch.trim_start_matches("refs/heads/");
    format!("+refs/heads/{branch}:refs/remotes/origin/{branch}")
}

fn depth_arg(depth: u32) -> i32 {
    i32::try_from(depth).unwrap_or(i32::MAX)
}

fn note_unsupported(since: Option<&str>, exclude: &[String], cors_proxy: Option<&str>) {
    if let Some(since) = since {
        debug!(since, "libgit2 cannot deepen by date; ignoring");
    }
    if !exclude.is_empty() {
        debug!(?exclude, "libgit2 cannot exclude refs from history; ignoring");
    }
    if let Some(proxy) = cors_proxy {
        debug!(proxy, "cors proxy only applies to browser transports; ignoring");
    }
}

// ============================================================================
// Operations
// ============================================================================

fn clone_blocking(
    path: &Path,
    request: &CloneRequest,
    hooks: &dyn EngineHooks,
) -> Result<(), VcsError> {
    note_unsupported(
        request.since.as_deref(),
        &request.exclude,
        request.cors_proxy.as_deref(),
    );

    let state = AuthState::default();
    let mut fetch = FetchOptions::new();
    fetch.remote_callbacks(remote_callbacks(&request.url, hooks, &state));
    if let Some(depth) = request.depth {
        fetch.depth(depth_arg(depth));
    }
    if request.no_tags {
        fetch.download_tags(AutotagOption::None);
    }

    let mut builder = RepoBuilder::new();
    builder.fetch_options(fetch);
    if let Some(branch) = request.reference.as_deref() {
        builder.branch(branch);
        if request.single_branch {
            let refspec = branch_refspec(branch);
            builder.remote_create(move |repo, name, url| {
                repo.remote_with_fetch(name, url, &refspec)
            });
        }
    } else if request.single_branch {
        debug!("single branch needs a ref; cloning all branches");
    }
    if request.no_checkout {
        let mut checkout = CheckoutBuilder::new();
        checkout.dry_run();
        builder.with_checkout(checkout);
    }

    let result = builder.clone(&request.url, path).map(drop);
    finish(result, &request.url, hooks, &state)?;
    debug!(url = %request.url, path = %path.display(), "cloned");
    Ok(())
}

fn signature(repo: &Repository, author: &Author) -> Result<Signature<'static>, git2::Error> {
    if let (Some(name), Some(email)) = (&author.name, &author.email) {
        return Signature::now(name, email);
    }
    let fallback = repo.signature()?;
    Signature::now(
        author.name.as_deref().or(fallback.name()).unwrap_or_default(),
        author.email.as_deref().or(fallback.email()).unwrap_or_default(),
    )
}

fn commit_blocking(path: &Path, request: &CommitRequest) -> Result<String, VcsError> {
    let repo = Repository::open(path)?;
    let mut index = repo.index()?;
    let tree_oid = index.write_tree()?;
    let tree = repo.find_tree(tree_oid)?;
    let sig = signature(&repo, &request.author)?;

    let parent = match repo.head() {
        Ok(head) => Some(head.peel_to_commit()?),
        Err(_) => None,
    };
    let parents: Vec<&Commit> = parent.iter().collect();
    let oid = repo.commit(Some("HEAD"), &sig, &sig, &request.message, &tree, &parents)?;

    Ok(oid.to_string())
}

/// Unix seconds for an RFC 3339 timestamp or a `YYYY-MM-DD` date.
fn parse_since(raw: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp())
}

fn log_blocking(path: &Path, request: &LogRequest) -> Result<Vec<CommitInfo>, VcsError> {
    let repo = Repository::open(path)?;
    let start = repo.revparse_single(&request.reference)?.peel_to_commit()?;
    let since = request.since.as_deref().and_then(|raw| {
        let parsed = parse_since(raw);
        if parsed.is_none() {
            debug!(since = raw, "unparsable date; ignoring");
        }
        parsed
    });
    let limit = request.depth.map_or(usize::MAX, |d| d as usize);

    let mut revwalk = repo.revwalk()?;
    revwalk.set_sorting(Sort::TIME)?;
    revwalk.push(start.id())?;

    let mut entries = Vec::new();
    for oid in revwalk {
        if entries.len() >= limit {
            break;
        }
        let commit = match oid.and_then(|oid| repo.find_commit(oid)) {
            Ok(commit) => commit,
            // Missing objects end a shallow history.
            Err(e) if request.force => {
                debug!(error = %e, "history truncated");
                break;
            }
            Err(e) => return Err(e.into()),
        };
        if since.is_some_and(|s| commit.time().seconds() < s) {
            break;
        }
        let author = commit.author();
        entries.push(CommitInfo {
            oid: commit.id().to_string(),
            message: commit.message().unwrap_or("").to_string(),
            author: author.name().unwrap_or("").to_string(),
            email: author.email().unwrap_or("").to_string(),
            time: commit.time().seconds(),
        });
    }

    Ok(entries)
}

fn fetch_refspecs(request: &FetchRequest) -> Vec<String> {
    let branch = request.remote_ref.as_deref().or(if request.single_branch {
        request.reference.as_deref()
    } else {
        None
    });
    match branch {
        Some(branch) => vec![branch_refspec(branch)],
        None => vec!["+refs/heads/*:refs/remotes/origin/*".to_string()],
    }
}

fn fetch_blocking(
    path: &Path,
    request: &FetchRequest,
    hooks: &dyn EngineHooks,
) -> Result<FetchResult, VcsError> {
    note_unsupported(
        request.since.as_deref(),
        &request.exclude,
        request.cors_proxy.as_deref(),
    );

    let repo = Repository::open(path)?;
    let mut remote = if request.url.is_empty() {
        repo.find_remote("origin")?
    } else {
        repo.remote_anonymous(&request.url)?
    };
    let url = remote.url().unwrap_or_default().to_string();
    let refspecs = fetch_refspecs(request);

    let state = AuthState::default();
    let mut options = FetchOptions::new();
    options.remote_callbacks(remote_callbacks(&url, hooks, &state));
    if let Some(depth) = request.depth {
        options.depth(depth_arg(depth));
    }

    let result = remote.fetch(&refspecs, Some(&mut options), None);
    finish(result, &url, hooks, &state)?;

    let default_branch = remote
        .default_branch()
        .ok()
        .and_then(|b| b.as_str().map(str::to_string));
    let fetch_head = repo
        .revparse_single("FETCH_HEAD")
        .ok()
        .map(|o| o.id().to_string());
    debug!(%url, ?default_branch, ?fetch_head, "fetched");

    Ok(FetchResult {
        default_branch,
        fetch_head,
    })
}

fn file_status(status: Status) -> FileStatus {
    if status.is_ignored() {
        FileStatus::Ignored
    } else if status.is_index_new() {
        if status.is_wt_modified() {
            FileStatus::AddedUnstaged
        } else {
            FileStatus::Added
        }
    } else if status.is_wt_new() {
        if status.is_index_deleted() {
            FileStatus::Undeleted
        } else {
            FileStatus::AddedUnstaged
        }
    } else if status.is_index_deleted() {
        FileStatus::Deleted
    } else if status.is_wt_deleted() {
        FileStatus::DeletedUnstaged
    } else if status.is_index_modified() {
        if status.is_wt_modified() {
            FileStatus::ModifiedUnstaged
        } else {
            FileStatus::Modified
        }
    } else if status.is_wt_modified() {
        FileStatus::ModifiedUnstaged
    } else {
        FileStatus::Unmodified
    }
}
