//! Version control over the [`Filesystem`](crate::vfs::Filesystem) seam.
//!
//! [`Vcs`] is what callers use. It wires an engine to the user's settings
//! and notifications. Engines implement [`VcsEngine`]; the only one shipped
//! is [`Git2Engine`] on libgit2 (feature `native`).

mod engine;
mod facade;
#[cfg(feature = "native")]
mod git2_engine;
mod hooks;

pub use engine::{
    AuthFailureAction, Author, CloneRequest, CommitInfo, CommitRequest, EngineHooks,
    FetchRequest, FetchResult, FileStatus, InitRequest, LogRequest, ProgressEvent, Remote,
    StatusRequest, VcsEngine, VcsError,
};
pub use facade::Vcs;
#[cfg(feature = "native")]
pub use git2_engine::Git2Engine;
pub use hooks::{CredentialResolver, Notifier, NotifyingHooks, TracingNotifier, host_of};
