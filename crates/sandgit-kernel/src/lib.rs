//! sandgit-kernel: git over sandboxed device storage.
//!
//! This crate provides:
//!
//! - **vfs**: the [`StoragePlugin`](vfs::StoragePlugin) boundary, memory and
//!   local backends, and the [`Shim`](vfs::Shim) that presents storage as a
//!   git engine's [`Filesystem`](vfs::Filesystem)
//! - **vcs**: the [`Vcs`](vcs::Vcs) façade and a libgit2 engine
//! - **clipboard**: copy/cut/paste of storage entries
//! - **encoding**: base64 helpers shared by the shim and plugins
//! - **config**: settings loading

pub mod clipboard;
pub mod config;
pub mod encoding;
pub mod paths;
pub mod vcs;
pub mod vfs;

pub use clipboard::{Clipboard, ClipboardAction, PasteError, PasteReport};
pub use config::{ConfigError, DEFAULT_CORS_PROXY, load_settings, parse_settings};
pub use vcs::{Vcs, VcsEngine, VcsError};
pub use vfs::{Filesystem, MemoryStorage, Shim, StoragePlugin};
