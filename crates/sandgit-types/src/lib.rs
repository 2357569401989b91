//! sandgit-types: pure data types shared across sandgit crates.
//!
//! This crate holds the shapes that cross crate boundaries:
//!
//! - **Stat**: `EntryKind`, the plugin-side `NativeStat`, and the
//!   engine-facing `StatRecord`
//! - **Errors**: the coarse `NotFound` / `WriteFailed` pair the shim surfaces
//! - **Settings**: per-host `AuthRecord`s and `CloneSettings`

pub mod error;
pub mod settings;
pub mod stat;

pub use error::{NotFound, WriteFailed};
pub use settings::{AuthRecord, CloneSettings, Settings, WILDCARD_HOST};
pub use stat::{EntryKind, NativeStat, StatRecord};
