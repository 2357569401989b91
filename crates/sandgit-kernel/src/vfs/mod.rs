//! Storage layer for sandgit.
//!
//! Device storage is reached through a [`StoragePlugin`]; git engines see a
//! [`Filesystem`]. The [`Shim`] sits between the two:
//!
//! ```text
//! git engine ──Filesystem──▶ Shim ──StoragePlugin──▶ MemoryStorage
//!                                                 └▶ LocalStorage (native)
//! ```

#[cfg(feature = "native")]
mod local;
mod memory;
mod shim;
mod traits;

#[cfg(feature = "native")]
pub use local::LocalStorage;
pub use memory::MemoryStorage;
pub use shim::Shim;
pub use traits::{
    Encoding, FileContent, FileData, Filesystem, ReadOptions, StoragePlugin, StoredData,
};
