//! Core storage traits and types.
//!
//! Two seams meet here:
//!
//! - [`StoragePlugin`] is what the device offers: base64-in/base64-out file
//!   calls with no structured error codes.
//! - [`Filesystem`] is what a git engine expects: a POSIX-flavored async
//!   file API with `stat`, `lstat`, `readlink` and `symlink`.
//!
//! [`Shim`](super::Shim) turns the first into the second.

use async_trait::async_trait;
use sandgit_types::{NativeStat, NotFound, StatRecord, WriteFailed};
use std::io;
use std::path::{Path, PathBuf};

/// Content handed to a storage plugin for writing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredData {
    /// Binary content, base64 encoded.
    Base64(String),
    /// Text content, stored as is.
    Utf8(String),
}

/// Native device storage.
///
/// Paths are relative to the storage root. `read_file` returns base64 for
/// every entry on plugins that store bytes; plain-text plugins may return
/// text unencoded, which is why readers go through
/// [`raw_text`](crate::encoding::raw_text).
#[async_trait]
pub trait StoragePlugin: Send + Sync {
    /// Read a file's content.
    async fn read_file(&self, path: &Path) -> io::Result<String>;

    /// Write a file, creating parent directories as needed.
    async fn write_file(&self, path: &Path, data: StoredData) -> io::Result<()>;

    /// Create a directory and any missing parents.
    async fn mkdir(&self, path: &Path) -> io::Result<()>;

    /// Remove an empty directory.
    async fn rmdir(&self, path: &Path) -> io::Result<()>;

    /// Remove a file.
    async fn unlink(&self, path: &Path) -> io::Result<()>;

    /// Names of the entries in a directory, sorted.
    async fn readdir(&self, path: &Path) -> io::Result<Vec<String>>;

    async fn stat(&self, path: &Path) -> io::Result<NativeStat>;

    /// Copy a file or a whole directory tree.
    async fn copy(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Move a file or a whole directory tree.
    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Real on-disk path for a storage path.
    ///
    /// `None` for virtual backends. Engines built on libraries that need
    /// real paths (libgit2) check this.
    fn real_path(&self, path: &Path) -> Option<PathBuf> {
        let _ = path;
        None
    }
}

/// Which shape `read_file` should return.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Encoding {
    /// Raw bytes.
    #[default]
    Binary,
    /// Decoded text.
    Utf8,
}

/// Options for [`Filesystem::read_file`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadOptions {
    pub encoding: Encoding,
}

impl ReadOptions {
    pub fn utf8() -> Self {
        Self {
            encoding: Encoding::Utf8,
        }
    }
}

/// Result of a read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContent {
    Bytes(Vec<u8>),
    Text(String),
}

impl FileContent {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Bytes(b) => b,
            Self::Text(t) => t.as_bytes(),
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Bytes(b) => b,
            Self::Text(t) => t.into_bytes(),
        }
    }
}

/// Payload for a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileData {
    Bytes(Vec<u8>),
    Text(String),
    /// Typed binary payload. The content type is not persisted.
    Blob { content_type: String, bytes: Vec<u8> },
}

impl From<Vec<u8>> for FileData {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<&[u8]> for FileData {
    fn from(bytes: &[u8]) -> Self {
        Self::Bytes(bytes.to_vec())
    }
}

impl From<String> for FileData {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for FileData {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// The file API a git engine is written against.
///
/// Missing-vs-present is the only distinction made on the read side:
/// `read_file`, `stat`, `lstat` and `read_link` fail with [`NotFound`] for
/// any storage failure. Directory operations pass storage errors through.
#[async_trait]
pub trait Filesystem: Send + Sync {
    async fn read_file(&self, path: &Path, options: ReadOptions) -> Result<FileContent, NotFound>;

    async fn write_file(&self, path: &Path, data: FileData) -> Result<(), WriteFailed>;

    async fn mkdir(&self, path: &Path) -> io::Result<()>;

    async fn rmdir(&self, path: &Path) -> io::Result<()>;

    async fn unlink(&self, path: &Path) -> io::Result<()>;

    async fn readdir(&self, path: &Path) -> io::Result<Vec<String>>;

    async fn stat(&self, path: &Path) -> Result<StatRecord, NotFound>;

    /// Metadata without following links.
    ///
    /// Default: same as `stat`, for storage without real links.
    async fn lstat(&self, path: &Path) -> Result<StatRecord, NotFound> {
        self.stat(path).await
    }

    /// Read a link's target.
    ///
    /// Default: the raw bytes of the entry, since links are stored as
    /// ordinary files.
    async fn read_link(&self, path: &Path) -> Result<FileContent, NotFound> {
        self.read_file(path, ReadOptions::default()).await
    }

    /// Create a link at `path` whose content is `data`.
    ///
    /// Default: an ordinary write.
    async fn symlink(&self, path: &Path, data: FileData) -> Result<(), WriteFailed> {
        self.write_file(path, data).await
    }

    /// Check if a path exists.
    async fn exists(&self, path: &Path) -> bool {
        self.stat(path).await.is_ok()
    }

    /// Real on-disk path, when the storage underneath has one.
    fn real_path(&self, path: &Path) -> Option<PathBuf> {
        let _ = path;
        None
    }
}
