//! Local disk storage plugin.
//!
//! Presents a directory on a real filesystem the way device storage looks
//! to sandgit: base64 content out, sandboxed paths in.

use super::traits::{StoragePlugin, StoredData};
use crate::encoding::{base64_to_bytes, bytes_to_base64};
use async_trait::async_trait;
use sandgit_types::{EntryKind, NativeStat};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs;

/// Local filesystem storage.
///
/// All operations are relative to `root`. For example, if `root` is
/// `/home/amy/projects`, then `read_file("app/.git/HEAD")` reads
/// `/home/amy/projects/app/.git/HEAD`.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
    read_only: bool,
}

fn millis(time: io::Result<SystemTime>) -> Option<u64> {
    time.ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_millis() as u64)
}

impl LocalStorage {
    /// Create storage rooted at the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            read_only: false,
        }
    }

    /// Create read-only storage.
    pub fn read_only(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            read_only: true,
        }
    }

    /// Get the root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a storage path to a path under the root.
    ///
    /// `.` and `..` are resolved lexically; a path climbing above the root
    /// is rejected. Links on disk are not followed.
    fn resolve(&self, path: &Path) -> io::Result<PathBuf> {
        let mut relative = PathBuf::new();
        for component in path.components() {
            match component {
                Component::ParentDir => {
                    if !relative.pop() {
                        return Err(io::Error::new(
                            io::ErrorKind::PermissionDenied,
                            format!("path escapes root: {}", path.display()),
                        ));
                    }
                }
                Component::Normal(c) => relative.push(c),
                Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
            }
        }
        Ok(self.root.join(relative))
    }

    /// Check if write operations are allowed.
    fn check_writable(&self) -> io::Result<()> {
        if self.read_only {
            Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "storage is read-only",
            ))
        } else {
            Ok(())
        }
    }

    async fn ensure_parent(path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Copy a directory tree breadth-first.
    async fn copy_tree(from: &Path, to: &Path) -> io::Result<()> {
        let mut pending = vec![(from.to_path_buf(), to.to_path_buf())];
        while let Some((src, dst)) = pending.pop() {
            fs::create_dir_all(&dst).await?;
            let mut dir = fs::read_dir(&src).await?;
            while let Some(entry) = dir.next_entry().await? {
                let target = dst.join(entry.file_name());
                if entry.file_type().await?.is_dir() {
                    pending.push((entry.path(), target));
                } else {
                    fs::copy(entry.path(), &target).await?;
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl StoragePlugin for LocalStorage {
    async fn read_file(&self, path: &Path) -> io::Result<String> {
        let full_path = self.resolve(path)?;
        let data = fs::read(&full_path).await?;
        Ok(bytes_to_base64(&data))
    }

    async fn write_file(&self, path: &Path, data: StoredData) -> io::Result<()> {
        self.check_writable()?;
        let full_path = self.resolve(path)?;
        let bytes = match data {
            StoredData::Base64(encoded) => base64_to_bytes(&encoded)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?,
            StoredData::Utf8(text) => text.into_bytes(),
        };

        Self::ensure_parent(&full_path).await?;
        fs::write(&full_path, bytes).await
    }

    async fn mkdir(&self, path: &Path) -> io::Result<()> {
        self.check_writable()?;
        let full_path = self.resolve(path)?;
        fs::create_dir_all(&full_path).await
    }

    async fn rmdir(&self, path: &Path) -> io::Result<()> {
        self.check_writable()?;
        let full_path = self.resolve(path)?;
        if full_path == self.root {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "cannot remove storage root",
            ));
        }
        fs::remove_dir(&full_path).await
    }

    async fn unlink(&self, path: &Path) -> io::Result<()> {
        self.check_writable()?;
        let full_path = self.resolve(path)?;
        fs::remove_file(&full_path).await
    }

    async fn readdir(&self, path: &Path) -> io::Result<Vec<String>> {
        let full_path = self.resolve(path)?;
        let mut names = Vec::new();
        let mut dir = fs::read_dir(&full_path).await?;

        while let Some(entry) = dir.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }

        names.sort();
        Ok(names)
    }

    async fn stat(&self, path: &Path) -> io::Result<NativeStat> {
        let full_path = self.resolve(path)?;
        let meta = fs::symlink_metadata(&full_path).await?;
        let file_type = meta.file_type();

        let kind = if file_type.is_symlink() {
            EntryKind::Symlink
        } else if file_type.is_dir() {
            EntryKind::Directory
        } else {
            // Sockets, pipes and devices count as files
            EntryKind::File
        };

        Ok(NativeStat {
            kind,
            size: if kind == EntryKind::Directory { 0 } else { meta.len() },
            mtime_ms: millis(meta.modified()).unwrap_or(0),
            ctime_ms: millis(meta.created()),
        })
    }

    async fn copy(&self, from: &Path, to: &Path) -> io::Result<()> {
        self.check_writable()?;
        let from_path = self.resolve(from)?;
        let to_path = self.resolve(to)?;

        if fs::try_exists(&to_path).await? {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("destination exists: {}", to.display()),
            ));
        }

        let meta = fs::metadata(&from_path).await?;
        if meta.is_dir() && to_path.starts_with(&from_path) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("cannot copy {} into itself", from.display()),
            ));
        }
        Self::ensure_parent(&to_path).await?;
        if meta.is_dir() {
            Self::copy_tree(&from_path, &to_path).await
        } else {
            fs::copy(&from_path, &to_path).await.map(|_| ())
        }
    }

    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        self.check_writable()?;
        let from_path = self.resolve(from)?;
        let to_path = self.resolve(to)?;

        Self::ensure_parent(&to_path).await?;
        fs::rename(&from_path, &to_path).await
    }

    fn real_path(&self, path: &Path) -> Option<PathBuf> {
        self.resolve(path).ok()
    }
}
