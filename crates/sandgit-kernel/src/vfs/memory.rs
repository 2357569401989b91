//! In-memory storage plugin.
//!
//! Stands in for device storage in tests and on hosts without a disk.
//! All data is ephemeral.

use super::traits::{StoragePlugin, StoredData};
use crate::encoding::{base64_to_bytes, bytes_to_base64};
use crate::paths::normalize;
use async_trait::async_trait;
use sandgit_types::NativeStat;
use std::collections::{HashMap, hash_map};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;

/// Entry in memory storage.
#[derive(Debug, Clone)]
enum Entry {
    File {
        data: Vec<u8>,
        created: u64,
        modified: u64,
    },
    Directory {
        created: u64,
        modified: u64,
    },
}

impl Entry {
    fn directory() -> Self {
        let now = now_ms();
        Entry::Directory {
            created: now,
            modified: now,
        }
    }

    fn stat(&self) -> NativeStat {
        match self {
            Entry::File {
                data,
                created,
                modified,
            } => NativeStat::file(data.len() as u64, *modified).with_ctime(*created),
            Entry::Directory { created, modified } => {
                NativeStat::directory(*modified).with_ctime(*created)
            }
        }
    }

    /// Same entry with fresh timestamps, for copies.
    fn fresh_copy(&self) -> Self {
        let now = now_ms();
        match self {
            Entry::File { data, .. } => Entry::File {
                data: data.clone(),
                created: now,
                modified: now,
            },
            Entry::Directory { .. } => Entry::directory(),
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("not found: {}", path.display()),
    )
}

/// In-memory storage.
///
/// Thread-safe via internal `RwLock`. All data is lost when dropped.
#[derive(Debug)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<PathBuf, Entry>>,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    /// Create empty storage holding only the root directory.
    pub fn new() -> Self {
        let mut entries = HashMap::new();
        entries.insert(PathBuf::new(), Entry::directory());
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Insert missing parent directories of `path`.
    ///
    /// Fails if a parent exists as a file.
    fn ensure_parents(entries: &mut HashMap<PathBuf, Entry>, path: &Path) -> io::Result<()> {
        let mut current = PathBuf::new();
        for component in path.parent().into_iter().flat_map(|p| p.components()) {
            if let Component::Normal(s) = component {
                current.push(s);
                match entries.get(&current) {
                    Some(Entry::Directory { .. }) => {}
                    Some(Entry::File { .. }) => {
                        return Err(io::Error::new(
                            io::ErrorKind::NotADirectory,
                            format!("not a directory: {}", current.display()),
                        ));
                    }
                    None => {
                        entries.insert(current.clone(), Entry::directory());
                    }
                }
            }
        }
        Ok(())
    }

    fn has_children(entries: &HashMap<PathBuf, Entry>, dir: &Path) -> bool {
        entries
            .keys()
            .any(|k| k.parent() == Some(dir) && k.as_path() != dir)
    }

    /// Entries strictly below `dir`, with paths relative to it.
    fn subtree(entries: &HashMap<PathBuf, Entry>, dir: &Path) -> Vec<(PathBuf, Entry)> {
        entries
            .iter()
            .filter(|(k, _)| k.as_path() != dir)
            .filter_map(|(k, v)| {
                k.strip_prefix(dir)
                    .ok()
                    .map(|rel| (rel.to_path_buf(), v.clone()))
            })
            .collect()
    }

    /// Reject `to` lying inside `from` (moving or copying a tree into itself).
    fn check_not_inside(from: &Path, to: &Path) -> io::Result<()> {
        if to.starts_with(from) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "cannot place {} inside itself at {}",
                    from.display(),
                    to.display()
                ),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl StoragePlugin for MemoryStorage {
    async fn read_file(&self, path: &Path) -> io::Result<String> {
        let normalized = normalize(path);
        let entries = self.entries.read().await;

        match entries.get(&normalized) {
            Some(Entry::File { data, .. }) => Ok(bytes_to_base64(data)),
            Some(Entry::Directory { .. }) => Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("is a directory: {}", path.display()),
            )),
            None => Err(not_found(path)),
        }
    }

    async fn write_file(&self, path: &Path, data: StoredData) -> io::Result<()> {
        let normalized = normalize(path);
        let bytes = match data {
            StoredData::Base64(encoded) => base64_to_bytes(&encoded)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?,
            StoredData::Utf8(text) => text.into_bytes(),
        };

        let mut entries = self.entries.write().await;
        Self::ensure_parents(&mut entries, &normalized)?;

        let now = now_ms();
        match entries.entry(normalized) {
            hash_map::Entry::Occupied(mut slot) => match slot.get_mut() {
                Entry::Directory { .. } => Err(io::Error::new(
                    io::ErrorKind::IsADirectory,
                    format!("is a directory: {}", path.display()),
                )),
                Entry::File { data, modified, .. } => {
                    *data = bytes;
                    *modified = now;
                    Ok(())
                }
            },
            hash_map::Entry::Vacant(slot) => {
                slot.insert(Entry::File {
                    data: bytes,
                    created: now,
                    modified: now,
                });
                Ok(())
            }
        }
    }

    async fn mkdir(&self, path: &Path) -> io::Result<()> {
        let normalized = normalize(path);
        let mut entries = self.entries.write().await;
        Self::ensure_parents(&mut entries, &normalized)?;

        match entries.get(&normalized) {
            Some(Entry::Directory { .. }) => Ok(()),
            Some(Entry::File { .. }) => Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("file exists: {}", path.display()),
            )),
            None => {
                entries.insert(normalized, Entry::directory());
                Ok(())
            }
        }
    }

    async fn rmdir(&self, path: &Path) -> io::Result<()> {
        let normalized = normalize(path);
        if normalized.as_os_str().is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "cannot remove root directory",
            ));
        }

        let mut entries = self.entries.write().await;
        match entries.get(&normalized) {
            Some(Entry::Directory { .. }) => {}
            Some(Entry::File { .. }) => {
                return Err(io::Error::new(
                    io::ErrorKind::NotADirectory,
                    format!("not a directory: {}", path.display()),
                ));
            }
            None => return Err(not_found(path)),
        }
        if Self::has_children(&entries, &normalized) {
            return Err(io::Error::new(
                io::ErrorKind::DirectoryNotEmpty,
                format!("directory not empty: {}", path.display()),
            ));
        }
        entries.remove(&normalized);
        Ok(())
    }

    async fn unlink(&self, path: &Path) -> io::Result<()> {
        let normalized = normalize(path);
        let mut entries = self.entries.write().await;
        match entries.get(&normalized) {
            Some(Entry::File { .. }) => {
                entries.remove(&normalized);
                Ok(())
            }
            Some(Entry::Directory { .. }) => Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("is a directory: {}", path.display()),
            )),
            None => Err(not_found(path)),
        }
    }

    async fn readdir(&self, path: &Path) -> io::Result<Vec<String>> {
        let normalized = normalize(path);
        let entries = self.entries.read().await;

        match entries.get(&normalized) {
            Some(Entry::Directory { .. }) => {}
            Some(Entry::File { .. }) => {
                return Err(io::Error::new(
                    io::ErrorKind::NotADirectory,
                    format!("not a directory: {}", path.display()),
                ));
            }
            None => return Err(not_found(path)),
        }

        let mut names: Vec<String> = entries
            .keys()
            .filter(|k| k.parent() == Some(normalized.as_path()) && **k != normalized)
            .filter_map(|k| k.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect();
        names.sort();
        Ok(names)
    }

    async fn stat(&self, path: &Path) -> io::Result<NativeStat> {
        let normalized = normalize(path);
        let entries = self.entries.read().await;
        entries
            .get(&normalized)
            .map(Entry::stat)
            .ok_or_else(|| not_found(path))
    }

    async fn copy(&self, from: &Path, to: &Path) -> io::Result<()> {
        let from_normalized = normalize(from);
        let to_normalized = normalize(to);

        let mut entries = self.entries.write().await;
        let entry = entries
            .get(&from_normalized)
            .cloned()
            .ok_or_else(|| not_found(from))?;
        if entries.contains_key(&to_normalized) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("destination exists: {}", to.display()),
            ));
        }

        if matches!(entry, Entry::Directory { .. }) {
            Self::check_not_inside(&from_normalized, &to_normalized)?;
        }
        Self::ensure_parents(&mut entries, &to_normalized)?;

        let children = Self::subtree(&entries, &from_normalized);
        entries.insert(to_normalized.clone(), entry.fresh_copy());
        for (relative, child) in children {
            entries.insert(to_normalized.join(relative), child.fresh_copy());
        }
        Ok(())
    }

    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        let from_normalized = normalize(from);
        let to_normalized = normalize(to);

        if from_normalized.as_os_str().is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "cannot rename root directory",
            ));
        }

        let mut entries = self.entries.write().await;
        let entry = entries
            .get(&from_normalized)
            .cloned()
            .ok_or_else(|| not_found(from))?;
        if from_normalized == to_normalized {
            return Ok(());
        }

        // Check we're not overwriting a directory with a file or vice versa
        match (&entry, entries.get(&to_normalized)) {
            (Entry::File { .. }, Some(Entry::Directory { .. })) => {
                return Err(io::Error::new(
                    io::ErrorKind::IsADirectory,
                    format!("destination is a directory: {}", to.display()),
                ));
            }
            (Entry::Directory { .. }, Some(Entry::File { .. })) => {
                return Err(io::Error::new(
                    io::ErrorKind::NotADirectory,
                    format!("destination is not a directory: {}", to.display()),
                ));
            }
            (Entry::Directory { .. }, Some(Entry::Directory { .. }))
                if Self::has_children(&entries, &to_normalized) =>
            {
                return Err(io::Error::new(
                    io::ErrorKind::DirectoryNotEmpty,
                    format!("directory not empty: {}", to.display()),
                ));
            }
            _ => {}
        }

        if matches!(entry, Entry::Directory { .. }) {
            Self::check_not_inside(&from_normalized, &to_normalized)?;
        }
        Self::ensure_parents(&mut entries, &to_normalized)?;

        // Directories carry their whole subtree along
        let children = Self::subtree(&entries, &from_normalized);
        for (relative, _) in &children {
            entries.remove(&from_normalized.join(relative));
        }
        for (relative, child) in children {
            entries.insert(to_normalized.join(relative), child);
        }
        entries.remove(&from_normalized);
        entries.insert(to_normalized, entry);
        Ok(())
    }
}
