//! The filesystem shim: a git engine's file API over a storage plugin.
//!
//! Read-side failures of any kind become [`NotFound`], since engines only
//! branch on whether an entry exists. Write failures are logged and become
//! [`WriteFailed`]. Directory operations pass through untouched.
//!
//! Device storage has no symbolic links. `symlink` writes an ordinary file
//! holding the link data, `read_link` reads it back raw, and `lstat` is
//! `stat`.

use super::traits::{
    Encoding, FileContent, FileData, Filesystem, ReadOptions, StoragePlugin, StoredData,
};
use crate::encoding::{base64_to_bytes, bytes_to_base64, raw_text};
use async_trait::async_trait;
use sandgit_types::{NotFound, StatRecord, WriteFailed};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error};

/// Engine-facing [`Filesystem`] backed by a [`StoragePlugin`].
#[derive(Clone)]
pub struct Shim {
    storage: Arc<dyn StoragePlugin>,
}

impl std::fmt::Debug for Shim {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shim").finish_non_exhaustive()
    }
}

impl Shim {
    pub fn new(storage: impl StoragePlugin + 'static) -> Self {
        Self {
            storage: Arc::new(storage),
        }
    }

    pub fn from_arc(storage: Arc<dyn StoragePlugin>) -> Self {
        Self { storage }
    }

    /// The storage plugin underneath.
    pub fn storage(&self) -> &Arc<dyn StoragePlugin> {
        &self.storage
    }
}

#[async_trait]
impl Filesystem for Shim {
    async fn read_file(&self, path: &Path, options: ReadOptions) -> Result<FileContent, NotFound> {
        debug!(path = %path.display(), encoding = ?options.encoding, "read_file");
        let stored = match self.storage.read_file(path).await {
            Ok(stored) => stored,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "read_file failed");
                return Err(NotFound::new(path));
            }
        };

        match options.encoding {
            Encoding::Utf8 => Ok(FileContent::Text(raw_text(&stored))),
            Encoding::Binary => base64_to_bytes(&stored)
                .map(FileContent::Bytes)
                .map_err(|e| {
                    debug!(path = %path.display(), error = %e, "stored content is not base64");
                    NotFound::new(path)
                }),
        }
    }

    async fn write_file(&self, path: &Path, data: FileData) -> Result<(), WriteFailed> {
        let stored = match data {
            FileData::Bytes(bytes) | FileData::Blob { bytes, .. } => {
                StoredData::Base64(bytes_to_base64(&bytes))
            }
            FileData::Text(text) => StoredData::Utf8(text),
        };
        debug!(path = %path.display(), "write_file");

        self.storage.write_file(path, stored).await.map_err(|e| {
            error!(path = %path.display(), error = %e, "write_file failed");
            WriteFailed
        })
    }

    async fn mkdir(&self, path: &Path) -> io::Result<()> {
        debug!(path = %path.display(), "mkdir");
        self.storage.mkdir(path).await
    }

    async fn rmdir(&self, path: &Path) -> io::Result<()> {
        debug!(path = %path.display(), "rmdir");
        self.storage.rmdir(path).await
    }

    async fn unlink(&self, path: &Path) -> io::Result<()> {
        debug!(path = %path.display(), "unlink");
        self.storage.unlink(path).await
    }

    async fn readdir(&self, path: &Path) -> io::Result<Vec<String>> {
        debug!(path = %path.display(), "readdir");
        self.storage.readdir(path).await
    }

    async fn stat(&self, path: &Path) -> Result<StatRecord, NotFound> {
        debug!(path = %path.display(), "stat");
        self.storage
            .stat(path)
            .await
            .map(StatRecord::from)
            .map_err(|_| NotFound::new(path))
    }

    fn real_path(&self, path: &Path) -> Option<PathBuf> {
        self.storage.real_path(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::MemoryStorage;
    use rstest::rstest;
    use sandgit_types::{EntryKind, NativeStat};

    fn shim() -> Shim {
        Shim::new(MemoryStorage::new())
    }

    /// Storage that rejects every call, the way a plugin does when the
    /// sandbox refuses access.
    struct Refusing;

    #[async_trait]
    impl StoragePlugin for Refusing {
        async fn read_file(&self, _: &Path) -> io::Result<String> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
        }
        async fn write_file(&self, _: &Path, _: StoredData) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
        }
        async fn mkdir(&self, _: &Path) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
        }
        async fn rmdir(&self, _: &Path) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
        }
        async fn unlink(&self, _: &Path) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
        }
        async fn readdir(&self, _: &Path) -> io::Result<Vec<String>> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
        }
        async fn stat(&self, _: &Path) -> io::Result<NativeStat> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
        }
        async fn copy(&self, _: &Path, _: &Path) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
        }
        async fn rename(&self, _: &Path, _: &Path) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
        }
    }

    /// Storage that hands back plain text instead of base64.
    struct PlainText(&'static str);

    #[async_trait]
    impl StoragePlugin for PlainText {
        async fn read_file(&self, _: &Path) -> io::Result<String> {
            Ok(self.0.to_string())
        }
        async fn write_file(&self, _: &Path, _: StoredData) -> io::Result<()> {
            Ok(())
        }
        async fn mkdir(&self, _: &Path) -> io::Result<()> {
            Ok(())
        }
        async fn rmdir(&self, _: &Path) -> io::Result<()> {
            Ok(())
        }
        async fn unlink(&self, _: &Path) -> io::Result<()> {
            Ok(())
        }
        async fn readdir(&self, _: &Path) -> io::Result<Vec<String>> {
            Ok(Vec::new())
        }
        async fn stat(&self, _: &Path) -> io::Result<NativeStat> {
            Ok(NativeStat::file(self.0.len() as u64, 1))
        }
        async fn copy(&self, _: &Path, _: &Path) -> io::Result<()> {
            Ok(())
        }
        async fn rename(&self, _: &Path, _: &Path) -> io::Result<()> {
            Ok(())
        }
    }

    #[rstest]
    #[case::top_level("missing")]
    #[case::nested("repo/.git/refs/heads/main")]
    #[tokio::test]
    async fn missing_entries_are_not_found(#[case] path: &str) {
        let fs = shim();
        let path = Path::new(path);

        let err = fs.stat(path).await.unwrap_err();
        assert_eq!(err.code(), "ENOENT");
        assert_eq!(fs.read_file(path, ReadOptions::default()).await, Err(NotFound::new(path)));
        assert_eq!(fs.read_file(path, ReadOptions::utf8()).await, Err(NotFound::new(path)));
        assert_eq!(fs.lstat(path).await, Err(NotFound::new(path)));
        assert!(!fs.exists(path).await);
    }

    #[tokio::test]
    async fn any_native_failure_collapses_to_not_found() {
        let fs = Shim::new(Refusing);
        let path = Path::new("x");
        assert_eq!(fs.stat(path).await, Err(NotFound::new(path)));
        assert_eq!(fs.read_file(path, ReadOptions::utf8()).await, Err(NotFound::new(path)));
    }

    #[tokio::test]
    async fn write_failure_is_unclassified() {
        let fs = Shim::new(Refusing);
        assert_eq!(fs.write_file(Path::new("x"), "data".into()).await, Err(WriteFailed));
    }

    #[tokio::test]
    async fn directory_errors_pass_through() {
        let fs = Shim::new(Refusing);
        let err = fs.mkdir(Path::new("d")).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
        let err = fs.readdir(Path::new("d")).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }

    #[tokio::test]
    async fn text_read_decodes_base64_storage() {
        let fs = shim();
        fs.write_file(Path::new("HEAD"), "ref: refs/heads/main\n".into()).await.unwrap();

        let content = fs.read_file(Path::new("HEAD"), ReadOptions::utf8()).await.unwrap();
        assert_eq!(content, FileContent::Text("ref: refs/heads/main\n".into()));
    }

    #[tokio::test]
    async fn text_read_passes_plain_storage_through() {
        let fs = Shim::new(PlainText("hello world"));
        let content = fs.read_file(Path::new("a"), ReadOptions::utf8()).await.unwrap();
        assert_eq!(content, FileContent::Text("hello world".into()));

        // Plain text is not base64, so a binary read has nothing to decode
        assert!(fs.read_file(Path::new("a"), ReadOptions::default()).await.is_err());
    }

    #[tokio::test]
    async fn binary_round_trip() {
        let fs = shim();
        let bytes = vec![0u8, 159, 146, 150, 255];
        fs.write_file(Path::new("objects/ab/cdef"), bytes.clone().into()).await.unwrap();

        let content = fs.read_file(Path::new("objects/ab/cdef"), ReadOptions::default()).await.unwrap();
        assert_eq!(content, FileContent::Bytes(bytes));
    }

    #[tokio::test]
    async fn blob_written_as_bytes() {
        let fs = shim();
        let data = FileData::Blob {
            content_type: "application/octet-stream".into(),
            bytes: vec![1, 2, 3],
        };
        fs.write_file(Path::new("pack"), data).await.unwrap();

        let content = fs.read_file(Path::new("pack"), ReadOptions::default()).await.unwrap();
        assert_eq!(content.as_bytes(), &[1, 2, 3]);
    }

    #[tokio::test]
    async fn empty_file_round_trips() {
        let fs = shim();
        fs.write_file(Path::new("empty"), Vec::<u8>::new().into()).await.unwrap();
        let content = fs.read_file(Path::new("empty"), ReadOptions::default()).await.unwrap();
        assert_eq!(content, FileContent::Bytes(Vec::new()));
    }

    #[tokio::test]
    async fn stat_normalizes_metadata() {
        let fs = shim();
        fs.write_file(Path::new("repo/file.txt"), "12345".into()).await.unwrap();

        let file = fs.stat(Path::new("repo/file.txt")).await.unwrap();
        assert!(file.is_file());
        assert_eq!(file.size, 5);
        assert_eq!(file.mode, StatRecord::MODE);

        let dir = fs.stat(Path::new("repo")).await.unwrap();
        assert!(dir.is_directory());
        assert_eq!(dir.kind, EntryKind::Directory);
    }

    #[tokio::test]
    async fn stat_without_ctime_uses_mtime() {
        let fs = Shim::new(PlainText("abc"));
        let record = fs.stat(Path::new("a")).await.unwrap();
        assert_eq!(record.ctime_ms, record.mtime_ms);
    }

    #[rstest]
    #[case::file("repo/file.txt")]
    #[case::dir("repo")]
    #[case::missing("repo/nope")]
    #[tokio::test]
    async fn lstat_matches_stat(#[case] path: &str) {
        let fs = shim();
        fs.write_file(Path::new("repo/file.txt"), "x".into()).await.unwrap();
        let path = Path::new(path);
        assert_eq!(fs.lstat(path).await, fs.stat(path).await);
    }

    #[tokio::test]
    async fn symlink_is_emulated_as_a_file() {
        let fs = shim();
        fs.symlink(Path::new("link"), "../target".into()).await.unwrap();

        let text = fs.read_file(Path::new("link"), ReadOptions::utf8()).await.unwrap();
        assert_eq!(text, FileContent::Text("../target".into()));

        let raw = fs.read_link(Path::new("link")).await.unwrap();
        assert_eq!(raw, FileContent::Bytes(b"../target".to_vec()));

        assert!(fs.lstat(Path::new("link")).await.unwrap().is_file());
    }

    #[tokio::test]
    async fn symlink_bytes_read_back_unchanged() {
        let fs = shim();
        let data = vec![7u8, 0, 7];
        fs.symlink(Path::new("bin-link"), data.clone().into()).await.unwrap();
        let content = fs.read_file(Path::new("bin-link"), ReadOptions::default()).await.unwrap();
        assert_eq!(content.into_bytes(), data);
    }

    #[tokio::test]
    async fn directory_pass_through() {
        let fs = shim();
        fs.mkdir(Path::new("repo/.git/objects")).await.unwrap();
        fs.write_file(Path::new("repo/.git/HEAD"), "ref".into()).await.unwrap();

        assert_eq!(fs.readdir(Path::new("repo/.git")).await.unwrap(), vec!["HEAD", "objects"]);

        fs.unlink(Path::new("repo/.git/HEAD")).await.unwrap();
        fs.rmdir(Path::new("repo/.git/objects")).await.unwrap();
        assert!(fs.readdir(Path::new("repo/.git")).await.unwrap().is_empty());
    }

    #[test]
    fn memory_storage_has_no_real_path() {
        assert_eq!(shim().real_path(Path::new("repo")), None);
    }
}
