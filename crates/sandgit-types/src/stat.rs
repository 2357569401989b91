//! Entry metadata, as reported by storage and as handed to the git engine.

use serde::{Deserialize, Serialize};

/// Kind of storage entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
}

/// Metadata as a storage plugin reports it.
///
/// Timestamps are milliseconds since the Unix epoch. Plugins that cannot
/// report a creation time leave `ctime_ms` empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeStat {
    pub kind: EntryKind,
    pub size: u64,
    pub mtime_ms: u64,
    pub ctime_ms: Option<u64>,
}

impl NativeStat {
    pub fn file(size: u64, mtime_ms: u64) -> Self {
        Self {
            kind: EntryKind::File,
            size,
            mtime_ms,
            ctime_ms: None,
        }
    }

    pub fn directory(mtime_ms: u64) -> Self {
        Self {
            kind: EntryKind::Directory,
            size: 0,
            mtime_ms,
            ctime_ms: None,
        }
    }

    pub fn with_ctime(mut self, ctime_ms: u64) -> Self {
        self.ctime_ms = Some(ctime_ms);
        self
    }
}

/// Normalized stat snapshot in the shape a POSIX-minded git engine expects.
///
/// The identity fields (`mode`, `ino`, `dev`, `uid`, `gid`) carry fixed
/// placeholder values. Sandboxed storage has no inodes or owners; the engine
/// only needs the fields to be present and stable across calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatRecord {
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub size: u64,
    pub mtime_ms: u64,
    pub ctime_ms: u64,
    pub mode: u32,
    pub ino: u64,
    pub dev: u64,
    pub uid: u32,
    pub gid: u32,
}

impl StatRecord {
    pub const MODE: u32 = 16822;
    pub const INO: u64 = 2_814_749_767_351_612;
    pub const DEV: u64 = 1_761_345_728;
    pub const UID: u32 = 1;
    pub const GID: u32 = 1;

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    pub fn is_directory(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    pub fn is_symbolic_link(&self) -> bool {
        self.kind == EntryKind::Symlink
    }
}

impl From<NativeStat> for StatRecord {
    fn from(native: NativeStat) -> Self {
        Self {
            kind: native.kind,
            size: native.size,
            mtime_ms: native.mtime_ms,
            ctime_ms: native.ctime_ms.unwrap_or(native.mtime_ms),
            mode: Self::MODE,
            ino: Self::INO,
            dev: Self::DEV,
            uid: Self::UID,
            gid: Self::GID,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ctime_falls_back_to_mtime() {
        let record = StatRecord::from(NativeStat::file(12, 1_700_000_000_000));
        assert_eq!(record.ctime_ms, 1_700_000_000_000);
        assert_eq!(record.mtime_ms, record.ctime_ms);
    }

    #[test]
    fn ctime_kept_when_reported() {
        let record = StatRecord::from(NativeStat::file(12, 2_000).with_ctime(1_000));
        assert_eq!(record.ctime_ms, 1_000);
        assert_eq!(record.mtime_ms, 2_000);
    }

    #[test]
    fn placeholder_identity_fields() {
        let record = StatRecord::from(NativeStat::directory(5));
        assert_eq!(record.mode, 16822);
        assert_eq!(record.ino, 2814749767351612);
        assert_eq!(record.dev, 1761345728);
        assert_eq!((record.uid, record.gid), (1, 1));
    }

    #[test]
    fn kind_predicates() {
        let dir = StatRecord::from(NativeStat::directory(0));
        assert!(dir.is_directory());
        assert!(!dir.is_file());
        assert!(!dir.is_symbolic_link());

        let mut native = NativeStat::file(0, 0);
        native.kind = EntryKind::Symlink;
        let link = StatRecord::from(native);
        assert!(link.is_symbolic_link());
        assert!(!link.is_file());
    }
}
