//! File-manager clipboard: copy or cut entries, then paste them into a
//! directory.
//!
//! Copies never overwrite: a colliding name gets a `" copy"`, `" copy 2"`,
//! `" copy 3"`, … suffix. A directory is never pasted into itself or any
//! of its descendants; such entries are skipped with a warning.

use std::io;
use std::path::{Path, PathBuf};

use futures::future::join_all;
use sandgit_types::EntryKind;
use tracing::{debug, warn};

use crate::paths::{basename, is_within, normalize};
use crate::vfs::StoragePlugin;

/// What a paste does with the clipboard entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClipboardAction {
    #[default]
    Copy,
    Cut,
}

/// Errors from [`Clipboard::paste`].
#[derive(Debug, thiserror::Error)]
pub enum PasteError {
    #[error("Can only paste in one folder: {} is not a directory", .0.display())]
    NotADirectory(PathBuf),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Outcome of a paste.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PasteReport {
    /// Destination of every entry that was copied or moved.
    pub pasted: Vec<PathBuf>,
    /// Entries refused because the target lies inside them.
    pub skipped: Vec<PathBuf>,
    /// Sources that no longer exist after a cut.
    pub removed: Vec<PathBuf>,
}

enum ItemOutcome {
    Pasted { from: PathBuf, to: PathBuf },
    Skipped(PathBuf),
}

/// Pending clipboard entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Clipboard {
    pub action: ClipboardAction,
    pub objects: Vec<PathBuf>,
}

impl Clipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the clipboard with entries to copy.
    pub fn copy(&mut self, objects: impl IntoIterator<Item = PathBuf>) {
        self.action = ClipboardAction::Copy;
        self.objects = objects.into_iter().collect();
    }

    /// Replace the clipboard with entries to move.
    pub fn cut(&mut self, objects: impl IntoIterator<Item = PathBuf>) {
        self.action = ClipboardAction::Cut;
        self.objects = objects.into_iter().collect();
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn reset(&mut self) {
        self.action = ClipboardAction::default();
        self.objects.clear();
    }

    /// Whether `item` may be pasted into `target`.
    pub fn allow_paste(target: &Path, item: &Path) -> bool {
        !is_within(target, item)
    }

    /// Paste every entry into the directory `target`.
    ///
    /// Entries are pasted concurrently; the call returns once all of them
    /// have finished. On success the clipboard is emptied. If any entry
    /// fails, the first error is returned and the clipboard is kept.
    pub async fn paste(
        &mut self,
        storage: &dyn StoragePlugin,
        target: &Path,
    ) -> Result<PasteReport, PasteError> {
        let target = normalize(target);
        if storage.stat(&target).await?.kind != EntryKind::Directory {
            return Err(PasteError::NotADirectory(target));
        }

        let action = self.action;
        let results = join_all(
            self.objects
                .iter()
                .map(|item| paste_one(storage, action, item, &target)),
        )
        .await;

        let mut report = PasteReport::default();
        for result in results {
            match result? {
                ItemOutcome::Pasted { from, to } => {
                    if action == ClipboardAction::Cut {
                        report.removed.push(from);
                    }
                    report.pasted.push(to);
                }
                ItemOutcome::Skipped(item) => report.skipped.push(item),
            }
        }

        self.reset();
        Ok(report)
    }
}

async fn paste_one(
    storage: &dyn StoragePlugin,
    action: ClipboardAction,
    item: &Path,
    target: &Path,
) -> io::Result<ItemOutcome> {
    if !Clipboard::allow_paste(target, item) {
        warn!(
            "Cannot copy parent directory to its own subdirectory \"{}\" -> \"{}\"",
            item.display(),
            target.display()
        );
        return Ok(ItemOutcome::Skipped(item.to_path_buf()));
    }

    let name = basename(item);
    let name = match action {
        ClipboardAction::Copy => resolve_name(storage, target, &name).await?,
        ClipboardAction::Cut => name,
    };
    let to = target.join(name);

    debug!(from = %item.display(), to = %to.display(), ?action, "paste");
    match action {
        ClipboardAction::Copy => storage.copy(item, &to).await?,
        ClipboardAction::Cut => storage.rename(item, &to).await?,
    }

    Ok(ItemOutcome::Pasted {
        from: item.to_path_buf(),
        to,
    })
}

/// First name in `dir` not already taken, starting from `name` and then
/// trying `"<name> copy"`, `"<name> copy 2"`, `"<name> copy 3"`, …
pub async fn resolve_name(
    storage: &dyn StoragePlugin,
    dir: &Path,
    name: &str,
) -> io::Result<String> {
    let names = storage.readdir(dir).await?;
    Ok(next_free_name(&names, name))
}

fn next_free_name(taken: &[String], name: &str) -> String {
    let is_taken = |candidate: &str| taken.iter().any(|n| n == candidate);
    if !is_taken(name) {
        return name.to_string();
    }

    let mut index = 1u32;
    loop {
        let candidate = if index == 1 {
            format!("{name} copy")
        } else {
            format!("{name} copy {index}")
        };
        if !is_taken(&candidate) {
            return candidate;
        }
        index += 1;
    }
}
