//! The shim and the paste action over real disk storage.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use sandgit_kernel::clipboard::Clipboard;
use sandgit_kernel::vfs::{
    FileContent, FileData, Filesystem, LocalStorage, ReadOptions, Shim, StoragePlugin,
};

fn setup() -> (tempfile::TempDir, Arc<LocalStorage>, Shim) {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(LocalStorage::new(dir.path()));
    let shim = Shim::from_arc(storage.clone());
    (dir, storage, shim)
}

#[tokio::test]
async fn binary_bytes_land_on_disk_verbatim() {
    let (dir, _, shim) = setup();
    let bytes: Vec<u8> = (0..=255).collect();

    shim.write_file(Path::new("objects/blob"), bytes.clone().into())
        .await
        .unwrap();

    assert_eq!(std::fs::read(dir.path().join("objects/blob")).unwrap(), bytes);
    let read = shim
        .read_file(Path::new("objects/blob"), ReadOptions::default())
        .await
        .unwrap();
    assert_eq!(read, FileContent::Bytes(bytes));
}

#[tokio::test]
async fn text_round_trips_as_text() {
    let (_dir, _, shim) = setup();

    shim.write_file(Path::new("README.md"), "# hello\n".into())
        .await
        .unwrap();

    let read = shim
        .read_file(Path::new("README.md"), ReadOptions::utf8())
        .await
        .unwrap();
    assert_eq!(read, FileContent::Text("# hello\n".into()));
}

#[tokio::test]
async fn missing_entries_are_enoent() {
    let (_dir, _, shim) = setup();

    let err = shim
        .read_file(Path::new("nope.txt"), ReadOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "ENOENT");
    assert_eq!(err.to_string(), "ENOENT: nope.txt");

    assert!(shim.stat(Path::new("nope.txt")).await.is_err());
    assert!(!shim.exists(Path::new("nope.txt")).await);
}

#[tokio::test]
async fn escapes_are_refused_and_reported_as_write_failures() {
    let (_dir, _, shim) = setup();

    assert!(shim
        .write_file(Path::new("../outside.txt"), FileData::from("x"))
        .await
        .is_err());
    assert!(shim.real_path(Path::new("../outside")).is_none());
}

#[tokio::test]
async fn stat_reports_files_and_directories() {
    let (_dir, _, shim) = setup();
    shim.write_file(Path::new("src/main.rs"), "fn main() {}".into())
        .await
        .unwrap();

    let file = shim.stat(Path::new("src/main.rs")).await.unwrap();
    assert!(file.is_file());
    assert_eq!(file.size, 12);

    let dir = shim.lstat(Path::new("src")).await.unwrap();
    assert!(dir.is_directory());
    assert!(!dir.is_symbolic_link());
}

#[tokio::test]
async fn paste_copies_trees_between_directories() {
    let (dir, storage, shim) = setup();
    shim.write_file(Path::new("app/src/lib.rs"), "pub fn f() {}".into())
        .await
        .unwrap();
    shim.write_file(Path::new("backup/app/keep"), "".into())
        .await
        .unwrap();

    let mut clipboard = Clipboard::new();
    clipboard.copy([PathBuf::from("app")]);
    let report = clipboard
        .paste(storage.as_ref(), Path::new("backup"))
        .await
        .unwrap();

    assert_eq!(report.pasted, vec![PathBuf::from("backup/app copy")]);
    assert_eq!(
        std::fs::read_to_string(dir.path().join("backup/app copy/src/lib.rs")).unwrap(),
        "pub fn f() {}"
    );
    assert_eq!(
        storage.readdir(Path::new("backup")).await.unwrap(),
        vec!["app", "app copy"]
    );
}
