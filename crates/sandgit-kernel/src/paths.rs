//! Storage path helpers.
//!
//! Storage paths are relative and `/`-separated; a leading `/` is ignored.
//! Comparisons here are lexical.

use std::path::{Component, Path, PathBuf};

/// Lexically normalize a storage path: drop the root, `.` and resolve `..`.
pub fn normalize(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                result.pop();
            }
            Component::Normal(s) => result.push(s),
            Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
        }
    }
    result
}

/// True when both paths name the same entry.
pub fn path_equals(a: &Path, b: &Path) -> bool {
    normalize(a) == normalize(b)
}

/// True when `path` is `ancestor` or lies somewhere below it.
pub fn is_within(path: &Path, ancestor: &Path) -> bool {
    normalize(path).starts_with(normalize(ancestor))
}

/// Final component of `path`, or an empty string for the root.
pub fn basename(path: &Path) -> String {
    normalize(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(feature = "native")]
mod dirs {
    use std::path::PathBuf;

    use directories::BaseDirs;

    /// Get the config directory.
    ///
    /// Uses `$XDG_CONFIG_HOME/sandgit` or falls back to `~/.config/sandgit`.
    pub fn config_dir() -> PathBuf {
        BaseDirs::new()
            .map(|d| d.config_dir().to_path_buf())
            .unwrap_or_else(|| home_fallback().join(".config"))
            .join("sandgit")
    }

    /// Default settings file.
    pub fn config_file() -> PathBuf {
        config_dir().join("config.toml")
    }

    /// Fallback home directory when BaseDirs fails.
    fn home_fallback() -> PathBuf {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

#[cfg(feature = "native")]
pub use dirs::{config_dir, config_file};

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::same("a/b", "a/b", true)]
    #[case::leading_slash("/a/b", "a/b", true)]
    #[case::dot("a/./b", "a/b", true)]
    #[case::parent("a/c/../b", "a/b", true)]
    #[case::different("a/b", "a/c", false)]
    fn equality(#[case] a: &str, #[case] b: &str, #[case] expected: bool) {
        assert_eq!(path_equals(Path::new(a), Path::new(b)), expected);
    }

    #[rstest]
    #[case::itself("projects/app", "projects/app", true)]
    #[case::child("projects/app/src", "projects/app", true)]
    #[case::sibling_prefix("projects/app2", "projects/app", false)]
    #[case::parent("projects", "projects/app", false)]
    #[case::anything_in_root("projects", "", true)]
    fn containment(#[case] path: &str, #[case] ancestor: &str, #[case] expected: bool) {
        assert_eq!(is_within(Path::new(path), Path::new(ancestor)), expected);
    }

    #[test]
    fn basename_of_root_is_empty() {
        assert_eq!(basename(Path::new("/")), "");
        assert_eq!(basename(Path::new("a/b.txt")), "b.txt");
    }

    #[cfg(feature = "native")]
    #[test]
    fn config_paths_are_under_sandgit() {
        assert!(config_dir().ends_with("sandgit"));
        assert!(config_file().starts_with(config_dir()));
    }
}
