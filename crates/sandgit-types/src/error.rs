//! The shim's two error shapes.
//!
//! Native storage plugins reject failed calls without a structured error
//! code, so read-side failures all collapse into [`NotFound`] and write-side
//! failures into a payload-free [`WriteFailed`]. Callers branch on
//! found-vs-missing and nothing finer.

use std::path::{Path, PathBuf};

/// Error class code carried by [`NotFound`].
pub const ENOENT: &str = "ENOENT";

/// An entry could not be read or stat'ed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", render(.path.as_deref()))]
pub struct NotFound {
    pub path: Option<PathBuf>,
}

impl NotFound {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: Some(path.as_ref().to_path_buf()),
        }
    }

    /// `NotFound` with no path attached.
    pub fn bare() -> Self {
        Self { path: None }
    }

    /// Short class name, for callers that match on error codes.
    pub fn code(&self) -> &'static str {
        ENOENT
    }
}

fn render(path: Option<&Path>) -> String {
    match path {
        Some(p) if !p.as_os_str().is_empty() => format!("{ENOENT}: {}", p.display()),
        _ => ENOENT.to_string(),
    }
}

/// A write was rejected by storage. Details go to the log, not the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("write failed")]
pub struct WriteFailed;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_is_prefixed_with_code() {
        let err = NotFound::new("repo/.git/HEAD");
        assert_eq!(err.to_string(), "ENOENT: repo/.git/HEAD");
        assert_eq!(err.code(), "ENOENT");
    }

    #[test]
    fn bare_message_is_just_the_code() {
        assert_eq!(NotFound::bare().to_string(), "ENOENT");
        assert_eq!(NotFound::new("").to_string(), "ENOENT");
    }
}
