//! Settings loading.
//!
//! Settings live in a TOML file:
//!
//! ```toml
//! [git."github.com"]
//! name = "Amy"
//! email = "amy@example.com"
//! token = "ghp_..."
//!
//! [git."*"]
//! name = "Amy"
//! email = "amy@example.com"
//!
//! [clone_git]
//! single_branch = true
//! depth = "1"
//! exclude = "gh-pages, wip"
//! ```

use std::io;
use std::path::{Path, PathBuf};

use sandgit_types::Settings;

/// Proxy used for remotes that lack CORS headers.
pub const DEFAULT_CORS_PROXY: &str = "https://cors.isomorphic-git.org";

/// Errors loading settings.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Parse settings from TOML text.
pub fn parse_settings(raw: &str, origin: &Path) -> Result<Settings, ConfigError> {
    toml::from_str(raw).map_err(|source| ConfigError::Parse {
        path: origin.to_path_buf(),
        source,
    })
}

/// Load settings from `path`. A missing file yields default settings.
pub fn load_settings(path: &Path) -> Result<Settings, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(raw) => parse_settings(&raw, path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no settings file, using defaults");
            Ok(Settings::default())
        }
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Load settings from the default location.
#[cfg(feature = "native")]
pub fn load_default_settings() -> Result<Settings, ConfigError> {
    load_settings(&crate::paths::config_file())
}
