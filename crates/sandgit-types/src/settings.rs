//! User settings: per-host credentials and clone/fetch preferences.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Host key whose record applies when a host has no record of its own.
pub const WILDCARD_HOST: &str = "*";

/// Credentials and identity for one git host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthRecord {
    /// Author name used for commits.
    pub name: String,
    /// Author email used for commits.
    pub email: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Personal access token. Engines send it as the password when no
    /// password is set.
    pub token: Option<String>,
}

impl AuthRecord {
    /// Username to present to the remote, if any.
    pub fn login(&self) -> Option<&str> {
        self.username.as_deref().filter(|u| !u.is_empty())
    }

    /// Secret to present to the remote: the password, or the token.
    pub fn secret(&self) -> Option<&str> {
        self.password
            .as_deref()
            .filter(|p| !p.is_empty())
            .or_else(|| self.token.as_deref().filter(|t| !t.is_empty()))
    }
}

/// Clone/fetch/log preferences.
///
/// Values are stored the way the settings UI writes them: `depth` is free
/// text and `exclude` is one comma-separated string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloneSettings {
    pub single_branch: bool,
    pub no_checkout: bool,
    pub no_tags: bool,
    pub depth: String,
    pub since: String,
    pub exclude: String,
}

impl CloneSettings {
    /// Shallow depth, when `depth` holds a positive number.
    pub fn depth(&self) -> Option<u32> {
        self.depth.trim().parse::<u32>().ok().filter(|d| *d > 0)
    }

    /// Shallow-since date, when set.
    pub fn since(&self) -> Option<&str> {
        let since = self.since.trim();
        (!since.is_empty()).then_some(since)
    }

    /// Excluded refs, split on commas. Whitespace after a comma is
    /// dropped, and so are empty items.
    pub fn exclude_list(&self) -> Vec<String> {
        let mut collapsed = String::with_capacity(self.exclude.len());
        let mut after_comma = false;
        for c in self.exclude.chars() {
            if after_comma && c.is_whitespace() {
                continue;
            }
            after_comma = c == ',';
            collapsed.push(c);
        }
        collapsed
            .split(',')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// The settings store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Credentials keyed by hostname, with [`WILDCARD_HOST`] as the fallback.
    pub git: HashMap<String, AuthRecord>,
    pub clone_git: CloneSettings,
}

impl Settings {
    /// The key to use for `host`: the host itself when it has a record,
    /// otherwise the wildcard.
    pub fn provider_key<'a>(&self, host: &'a str) -> &'a str {
        if self.git.contains_key(host) {
            host
        } else {
            WILDCARD_HOST
        }
    }

    /// Record for `host`, falling back to the wildcard record.
    pub fn auth_for_host(&self, host: &str) -> Option<&AuthRecord> {
        self.git.get(self.provider_key(host))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::empty("", None)]
    #[case::number("3", Some(3))]
    #[case::padded(" 10 ", Some(10))]
    #[case::zero("0", None)]
    #[case::text("full", None)]
    fn depth_parsing(#[case] raw: &str, #[case] expected: Option<u32>) {
        let settings = CloneSettings {
            depth: raw.into(),
            ..Default::default()
        };
        assert_eq!(settings.depth(), expected);
    }

    #[rstest]
    #[case::empty("", &[])]
    #[case::single("main", &["main"])]
    #[case::spaced("main, dev,  feature", &["main", "dev", "feature"])]
    #[case::holes("a,,b,", &["a", "b"])]
    #[case::trailing_space_kept("a ,b", &["a ", "b"])]
    fn exclude_parsing(#[case] raw: &str, #[case] expected: &[&str]) {
        let settings = CloneSettings {
            exclude: raw.into(),
            ..Default::default()
        };
        assert_eq!(settings.exclude_list(), expected);
    }

    #[test]
    fn since_blank_is_none() {
        let mut settings = CloneSettings::default();
        assert_eq!(settings.since(), None);
        settings.since = "2024-01-01".into();
        assert_eq!(settings.since(), Some("2024-01-01"));
    }

    #[test]
    fn host_falls_back_to_wildcard() {
        let mut settings = Settings::default();
        settings.git.insert(
            "*".into(),
            AuthRecord {
                name: "anyone".into(),
                ..Default::default()
            },
        );
        settings.git.insert(
            "github.com".into(),
            AuthRecord {
                name: "octo".into(),
                ..Default::default()
            },
        );

        assert_eq!(settings.provider_key("github.com"), "github.com");
        assert_eq!(settings.provider_key("gitlab.com"), "*");
        assert_eq!(settings.auth_for_host("gitlab.com").map(|a| a.name.as_str()), Some("anyone"));
    }

    #[test]
    fn secret_prefers_password_over_token() {
        let auth = AuthRecord {
            password: Some("pw".into()),
            token: Some("tok".into()),
            ..Default::default()
        };
        assert_eq!(auth.secret(), Some("pw"));

        let auth = AuthRecord {
            token: Some("tok".into()),
            ..Default::default()
        };
        assert_eq!(auth.secret(), Some("tok"));
        assert_eq!(auth.login(), None);
    }

    #[test]
    fn deserializes_from_toml() {
        let raw = r#"
            [git."github.com"]
            name = "Octo Cat"
            email = "octo@example.com"
            token = "ghp_x"

            [clone_git]
            single_branch = true
            depth = "1"
        "#;
        let settings: Settings = toml::from_str(raw).unwrap();
        assert_eq!(settings.git["github.com"].email, "octo@example.com");
        assert!(settings.clone_git.single_branch);
        assert_eq!(settings.clone_git.depth(), Some(1));
        assert!(settings.clone_git.exclude_list().is_empty());
    }
}
