//! sandgit command line.
//!
//! Every command runs against a [`LocalStorage`] rooted at `--root`, seen
//! through the [`Shim`] exactly as a git engine sees it. Git commands use
//! [`Git2Engine`].

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::DateTime;
use clap::{Parser, Subcommand};

use sandgit_kernel::clipboard::Clipboard;
use sandgit_kernel::config::{load_default_settings, load_settings};
use sandgit_kernel::vcs::{Git2Engine, TracingNotifier, Vcs};
use sandgit_kernel::vfs::{FileContent, FileData, Filesystem, LocalStorage, ReadOptions, Shim};
use sandgit_types::Settings;
use tracing::debug;

/// Git over sandboxed storage.
#[derive(Parser, Debug)]
#[command(name = "sandgit", version)]
#[command(about = "Work with files and git repositories inside a storage root")]
pub struct Cli {
    /// Storage root; every path is relative to it
    #[arg(long, global = true, default_value = ".")]
    pub root: PathBuf,

    /// Settings file (default: $XDG_CONFIG_HOME/sandgit/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print an entry's metadata as JSON
    Stat { path: PathBuf },

    /// Print a file's content
    Cat {
        path: PathBuf,
        /// Decode as text
        #[arg(long)]
        text: bool,
    },

    /// List a directory
    Ls {
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Write text to a file, creating parents
    Write { path: PathBuf, text: String },

    /// Create a directory and its parents
    Mkdir { path: PathBuf },

    /// Remove a file or an empty directory
    Rm { path: PathBuf },

    /// Copy or move entries into a directory
    Paste {
        /// Move instead of copy
        #[arg(long, conflicts_with = "copy")]
        cut: bool,
        /// Copy (the default)
        #[arg(long)]
        copy: bool,
        /// Entries to paste, then the target directory
        #[arg(num_args = 2.., required = true)]
        paths: Vec<PathBuf>,
    },

    /// Create an empty repository
    Init {
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },

    /// Clone a remote repository
    Clone {
        url: String,
        /// Target directory (default: the repository name)
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Branch to check out
        #[arg(long = "ref")]
        reference: Option<String>,
    },

    /// Commit the index
    Commit {
        #[arg(short, long)]
        message: String,
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },

    /// List configured remotes
    Remotes {
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },

    /// Show commit history
    Log {
        #[arg(long = "ref")]
        reference: Option<String>,
        /// Stop quietly at missing history instead of failing
        #[arg(long)]
        force: bool,
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },

    /// Fetch from a remote
    Fetch {
        url: String,
        #[arg(long = "ref")]
        reference: Option<String>,
        #[arg(long)]
        remote_ref: Option<String>,
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },

    /// Show one file's status
    Status {
        filepath: String,
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
}

/// Run one command, writing its output to `out`.
pub async fn run(cli: Cli, out: &mut impl Write) -> Result<()> {
    debug!(root = %cli.root.display(), "opening storage");
    let storage = Arc::new(LocalStorage::new(&cli.root));
    let shim = Arc::new(Shim::from_arc(storage.clone()));

    match cli.command {
        Command::Stat { path } => {
            let record = shim
                .stat(&path)
                .await
                .with_context(|| format!("stat {}", path.display()))?;
            writeln!(out, "{}", serde_json::to_string_pretty(&record)?)?;
        }
        Command::Cat { path, text } => {
            let options = if text {
                ReadOptions::utf8()
            } else {
                ReadOptions::default()
            };
            let content = shim
                .read_file(&path, options)
                .await
                .with_context(|| format!("cat {}", path.display()))?;
            match content {
                FileContent::Bytes(bytes) => out.write_all(&bytes)?,
                FileContent::Text(text) => out.write_all(text.as_bytes())?,
            }
        }
        Command::Ls { path } => {
            for name in shim
                .readdir(&path)
                .await
                .with_context(|| format!("ls {}", path.display()))?
            {
                writeln!(out, "{name}")?;
            }
        }
        Command::Write { path, text } => {
            shim.write_file(&path, FileData::Text(text))
                .await
                .with_context(|| format!("write {}", path.display()))?;
        }
        Command::Mkdir { path } => {
            shim.mkdir(&path)
                .await
                .with_context(|| format!("mkdir {}", path.display()))?;
        }
        Command::Rm { path } => remove(shim.as_ref(), &path).await?,
        Command::Paste { cut, copy: _, mut paths } => {
            let Some(target) = paths.pop() else {
                bail!("paste needs at least one entry and a target");
            };
            let mut clipboard = Clipboard::new();
            if cut {
                clipboard.cut(paths);
            } else {
                clipboard.copy(paths);
            }
            let report = clipboard
                .paste(storage.as_ref(), &target)
                .await
                .with_context(|| format!("paste into {}", target.display()))?;
            for path in &report.pasted {
                writeln!(out, "pasted {}", path.display())?;
            }
            for path in &report.skipped {
                writeln!(out, "skipped {}", path.display())?;
            }
        }
        command => {
            let settings = settings(cli.config.as_deref())?;
            let vcs = Vcs::new(
                Arc::new(Git2Engine::new()),
                shim,
                Arc::new(settings.clone()),
                Arc::new(TracingNotifier),
            )
            .with_clone_settings(settings.clone_git);
            run_git(&vcs, command, out).await?;
        }
    }

    Ok(())
}

async fn run_git(vcs: &Vcs, command: Command, out: &mut impl Write) -> Result<()> {
    match command {
        Command::Init { dir } => {
            vcs.init(&dir).await.context("init")?;
            writeln!(out, "Initialized empty repository in {}", dir.display())?;
        }
        Command::Clone {
            url,
            dir,
            reference,
        } => {
            let dir = dir.unwrap_or_else(|| PathBuf::from(repo_name(&url)));
            vcs.clone(&dir, &url, reference.as_deref())
                .await
                .with_context(|| format!("clone {url}"))?;
        }
        Command::Commit { message, dir } => {
            let oid = vcs.commit(&dir, &message).await.context("commit")?;
            writeln!(out, "{oid}")?;
        }
        Command::Remotes { dir } => {
            for remote in vcs.list_remotes(&dir).await.context("remotes")? {
                writeln!(out, "{}\t{}", remote.remote, remote.url)?;
            }
        }
        Command::Log {
            reference,
            force,
            dir,
        } => {
            for commit in vcs
                .log(&dir, reference.as_deref(), force)
                .await
                .context("log")?
            {
                let date = DateTime::from_timestamp(commit.time, 0)
                    .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default();
                let summary = commit.message.lines().next().unwrap_or_default();
                let short = commit.oid.get(..7).unwrap_or(&commit.oid);
                writeln!(out, "{short} {date} {} {summary}", commit.author)?;
            }
        }
        Command::Fetch {
            url,
            reference,
            remote_ref,
            dir,
        } => {
            let result = vcs
                .fetch(&dir, &url, reference.as_deref(), remote_ref.as_deref())
                .await
                .with_context(|| format!("fetch {url}"))?;
            if let Some(branch) = result.default_branch {
                writeln!(out, "default branch: {branch}")?;
            }
            if let Some(head) = result.fetch_head {
                writeln!(out, "FETCH_HEAD: {head}")?;
            }
        }
        Command::Status { filepath, dir } => {
            let status = vcs.status(&dir, &filepath).await.context("status")?;
            writeln!(out, "{status}")?;
        }
        other => bail!("not a git command: {other:?}"),
    }
    Ok(())
}

fn settings(path: Option<&Path>) -> Result<Settings> {
    let settings = match path {
        Some(path) => load_settings(path)?,
        None => load_default_settings()?,
    };
    debug!(config = ?path, hosts = settings.git.len(), "settings loaded");
    Ok(settings)
}

async fn remove(fs: &dyn Filesystem, path: &Path) -> Result<()> {
    let record = fs
        .stat(path)
        .await
        .with_context(|| format!("rm {}", path.display()))?;
    let removed = if record.is_directory() {
        fs.rmdir(path).await
    } else {
        fs.unlink(path).await
    };
    removed.with_context(|| format!("rm {}", path.display()))
}

/// Directory name for a clone: the last URL segment without `.git`.
fn repo_name(url: &str) -> String {
    let last = url
        .trim_end_matches('/')
        .rsplit(['/', ':'])
        .next()
        .unwrap_or_default();
    let name = last.strip_suffix(".git").unwrap_or(last);
    if name.is_empty() {
        "repo".to_string()
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn sandgit(root: &Path, args: &[&str]) -> Result<String> {
        let config = root.join("no-such-config.toml");
        let mut argv = vec![
            "sandgit".to_string(),
            "--root".to_string(),
            root.display().to_string(),
            "--config".to_string(),
            config.display().to_string(),
        ];
        argv.extend(args.iter().map(|a| a.to_string()));
        let cli = Cli::try_parse_from(argv)?;

        let mut out = Vec::new();
        run(cli, &mut out).await?;
        Ok(String::from_utf8(out)?)
    }

    #[test]
    fn repo_names_from_urls() {
        assert_eq!(repo_name("https://github.com/octo/hello.git"), "hello");
        assert_eq!(repo_name("https://github.com/octo/hello/"), "hello");
        assert_eq!(repo_name("git@github.com:octo.git"), "octo");
        assert_eq!(repo_name(""), "repo");
    }

    #[tokio::test]
    async fn write_cat_ls_stat() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        sandgit(root, &["write", "notes/today.md", "buy milk"]).await.unwrap();
        assert_eq!(
            sandgit(root, &["cat", "--text", "notes/today.md"]).await.unwrap(),
            "buy milk"
        );
        assert_eq!(sandgit(root, &["ls", "notes"]).await.unwrap(), "today.md\n");

        let stat: serde_json::Value =
            serde_json::from_str(&sandgit(root, &["stat", "notes"]).await.unwrap()).unwrap();
        assert_eq!(stat["type"], "directory");
        assert_eq!(stat["mode"], 16822);
    }

    #[tokio::test]
    async fn rm_handles_files_and_directories() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        sandgit(root, &["write", "a/b.txt", "x"]).await.unwrap();
        sandgit(root, &["rm", "a/b.txt"]).await.unwrap();
        sandgit(root, &["rm", "a"]).await.unwrap();
        assert!(!root.join("a").exists());

        let err = sandgit(root, &["cat", "a/b.txt"]).await.unwrap_err();
        assert!(format!("{err:#}").contains("ENOENT"));
    }

    #[tokio::test]
    async fn paste_copy_and_cut() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        sandgit(root, &["write", "a.txt", "alpha"]).await.unwrap();
        sandgit(root, &["mkdir", "box"]).await.unwrap();

        let out = sandgit(root, &["paste", "a.txt", "."]).await.unwrap();
        assert_eq!(out, "pasted a.txt copy\n");

        let out = sandgit(root, &["paste", "--cut", "a.txt", "box"]).await.unwrap();
        assert_eq!(out, "pasted box/a.txt\n");
        assert!(root.join("box/a.txt").exists());
        assert!(!root.join("a.txt").exists());

        let out = sandgit(root, &["paste", "box", "box"]).await.unwrap();
        assert_eq!(out, "skipped box\n");
    }

    #[tokio::test]
    async fn init_and_status() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        let out = sandgit(root, &["init", "--dir", "repo"]).await.unwrap();
        assert!(out.starts_with("Initialized empty repository"));
        assert!(root.join("repo/.git").is_dir());

        sandgit(root, &["write", "repo/new.txt", "hi"]).await.unwrap();
        assert_eq!(
            sandgit(root, &["status", "--dir", "repo", "new.txt"]).await.unwrap(),
            "*added\n"
        );
        assert_eq!(
            sandgit(root, &["remotes", "--dir", "repo"]).await.unwrap(),
            ""
        );
    }
}
