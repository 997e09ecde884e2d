// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Repository checkout synchronization.
//!
//! A __checkout__ is a directory holding a shallow clone of a remote
//! repository at a single ref. Checkouts are never updated in place. Every
//! sync throws away whatever sits at the destination, and clones the
//! repository again from scratch. There is no reconciliation of divergent
//! local state, and no history beyond the pinned ref is ever fetched.
//!
//! # Destructive Replace
//!
//! Existing destinations are deleted recursively without confirmation. A
//! clone that fails afterwards leaves the destination absent, nothing is
//! restored. Callers that want to keep old checkouts around can enable
//! backups, which move the destination aside instead of deleting it.

use crate::install::BACKUP_TIMESTAMP_FORMAT;

use chrono::Local;
use indicatif::{ProgressBar, ProgressStyle};
use std::{
    ffi::OsStr,
    fs::{remove_dir_all, remove_file, rename, symlink_metadata},
    io::ErrorKind,
    path::{Path, PathBuf},
    process::Command,
    time::Duration,
};
use tracing::{debug, info, instrument};

/// Layer of indirection for checkout synchronization.
pub trait RepoSyncer {
    /// Replace destination with a fresh checkout of repository at reference.
    fn sync(&self, owner: &str, name: &str, reference: &str, destination: &Path) -> Result<()>;
}

/// Checkout synchronization through the Git binary.
#[derive(Debug, Clone)]
pub struct GitSyncer {
    clone_url: String,
    backup: bool,
}

impl GitSyncer {
    /// Construct new syncer cloning from base URL.
    ///
    /// Repositories are cloned from `{clone_url}/{owner}/{name}.git`.
    pub fn new(clone_url: impl Into<String>) -> Self {
        Self {
            clone_url: clone_url.into().trim_end_matches('/').to_string(),
            backup: false,
        }
    }

    /// Move existing destinations aside instead of deleting them.
    pub fn with_backup(mut self, backup: bool) -> Self {
        self.backup = backup;
        self
    }

    /// Remote URL of repository.
    pub fn repo_url(&self, owner: &str, name: &str) -> String {
        format!("{}/{owner}/{name}.git", self.clone_url)
    }

    /// Clear out destination path.
    ///
    /// Returns the backup location if the destination was moved aside rather
    /// than deleted.
    fn clear_destination(&self, destination: &Path) -> Result<Option<PathBuf>> {
        // INVARIANT: Dangling symlinks still occupy the destination.
        let metadata = match symlink_metadata(destination) {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(SyncError::Remove {
                    source: err,
                    path: destination.to_path_buf(),
                })
            }
        };

        if self.backup {
            let timestamp = Local::now().format(BACKUP_TIMESTAMP_FORMAT);
            let mut backup_name = destination.as_os_str().to_os_string();
            backup_name.push(format!(".backup.{timestamp}"));
            let backup_path = PathBuf::from(backup_name);

            info!(
                "moving existing {:?} to {:?}",
                destination.display(),
                backup_path.display()
            );
            rename(destination, &backup_path).map_err(|err| SyncError::Backup {
                source: err,
                path: destination.to_path_buf(),
            })?;

            return Ok(Some(backup_path));
        }

        info!("removing existing {:?}", destination.display());
        let removal = if metadata.is_dir() {
            remove_dir_all(destination)
        } else {
            remove_file(destination)
        };
        removal.map_err(|err| SyncError::Remove {
            source: err,
            path: destination.to_path_buf(),
        })?;

        Ok(None)
    }
}

impl RepoSyncer for GitSyncer {
    /// Replace destination with a depth-1 clone of repository at reference.
    ///
    /// # Errors
    ///
    /// - Return [`SyncError::Remove`] if existing destination cannot be
    ///   deleted.
    /// - Return [`SyncError::Backup`] if existing destination cannot be moved
    ///   aside.
    /// - Return [`SyncError::CreateParent`] if parent directories of
    ///   destination cannot be created.
    /// - Return [`SyncError::Clone`] if Git fails to clone.
    #[instrument(skip(self, destination), level = "debug")]
    fn sync(&self, owner: &str, name: &str, reference: &str, destination: &Path) -> Result<()> {
        self.clear_destination(destination)?;

        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            mkdirp::mkdirp(parent).map_err(|err| SyncError::CreateParent {
                source: err,
                path: parent.to_path_buf(),
            })?;
        }

        let url = self.repo_url(owner, name);
        let style = ProgressStyle::with_template("{elapsed_precise:.green}  {spinner:.yellow}  {msg}")?
            .tick_chars("-Cco. ");
        let bar = ProgressBar::new_spinner();
        bar.set_style(style);
        bar.set_message(format!("{owner}/{name} @ {reference}"));
        bar.enable_steady_tick(Duration::from_millis(100));

        info!(
            "cloning {owner}/{name} at {reference} into {:?}",
            destination.display()
        );
        let branch = format!("--branch={reference}");
        let output = syscall_non_interactive(
            "git",
            [
                OsStr::new("clone"),
                OsStr::new(branch.as_str()),
                OsStr::new("--depth=1"),
                OsStr::new("--"),
                OsStr::new(url.as_str()),
                destination.as_os_str(),
            ],
        );
        bar.finish_and_clear();

        let output = output.map_err(|err| SyncError::Clone {
            source: err,
            url: url.clone(),
            reference: reference.into(),
        })?;
        if !output.is_empty() {
            debug!("{output}");
        }

        Ok(())
    }
}

fn syscall_non_interactive(
    cmd: impl AsRef<OsStr>,
    args: impl IntoIterator<Item = impl AsRef<OsStr>>,
) -> Result<String, SyscallError> {
    let output = Command::new(cmd.as_ref())
        .args(args)
        // INVARIANT: Never block on credential prompts behind the spinner.
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()
        .map_err(|err| SyscallError::Spawn {
            source: err,
            command: cmd.as_ref().to_string_lossy().into_owned(),
        })?;
    let stdout = String::from_utf8_lossy(output.stdout.as_slice()).into_owned();
    let stderr = String::from_utf8_lossy(output.stderr.as_slice()).into_owned();
    let mut message = String::new();

    if !stdout.is_empty() {
        message.push_str(format!("stdout: {stdout}").as_str());
    }

    if !stderr.is_empty() {
        message.push_str(format!("stderr: {stderr}").as_str());
    }

    // INVARIANT: Chomp trailing newlines.
    let message = message
        .strip_suffix("\r\n")
        .or(message.strip_suffix('\n'))
        .map(ToString::to_string)
        .unwrap_or(message);

    if !output.status.success() {
        return Err(SyscallError::Failed {
            command: cmd.as_ref().to_string_lossy().into_owned(),
            message,
        });
    }

    Ok(message)
}

/// External command failure.
#[derive(Debug, thiserror::Error)]
pub enum SyscallError {
    /// Command could not be started.
    #[error("failed to run command {command:?}")]
    Spawn {
        #[source]
        source: std::io::Error,
        command: String,
    },

    /// Command exited with non-zero status.
    #[error("command {command:?} failed:\n{message}")]
    Failed { command: String, message: String },
}

/// All possible error types for checkout synchronization.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Existing destination cannot be deleted.
    #[error("failed to remove existing checkout at {:?}", path.display())]
    Remove {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Existing destination cannot be moved aside.
    #[error("failed to back up existing checkout at {:?}", path.display())]
    Backup {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Parent directories of destination cannot be created.
    #[error("failed to create directory {:?}", path.display())]
    CreateParent {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Style template cannot be set for progress spinner.
    #[error(transparent)]
    IndicatifStyleTemplate(#[from] indicatif::style::TemplateError),

    /// Git failed to clone repository.
    #[error("failed to clone {url} at {reference}")]
    Clone {
        #[source]
        source: SyscallError,
        url: String,
        reference: String,
    },
}

/// Friendly result alias :3
pub type Result<T, E = SyncError> = std::result::Result<T, E>;
