// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration file installation.
//!
//! Copy configuration files into a target directory, usually the user's home
//! directory. Any file that would be overwritten is first moved into a
//! `backup` directory next to it, with a timestamp appended to its name. Thus,
//! `~/.zshrc` becomes `~/backup/.zshrc.20250101_120000` before the new
//! `~/.zshrc` gets copied over.
//!
//! Only the top-level of the source directory is installed. Directories are
//! skipped.

use chrono::Local;
use glob::Pattern;
use std::{
    fs::{copy, read_dir, rename, symlink_metadata},
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tracing::{info, instrument, warn};

/// Name of directory that holds backups of replaced files.
pub const BACKUP_DIR_NAME: &str = "backup";

/// Timestamp layout appended to backup file names.
pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Outcome of configuration file installation.
#[derive(Default, Debug, PartialEq, Eq, Clone)]
pub struct InstallReport {
    /// Files copied into target directory.
    pub copied: Vec<PathBuf>,

    /// Replaced files paired with where they were backed up to.
    pub backed_up: Vec<(PathBuf, PathBuf)>,

    /// Entries of source directory that were not installed.
    pub skipped: Vec<PathBuf>,
}

/// Install configuration files from source directory into target directory.
///
/// Entries are installed in file name order. Entries whose file name matches
/// any of the `exclude` glob patterns are skipped, and so are directories.
///
/// # Errors
///
/// - Return [`InstallError::Pattern`] if an exclude pattern is malformed.
/// - Return [`InstallError::ReadSource`] if source directory cannot be read.
/// - Return [`InstallError::Backup`] if existing file cannot be backed up.
/// - Return [`InstallError::Copy`] if file cannot be copied.
#[instrument(skip(configs_dir, target_dir, exclude), level = "debug")]
pub fn install_configs(
    configs_dir: impl AsRef<Path>,
    target_dir: impl AsRef<Path>,
    exclude: impl IntoIterator<Item = impl AsRef<str>>,
) -> Result<InstallReport> {
    let configs_dir = configs_dir.as_ref();
    let target_dir = target_dir.as_ref();
    let patterns = exclude
        .into_iter()
        .map(|pattern| {
            Pattern::new(pattern.as_ref()).map_err(|err| InstallError::Pattern {
                source: err,
                pattern: pattern.as_ref().to_string(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let read_source = |err| InstallError::ReadSource {
        source: err,
        configs_dir: configs_dir.to_path_buf(),
    };
    let mut entries = read_dir(configs_dir)
        .map_err(read_source)?
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(read_source)?;
    entries.sort();

    let mut report = InstallReport::default();
    for entry in entries {
        let Some(file_name) = entry.file_name() else {
            continue;
        };

        let name = file_name.to_string_lossy();
        if patterns.iter().any(|pattern| pattern.matches(name.as_ref())) {
            info!("skip excluded {:?}", entry.display());
            report.skipped.push(entry);
            continue;
        }

        if entry.is_dir() {
            warn!("skip directory {:?}", entry.display());
            report.skipped.push(entry);
            continue;
        }

        let target = target_dir.join(file_name);
        if let Some(backup) = backup_config(&target)? {
            report.backed_up.push((target.clone(), backup));
        }

        copy_config(&entry, &target)?;
        report.copied.push(target);
    }

    Ok(report)
}

/// Back up existing file by moving it into a sibling `backup` directory.
///
/// The backup keeps the original file name with a timestamp appended to it.
/// Nothing happens if the file does not exist.
///
/// # Errors
///
/// - Return [`InstallError::Backup`] if backup directory cannot be created, or
///   file cannot be moved into it.
#[instrument(skip(path), level = "debug")]
pub fn backup_config(path: impl AsRef<Path>) -> Result<Option<PathBuf>> {
    let path = path.as_ref();

    let backup_err = |err| InstallError::Backup {
        source: err,
        path: path.to_path_buf(),
    };

    // INVARIANT: Dangling symlinks still count as existing files.
    match symlink_metadata(path) {
        Ok(_) => {}
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(backup_err(err)),
    }
    let Some(file_name) = path.file_name() else {
        return Ok(None);
    };

    let backup_dir = path
        .parent()
        .map(|parent| parent.join(BACKUP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(BACKUP_DIR_NAME));
    mkdirp::mkdirp(&backup_dir).map_err(backup_err)?;

    let timestamp = Local::now().format(BACKUP_TIMESTAMP_FORMAT);
    let mut backup_name = file_name.to_os_string();
    backup_name.push(format!(".{timestamp}"));
    let backup_path = backup_dir.join(backup_name);

    info!(
        "backing up {:?} to {:?}",
        path.display(),
        backup_path.display()
    );
    rename(path, &backup_path).map_err(backup_err)?;

    Ok(Some(backup_path))
}

/// Copy configuration file to destination, preserving its permissions.
///
/// # Errors
///
/// - Return [`InstallError::Copy`] if file cannot be copied.
pub fn copy_config(src: impl AsRef<Path>, dest: impl AsRef<Path>) -> Result<()> {
    let (src, dest) = (src.as_ref(), dest.as_ref());
    info!("copying {:?} to {:?}", src.display(), dest.display());
    copy(src, dest).map_err(|err| InstallError::Copy {
        source: err,
        src: src.to_path_buf(),
        dest: dest.to_path_buf(),
    })?;

    Ok(())
}

/// All possible error types for configuration file installation.
#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    /// Exclude pattern is not a valid glob.
    #[error("invalid exclude pattern {pattern:?}")]
    Pattern {
        #[source]
        source: glob::PatternError,
        pattern: String,
    },

    /// Source directory cannot be read.
    #[error("failed to read configuration directory {:?}", configs_dir.display())]
    ReadSource {
        #[source]
        source: std::io::Error,
        configs_dir: PathBuf,
    },

    /// Existing file cannot be backed up.
    #[error("failed to back up {:?}", path.display())]
    Backup {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// File cannot be copied to target.
    #[error("failed to copy {:?} to {:?}", src.display(), dest.display())]
    Copy {
        #[source]
        source: std::io::Error,
        src: PathBuf,
        dest: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = InstallError> = std::result::Result<T, E>;
