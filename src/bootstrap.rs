// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Dependency checkout orchestration.
//!
//! Ties ref resolution and checkout synchronization together. Each entry of a
//! dependency list is resolved, then synced, one after the other. Failure of
//! one entry is recorded and logged, and never prevents later entries from
//! being attempted.

use crate::{
    config::{DependencyList, DependencySpec, RemoteSettings},
    resolve::{GithubApi, RefListing, ResolveError, ResolvedRef, TagResolver},
    sync::{GitSyncer, RepoSyncer, SyncError},
};

use std::path::Path;
use tracing::{error, info, instrument};

/// Outcome of syncing a dependency list.
#[derive(Debug, Default)]
pub struct SyncReport {
    /// Dependencies checked out, with the ref they were checked out at.
    pub synced: Vec<(DependencySpec, ResolvedRef)>,

    /// Dependencies that failed, with the reason why.
    pub failed: Vec<(DependencySpec, DependencyError)>,
}

impl SyncReport {
    /// Check if every dependency was checked out.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Resolve and check out dependencies.
#[derive(Debug)]
pub struct Bootstrap<L = GithubApi, S = GitSyncer>
where
    L: RefListing,
    S: RepoSyncer,
{
    resolver: TagResolver<L>,
    syncer: S,
}

impl Bootstrap {
    /// Construct new bootstrap against GitHub from remote settings.
    pub fn from_settings(settings: &RemoteSettings, backup_checkouts: bool) -> Self {
        Self::new(
            TagResolver::new(GithubApi::from_settings(settings)),
            GitSyncer::new(settings.clone_url.as_str()).with_backup(backup_checkouts),
        )
    }
}

impl<L, S> Bootstrap<L, S>
where
    L: RefListing,
    S: RepoSyncer,
{
    /// Construct new bootstrap.
    pub fn new(resolver: TagResolver<L>, syncer: S) -> Self {
        Self { resolver, syncer }
    }

    /// Resolve version ref of dependency without checking it out.
    ///
    /// # Errors
    ///
    /// - Return [`ResolveError`] if no usable ref can be found.
    pub fn resolve(&self, owner: &str, name: &str) -> Result<ResolvedRef, ResolveError> {
        self.resolver.resolve(owner, name)
    }

    /// Resolve and check out a single dependency under checkout directory.
    ///
    /// # Errors
    ///
    /// - Return [`DependencyError::Resolve`] if no usable ref can be found.
    /// - Return [`DependencyError::Sync`] if checkout fails.
    #[instrument(skip(self, checkout_dir), level = "debug")]
    pub fn sync_one(
        &self,
        dependency: &DependencySpec,
        checkout_dir: &Path,
    ) -> Result<ResolvedRef> {
        let reference = self
            .resolver
            .resolve(&dependency.owner, &dependency.name)?;
        let destination = dependency.checkout_path(checkout_dir);
        self.syncer.sync(
            &dependency.owner,
            &dependency.name,
            reference.as_str(),
            &destination,
        )?;

        Ok(reference)
    }

    /// Resolve and check out every dependency in order.
    ///
    /// Never stops early. Failed dependencies are logged, and collected into
    /// the returned report.
    pub fn sync_all(&self, dependencies: &DependencyList, checkout_dir: &Path) -> SyncReport {
        let mut report = SyncReport::default();
        for dependency in dependencies {
            match self.sync_one(dependency, checkout_dir) {
                Ok(reference) => report.synced.push((dependency.clone(), reference)),
                Err(err) => {
                    error!("{}", err.with_causes());
                    report.failed.push((dependency.clone(), err));
                }
            }
        }

        info!(
            "synced {} of {} dependencies",
            report.synced.len(),
            dependencies.len()
        );

        report
    }
}

/// Failure of a single dependency.
#[derive(Debug, thiserror::Error)]
pub enum DependencyError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Sync(#[from] SyncError),
}

impl DependencyError {
    /// Render error followed by every underlying cause, one per line.
    ///
    /// Causes carry details like Git's own error output, which the top-level
    /// message leaves out.
    pub fn with_causes(&self) -> String {
        let mut message = self.to_string();
        let mut cause = std::error::Error::source(self);
        while let Some(source) = cause {
            message.push_str(format!("\ncaused by: {source}").as_str());
            cause = source.source();
        }

        message
    }
}

/// Friendly result alias :3
type Result<T, E = DependencyError> = std::result::Result<T, E>;
