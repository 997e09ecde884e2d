// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Personal environment bootstrapper.
//!
//! Dotboot prepares a fresh user environment in two steps. First, it installs
//! configuration files into the user's home directory, backing up any file it
//! would overwrite. Second, it checks out a list of external repositories at
//! their newest release, or newest tag if no release exists, into a
//! structured local directory.
//!
//! Nothing is synced incrementally. Every run queries the remote for the
//! newest ref again, and clones every repository from scratch.

pub mod bootstrap;
pub mod config;
pub mod install;
pub mod path;
pub mod resolve;
pub mod sync;

pub use bootstrap::{Bootstrap, DependencyError, SyncReport};
pub use config::{BootstrapConfig, DependencyList, DependencySpec, Layout};
pub use install::{install_configs, InstallReport};
pub use resolve::{GithubApi, RefListing, ResolvedRef, TagResolver};
pub use sync::{GitSyncer, RepoSyncer};
