// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Version ref resolution.
//!
//! Determine which ref of a remote repository should be checked out. A
//! __release__ is preferred, because releases are curated by the maintainers
//! of a repository. However, not all repositories publish releases. Thus, the
//! newest plain __tag__ is used as a fallback.
//!
//! # Resolution Order
//!
//! Resolution is an ordered list of fallible strategies that are tried in
//! turn:
//!
//! 1. Releases listing. The `tag_name` of the first entry wins. Failure of any
//!    kind is not surfaced, and resolution moves on.
//! 2. Tags listing. The `name` of the first entry wins. Failure here is
//!    surfaced to the caller.
//!
//! "First" is whatever the remote listing puts at index zero. Remote hosts
//! list newest entries first, so no sorting happens here. Nothing is cached,
//! every call queries the remote again.

use crate::config::RemoteSettings;

use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use std::fmt::{Display, Formatter, Result as FmtResult};
use tracing::{debug, info, instrument};

/// Value of User-Agent header sent with every API request.
pub const USER_AGENT: &str = concat!("dotboot/", env!("CARGO_PKG_VERSION"));

/// Version ref chosen for a repository.
#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub struct ResolvedRef(String);

impl ResolvedRef {
    /// Construct new resolved ref.
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for ResolvedRef {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Display for ResolvedRef {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.as_str())
    }
}

/// Layer of indirection for remote ref listings.
///
/// Both listings return ref names in the exact order the remote produced
/// them.
pub trait RefListing {
    /// List tag names of published releases.
    fn releases(&self, owner: &str, name: &str) -> Result<Vec<String>, ListingError>;

    /// List names of tags.
    fn tags(&self, owner: &str, name: &str) -> Result<Vec<String>, ListingError>;
}

/// Ref listings through the GitHub REST API.
///
/// No timeouts are applied. A stalled remote blocks the caller.
pub struct GithubApi {
    agent: ureq::Agent,
    api_url: String,
    token: Option<String>,
}

impl GithubApi {
    /// Construct new API client against base URL.
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            agent: ureq::Agent::new_with_defaults(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    /// Authenticate every request with bearer token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Construct new API client from remote settings.
    pub fn from_settings(settings: &RemoteSettings) -> Self {
        let api = Self::new(settings.api_url.as_str());
        match &settings.token {
            Some(token) => api.with_token(token.as_str()),
            None => api,
        }
    }

    /// Fetch listing at endpoint of repository.
    ///
    /// Only the first entry has to match the expected layout, because it is
    /// the only one resolution ever picks. Later entries that do not match
    /// are dropped.
    #[instrument(skip(self), level = "debug")]
    fn list<T>(&self, owner: &str, name: &str, endpoint: &str) -> Result<Vec<T>, ListingError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}/repos/{owner}/{name}/{endpoint}", self.api_url);
        debug!("GET {url}");

        let mut request = self
            .agent
            .get(url.as_str())
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Bearer {token}"));
        }

        let mut response = request
            .call()
            .map_err(|err| ListingError::from_ureq(err, &url))?;
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|err| ListingError::from_ureq(err, &url))?;

        let schema_err = |err: serde_json::Error| ListingError::Schema {
            source: err,
            url: url.clone(),
        };
        let mut entries = serde_json::from_str::<Vec<Value>>(&body)
            .map_err(schema_err)?
            .into_iter();
        let Some(first) = entries.next() else {
            return Ok(Vec::new());
        };

        let mut listing = vec![serde_json::from_value::<T>(first).map_err(schema_err)?];
        listing.extend(entries.filter_map(|entry| serde_json::from_value(entry).ok()));

        Ok(listing)
    }
}

impl RefListing for GithubApi {
    fn releases(&self, owner: &str, name: &str) -> Result<Vec<String>, ListingError> {
        let releases: Vec<Release> = self.list(owner, name, "releases")?;
        Ok(releases.into_iter().map(|release| release.tag_name).collect())
    }

    fn tags(&self, owner: &str, name: &str) -> Result<Vec<String>, ListingError> {
        let tags: Vec<Tag> = self.list(owner, name, "tags")?;
        Ok(tags.into_iter().map(|tag| tag.name).collect())
    }
}

#[derive(Debug, Deserialize)]
struct Release {
    tag_name: String,
}

#[derive(Debug, Deserialize)]
struct Tag {
    name: String,
}

/// Listing tier that a resolution strategy queries.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Tier {
    Releases,
    Tags,
}

impl Display for Tier {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Releases => fmt.write_str("releases"),
            Self::Tags => fmt.write_str("tags"),
        }
    }
}

type Strategy<L> = fn(&L, &str, &str) -> Result<Vec<String>, ListingError>;

/// Resolve the newest release, or newest tag, of remote repositories.
#[derive(Debug)]
pub struct TagResolver<L = GithubApi>
where
    L: RefListing,
{
    listing: L,
}

impl<L> TagResolver<L>
where
    L: RefListing,
{
    /// Construct new resolver over ref listing.
    pub fn new(listing: L) -> Self {
        Self { listing }
    }

    fn strategies(&self) -> [(Tier, Strategy<L>); 2] {
        [
            (Tier::Releases, L::releases as Strategy<L>),
            (Tier::Tags, L::tags as Strategy<L>),
        ]
    }

    /// Resolve version ref to check out for a repository.
    ///
    /// Tries each listing tier in order, and returns the first entry of the
    /// first non-empty listing. Failure of an earlier tier is only logged. The
    /// outcome of the last tier decides what error is returned.
    ///
    /// # Errors
    ///
    /// - Return [`ResolveError::Fetch`] if the last tier failed to be listed.
    /// - Return [`ResolveError::NotFound`] if no tier listed anything.
    #[instrument(skip(self), level = "debug")]
    pub fn resolve(&self, owner: &str, name: &str) -> Result<ResolvedRef> {
        let mut last_error = None;
        for (tier, attempt) in self.strategies() {
            match attempt(&self.listing, owner, name) {
                Ok(listing) => match listing.into_iter().next() {
                    Some(reference) => {
                        info!("resolved {owner}/{name} to {reference} from {tier}");
                        return Ok(ResolvedRef::new(reference));
                    }
                    None => {
                        debug!("no {tier} listed for {owner}/{name}");
                        last_error = None;
                    }
                },
                Err(error) => {
                    debug!("failed to list {tier} for {owner}/{name}: {error}");
                    last_error = Some(error);
                }
            }
        }

        match last_error {
            Some(source) => Err(ResolveError::Fetch {
                source,
                owner: owner.into(),
                name: name.into(),
            }),
            None => Err(ResolveError::NotFound {
                owner: owner.into(),
                name: name.into(),
            }),
        }
    }
}

/// Failure to obtain a ref listing.
#[derive(Debug, thiserror::Error)]
pub enum ListingError {
    /// Remote could not be reached, or response could not be read.
    #[error("failed to request {url}")]
    Transport {
        #[source]
        source: ureq::Error,
        url: String,
    },

    /// Remote answered with an error status.
    #[error("request to {url} returned HTTP status {code}")]
    Status { code: u16, url: String },

    /// Response body is not a listing of the expected shape.
    #[error("unexpected response layout from {url}")]
    Schema {
        #[source]
        source: serde_json::Error,
        url: String,
    },
}

impl ListingError {
    fn from_ureq(error: ureq::Error, url: &str) -> Self {
        match error {
            ureq::Error::StatusCode(code) => Self::Status {
                code,
                url: url.into(),
            },
            source => Self::Transport {
                source,
                url: url.into(),
            },
        }
    }
}

/// All possible error types for ref resolution.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// Fallback listing could not be obtained.
    #[error("failed to fetch tag information for {owner}/{name}")]
    Fetch {
        #[source]
        source: ListingError,
        owner: String,
        name: String,
    },

    /// Repository has neither releases nor tags.
    #[error("no releases or tags found for {owner}/{name}")]
    NotFound { owner: String, name: String },
}

/// Friendly result alias :3
pub type Result<T, E = ResolveError> = std::result::Result<T, E>;
