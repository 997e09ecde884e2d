// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout for configuration files that Dotboot uses to simplify
//! the process of serialization and deserialization. File I/O is left to the
//! caller to figure out.
//!
//! Two files drive a bootstrap run: the __bootstrap configuration__ written in
//! TOML, and the __dependency list__ written in JSON. The bootstrap
//! configuration decides where things live, while the dependency list decides
//! which repositories get checked out.

use crate::path::{default_checkout_dir, home_dir, NoWayHome};

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    slice::Iter,
    str::FromStr,
};

/// Default GitHub REST API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Default base URL that repositories are cloned from.
pub const DEFAULT_CLONE_URL: &str = "https://github.com";

/// Bootstrap configuration layout.
///
/// # General Layout
///
/// A bootstrap configuration is composed of two basic parts: settings and
/// remote. The settings section defines where configuration files come from,
/// where they go, and where dependency checkouts are placed. The remote
/// section defines how repositories are looked up and cloned.
///
/// Every field is optional. Unset paths are filled in by [`Layout`].
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Local file layout settings.
    pub settings: Settings,

    /// Remote repository host settings.
    pub remote: RemoteSettings,
}

impl BootstrapConfig {
    /// Resolve final directory layout for a bootstrap run.
    ///
    /// Unset configuration and dependency list paths are taken relative to
    /// `root`. Unset target directory falls back to the user's home directory,
    /// and unset checkout directory falls back to `$XDG_DATA_HOME/zsh`.
    ///
    /// # Errors
    ///
    /// - Return [`NoWayHome`] if a fallback needs the home directory, but it
    ///   cannot be determined.
    pub fn layout(&self, root: impl AsRef<Path>) -> Result<Layout, NoWayHome> {
        let root = root.as_ref();
        let settings = &self.settings;

        Ok(Layout {
            configs_dir: match &settings.configs_dir {
                Some(path) => path.clone(),
                None => root.join("configs"),
            },
            dependencies: match &settings.dependencies {
                Some(path) => path.clone(),
                None => root.join("dependencies.json"),
            },
            target_dir: match &settings.target_dir {
                Some(path) => path.clone(),
                None => home_dir()?,
            },
            checkout_dir: match &settings.checkout_dir {
                Some(path) => path.clone(),
                None => default_checkout_dir()?,
            },
        })
    }
}

impl FromStr for BootstrapConfig {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut config: BootstrapConfig =
            toml::de::from_str(data).map_err(ConfigError::DeserializeToml)?;

        // INVARIANT: Perform shell expansion on all path fields and the token.
        let settings = &mut config.settings;
        for path in [
            &mut settings.configs_dir,
            &mut settings.dependencies,
            &mut settings.target_dir,
            &mut settings.checkout_dir,
        ]
        .into_iter()
        .flatten()
        {
            *path = expand_path(path)?;
        }

        if let Some(token) = config.remote.token.take() {
            config.remote.token = Some(shellexpand::full(&token)?.into_owned());
        }

        Ok(config)
    }
}

impl Display for BootstrapConfig {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// Local file layout settings.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Directory holding configuration files to install.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configs_dir: Option<PathBuf>,

    /// Path to JSON dependency list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<PathBuf>,

    /// Directory that configuration files are installed into.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_dir: Option<PathBuf>,

    /// Base directory of all dependency checkouts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout_dir: Option<PathBuf>,

    /// Glob patterns of configuration file names to skip.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,

    /// Move existing checkouts aside instead of deleting them.
    pub backup_checkouts: bool,
}

/// Remote repository host settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RemoteSettings {
    /// Base URL of REST API to query releases and tags from.
    pub api_url: String,

    /// Base URL to clone repositories from.
    pub clone_url: String,

    /// Bearer token for API requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.into(),
            clone_url: DEFAULT_CLONE_URL.into(),
            token: None,
        }
    }
}

/// Fully resolved directory layout of a bootstrap run.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Layout {
    /// Directory holding configuration files to install.
    pub configs_dir: PathBuf,

    /// Path to JSON dependency list.
    pub dependencies: PathBuf,

    /// Directory that configuration files are installed into.
    pub target_dir: PathBuf,

    /// Base directory of all dependency checkouts.
    pub checkout_dir: PathBuf,
}

/// Tracked repository entry of dependency list.
///
/// Keys follow the `dep_class`, `user_name`, `repo_name` naming of existing
/// dependency lists. The shorter `category`, `owner`, `name` keys are accepted
/// as well.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct DependencySpec {
    /// Classification used as checkout subdirectory.
    #[serde(rename = "dep_class", alias = "category")]
    pub category: String,

    /// Owner of remote repository.
    #[serde(rename = "user_name", alias = "owner")]
    pub owner: String,

    /// Name of remote repository.
    #[serde(rename = "repo_name", alias = "name")]
    pub name: String,
}

impl DependencySpec {
    /// Construct new dependency entry.
    pub fn new(
        category: impl Into<String>,
        owner: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Path of checkout for this dependency under `base`.
    pub fn checkout_path(&self, base: impl AsRef<Path>) -> PathBuf {
        base.as_ref().join(&self.category).join(&self.name)
    }
}

impl Display for DependencySpec {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        write!(fmt, "{}/{}", self.owner, self.name)
    }
}

/// Ordered listing of tracked repositories.
///
/// No uniqueness is enforced. Duplicate entries are processed independently.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(transparent)]
pub struct DependencyList(Vec<DependencySpec>);

impl DependencyList {
    /// Construct new dependency list.
    pub fn new(entries: impl IntoIterator<Item = DependencySpec>) -> Self {
        Self(entries.into_iter().collect())
    }

    pub fn iter(&self) -> Iter<'_, DependencySpec> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromStr for DependencyList {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(data).map_err(ConfigError::DeserializeJson)
    }
}

impl<'a> IntoIterator for &'a DependencyList {
    type Item = &'a DependencySpec;
    type IntoIter = Iter<'a, DependencySpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn expand_path(path: &Path) -> Result<PathBuf> {
    let expanded = shellexpand::full(&path.to_string_lossy())?.into_owned();
    Ok(PathBuf::from(expanded))
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to deserialize bootstrap configuration.
    #[error(transparent)]
    DeserializeToml(#[from] toml::de::Error),

    /// Failed to serialize bootstrap configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to deserialize dependency list.
    #[error(transparent)]
    DeserializeJson(#[from] serde_json::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;

    #[sealed_test(env = [("BLAH", "/home/blah"), ("TOKEN", "s3cr3t")])]
    fn deserialize_bootstrap_config() -> anyhow::Result<()> {
        let result: BootstrapConfig = r#"
            [settings]
            configs_dir = "$BLAH/dotfiles/configs"
            target_dir = "$BLAH"
            checkout_dir = "$BLAH/.local/share/zsh"
            exclude = ["*.swp", "README*"]
            backup_checkouts = true

            [remote]
            api_url = "http://localhost:8080"
            token = "$TOKEN"
        "#
        .parse()?;

        let expect = BootstrapConfig {
            settings: Settings {
                configs_dir: Some("/home/blah/dotfiles/configs".into()),
                dependencies: None,
                target_dir: Some("/home/blah".into()),
                checkout_dir: Some("/home/blah/.local/share/zsh".into()),
                exclude: vec!["*.swp".into(), "README*".into()],
                backup_checkouts: true,
            },
            remote: RemoteSettings {
                api_url: "http://localhost:8080".into(),
                clone_url: DEFAULT_CLONE_URL.into(),
                token: Some("s3cr3t".into()),
            },
        };

        assert_eq!(result, expect);

        Ok(())
    }

    #[test]
    fn deserialize_empty_bootstrap_config() -> anyhow::Result<()> {
        let result: BootstrapConfig = "".parse()?;
        assert_eq!(result, BootstrapConfig::default());
        assert_eq!(result.remote.api_url, DEFAULT_API_URL);
        assert!(!result.settings.backup_checkouts);

        Ok(())
    }

    #[sealed_test]
    fn deserialize_unset_variable_fails() {
        let result = r#"
            [settings]
            target_dir = "$DOTBOOT_NOT_SET_ANYWHERE"
        "#
        .parse::<BootstrapConfig>();
        assert!(matches!(result, Err(ConfigError::ShellExpansion(_))));
    }

    #[test]
    fn serialize_bootstrap_config() {
        let result = BootstrapConfig {
            settings: Settings {
                configs_dir: Some("/home/blah/dotfiles/configs".into()),
                dependencies: Some("/home/blah/dotfiles/dependencies.json".into()),
                target_dir: None,
                checkout_dir: None,
                exclude: vec!["*.swp".into(), "README*".into()],
                backup_checkouts: false,
            },
            remote: RemoteSettings::default(),
        }
        .to_string();

        let expect = indoc! {r#"
            [settings]
            configs_dir = "/home/blah/dotfiles/configs"
            dependencies = "/home/blah/dotfiles/dependencies.json"
            exclude = [
                "*.swp",
                "README*",
            ]
            backup_checkouts = false

            [remote]
            api_url = "https://api.github.com"
            clone_url = "https://github.com"
        "#};

        assert_eq!(result, expect);
    }

    #[test]
    fn layout_falls_back_to_root() -> anyhow::Result<()> {
        let config = BootstrapConfig {
            settings: Settings {
                target_dir: Some("/home/blah".into()),
                checkout_dir: Some("/home/blah/.local/share/zsh".into()),
                ..Default::default()
            },
            ..Default::default()
        };

        let result = config.layout("/srv/dotfiles")?;
        let expect = Layout {
            configs_dir: "/srv/dotfiles/configs".into(),
            dependencies: "/srv/dotfiles/dependencies.json".into(),
            target_dir: "/home/blah".into(),
            checkout_dir: "/home/blah/.local/share/zsh".into(),
        };
        assert_eq!(result, expect);

        Ok(())
    }

    #[test]
    fn deserialize_dependency_list() -> anyhow::Result<()> {
        let result: DependencyList = r#"
            [
                {"dep_class": "plugins", "user_name": "zsh-users", "repo_name": "zsh-autosuggestions"},
                {"category": "themes", "owner": "romkatv", "name": "powerlevel10k", "note": "ignored"},
                {"dep_class": "plugins", "user_name": "zsh-users", "repo_name": "zsh-autosuggestions"}
            ]
        "#
        .parse()?;

        let expect = DependencyList::new([
            DependencySpec::new("plugins", "zsh-users", "zsh-autosuggestions"),
            DependencySpec::new("themes", "romkatv", "powerlevel10k"),
            DependencySpec::new("plugins", "zsh-users", "zsh-autosuggestions"),
        ]);
        assert_eq!(result, expect);
        assert_eq!(result.len(), 3);

        Ok(())
    }

    #[test]
    fn deserialize_dependency_missing_key_fails() {
        let result = r#"[{"dep_class": "plugins", "user_name": "zsh-users"}]"#
            .parse::<DependencyList>();
        assert!(matches!(result, Err(ConfigError::DeserializeJson(_))));
    }

    #[test]
    fn dependency_checkout_path() {
        let spec = DependencySpec::new("tools", "acme", "widget");
        assert_eq!(
            spec.checkout_path("/dest"),
            PathBuf::from("/dest/tools/widget")
        );
        assert_eq!(spec.to_string(), "acme/widget");
    }
}
