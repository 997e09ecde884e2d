// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::{fake_github, RepoFixture};

use anyhow::Result;
use dotboot::{
    install_configs, Bootstrap, DependencyList, DependencySpec, GitSyncer, GithubApi,
    RepoSyncer, TagResolver,
};
use git2::Repository;
use pretty_assertions::assert_eq;
use sealed_test::prelude::*;
use std::{
    env::current_dir,
    fs::{create_dir_all, read_to_string, write},
    path::Path,
};

/// Create remote "acme/widget" with tags "v1.0" and "v2.0".
///
/// Version 1.0 ships "old.txt", which version 2.0 drops.
fn widget_remote() -> Result<GitSyncer> {
    let fixture = RepoFixture::new("remote/acme/widget.git")?;
    let v1 = fixture.commit(&[("README", "widget v1\n"), ("old.txt", "legacy\n")])?;
    fixture.tag("v1.0", v1)?;
    let v2 = fixture.commit(&[("README", "widget v2\n")])?;
    fixture.tag("v2.0", v2)?;

    let remote = current_dir()?.join("remote");
    Ok(GitSyncer::new(format!("file://{}", remote.display())))
}

#[sealed_test]
fn sync_creates_shallow_checkout_at_ref() -> Result<()> {
    let syncer = widget_remote()?;
    let destination = Path::new("dest/tools/widget");

    syncer.sync("acme", "widget", "v2.0", destination)?;

    assert_eq!(read_to_string(destination.join("README"))?, "widget v2\n");
    assert!(!destination.join("old.txt").exists());
    assert!(Repository::open(destination)?.is_shallow());

    Ok(())
}

#[sealed_test]
fn sync_replaces_prior_contents() -> Result<()> {
    let syncer = widget_remote()?;
    let destination = Path::new("dest/tools/widget");
    create_dir_all(destination.join("notes"))?;
    write(destination.join("scratch.txt"), "mine")?;
    write(destination.join("notes/todo.md"), "- [ ] stuff")?;

    syncer.sync("acme", "widget", "v1.0", destination)?;
    assert!(!destination.join("scratch.txt").exists());
    assert!(!destination.join("notes").exists());
    assert_eq!(read_to_string(destination.join("old.txt"))?, "legacy\n");

    // Same outcome as a single clone of v2.0, nothing merged from v1.0.
    syncer.sync("acme", "widget", "v2.0", destination)?;
    syncer.sync("acme", "widget", "v2.0", destination)?;
    assert_eq!(read_to_string(destination.join("README"))?, "widget v2\n");
    assert!(!destination.join("old.txt").exists());

    Ok(())
}

#[sealed_test]
fn sync_unknown_ref_fails() -> Result<()> {
    let syncer = widget_remote()?;
    let destination = Path::new("dest/tools/widget");

    let result = syncer.sync("acme", "widget", "v9.9", destination);
    assert!(result.is_err());
    assert!(!destination.exists());

    Ok(())
}

#[sealed_test]
fn bootstrap_checks_out_every_resolvable_dependency() -> Result<()> {
    let syncer = widget_remote()?;
    let fixture = RepoFixture::new("remote/acme/gadget.git")?;
    let oid = fixture.commit(&[("README", "gadget\n")])?;
    fixture.tag("v0.9", oid)?;

    let api_url = fake_github(vec![
        (
            "/repos/acme/widget/releases",
            200,
            r#"[{"tag_name": "v1.0"}, {"tag_name": "v0.1"}]"#,
        ),
        ("/repos/acme/gadget/releases", 200, "[]"),
        ("/repos/acme/gadget/tags", 200, r#"[{"name": "v0.9"}]"#),
        ("/repos/acme/ghost/tags", 500, "{}"),
    ])?;
    let bootstrap = Bootstrap::new(TagResolver::new(GithubApi::new(api_url)), syncer);

    let dependencies: DependencyList = r#"
        [
            {"dep_class": "tools", "user_name": "acme", "repo_name": "ghost"},
            {"dep_class": "tools", "user_name": "acme", "repo_name": "widget"},
            {"dep_class": "plugins", "user_name": "acme", "repo_name": "gadget"}
        ]
    "#
    .parse()?;
    let report = bootstrap.sync_all(&dependencies, Path::new("checkouts"));

    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, DependencySpec::new("tools", "acme", "ghost"));
    assert!(report.failed[0].1.to_string().contains("acme/ghost"));
    assert_eq!(report.synced.len(), 2);
    assert_eq!(
        read_to_string("checkouts/tools/widget/old.txt")?,
        "legacy\n"
    );
    assert_eq!(
        read_to_string("checkouts/plugins/gadget/README")?,
        "gadget\n"
    );
    assert!(!Path::new("checkouts/tools/ghost").exists());

    Ok(())
}

#[sealed_test]
fn install_backs_up_hand_written_config() -> Result<()> {
    create_dir_all("configs")?;
    create_dir_all("home")?;
    write("configs/.zshrc", "source ~/.p10k.zsh\n")?;
    write("home/.zshrc", "# hand written\n")?;

    let first = install_configs("configs", "home", Vec::<String>::new())?;
    assert_eq!(first.backed_up.len(), 1);
    assert_eq!(read_to_string(&first.backed_up[0].1)?, "# hand written\n");
    assert_eq!(read_to_string("home/.zshrc")?, "source ~/.p10k.zsh\n");

    Ok(())
}
