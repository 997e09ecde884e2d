// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use dotboot::{
    config::{BootstrapConfig, DependencyList, Layout},
    install::install_configs,
    path::default_config_file,
    Bootstrap,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::{fs::read_to_string, path::PathBuf, process::exit};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "dotboot [options] <dotboot-command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    /// Directory holding default "configs" directory and "dependencies.json".
    #[arg(short, long, global = true, default_value = ".", value_name = "dir")]
    pub root: PathBuf,

    /// Path to bootstrap configuration file.
    #[arg(short, long, global = true, value_name = "file")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    fn run(self) -> Result<()> {
        let config = load_config(self.config)?;
        let layout = config.layout(&self.root)?;

        match self.command {
            Command::Run => {
                run_configs(&config, &layout)?;
                run_deps(&config, &layout)?;
            }
            Command::Configs => run_configs(&config, &layout)?,
            Command::Deps => run_deps(&config, &layout)?,
            Command::Resolve(opts) => run_resolve(&config, opts)?,
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Install configuration files, then check out all dependencies.
    #[command(override_usage = "dotboot run [options]")]
    Run,

    /// Install configuration files only.
    #[command(override_usage = "dotboot configs [options]")]
    Configs,

    /// Check out all dependencies only.
    #[command(override_usage = "dotboot deps [options]")]
    Deps,

    /// Show ref that would be checked out for a repository.
    #[command(override_usage = "dotboot resolve [options] <owner> <name>")]
    Resolve(ResolveOptions),
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct ResolveOptions {
    /// Owner of remote repository.
    #[arg(required = true, value_name = "owner")]
    pub owner: String,

    /// Name of remote repository.
    #[arg(required = true, value_name = "name")]
    pub name: String,
}

fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run() {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

fn run() -> Result<()> {
    Cli::parse().run()
}

fn load_config(path: Option<PathBuf>) -> Result<BootstrapConfig> {
    let path = match path {
        Some(path) => path,
        None => {
            let path = default_config_file()?;
            if !path.exists() {
                info!("no configuration at {:?}, using defaults", path.display());
                return Ok(BootstrapConfig::default());
            }
            path
        }
    };

    let data = read_to_string(&path)
        .with_context(|| format!("failed to read configuration {:?}", path.display()))?;
    let config = data
        .parse::<BootstrapConfig>()
        .with_context(|| format!("failed to parse configuration {:?}", path.display()))?;

    Ok(config)
}

fn run_configs(config: &BootstrapConfig, layout: &Layout) -> Result<()> {
    let report = install_configs(
        &layout.configs_dir,
        &layout.target_dir,
        &config.settings.exclude,
    )?;
    info!(
        "installed {} configuration files, backed up {}",
        report.copied.len(),
        report.backed_up.len()
    );

    Ok(())
}

fn run_deps(config: &BootstrapConfig, layout: &Layout) -> Result<()> {
    let data = read_to_string(&layout.dependencies).with_context(|| {
        format!(
            "failed to read dependency list {:?}",
            layout.dependencies.display()
        )
    })?;
    let dependencies = data.parse::<DependencyList>().with_context(|| {
        format!(
            "failed to parse dependency list {:?}",
            layout.dependencies.display()
        )
    })?;

    let bootstrap = Bootstrap::from_settings(&config.remote, config.settings.backup_checkouts);
    let report = bootstrap.sync_all(&dependencies, &layout.checkout_dir);
    if !report.is_complete() {
        warn!("{} dependencies failed to sync", report.failed.len());
    }

    info!("setup complete");

    Ok(())
}

fn run_resolve(config: &BootstrapConfig, opts: ResolveOptions) -> Result<()> {
    let bootstrap = Bootstrap::from_settings(&config.remote, config.settings.backup_checkouts);
    let reference = bootstrap.resolve(&opts.owner, &opts.name)?;
    println!("{reference}");

    Ok(())
}
