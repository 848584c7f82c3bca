// thin/src/cli.rs
//! Defines the command-line argument structure using clap.
use std::path::PathBuf;
use std::sync::Arc;

use clap::{ArgAction, Args, Parser, Subcommand};
use colored::Colorize;
use thin_common::error::Result;
use thin_common::model::ResolvedArtifact;
use thin_common::Config;
use thin_core::resolve::{ArtifactResolver, RepositoryResolver, ResolveOptions};
use thin_core::ThinLauncher;
use thin_net::MavenRepository;

pub mod classpath;
pub mod generate;
pub mod launch;
pub mod resolve;

use crate::cli::classpath::ClasspathArgs;
use crate::cli::generate::GenerateArgs;
use crate::cli::launch::LaunchArgs;
use crate::cli::resolve::ResolveArgs;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, name = "thin", bin_name = "thin")]
#[command(propagate_version = true)]
pub struct CliArgs {
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(flatten)]
    pub options: GlobalOptions,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every command. They override `THIN_*` variables and `--thin.*` arguments.
#[derive(Args, Debug, Default)]
pub struct GlobalOptions {
    /// Resolution cache root (the local repository lives in `<root>/repository`)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Descriptor name, `thin` looks for `thin.properties`
    #[arg(long, global = true)]
    pub name: Option<String>,

    /// Active profiles, comma separated
    #[arg(long, global = true)]
    pub profile: Option<String>,

    /// Extra descriptor locations, comma separated
    #[arg(long, global = true)]
    pub location: Option<String>,

    /// Baseline package (path or maven:// coordinate) whose artifacts are not repeated
    #[arg(long, global = true)]
    pub parent: Option<String>,

    /// Entry point class, instead of the one in the manifest
    #[arg(long, global = true)]
    pub main: Option<String>,

    /// Only use the local repository
    #[arg(long, global = true)]
    pub offline: bool,

    /// Remote repository URL, may be repeated
    #[arg(long = "repository", global = true)]
    pub repositories: Vec<String>,
}

impl GlobalOptions {
    pub fn apply(&self, config: &mut Config) -> Result<()> {
        if let Some(root) = &self.root {
            config.root = root.clone();
        }
        let pairs = [
            ("name", self.name.as_deref()),
            ("profile", self.profile.as_deref()),
            ("extraLocations", self.location.as_deref()),
            ("parentLocator", self.parent.as_deref()),
            ("mainOverride", self.main.as_deref()),
        ];
        for (key, value) in pairs {
            if let Some(value) = value {
                config.apply_option(key, value)?;
            }
        }
        if self.offline {
            config.offline = true;
        }
        if !self.repositories.is_empty() {
            config.apply_option("repositories", &self.repositories.join(","))?;
        }
        Ok(())
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compute the load path of an application and run it
    Launch(LaunchArgs),
    /// Print the load path of an application
    Classpath(ClasspathArgs),
    /// Resolve every dependency without launching
    Resolve(ResolveArgs),
    /// Write a computed properties descriptor listing the resolved load path
    Generate(GenerateArgs),
}

impl Command {
    pub fn run(&self, config: Config, options: &GlobalOptions, verbose: u8) -> Result<()> {
        match self {
            Self::Launch(command) => command.run(config, options, verbose),
            Self::Classpath(command) => command.run(config, verbose),
            Self::Resolve(command) => command.run(config, verbose),
            Self::Generate(command) => command.run(config, verbose),
        }
    }
}

/// Repository-backed resolver for the configured root and remotes.
pub fn build_resolver(config: &Config) -> Result<Arc<dyn ArtifactResolver>> {
    let repository = MavenRepository::from_config(config)?;
    Ok(Arc::new(RepositoryResolver::new(repository)))
}

/// Resolution options; with `show_progress` every resolved artifact is reported on stderr.
pub fn resolve_options(show_progress: bool) -> ResolveOptions {
    let options = ResolveOptions::default();
    if !show_progress {
        return options;
    }
    options.with_progress(Arc::new(|artifact: &ResolvedArtifact| {
        eprintln!("{} {}", "Resolved".green(), artifact);
    }))
}

/// Launcher for `archive` (or the configured one).
pub fn open_launcher(config: &mut Config, archive: Option<&str>, verbose: u8) -> Result<ThinLauncher> {
    if let Some(archive) = archive {
        config.archive = Some(archive.to_string());
    }
    let resolver = build_resolver(config)?;
    let show_progress = verbose > 0 || config.debug;
    Ok(ThinLauncher::new(config, resolver)?.with_options(resolve_options(show_progress)))
}
