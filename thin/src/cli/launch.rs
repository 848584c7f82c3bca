// thin/src/cli/launch.rs
use std::process;

use clap::Args;
use thin_common::error::{Result, ThinError};
use thin_common::Config;
use thin_core::launcher::{join_path, strip_thin_args, thin_args, Launcher};
use tracing::{debug, instrument};

use super::{open_launcher, GlobalOptions};

#[derive(Args, Debug)]
pub struct LaunchArgs {
    /// Application package: a jar, an exploded directory or a maven:// coordinate
    pub archive: Option<String>,

    /// Arguments for the application; `--thin.<key>=<value>` ones configure the launcher
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

impl LaunchArgs {
    #[instrument(skip_all, fields(archive = ?self.archive))]
    pub fn run(&self, mut config: Config, options: &GlobalOptions, verbose: u8) -> Result<()> {
        let overrides = thin_args(&self.args);
        config.apply_options(overrides.iter().map(|(k, v)| (k.as_str(), v.as_str())))?;
        options.apply(&mut config)?;

        let launcher = open_launcher(&mut config, self.archive.as_deref(), verbose)?;
        if config.classpath_only {
            println!("{}", join_path(&launcher.classpath()?));
            return Ok(());
        }
        if config.dry_run {
            let entries = launcher.classpath()?;
            debug!("Dry run, resolved {} load path entries", entries.len());
            return Ok(());
        }

        let mut command = launcher.command(&strip_thin_args(&self.args))?;
        let status = command.status().map_err(|e| {
            ThinError::Launch(format!("Failed to start {:?}: {}", command.get_program(), e))
        })?;
        debug!("Application exited with {}", status);
        if !status.success() {
            process::exit(status.code().unwrap_or(1));
        }
        Ok(())
    }
}
