// thin/src/cli/resolve.rs
use clap::Args;
use colored::Colorize;
use thin_common::error::Result;
use thin_common::Config;
use thin_core::launcher::Launcher;
use tracing::{debug, instrument};

use super::open_launcher;

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Application package: a jar, an exploded directory or a maven:// coordinate
    pub archive: Option<String>,
}

impl ResolveArgs {
    #[instrument(skip_all, fields(archive = ?self.archive))]
    pub fn run(&self, mut config: Config, verbose: u8) -> Result<()> {
        let launcher = open_launcher(&mut config, self.archive.as_deref(), verbose)?;
        let requests = launcher.engine().requests(
            launcher.archive(),
            &config.name,
            &config.profiles,
        )?;
        for request in &requests {
            debug!("Requested {}", request);
        }
        let entries = launcher.classpath()?;
        println!(
            "{} {} ({} declared dependencies, {} load path entries)",
            "✓".green(),
            launcher.archive().path().display(),
            requests.len(),
            entries.len()
        );
        Ok(())
    }
}
