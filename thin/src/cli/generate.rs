// thin/src/cli/generate.rs
use std::path::PathBuf;

use clap::Args;
use colored::Colorize;
use thin_common::error::Result;
use thin_common::Config;
use thin_core::classpath::package_coordinate;
use thin_core::properties::PropertiesWriter;
use tracing::instrument;

use super::open_launcher;

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Application package: a jar, an exploded directory or a maven:// coordinate
    pub archive: Option<String>,

    /// Directory receiving `META-INF/<name>.properties`
    #[arg(long, short)]
    pub output: PathBuf,
}

impl GenerateArgs {
    #[instrument(skip_all, fields(archive = ?self.archive))]
    pub fn run(&self, mut config: Config, verbose: u8) -> Result<()> {
        let launcher = open_launcher(&mut config, self.archive.as_deref(), verbose)?;
        let archive = launcher.archive();
        let resolved = launcher
            .engine()
            .extract(archive, &config.name, &config.profiles)?;
        let project = package_coordinate(archive)?;
        let written = PropertiesWriter::new(&project).write(&self.output, &config.name, resolved.iter())?;
        println!(
            "{} Wrote {} ({} dependencies)",
            "✓".green(),
            written.display().to_string().cyan(),
            resolved.len()
        );
        Ok(())
    }
}
