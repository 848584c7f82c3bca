// thin/src/cli/classpath.rs
use clap::Args;
use thin_common::error::Result;
use thin_common::Config;
use thin_core::launcher::{join_path, Launcher};
use tracing::instrument;

use super::open_launcher;

#[derive(Args, Debug)]
pub struct ClasspathArgs {
    /// Application package: a jar, an exploded directory or a maven:// coordinate
    pub archive: Option<String>,
}

impl ClasspathArgs {
    #[instrument(skip_all, fields(archive = ?self.archive))]
    pub fn run(&self, mut config: Config, verbose: u8) -> Result<()> {
        let launcher = open_launcher(&mut config, self.archive.as_deref(), verbose)?;
        println!("{}", join_path(&launcher.classpath()?));
        Ok(())
    }
}
