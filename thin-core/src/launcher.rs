// thin-core/src/launcher.rs
//! Turns a package and its computed load path into a JVM command line.
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use thin_common::config::Config;
use thin_common::error::{Result, ThinError};
use tracing::{debug, instrument};

use crate::archive::{Archive, ArchiveLocator, NestedEntry, NESTED_CLASSES};
use crate::classpath::{Classpath, PATH_SEPARATOR};
use crate::resolve::{ArtifactResolver, ResolveOptions};

const THIN_ARG_PREFIX: &str = "--thin.";

/// Everything needed to start an application.
pub trait Launcher {
    /// Ordered load path, package entries first.
    fn classpath(&self) -> Result<Vec<PathBuf>>;

    fn main_class(&self) -> Result<String>;

    fn command(&self, args: &[String]) -> Result<Command>;
}

pub struct ThinLauncher {
    config: Config,
    archive: Archive,
    parent: Option<Archive>,
    classpath: Classpath,
}

impl ThinLauncher {
    /// Opens the configured package (and parent, if any), fetching them through
    /// `resolver` when they are given as coordinates.
    pub fn new(config: &Config, resolver: Arc<dyn ArtifactResolver>) -> Result<Self> {
        let locator: ArchiveLocator = config
            .archive
            .as_deref()
            .ok_or_else(|| ThinError::Config("no archive to launch".to_string()))?
            .parse()?;
        let archive = locator.open(resolver.as_ref())?;
        let parent = match config.parent_locator.as_deref() {
            Some(text) => {
                let locator: ArchiveLocator = text.parse()?;
                debug!("Using parent package {}", locator);
                Some(locator.open(resolver.as_ref())?)
            }
            None => None,
        };
        let classpath = Classpath::new(resolver).with_locations(config.extra_locations.clone());
        Ok(Self {
            config: config.clone(),
            archive,
            parent,
            classpath,
        })
    }

    pub fn with_options(mut self, options: ResolveOptions) -> Self {
        self.classpath = self.classpath.with_options(options);
        self
    }

    pub fn archive(&self) -> &Archive {
        &self.archive
    }

    pub fn parent(&self) -> Option<&Archive> {
        self.parent.as_ref()
    }

    pub fn engine(&self) -> &Classpath {
        &self.classpath
    }

    /// Local directory for the nested classes of the package.
    fn nested_classes(&self) -> Result<Option<PathBuf>> {
        match self.archive.nested_entry(NESTED_CLASSES) {
            None => Ok(None),
            Some(NestedEntry::Directory(dir)) => Ok(Some(dir)),
            Some(NestedEntry::InJar { archive, prefix }) => {
                materialize(&self.archive, &archive, &prefix, &self.config.nested_dir()).map(Some)
            }
        }
    }
}

impl Launcher for ThinLauncher {
    #[instrument(skip(self), fields(archive = %self.archive.path().display()))]
    fn classpath(&self) -> Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        if let Some(nested) = self.nested_classes()? {
            entries.push(canonical(nested));
        }
        entries.push(canonical(self.archive.path().to_path_buf()));
        let set = self.classpath.combine(
            self.parent.as_ref(),
            &self.archive,
            &self.config.name,
            &self.config.profiles,
        )?;
        for artifact in set {
            let path = canonical(artifact.path);
            if !entries.contains(&path) {
                entries.push(path);
            }
        }
        debug!("Load path has {} entries", entries.len());
        Ok(entries)
    }

    fn main_class(&self) -> Result<String> {
        if let Some(main) = &self.config.main_override {
            return Ok(main.clone());
        }
        self.archive.main_class()?.ok_or_else(|| {
            ThinError::AmbiguousEntryPoint(self.archive.path().display().to_string())
        })
    }

    fn command(&self, args: &[String]) -> Result<Command> {
        let main = self.main_class()?;
        let classpath = join_path(&self.classpath()?);
        let mut command = Command::new(java_executable());
        command.arg("-cp").arg(classpath).arg(&main).args(args);
        debug!("Launch command: {:?}", command);
        Ok(command)
    }
}

/// Absolute form of a load path entry; entries that do not exist are kept as given.
fn canonical(path: PathBuf) -> PathBuf {
    fs::canonicalize(&path).unwrap_or(path)
}

pub fn join_path(entries: &[PathBuf]) -> String {
    entries
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(PATH_SEPARATOR)
}

fn java_executable() -> PathBuf {
    match env::var_os("JAVA_HOME") {
        Some(home) if !home.is_empty() => Path::new(&home).join("bin").join("java"),
        _ => PathBuf::from("java"),
    }
}

/// Extracts a directory inside a jar once, keyed by the jar's path.
fn materialize(source: &Archive, jar: &Path, prefix: &str, nested_root: &Path) -> Result<PathBuf> {
    let canonical = fs::canonicalize(jar).unwrap_or_else(|_| jar.to_path_buf());
    let mut hasher = Sha256::new();
    hasher.update(canonical.to_string_lossy().as_bytes());
    hasher.update(prefix.as_bytes());
    let target = nested_root.join(hex::encode(hasher.finalize()));
    if target.is_dir() {
        debug!("Reusing nested classes at {}", target.display());
        return Ok(target);
    }

    let staging = target.with_extension("partial");
    if staging.exists() {
        fs::remove_dir_all(&staging)?;
    }
    source.extract_prefix(prefix, &staging)?;
    fs::rename(&staging, &target)?;
    debug!("Extracted nested classes of {} to {}", jar.display(), target.display());
    Ok(target)
}

/// Application arguments with every `--thin.*` option removed.
///
/// Arguments after a bare `--` are passed through untouched.
pub fn strip_thin_args(args: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity(args.len());
    let mut iter = args.iter();
    for arg in iter.by_ref() {
        if arg == "--" {
            break;
        }
        if !arg.starts_with(THIN_ARG_PREFIX) {
            out.push(arg.clone());
        }
    }
    out.extend(iter.cloned());
    out
}

/// `--thin.<key>[=<value>]` arguments as option pairs (before any bare `--`).
pub fn thin_args(args: &[String]) -> Vec<(String, String)> {
    args.iter()
        .take_while(|arg| arg.as_str() != "--")
        .filter_map(|arg| arg.strip_prefix(THIN_ARG_PREFIX))
        .map(|option| match option.split_once('=') {
            Some((key, value)) => (key.to_string(), value.to_string()),
            None => (option.to_string(), String::new()),
        })
        .collect()
}
