// thin-core/src/archive/mod.rs
//! Application packages: exploded directories and jar (zip) files.
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

use thin_common::error::{Result, ThinError};
use tracing::{debug, warn};
use walkdir::WalkDir;
use zip::ZipArchive;

pub mod discovery;
pub mod locator;
pub mod manifest;

pub use locator::ArchiveLocator;
pub use manifest::Manifest;

/// Default prefix of the nested classes directory of a packaged application.
pub const NESTED_CLASSES: &str = "BOOT-INF/classes/";

const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";
const MAVEN_METADATA_PREFIX: &str = "META-INF/maven/";
/// Upper bound on the buffer reserved from a zip header's declared size.
const MAX_ENTRY_RESERVE: u64 = 64 * 1024;

#[derive(Debug, Clone)]
pub enum Archive {
    Exploded { root: PathBuf },
    Jar { path: PathBuf, names: Vec<String> },
}

/// Load-path contribution of a nested classes directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NestedEntry {
    /// A real directory that can go on the load path as-is.
    Directory(PathBuf),
    /// A directory inside a jar; `prefix` ends with `/`.
    InJar { archive: PathBuf, prefix: String },
}

impl Archive {
    pub fn open(path: &Path) -> Result<Self> {
        if path.is_dir() {
            debug!("Opening exploded archive {}", path.display());
            return Ok(Archive::Exploded {
                root: path.to_path_buf(),
            });
        }
        if !path.is_file() {
            return Err(ThinError::Archive(format!(
                "Archive {} does not exist",
                path.display()
            )));
        }
        let file = File::open(path)?;
        let zip = ZipArchive::new(file).map_err(|e| {
            ThinError::Archive(format!("Failed to open jar {}: {}", path.display(), e))
        })?;
        let names: Vec<String> = zip.file_names().map(str::to_string).collect();
        debug!("Opened jar {} ({} entries)", path.display(), names.len());
        Ok(Archive::Jar {
            path: path.to_path_buf(),
            names,
        })
    }

    pub fn path(&self) -> &Path {
        match self {
            Archive::Exploded { root } => root,
            Archive::Jar { path, .. } => path,
        }
    }

    /// File entries below `prefix`, as `/`-separated paths relative to the archive root.
    pub fn entries(&self, prefix: &str) -> Result<Vec<String>> {
        let prefix = prefix.trim_start_matches('/');
        match self {
            Archive::Exploded { root } => {
                let base = root.join(prefix);
                if !base.exists() {
                    return Ok(Vec::new());
                }
                let mut found = Vec::new();
                for entry in WalkDir::new(&base).sort_by_file_name() {
                    let entry = entry.map_err(|e| {
                        ThinError::Archive(format!("Failed to walk {}: {}", base.display(), e))
                    })?;
                    if !entry.file_type().is_file() {
                        continue;
                    }
                    if let Ok(relative) = entry.path().strip_prefix(root) {
                        let name: Vec<String> = relative
                            .components()
                            .map(|c| c.as_os_str().to_string_lossy().into_owned())
                            .collect();
                        found.push(name.join("/"));
                    }
                }
                Ok(found)
            }
            Archive::Jar { names, .. } => {
                let mut found: Vec<String> = names
                    .iter()
                    .filter(|n| n.starts_with(prefix) && !n.ends_with('/'))
                    .cloned()
                    .collect();
                found.sort();
                Ok(found)
            }
        }
    }

    pub fn has_entry(&self, name: &str) -> bool {
        let name = name.trim_start_matches('/');
        match self {
            Archive::Exploded { root } => root.join(name).is_file(),
            Archive::Jar { names, .. } => names.iter().any(|n| n == name),
        }
    }

    /// Bytes of an entry, or `None` when the archive has no such entry.
    pub fn read_entry(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let name = name.trim_start_matches('/');
        if !self.has_entry(name) {
            return Ok(None);
        }
        match self {
            Archive::Exploded { root } => Ok(Some(fs::read(root.join(name))?)),
            Archive::Jar { path, .. } => {
                let mut zip = ZipArchive::new(File::open(path)?)?;
                let mut entry = zip.by_name(name)?;
                let mut bytes = Vec::with_capacity(entry.size().min(MAX_ENTRY_RESERVE) as usize);
                entry.read_to_end(&mut bytes)?;
                Ok(Some(bytes))
            }
        }
    }

    pub fn manifest(&self) -> Result<Option<Manifest>> {
        Ok(self
            .read_entry(MANIFEST_PATH)?
            .map(|bytes| Manifest::parse(&String::from_utf8_lossy(&bytes))))
    }

    /// Declared entry point: `Start-Class`, else `Main-Class`.
    pub fn main_class(&self) -> Result<Option<String>> {
        Ok(self.manifest()?.and_then(|m| {
            m.get("Start-Class")
                .or_else(|| m.get("Main-Class"))
                .map(str::to_string)
        }))
    }

    /// The package's own POM: `pom.xml` at the root, else the first
    /// `META-INF/maven/**/pom.xml` in name order.
    pub fn find_pom(&self) -> Result<Option<(String, Vec<u8>)>> {
        if let Some(bytes) = self.read_entry("pom.xml")? {
            return Ok(Some((self.describe("pom.xml"), bytes)));
        }
        let candidate = self
            .entries(MAVEN_METADATA_PREFIX)?
            .into_iter()
            .find(|name| name.ends_with("/pom.xml"));
        match candidate {
            Some(name) => Ok(self
                .read_entry(&name)?
                .map(|bytes| (self.describe(&name), bytes))),
            None => Ok(None),
        }
    }

    /// Human readable location of an entry, used in logs and errors.
    pub fn describe(&self, name: &str) -> String {
        match self {
            Archive::Exploded { root } => root.join(name).display().to_string(),
            Archive::Jar { path, .. } => format!("{}!/{}", path.display(), name),
        }
    }

    /// Load-path entry for the nested classes directory under `prefix`.
    /// A missing prefix contributes nothing.
    pub fn nested_entry(&self, prefix: &str) -> Option<NestedEntry> {
        let prefix = normalize_prefix(prefix);
        match self {
            Archive::Exploded { root } => {
                let dir = root.join(&prefix);
                dir.is_dir().then_some(NestedEntry::Directory(dir))
            }
            Archive::Jar { path, names } => names
                .iter()
                .any(|n| n.starts_with(&prefix) && n.len() > prefix.len())
                .then(|| NestedEntry::InJar {
                    archive: path.clone(),
                    prefix,
                }),
        }
    }

    /// Copies every entry under `prefix` into `target_dir`, stripping the prefix.
    pub fn extract_prefix(&self, prefix: &str, target_dir: &Path) -> Result<usize> {
        let prefix = normalize_prefix(prefix);
        fs::create_dir_all(target_dir)?;
        let mut written = 0;
        for name in self.entries(&prefix)? {
            let Some(relative) = safe_relative(&name[prefix.len()..]) else {
                warn!("Skipping unsafe entry {} in {}", name, self.path().display());
                continue;
            };
            let target = target_dir.join(relative);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            match self {
                Archive::Exploded { root } => {
                    fs::copy(root.join(&name), &target)?;
                }
                Archive::Jar { path, .. } => {
                    let mut zip = ZipArchive::new(File::open(path)?)?;
                    let mut entry = zip.by_name(&name)?;
                    let mut out = File::create(&target)?;
                    io::copy(&mut entry, &mut out)?;
                }
            }
            written += 1;
        }
        debug!(
            "Extracted {} entries under {} from {} to {}",
            written,
            prefix,
            self.path().display(),
            target_dir.display()
        );
        Ok(written)
    }
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_start_matches('/');
    if trimmed.is_empty() || trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    }
}

/// Rejects absolute paths and `..` components.
fn safe_relative(name: &str) -> Option<PathBuf> {
    let path = Path::new(name);
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    (!out.as_os_str().is_empty()).then_some(out)
}
