// thin-core/tests/common/mod.rs
#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thin_common::error::{Result, ThinError};
use thin_common::model::{Coordinate, DependencyRequest, ResolvedArtifact};
use thin_core::resolve::ArtifactResolver;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Deterministic resolver: a fixed dependency graph keyed by `group:artifact`
/// and a directory of descriptors in repository layout.
#[derive(Default)]
pub struct FakeResolver {
    graph: HashMap<String, Vec<String>>,
    missing: HashSet<String>,
    descriptors: Option<PathBuf>,
}

impl FakeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// `coordinate` depends on `dependencies` (full coordinates with versions).
    pub fn with(mut self, coordinate: &str, dependencies: &[&str]) -> Self {
        let key = ga(&Coordinate::parse(coordinate).unwrap());
        self.graph
            .insert(key, dependencies.iter().map(|d| d.to_string()).collect());
        self
    }

    pub fn missing(mut self, coordinate: &str) -> Self {
        self.missing.insert(coordinate.to_string());
        self
    }

    pub fn with_descriptors(mut self, dir: &Path) -> Self {
        self.descriptors = Some(dir.to_path_buf());
        self
    }

    pub fn shared(self) -> Arc<dyn ArtifactResolver> {
        Arc::new(self)
    }
}

fn ga(coordinate: &Coordinate) -> String {
    format!("{}:{}", coordinate.group(), coordinate.artifact())
}

pub fn fake_path(coordinate: &Coordinate) -> PathBuf {
    PathBuf::from("/repo").join(coordinate.repository_path().unwrap_or_default())
}

impl ArtifactResolver for FakeResolver {
    fn resolve(&self, request: &DependencyRequest) -> Result<Vec<ResolvedArtifact>> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([request.coordinate.clone()]);
        while let Some(coordinate) = queue.pop_front() {
            if !seen.insert(coordinate.identity_key()) {
                continue;
            }
            if coordinate.version().is_none() || self.missing.contains(&coordinate.to_string()) {
                return Err(ThinError::resolution(coordinate.to_string(), "not in fixture"));
            }
            out.push(ResolvedArtifact::new(coordinate.clone(), fake_path(&coordinate)).with_scope(request.scope));
            if !request.transitive {
                break;
            }
            for dependency in self.graph.get(&ga(&coordinate)).into_iter().flatten() {
                let dependency = Coordinate::parse(dependency).unwrap();
                let dropped = request
                    .managed
                    .scope(&dependency)
                    .is_some_and(|scope| !scope.is_propagated());
                if !request.is_excluded(&dependency) && !dropped {
                    queue.push_back(request.managed.apply(&dependency));
                }
            }
        }
        Ok(out)
    }

    fn resolve_descriptor(&self, coordinate: &Coordinate) -> Result<PathBuf> {
        let path = self
            .descriptors
            .as_ref()
            .zip(coordinate.as_pom().repository_path())
            .map(|(dir, relative)| dir.join(relative))
            .filter(|path| path.is_file());
        path.ok_or_else(|| ThinError::DescriptorNotFound(coordinate.to_string()))
    }
}

/// Writes files into `root`, creating directories as needed.
pub fn write_files(root: &Path, files: &[(&str, &str)]) {
    for (name, content) in files {
        let path = root.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
}

/// Writes a jar containing `files`.
pub fn write_jar(path: &Path, files: &[(&str, &str)]) {
    let mut zip = ZipWriter::new(File::create(path).unwrap());
    for (name, content) in files {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

/// Descriptor `pom.xml` with the given `(coordinate, scope)` dependencies.
pub fn pom(coordinate: &str, dependencies: &[(&str, &str)]) -> String {
    let c = Coordinate::parse(coordinate).unwrap();
    let mut xml = format!(
        "<project><groupId>{}</groupId><artifactId>{}</artifactId><version>{}</version><dependencies>",
        c.group(),
        c.artifact(),
        c.version().unwrap()
    );
    for (dependency, scope) in dependencies {
        let d = Coordinate::parse(dependency).unwrap();
        xml.push_str(&format!(
            "<dependency><groupId>{}</groupId><artifactId>{}</artifactId>",
            d.group(),
            d.artifact()
        ));
        if let Some(version) = d.version() {
            xml.push_str(&format!("<version>{version}</version>"));
        }
        if !scope.is_empty() {
            xml.push_str(&format!("<scope>{scope}</scope>"));
        }
        xml.push_str("</dependency>");
    }
    xml.push_str("</dependencies></project>");
    xml
}

pub fn listing<'a, I: IntoIterator<Item = &'a ResolvedArtifact>>(artifacts: I) -> Vec<String> {
    artifacts
        .into_iter()
        .map(|a| a.coordinate.to_string())
        .collect()
}
